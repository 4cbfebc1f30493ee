//! Viewer pose in grid-cell units

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// 2D vector in grid-cell units
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    #[inline(always)]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector for a heading angle
    #[inline(always)]
    pub fn from_angle(angle: f64) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    #[inline(always)]
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    #[inline(always)]
    pub fn scale(&self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
        }
    }

    #[inline(always)]
    pub fn add(&self, other: &Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    #[inline(always)]
    pub fn distance_to(&self, other: &Self) -> f64 {
        Self::new(self.x - other.x, self.y - other.y).length()
    }
}

/// Position plus heading.
///
/// `angle` is in radians, 0 along +x and growing toward +y. With screen y
/// pointing down that reads as clockwise on the minimap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

impl Pose {
    #[inline(always)]
    pub const fn new(x: f64, y: f64, angle: f64) -> Self {
        Self { x, y, angle }
    }

    #[inline(always)]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Unit vector the viewer is facing
    #[inline(always)]
    pub fn forward(&self) -> Vec2 {
        Vec2::from_angle(self.angle)
    }

    /// Unit vector a quarter turn toward increasing angle, the side a
    /// positive rotation turns to
    #[inline(always)]
    pub fn right(&self) -> Vec2 {
        Vec2::new(-self.angle.sin(), self.angle.cos())
    }

    /// Cell the viewer stands in
    #[inline(always)]
    pub fn cell(&self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }

    pub fn with_position(&self, position: Vec2) -> Self {
        Self {
            x: position.x,
            y: position.y,
            angle: self.angle,
        }
    }

    /// Heading turned by `delta`, wrapped into `[0, 2π)`
    pub fn rotated(&self, delta: f64) -> Self {
        Self {
            angle: (self.angle + delta).rem_euclid(TAU),
            ..*self
        }
    }
}
