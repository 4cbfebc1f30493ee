//! Raycast and engine configuration.
//!
//! Everything deserialises from camelCase JSON with every field optional, so a
//! host can override just the settings it cares about:
//!
//! ```
//! use tilecaster::config::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{ "raycast": { "rayCount": 160 } }"#).unwrap();
//! assert_eq!(config.raycast.ray_count, 160);
//! assert_eq!(config.tick_ms, 30.0);
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_3, FRAC_PI_4, PI};

use crate::error::{Error, Result};
use crate::pose::Pose;

/// How rays advance through the grid
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stepping {
    /// Fixed `step_size` increments, sampling the cell under each point
    #[default]
    March,
    /// Exact cell-boundary traversal; `step_size` is ignored
    Dda,
}

/// Field of view and ray marching settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RaycastConfig {
    /// Horizontal field of view in radians
    pub fov_radians: f64,
    /// Rays per cast, one per screen column
    pub ray_count: usize,
    /// Marching increment in cell units
    pub step_size: f64,
    /// Rays that travel this far without a hit report a miss
    pub max_distance: f64,
    /// Report `distance * cos(ray angle - heading)` instead of the raw ray length
    pub correct_fisheye: bool,
    pub stepping: Stepping,
    /// Report an immediate hit when the viewer starts inside a wall
    pub test_origin: bool,
}

impl Default for RaycastConfig {
    fn default() -> Self {
        Self {
            fov_radians: FRAC_PI_3,
            ray_count: 320,
            step_size: 0.05,
            max_distance: 16.0,
            correct_fisheye: true,
            stepping: Stepping::March,
            test_origin: false,
        }
    }
}

impl RaycastConfig {
    pub fn validate(&self) -> Result<()> {
        positive("fovRadians", self.fov_radians)?;
        positive("stepSize", self.step_size)?;
        positive("maxDistance", self.max_distance)?;
        if self.ray_count == 0 {
            return Err(Error::InvalidConfig("rayCount must be > 0".into()));
        }
        // cos(ray angle - heading) goes negative past a quarter turn either side
        if self.correct_fisheye && self.fov_radians >= PI {
            return Err(Error::InvalidConfig(format!(
                "fovRadians must be < pi with correctFisheye, got {}",
                self.fov_radians
            )));
        }
        Ok(())
    }

    /// Angle between neighbouring rays
    #[inline(always)]
    pub fn angle_step(&self) -> f64 {
        self.fov_radians / self.ray_count as f64
    }
}

/// Per-tick movement settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MovementConfig {
    /// Cells moved per tick while a move key is held
    pub move_speed: f64,
    /// Radians turned per tick while a turn key is held
    pub rotation_speed: f64,
    /// Clearance kept between the viewer and wall faces
    pub collision_radius: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: 0.1,
            rotation_speed: 0.05,
            collision_radius: 0.2,
        }
    }
}

impl MovementConfig {
    pub fn validate(&self) -> Result<()> {
        positive("moveSpeed", self.move_speed)?;
        positive("rotationSpeed", self.rotation_speed)?;
        if !self.collision_radius.is_finite() || !(0.0..0.5).contains(&self.collision_radius) {
            return Err(Error::InvalidConfig(format!(
                "collisionRadius must be in [0, 0.5), got {}",
                self.collision_radius
            )));
        }
        Ok(())
    }
}

/// Everything the browser host needs to start a session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub raycast: RaycastConfig,
    pub movement: MovementConfig,
    /// Fixed simulation step in milliseconds
    pub tick_ms: f64,
    /// Tag rows for the map; `None` uses the built-in demo layout
    pub layout: Option<Vec<Vec<u8>>>,
    pub spawn: Pose,
    /// Minimap cell size as a fraction of the canvas height, 0 hides it
    pub minimap_scale: f64,
    /// Pin the ray count to the canvas width
    pub ray_per_column: bool,
}

pub const DEMO_LAYOUT: [[u8; 7]; 7] = [
    [1, 1, 1, 1, 1, 1, 1],
    [1, 0, 0, 0, 1, 0, 1],
    [1, 0, 1, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 1, 1, 1],
    [1, 0, 0, 0, 0, 0, 1],
    [1, 1, 1, 1, 1, 1, 1],
];

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            raycast: RaycastConfig::default(),
            movement: MovementConfig::default(),
            tick_ms: 30.0,
            layout: None,
            spawn: Pose::new(1.5, 1.5, FRAC_PI_4),
            minimap_scale: 0.04,
            ray_per_column: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.raycast.validate()?;
        self.movement.validate()?;
        positive("tickMs", self.tick_ms)?;
        if !self.minimap_scale.is_finite() || self.minimap_scale < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "minimapScale must be >= 0, got {}",
                self.minimap_scale
            )));
        }
        Ok(())
    }

    /// Tag rows for the configured map
    pub fn layout_rows(&self) -> Vec<Vec<u8>> {
        match &self.layout {
            Some(rows) => rows.clone(),
            None => DEMO_LAYOUT.iter().map(|r| r.to_vec()).collect(),
        }
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{} must be a finite value > 0, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_raycast_settings() {
        let base = RaycastConfig::default();
        let cases = [
            RaycastConfig {
                fov_radians: 0.0,
                ..base.clone()
            },
            RaycastConfig {
                ray_count: 0,
                ..base.clone()
            },
            RaycastConfig {
                step_size: -0.1,
                ..base.clone()
            },
            RaycastConfig {
                max_distance: f64::NAN,
                ..base.clone()
            },
            RaycastConfig {
                max_distance: f64::INFINITY,
                ..base.clone()
            },
            RaycastConfig {
                fov_radians: 4.0,
                correct_fisheye: true,
                ..base.clone()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(_))),
                "{:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn test_wide_fov_without_correction() {
        let config = RaycastConfig {
            fov_radians: 4.0,
            correct_fisheye: false,
            ..RaycastConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_spawn_is_open_floor() {
        let config = EngineConfig::default();
        let (x, y) = config.spawn.cell();
        assert_eq!(config.layout_rows()[y as usize][x as usize], 0);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EngineConfig::from_json(
            r#"{
                "raycast": { "fovRadians": 1.0, "stepping": "dda", "correctFisheye": false },
                "movement": { "moveSpeed": 0.2 },
                "spawn": { "x": 1.5, "y": 1.5, "angle": 0.0 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.raycast.fov_radians, 1.0);
        assert_eq!(config.raycast.stepping, Stepping::Dda);
        assert!(!config.raycast.correct_fisheye);
        assert_eq!(config.raycast.ray_count, 320);
        assert_eq!(config.movement.move_speed, 0.2);
        assert_eq!(config.movement.rotation_speed, 0.05);
        assert_eq!(config.spawn, Pose::new(1.5, 1.5, 0.0));
        assert_eq!(config.layout_rows().len(), 7);
    }

    #[test]
    fn test_invalid_json_values() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "raycast": { "rayCount": 0 } }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{ "tickMs": -5 }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json("{ not json"),
            Err(Error::Parse(_))
        ));
    }
}
