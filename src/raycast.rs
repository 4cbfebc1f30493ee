//! Grid raycasting.
//!
//! [`GridRaycaster`] fans `ray_count` rays across the field of view and
//! reports, per ray, how far it travelled before entering a wall cell. It
//! keeps no state between calls: the same grid, pose and config always give
//! bit-identical results.
//!
//! Two stepping modes are available (see [`Stepping`]):
//!
//! * `March` samples the ray every `step_size` cells and stops at the first
//!   sample whose cell is a wall. The origin cell is not tested unless
//!   `test_origin` is set, so a viewer standing inside a wall still sees the
//!   first step taken before anything is checked.
//! * `Dda` walks cell boundaries exactly and reports the true distance to
//!   the wall face.
//!
//! Distances are Euclidean along the ray unless `correct_fisheye` is set,
//! in which case hits report `ray_distance * cos(ray_angle - heading)`, the
//! perpendicular distance to the camera plane. Misses always report
//! `max_distance`.

use crate::config::{RaycastConfig, Stepping};
use crate::error::Result;
use crate::grid::Grid;
use crate::pose::{Pose, Vec2};

/// Side of a wall cell a ray entered through.
///
/// `North` is the low-y edge (top of the minimap), `West` the low-x edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    North,
    South,
    East,
    West,
}

impl Face {
    /// True for the faces crossed while stepping in x
    #[inline(always)]
    pub fn is_vertical(self) -> bool {
        matches!(self, Face::East | Face::West)
    }
}

/// Outcome of a single ray
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Absolute ray angle in radians
    pub angle: f64,
    /// Reported distance, fisheye-corrected when enabled; `max_distance` on a miss
    pub distance: f64,
    /// Euclidean distance travelled along the ray
    pub ray_distance: f64,
    pub hit: bool,
    /// Wall cell the ray stopped in
    pub cell: Option<(i32, i32)>,
    pub face: Option<Face>,
    /// Position along the struck face in `[0, 1)`, for texture lookup
    pub wall_offset: f64,
}

impl RayHit {
    fn miss(angle: f64, max_distance: f64) -> Self {
        Self {
            angle,
            distance: max_distance,
            ray_distance: max_distance,
            hit: false,
            cell: None,
            face: None,
            wall_offset: 0.0,
        }
    }
}

/// One [`RayHit`] per ray, ordered left to right across the field of view
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RaycastResult {
    hits: Vec<RayHit>,
}

impl RaycastResult {
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RayHit> {
        self.hits.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RayHit> {
        self.hits.iter()
    }

    pub fn hits(&self) -> &[RayHit] {
        &self.hits
    }

    /// Reported distances in ray order
    pub fn distances(&self) -> Vec<f64> {
        self.hits.iter().map(|h| h.distance).collect()
    }

    pub fn into_hits(self) -> Vec<RayHit> {
        self.hits
    }
}

impl<'a> IntoIterator for &'a RaycastResult {
    type Item = &'a RayHit;
    type IntoIter = std::slice::Iter<'a, RayHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

impl std::ops::Index<usize> for RaycastResult {
    type Output = RayHit;

    fn index(&self, index: usize) -> &RayHit {
        &self.hits[index]
    }
}

/// Absolute angle of ray `index`.
///
/// Rays start at the left edge of the view, `heading - fov / 2`, and are
/// spaced `fov / ray_count` apart. A single ray is cast straight along the
/// heading.
#[inline(always)]
pub fn ray_angle(heading: f64, config: &RaycastConfig, index: usize) -> f64 {
    if config.ray_count == 1 {
        return heading;
    }
    heading - config.fov_radians / 2.0 + index as f64 * config.angle_step()
}

/// Wall found by one of the stepping strategies
struct Contact {
    distance: f64,
    cell: (i32, i32),
    face: Face,
    wall_offset: f64,
}

/// Stateless raycaster over a borrowed grid
#[derive(Clone, Copy, Debug)]
pub struct GridRaycaster<'a> {
    grid: &'a Grid,
}

impl<'a> GridRaycaster<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &'a Grid {
        self.grid
    }

    /// Cast the full fan of rays for `pose`.
    ///
    /// Fails with `InvalidConfig` before any ray is cast; on success the
    /// result always holds exactly `config.ray_count` entries.
    pub fn cast(&self, pose: Pose, config: &RaycastConfig) -> Result<RaycastResult> {
        config.validate()?;

        let hits: Vec<RayHit> = (0..config.ray_count)
            .map(|i| self.cast_ray(pose, ray_angle(pose.angle, config, i), config))
            .collect();

        log::trace!(
            "cast {} rays from ({:.3}, {:.3}) heading {:.3}",
            hits.len(),
            pose.x,
            pose.y,
            pose.angle
        );
        Ok(RaycastResult { hits })
    }

    /// Cast a single ray at an absolute angle. `config` is assumed valid.
    pub fn cast_ray(&self, pose: Pose, angle: f64, config: &RaycastConfig) -> RayHit {
        let origin = pose.position();

        if config.test_origin && self.grid.is_wall_at(origin.x, origin.y) {
            return RayHit {
                angle,
                distance: 0.0,
                ray_distance: 0.0,
                hit: true,
                cell: Some(pose.cell()),
                face: None,
                wall_offset: 0.0,
            };
        }

        let dir = Vec2::from_angle(angle);
        let contact = match config.stepping {
            Stepping::March => self.march(origin, dir, config.step_size, config.max_distance),
            Stepping::Dda => self.traverse(origin, dir, config.max_distance),
        };

        let Some(contact) = contact else {
            return RayHit::miss(angle, config.max_distance);
        };

        let distance = if config.correct_fisheye {
            contact.distance * (angle - pose.angle).cos()
        } else {
            contact.distance
        };

        RayHit {
            angle,
            distance,
            ray_distance: contact.distance,
            hit: true,
            cell: Some(contact.cell),
            face: Some(contact.face),
            wall_offset: contact.wall_offset,
        }
    }

    /// Fixed-step marching. Sample `k` sits at `k * step` along the ray and
    /// is only taken while that distance is within `max_distance`.
    fn march(&self, origin: Vec2, dir: Vec2, step: f64, max_distance: f64) -> Option<Contact> {
        let mut k: u64 = 1;
        loop {
            let distance = k as f64 * step;
            if distance > max_distance {
                return None;
            }

            let point = origin.add(&dir.scale(distance));
            let cell = (point.x.floor() as i32, point.y.floor() as i32);
            if self.grid.is_wall(cell.0, cell.1) {
                let (face, wall_offset) = entry_face(origin, dir, cell);
                return Some(Contact {
                    distance,
                    cell,
                    face,
                    wall_offset,
                });
            }
            k += 1;
        }
    }

    /// DDA traversal: jump from one cell boundary to the next, testing each
    /// newly entered cell.
    fn traverse(&self, origin: Vec2, dir: Vec2, max_distance: f64) -> Option<Contact> {
        let mut map_x = origin.x.floor() as i32;
        let mut map_y = origin.y.floor() as i32;

        // Everything off the grid is solid, so an off-grid origin is already
        // touching a wall. Stepping from it could also overflow the cell index.
        if !self.grid.contains(map_x, map_y) {
            let cell = (map_x, map_y);
            let (face, wall_offset) = entry_face(origin, dir, cell);
            return Some(Contact {
                distance: 0.0,
                cell,
                face,
                wall_offset,
            });
        }

        // Axis-parallel rays never cross the other axis' boundaries
        let delta_x = if dir.x.abs() > 1e-12 {
            (1.0 / dir.x).abs()
        } else {
            1e30
        };
        let delta_y = if dir.y.abs() > 1e-12 {
            (1.0 / dir.y).abs()
        } else {
            1e30
        };

        let (step_x, mut side_x) = if dir.x < 0.0 {
            (-1, (origin.x - map_x as f64) * delta_x)
        } else {
            (1, (map_x as f64 + 1.0 - origin.x) * delta_x)
        };
        let (step_y, mut side_y) = if dir.y < 0.0 {
            (-1, (origin.y - map_y as f64) * delta_y)
        } else {
            (1, (map_y as f64 + 1.0 - origin.y) * delta_y)
        };

        loop {
            let (distance, face) = if side_x < side_y {
                map_x += step_x;
                side_x += delta_x;
                let face = if step_x > 0 { Face::West } else { Face::East };
                (side_x - delta_x, face)
            } else {
                map_y += step_y;
                side_y += delta_y;
                let face = if step_y > 0 { Face::North } else { Face::South };
                (side_y - delta_y, face)
            };

            if distance > max_distance {
                return None;
            }

            if self.grid.is_wall(map_x, map_y) {
                let along = if face.is_vertical() {
                    origin.y + distance * dir.y
                } else {
                    origin.x + distance * dir.x
                };
                return Some(Contact {
                    distance,
                    cell: (map_x, map_y),
                    face,
                    wall_offset: along - along.floor(),
                });
            }
        }
    }
}

/// Face through which a ray from `origin` enters `cell`, and where along it.
///
/// The entry point is the later of the two near-slab crossings; when the
/// origin already lies inside the cell the offset is clamped to the face.
fn entry_face(origin: Vec2, dir: Vec2, cell: (i32, i32)) -> (Face, f64) {
    let (cx, cy) = (cell.0 as f64, cell.1 as f64);

    let tx = if dir.x > 0.0 {
        (cx - origin.x) / dir.x
    } else if dir.x < 0.0 {
        (cx + 1.0 - origin.x) / dir.x
    } else {
        f64::NEG_INFINITY
    };
    let ty = if dir.y > 0.0 {
        (cy - origin.y) / dir.y
    } else if dir.y < 0.0 {
        (cy + 1.0 - origin.y) / dir.y
    } else {
        f64::NEG_INFINITY
    };

    let clamp = |v: f64| v.clamp(0.0, 1.0 - f64::EPSILON);
    if tx >= ty {
        let face = if dir.x > 0.0 { Face::West } else { Face::East };
        (face, clamp(origin.y + dir.y * tx - cy))
    } else {
        let face = if dir.y > 0.0 { Face::North } else { Face::South };
        (face, clamp(origin.x + dir.x * ty - cx))
    }
}
