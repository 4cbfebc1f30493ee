//! Host-side simulation state: the map, the viewer and fixed-tick movement
//! with wall collision.

use crate::config::{MovementConfig, RaycastConfig};
use crate::error::{Error, Result};
use crate::grid::Grid;
use crate::input::Intent;
use crate::pose::{Pose, Vec2};
use crate::raycast::{GridRaycaster, RaycastResult};

/// Longest single collision step, in cells
const MAX_SUBSTEP: f64 = 0.5;

/// Frames that arrive after a long stall run at most this many ticks
const MAX_CATCH_UP: u32 = 5;

/// Turns variable frame timestamps into whole simulation ticks
#[derive(Clone, Debug)]
pub struct FixedStep {
    tick_ms: f64,
    accumulator: f64,
    last: Option<f64>,
}

impl FixedStep {
    pub fn new(tick_ms: f64) -> Self {
        Self {
            tick_ms,
            accumulator: 0.0,
            last: None,
        }
    }

    /// Number of ticks due at `now_ms`. The first call only sets the clock.
    pub fn advance(&mut self, now_ms: f64) -> u32 {
        let Some(last) = self.last.replace(now_ms) else {
            return 0;
        };
        self.accumulator += (now_ms - last).max(0.0);

        let mut ticks = 0;
        while self.accumulator >= self.tick_ms && ticks < MAX_CATCH_UP {
            self.accumulator -= self.tick_ms;
            ticks += 1;
        }
        if ticks == MAX_CATCH_UP && self.accumulator >= self.tick_ms {
            log::debug!("dropping {:.0}ms of simulation backlog", self.accumulator);
            self.accumulator %= self.tick_ms;
        }
        ticks
    }
}

pub struct World {
    grid: Grid,
    pose: Pose,
    movement: MovementConfig,
    ticks: u64,
}

impl World {
    pub fn new(grid: Grid, spawn: Pose, movement: MovementConfig) -> Result<Self> {
        movement.validate()?;
        let world = Self {
            grid,
            pose: spawn,
            movement,
            ticks: 0,
        };
        if world.is_blocked(spawn.x, spawn.y) {
            return Err(Error::InvalidConfig(format!(
                "spawn ({}, {}) overlaps a wall",
                spawn.x, spawn.y
            )));
        }
        log::debug!(
            "world ready: {}x{} grid, spawn ({:.2}, {:.2})",
            world.grid.width(),
            world.grid.height(),
            spawn.x,
            spawn.y
        );
        Ok(world)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Teleport, refusing positions whose footprint touches a wall
    pub fn set_pose(&mut self, pose: Pose) -> Result<()> {
        if self.is_blocked(pose.x, pose.y) {
            return Err(Error::InvalidConfig(format!(
                "pose ({}, {}) overlaps a wall",
                pose.x, pose.y
            )));
        }
        self.pose = pose;
        Ok(())
    }

    /// Advance one fixed step. Translation uses the heading at the start of
    /// the tick; the turn is applied afterwards.
    pub fn tick(&mut self, intent: Intent) {
        self.ticks += 1;

        let mut delta = self
            .pose
            .forward()
            .scale(intent.forward)
            .add(&self.pose.right().scale(intent.strafe));
        // Diagonal input is no faster than straight input
        let len = delta.length();
        if len > 1.0 {
            delta = delta.scale(1.0 / len);
        }
        if len > 0.0 {
            self.try_move(delta.scale(self.movement.move_speed));
        }

        if intent.turn != 0.0 {
            self.pose = self
                .pose
                .rotated(intent.turn * self.movement.rotation_speed);
        }
    }

    /// Move by `delta`, one axis at a time so the viewer slides along walls
    /// instead of stopping dead. Long moves are split into sub-steps shorter
    /// than a cell, so no wall can be stepped over. Returns the displacement
    /// actually applied.
    pub fn try_move(&mut self, delta: Vec2) -> Vec2 {
        let start = self.pose.position();
        let steps = (delta.length() / MAX_SUBSTEP).ceil().max(1.0) as usize;
        let part = delta.scale(1.0 / steps as f64);

        let mut pos = start;
        let mut clipped = false;
        for _ in 0..steps {
            let (next, blocked) = self.slide(pos, part);
            pos = next;
            clipped |= blocked;
        }

        if clipped {
            log::trace!(
                "move clipped at ({:.3}, {:.3}), wanted ({:.3}, {:.3})",
                pos.x,
                pos.y,
                delta.x,
                delta.y
            );
        }
        self.pose = self.pose.with_position(pos);
        Vec2::new(pos.x - start.x, pos.y - start.y)
    }

    /// One sub-step of [`World::try_move`]; also reports whether an axis was refused
    fn slide(&self, from: Vec2, delta: Vec2) -> (Vec2, bool) {
        let mut next = from;
        let mut blocked = false;
        if delta.x != 0.0 {
            if self.is_blocked(next.x + delta.x, next.y) {
                blocked = true;
            } else {
                next.x += delta.x;
            }
        }
        if delta.y != 0.0 {
            if self.is_blocked(next.x, next.y + delta.y) {
                blocked = true;
            } else {
                next.y += delta.y;
            }
        }
        (next, blocked)
    }

    /// Whether a viewer centred at `(x, y)` would overlap a wall cell. The
    /// footprint is a square of half-width `collision_radius`.
    pub fn is_blocked(&self, x: f64, y: f64) -> bool {
        let r = self.movement.collision_radius;
        let (x0, x1) = ((x - r).floor() as i32, (x + r).floor() as i32);
        let (y0, y1) = ((y - r).floor() as i32, (y + r).floor() as i32);
        (y0..=y1).any(|cy| (x0..=x1).any(|cx| self.grid.is_wall(cx, cy)))
    }

    pub fn cast(&self, config: &RaycastConfig) -> Result<RaycastResult> {
        GridRaycaster::new(&self.grid).cast(self.pose, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputState;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, TAU};

    fn open_room() -> Grid {
        Grid::parse(
            "#####
#...#
#...#
#...#
#####",
        )
        .unwrap()
    }

    fn world_at(pose: Pose) -> World {
        World::new(open_room(), pose, MovementConfig::default()).unwrap()
    }

    fn held(codes: &[&str]) -> Intent {
        let mut input = InputState::new();
        for code in codes {
            input.key_down(code);
        }
        input.intent()
    }

    #[test]
    fn test_forward_follows_heading() {
        let mut world = world_at(Pose::new(1.5, 1.5, 0.0));
        world.tick(held(&["KeyW"]));
        assert_relative_eq!(world.pose().x, 1.6, epsilon = 1e-12);
        assert_relative_eq!(world.pose().y, 1.5, epsilon = 1e-12);

        let mut world = world_at(Pose::new(2.5, 2.5, FRAC_PI_2));
        world.tick(held(&["KeyS"]));
        assert_relative_eq!(world.pose().x, 2.5, epsilon = 1e-12);
        assert_relative_eq!(world.pose().y, 2.4, epsilon = 1e-12);
        assert_eq!(world.ticks(), 1);
    }

    #[test]
    fn test_strafe_and_turn_agree() {
        // Turning right and strafing right both head toward +y when facing +x
        let mut world = world_at(Pose::new(2.5, 2.5, 0.0));
        world.tick(held(&["KeyD"]));
        assert_relative_eq!(world.pose().y, 2.6, epsilon = 1e-12);

        world.tick(held(&["ArrowRight"]));
        assert_relative_eq!(world.pose().angle, 0.05, epsilon = 1e-12);

        world.tick(held(&["ArrowLeft"]));
        world.tick(held(&["ArrowLeft"]));
        assert_relative_eq!(world.pose().angle, TAU - 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_idle_tick_keeps_pose() {
        let mut world = world_at(Pose::new(2.5, 2.5, 1.0));
        world.tick(Intent::default());
        assert_eq!(world.pose(), Pose::new(2.5, 2.5, 1.0));
    }

    #[test]
    fn test_walls_stop_movement() {
        let mut world = world_at(Pose::new(3.5, 2.5, 0.0));
        for _ in 0..20 {
            world.tick(held(&["KeyW"]));
        }
        let pose = world.pose();
        assert!(pose.x > 3.5);
        assert!(pose.x + MovementConfig::default().collision_radius < 4.0);
        assert!(!world.grid().is_wall_at(pose.x, pose.y));
    }

    #[test]
    fn test_slides_along_wall() {
        let mut world = world_at(Pose::new(3.75, 2.0, 0.0));
        world.tick(held(&["KeyW", "KeyD"]));
        let pose = world.pose();
        assert_eq!(pose.x, 3.75);
        assert!(pose.y > 2.0);
    }

    #[test]
    fn test_diagonal_speed_is_capped() {
        let mut world = world_at(Pose::new(2.0, 2.0, 0.0));
        world.tick(held(&["KeyW", "KeyD"]));
        let moved = world.pose().position().distance_to(&Vec2::new(2.0, 2.0));
        assert_relative_eq!(moved, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_fast_move_cannot_cross_wall() {
        let grid = Grid::parse(
            "#####
#.#.#
#####",
        )
        .unwrap();
        let movement = MovementConfig {
            move_speed: 2.0,
            ..MovementConfig::default()
        };
        assert!(movement.validate().is_ok());

        let mut world = World::new(grid, Pose::new(1.5, 1.5, 0.0), movement).unwrap();
        world.tick(held(&["KeyW"]));
        assert_eq!(world.pose().position(), Vec2::new(1.5, 1.5));
        assert_eq!(world.pose().cell(), (1, 1));
    }

    #[test]
    fn test_fast_move_in_open_corridor() {
        let grid = Grid::parse(
            "#######
#.....#
#######",
        )
        .unwrap();
        let movement = MovementConfig {
            move_speed: 2.0,
            ..MovementConfig::default()
        };
        let mut world = World::new(grid, Pose::new(1.5, 1.5, 0.0), movement).unwrap();
        world.tick(held(&["KeyW"]));
        assert_relative_eq!(world.pose().x, 3.5, epsilon = 1e-12);

        world.tick(held(&["KeyW"]));
        assert_relative_eq!(world.pose().x, 5.5, epsilon = 1e-12);

        // The first half-cell sub-step would already touch the east wall
        world.tick(held(&["KeyW"]));
        assert_relative_eq!(world.pose().x, 5.5, epsilon = 1e-12);
    }

    #[test]
    fn test_spawn_in_wall_rejected() {
        let err = World::new(
            open_room(),
            Pose::new(0.5, 0.5, 0.0),
            MovementConfig::default(),
        );
        assert!(matches!(err, Err(Error::InvalidConfig(_))));

        let mut world = world_at(Pose::new(2.5, 2.5, 0.0));
        assert!(world.set_pose(Pose::new(4.5, 2.5, 0.0)).is_err());
        assert!(world.set_pose(Pose::new(1.5, 3.5, 1.0)).is_ok());
    }

    #[test]
    fn test_fixed_step_counts_whole_ticks() {
        let mut clock = FixedStep::new(30.0);
        assert_eq!(clock.advance(0.0), 0);
        assert_eq!(clock.advance(30.0), 1);
        assert_eq!(clock.advance(45.0), 0);
        assert_eq!(clock.advance(60.0), 1);
        assert_eq!(clock.advance(59.0), 0);
    }

    #[test]
    fn test_fixed_step_caps_catch_up() {
        let mut clock = FixedStep::new(30.0);
        clock.advance(0.0);
        assert_eq!(clock.advance(1000.0), MAX_CATCH_UP);
        // 850ms over the cap is dropped down to the 10ms remainder
        assert_eq!(clock.advance(1010.0), 0);
        assert_eq!(clock.advance(1020.0), 1);
    }

    #[test]
    fn test_cast_from_current_pose() {
        let world = world_at(Pose::new(2.5, 2.5, 0.0));
        let config = RaycastConfig {
            ray_count: 1,
            stepping: crate::config::Stepping::Dda,
            ..RaycastConfig::default()
        };
        let result = world.cast(&config).unwrap();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result[0].distance, 1.5, epsilon = 1e-12);
    }
}
