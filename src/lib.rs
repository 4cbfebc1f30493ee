pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod input;
pub mod logger;
pub mod pose;
pub mod raycast;
pub mod render;
pub mod world;

pub use config::{EngineConfig, MovementConfig, RaycastConfig, Stepping};
pub use error::{Error, Result};
pub use grid::{Cell, Grid};
pub use pose::{Pose, Vec2};
pub use raycast::{Face, GridRaycaster, RayHit, RaycastResult};
pub use world::World;
