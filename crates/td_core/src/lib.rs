//! # TD Core
//!
//! Deterministic tower defense simulation core.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math in the tick (uses fixed-point)
//!
//! This separation enables:
//! - Authoritative server builds that stream [`events::GameEvent`]s
//! - Headless runners and balance tooling
//! - Snapshot/hash based desync detection
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`world`] - Typed entity/component store
//! - [`components`] - Component schema
//! - [`data`] - Tower, enemy, wave and rule tables
//! - [`path`] - The fixed waypoint path
//! - [`systems`] - Per-tick systems
//! - [`coordinator`] - Wave state machine and player economy
//! - [`simulation`] - Game loop driver
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod components;
pub mod coordinator;
pub mod data;
pub mod error;
pub mod events;
pub mod math;
pub mod path;
pub mod simulation;
pub mod snapshot;
pub mod systems;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::*;
    pub use crate::coordinator::Coordinator;
    pub use crate::data::{EnemyData, GameConfig, Rules, SpawnGroup, TowerData, WaveData};
    pub use crate::error::{GameError, PlacementError, Result};
    pub use crate::events::{GameEvent, TickEvents};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::path::Path;
    pub use crate::simulation::{Simulation, TICK_RATE};
    pub use crate::snapshot::GameSnapshot;
    pub use crate::world::{Bundle, Component, EntityId, World};
}
