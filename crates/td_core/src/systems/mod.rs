//! Per-tick systems.
//!
//! Systems are plain functions over `&mut World`. They own no state and run
//! in a fixed order driven by [`crate::simulation::Simulation::tick`]:
//! movement, targeting, attack, projectile resolution, health.
//!
//! Systems never touch the `GameState` singleton or player resources.
//! Anything that affects them (escapes, deaths) is returned to the caller,
//! which routes it to the [`crate::coordinator::Coordinator`].

pub mod attack;
pub mod health;
pub mod movement;
pub mod projectile;
pub mod targeting;
