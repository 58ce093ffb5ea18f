//! Headless session runner for scripted play and CI verification.
//!
//! This crate drives a [`td_core::simulation::Simulation`] without any
//! transport or presentation layer. It can be controlled via JSON commands
//! on stdin, with events and state on stdout. This enables:
//!
//! - **Bot testing**: A controller can play full sessions over a pipe
//! - **CI verification**: Scripted scenarios assert wave outcomes
//! - **Determinism checks**: Identical scripts end on identical state hashes
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (tick, place_tower, etc.)
//! - **stdout**: Events and responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response specification.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":20}' | cargo run -p td_headless
//!
//! # Run a scenario
//! cargo run -p td_headless -- run --scenario assets/scenarios/default_defense.ron
//! ```

pub mod protocol;
pub mod runner;
pub mod scenario;

pub use protocol::{Command, Response};
pub use runner::{run_scenario, HeadlessConfig, HeadlessRunner, RunSummary};
pub use scenario::{load_config, Scenario, ScenarioError};
