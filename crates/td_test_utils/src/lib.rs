//! # TD Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Determinism test harness
//! - Fixture helpers for sessions, players and enemies
//! - Property-based testing strategies and random player intents

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
