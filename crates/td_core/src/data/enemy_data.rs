//! Enemy data structures.

use serde::{Deserialize, Serialize};

use crate::components::EnemyKind;
use crate::math::{decimal_serde, Fixed};

/// Data-driven enemy definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyData {
    /// Which archetype this entry configures.
    pub kind: EnemyKind,

    /// Display name.
    pub name: String,

    /// Maximum health.
    pub health: u32,

    /// Path speed in units per second.
    #[serde(with = "decimal_serde")]
    pub speed: Fixed,

    /// Gold granted to every player on death.
    pub reward: u32,

    /// Flat armor rating.
    #[serde(default)]
    pub armor: u32,
}
