//! Tower data structures for data-driven tower definitions.

use serde::{Deserialize, Serialize};

use crate::components::TowerKind;
use crate::math::{decimal_serde, option_decimal_serde, Fixed};

/// Stat increases granted by one upgrade level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeData {
    /// Added to `Attack::damage`.
    #[serde(default)]
    pub damage_bonus: u32,

    /// Added to `Targeting::range`.
    #[serde(default, with = "decimal_serde")]
    pub range_bonus: Fixed,

    /// Added to `Attack::attack_speed`.
    #[serde(default, with = "decimal_serde")]
    pub attack_speed_bonus: Fixed,
}

/// Data-driven tower definition.
///
/// # Example RON
///
/// ```ron
/// TowerData(
///     kind: Archer,
///     name: "Archer Tower",
///     cost: 150,
///     damage: 100,
///     range: 25.0,
///     attack_speed: 0.5,
///     projectile_speed: Some(100.0),
///     upgrades: [
///         UpgradeData(damage_bonus: 50, range_bonus: 5.0, attack_speed_bonus: 0.125),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerData {
    /// Which archetype this entry configures.
    pub kind: TowerKind,

    /// Display name.
    pub name: String,

    /// Gold cost to place. Upgrade cost and sell refund derive from it.
    pub cost: u32,

    /// Damage per projectile at level 1.
    pub damage: u32,

    /// Targeting range at level 1.
    #[serde(with = "decimal_serde")]
    pub range: Fixed,

    /// Shots per second at level 1.
    #[serde(with = "decimal_serde")]
    pub attack_speed: Fixed,

    /// Projectile speed; falls back to the rules default when absent.
    #[serde(default, with = "option_decimal_serde")]
    pub projectile_speed: Option<Fixed>,

    /// Splash radius on impact.
    #[serde(default, with = "decimal_serde")]
    pub splash_radius: Fixed,

    /// Reserved.
    #[serde(default)]
    pub piercing: bool,

    /// Upgrade table; entry `n` takes the tower from level `n + 1` to `n + 2`.
    #[serde(default)]
    pub upgrades: Vec<UpgradeData>,
}

impl TowerData {
    /// Highest reachable level.
    #[must_use]
    pub fn max_level(&self) -> u32 {
        u32::try_from(self.upgrades.len()).map_or(u32::MAX, |n| n.saturating_add(1))
    }

    /// Upgrade that applies to a tower currently at `level`, if any.
    #[must_use]
    pub fn upgrade_from(&self, level: u32) -> Option<&UpgradeData> {
        let index = usize::try_from(level.checked_sub(1)?).ok()?;
        self.upgrades.get(index)
    }
}
