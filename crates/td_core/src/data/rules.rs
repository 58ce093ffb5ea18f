//! Numeric game rules.

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, Fixed};

/// Session-wide constants.
///
/// Every field has a default, so a config file only needs to list the rules
/// it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Gold each player starts with.
    pub starting_gold: u32,

    /// Lives each player starts with.
    pub starting_lives: u32,

    /// Minimum distance between a tower and any path segment.
    #[serde(with = "decimal_serde")]
    pub path_clearance: Fixed,

    /// Minimum distance between two towers.
    #[serde(with = "decimal_serde")]
    pub tower_clearance: Fixed,

    /// Seconds of idle time before the next wave starts on its own.
    #[serde(with = "decimal_serde")]
    pub inter_wave_delay: Fixed,

    /// A player whose lives fall to this value loses the game.
    pub defeat_lives_threshold: u32,

    /// Percentage of base cost refunded on sale.
    pub sell_refund_percent: u32,

    /// Percentage of base cost charged per upgrade.
    pub upgrade_cost_percent: u32,

    /// Projectile speed for towers that do not set one.
    #[serde(with = "decimal_serde")]
    pub default_projectile_speed: Fixed,

    /// Distance at which an enemy counts as having reached a waypoint.
    #[serde(with = "decimal_serde")]
    pub waypoint_threshold: Fixed,

    /// Distance at which a projectile hits its target.
    #[serde(with = "decimal_serde")]
    pub hit_threshold: Fixed,

    /// Score granted per point of reward.
    pub score_per_reward: u32,

    /// Maximum number of towers in the session.
    pub max_towers: usize,

    /// How far beyond the path's bounding box towers may still be placed.
    #[serde(with = "decimal_serde")]
    pub map_margin: Fixed,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            starting_gold: 500,
            starting_lives: 20,
            path_clearance: Fixed::from_num(5),
            tower_clearance: Fixed::from_num(8),
            inter_wave_delay: Fixed::from_num(10),
            defeat_lives_threshold: 0,
            sell_refund_percent: 75,
            upgrade_cost_percent: 150,
            default_projectile_speed: Fixed::from_num(20),
            waypoint_threshold: Fixed::ONE,
            hit_threshold: Fixed::ONE,
            score_per_reward: 10,
            max_towers: 50,
            map_margin: Fixed::from_num(50),
        }
    }
}

impl Rules {
    /// Gold returned when selling a tower of the given base cost.
    #[must_use]
    pub fn sell_refund(&self, base_cost: u32) -> u32 {
        percent_of(base_cost, self.sell_refund_percent)
    }

    /// Gold charged for one upgrade of a tower of the given base cost.
    #[must_use]
    pub fn upgrade_cost(&self, base_cost: u32) -> u32 {
        percent_of(base_cost, self.upgrade_cost_percent)
    }
}

fn percent_of(value: u32, percent: u32) -> u32 {
    let scaled = u64::from(value) * u64::from(percent) / 100;
    u32::try_from(scaled).unwrap_or(u32::MAX)
}
