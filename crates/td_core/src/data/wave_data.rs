//! Wave definitions.

use serde::{Deserialize, Serialize};

use crate::components::EnemyKind;
use crate::math::{decimal_serde, Fixed};

/// One run of identical enemies within a wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnGroup {
    /// Enemy archetype.
    pub enemy: EnemyKind,

    /// How many to spawn.
    pub count: u32,

    /// Seconds between consecutive spawns of this group.
    #[serde(with = "decimal_serde")]
    pub interval: Fixed,

    /// Scales the archetype's health.
    #[serde(default = "unit_multiplier", with = "decimal_serde")]
    pub health_multiplier: Fixed,

    /// Scales the archetype's speed.
    #[serde(default = "unit_multiplier", with = "decimal_serde")]
    pub speed_multiplier: Fixed,

    /// Scales the archetype's reward.
    #[serde(default = "unit_multiplier", with = "decimal_serde")]
    pub reward_multiplier: Fixed,
}

impl SpawnGroup {
    /// A group with no stat modifiers.
    #[must_use]
    pub fn new(enemy: EnemyKind, count: u32, interval: Fixed) -> Self {
        Self {
            enemy,
            count,
            interval,
            health_multiplier: Fixed::ONE,
            speed_multiplier: Fixed::ONE,
            reward_multiplier: Fixed::ONE,
        }
    }
}

fn unit_multiplier() -> Fixed {
    Fixed::ONE
}

/// An ordered list of spawn groups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WaveData {
    /// Groups, spawned one after another.
    pub groups: Vec<SpawnGroup>,
}

impl WaveData {
    /// Total enemies in the wave.
    #[must_use]
    pub fn enemy_count(&self) -> u32 {
        self.groups
            .iter()
            .fold(0u32, |total, group| total.saturating_add(group.count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enemy_count_sums_groups() {
        let wave = WaveData {
            groups: vec![
                SpawnGroup::new(EnemyKind::Basic, 8, Fixed::ONE),
                SpawnGroup::new(EnemyKind::Fast, 5, Fixed::from_num(1.25)),
            ],
        };
        assert_eq!(wave.enemy_count(), 13);
    }

    #[test]
    fn test_multipliers_default_to_one() {
        let group: SpawnGroup = ron::from_str("(enemy: Tank, count: 3, interval: 2.0)").unwrap();
        assert_eq!(group.health_multiplier, Fixed::ONE);
        assert_eq!(group.reward_multiplier, Fixed::ONE);
    }
}
