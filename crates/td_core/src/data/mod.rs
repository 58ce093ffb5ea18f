//! Static configuration tables.
//!
//! Tower kinds, enemy kinds, wave definitions, the waypoint path and the
//! numeric rules. All structs deserialize from RON with decimals written the
//! way a designer would write them; the conversion to fixed-point happens
//! once at load.
//!
//! **Note:** This module contains no IO. Callers read the file and hand the
//! text to [`GameConfig::from_ron_str`].

mod enemy_data;
mod rules;
mod tower_data;
mod wave_data;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub use enemy_data::EnemyData;
pub use rules::Rules;
pub use tower_data::{TowerData, UpgradeData};
pub use wave_data::{SpawnGroup, WaveData};

use crate::components::{EnemyKind, TowerKind};
use crate::error::{GameError, Result};
use crate::math::{decimal_serde, Fixed, Vec2Fixed};
use crate::path::Path;

/// A path waypoint as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waypoint {
    /// X coordinate.
    #[serde(with = "decimal_serde")]
    pub x: Fixed,
    /// Y coordinate on the ground plane.
    #[serde(with = "decimal_serde")]
    pub y: Fixed,
}

impl Waypoint {
    fn at(x: i32, y: i32) -> Self {
        Self {
            x: Fixed::from_num(x),
            y: Fixed::from_num(y),
        }
    }
}

impl From<Waypoint> for Vec2Fixed {
    fn from(waypoint: Waypoint) -> Self {
        Vec2Fixed::new(waypoint.x, waypoint.y)
    }
}

/// Complete session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// One entry per tower kind.
    pub towers: Vec<TowerData>,
    /// One entry per enemy kind.
    pub enemies: Vec<EnemyData>,
    /// Waves in play order.
    pub waves: Vec<WaveData>,
    /// Enemy route, spawn first.
    pub path: Vec<Waypoint>,
    /// Numeric rules.
    #[serde(default)]
    pub rules: Rules,
}

impl GameConfig {
    /// Parse a RON document.
    ///
    /// `source` names the document in error messages (usually a file path).
    ///
    /// # Errors
    ///
    /// [`GameError::ConfigParse`] if the text is not a valid configuration.
    pub fn from_ron_str(source: &str, text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|err| GameError::ConfigParse {
            path: source.to_string(),
            message: err.to_string(),
        })
    }

    /// Render as pretty RON.
    ///
    /// # Errors
    ///
    /// [`GameError::Serialization`] if encoding fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|err| GameError::Serialization(err.to_string()))
    }

    /// Look up a tower kind.
    #[must_use]
    pub fn tower(&self, kind: TowerKind) -> Option<&TowerData> {
        self.towers.iter().find(|t| t.kind == kind)
    }

    /// Look up an enemy kind.
    #[must_use]
    pub fn enemy(&self, kind: EnemyKind) -> Option<&EnemyData> {
        self.enemies.iter().find(|e| e.kind == kind)
    }

    /// Number of configured waves.
    #[must_use]
    pub fn wave_count(&self) -> u32 {
        u32::try_from(self.waves.len()).unwrap_or(u32::MAX)
    }

    /// Wave `number`, counting from 1.
    #[must_use]
    pub fn wave(&self, number: u32) -> Option<&WaveData> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.waves.get(index)
    }

    /// Build the runtime path.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidConfig`] if the waypoint list is degenerate.
    pub fn build_path(&self) -> Result<Path> {
        Path::new(self.path.iter().copied().map(Vec2Fixed::from).collect())
    }

    /// Collect every problem with this configuration.
    ///
    /// Returns an empty list for a usable configuration.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut seen_towers = BTreeSet::new();
        for tower in &self.towers {
            if !seen_towers.insert(tower.kind) {
                errors.push(format!("tower kind {:?} is defined twice", tower.kind));
            }
            if tower.range <= Fixed::ZERO {
                errors.push(format!("tower {:?} has non-positive range", tower.kind));
            }
            if tower.attack_speed <= Fixed::ZERO {
                errors.push(format!(
                    "tower {:?} has non-positive attack speed",
                    tower.kind
                ));
            }
            if tower.projectile_speed.is_some_and(|s| s <= Fixed::ZERO) {
                errors.push(format!(
                    "tower {:?} has non-positive projectile speed",
                    tower.kind
                ));
            }
            if tower.splash_radius < Fixed::ZERO {
                errors.push(format!("tower {:?} has negative splash radius", tower.kind));
            }
        }

        let mut seen_enemies = BTreeSet::new();
        for enemy in &self.enemies {
            if !seen_enemies.insert(enemy.kind) {
                errors.push(format!("enemy kind {:?} is defined twice", enemy.kind));
            }
            if enemy.health == 0 {
                errors.push(format!("enemy {:?} has zero health", enemy.kind));
            }
            if enemy.speed <= Fixed::ZERO {
                errors.push(format!("enemy {:?} has non-positive speed", enemy.kind));
            }
        }

        if self.waves.is_empty() {
            errors.push("no waves configured".to_string());
        }
        for (index, wave) in self.waves.iter().enumerate() {
            let number = index + 1;
            if wave.enemy_count() == 0 {
                errors.push(format!("wave {number} spawns no enemies"));
            }
            for group in &wave.groups {
                if !seen_enemies.contains(&group.enemy) {
                    errors.push(format!(
                        "wave {number} references unconfigured enemy {:?}",
                        group.enemy
                    ));
                }
                if group.interval < Fixed::ZERO {
                    errors.push(format!("wave {number} has a negative spawn interval"));
                }
                if group.health_multiplier <= Fixed::ZERO
                    || group.speed_multiplier <= Fixed::ZERO
                    || group.reward_multiplier < Fixed::ZERO
                {
                    errors.push(format!("wave {number} has an invalid multiplier"));
                }
            }
        }

        if let Err(err) = self.build_path() {
            errors.push(err.to_string());
        }

        let rules = &self.rules;
        if rules.sell_refund_percent > 100 {
            errors.push("sell refund exceeds 100%".to_string());
        }
        if rules.waypoint_threshold <= Fixed::ZERO || rules.hit_threshold <= Fixed::ZERO {
            errors.push("waypoint and hit thresholds must be positive".to_string());
        }
        if rules.default_projectile_speed <= Fixed::ZERO {
            errors.push("default projectile speed must be positive".to_string());
        }
        if rules.map_margin < Fixed::ZERO {
            errors.push("map margin is negative".to_string());
        }
        if rules.inter_wave_delay < Fixed::ZERO {
            errors.push("inter-wave delay is negative".to_string());
        }

        errors
    }

    /// Validate, folding every problem into one error.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidConfig`] listing each problem found.
    pub fn check(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GameError::InvalidConfig(errors.join("; ")))
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        let tower = |kind, name: &str, cost, damage, range: i32, attack_speed: f64| TowerData {
            kind,
            name: name.to_string(),
            cost,
            damage,
            range: Fixed::from_num(range),
            attack_speed: Fixed::from_num(attack_speed),
            projectile_speed: None,
            splash_radius: Fixed::ZERO,
            piercing: false,
            upgrades: Vec::new(),
        };
        let upgrade = |damage_bonus, range_bonus: i32, attack_speed_bonus: f64| UpgradeData {
            damage_bonus,
            range_bonus: Fixed::from_num(range_bonus),
            attack_speed_bonus: Fixed::from_num(attack_speed_bonus),
        };

        let towers = vec![
            TowerData {
                projectile_speed: Some(Fixed::from_num(50)),
                upgrades: vec![upgrade(10, 2, 0.25), upgrade(20, 3, 0.25)],
                ..tower(TowerKind::Basic, "Basic Tower", 50, 25, 15, 1.5)
            },
            TowerData {
                projectile_speed: Some(Fixed::from_num(100)),
                upgrades: vec![upgrade(50, 5, 0.125), upgrade(100, 8, 0.25)],
                ..tower(TowerKind::Archer, "Archer Tower", 150, 100, 25, 0.5)
            },
            TowerData {
                projectile_speed: Some(Fixed::from_num(30)),
                splash_radius: Fixed::from_num(8),
                upgrades: vec![upgrade(20, 3, 0.125), upgrade(40, 5, 0.25)],
                ..tower(TowerKind::Mage, "Mage Tower", 200, 50, 12, 1.0)
            },
            TowerData {
                projectile_speed: Some(Fixed::from_num(40)),
                upgrades: vec![upgrade(10, 2, 0.5), upgrade(20, 3, 1.0)],
                ..tower(TowerKind::Cannon, "Cannon Tower", 100, 15, 18, 2.0)
            },
        ];

        let enemy = |kind, name: &str, health, speed: i32, reward, armor| EnemyData {
            kind,
            name: name.to_string(),
            health,
            speed: Fixed::from_num(speed),
            reward,
            armor,
        };
        let enemies = vec![
            enemy(EnemyKind::Basic, "Basic", 100, 8, 10, 0),
            enemy(EnemyKind::Fast, "Fast", 60, 16, 15, 0),
            enemy(EnemyKind::Tank, "Tank", 300, 4, 25, 10),
            enemy(EnemyKind::Flying, "Flying", 80, 12, 20, 0),
        ];

        let group = |enemy, count, interval: f64| SpawnGroup::new(enemy, count, Fixed::from_num(interval));
        let waves = vec![
            WaveData {
                groups: vec![group(EnemyKind::Basic, 10, 1.0)],
            },
            WaveData {
                groups: vec![group(EnemyKind::Basic, 15, 0.75)],
            },
            WaveData {
                groups: vec![group(EnemyKind::Basic, 8, 1.0), group(EnemyKind::Fast, 5, 1.25)],
            },
            WaveData {
                groups: vec![group(EnemyKind::Basic, 12, 0.75), group(EnemyKind::Fast, 8, 1.0)],
            },
            WaveData {
                groups: vec![SpawnGroup {
                    health_multiplier: Fixed::from_num(1.5),
                    reward_multiplier: Fixed::from_num(2),
                    ..group(EnemyKind::Tank, 3, 2.0)
                }],
            },
        ];

        let path = vec![
            Waypoint::at(-50, 0),
            Waypoint::at(-30, 0),
            Waypoint::at(-30, 20),
            Waypoint::at(0, 20),
            Waypoint::at(0, -20),
            Waypoint::at(30, -20),
            Waypoint::at(30, 0),
            Waypoint::at(50, 0),
        ];

        Self {
            towers,
            enemies,
            waves,
            path,
            rules: Rules::default(),
        }
    }
}
