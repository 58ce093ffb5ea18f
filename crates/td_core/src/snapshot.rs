//! Read-only snapshots of the simulation.
//!
//! A snapshot captures everything observable about a session at one tick.
//! It is what gets shipped for state sync and replay, and its binary
//! encoding feeds the desync-detection hash.

use serde::{Deserialize, Serialize};

use crate::components::{
    Attack, Enemy, EnemyTag, GameState, Health, PathFollowing, Player, PlayerResources, Position,
    Projectile, ProjectileTag, Targeting, Tower, TowerTag, Velocity,
};
use crate::error::{GameError, Result};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::world::{EntityId, World};

/// A connected player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Player record.
    pub player: Player,
    /// Economy.
    pub resources: PlayerResources,
}

/// A placed tower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerSnapshot {
    /// Entity.
    pub id: EntityId,
    /// Position.
    pub position: Vec2Fixed,
    /// Identity and progression.
    pub tower: Tower,
    /// Target acquisition.
    pub targeting: Targeting,
    /// Weapon.
    pub attack: Attack,
}

/// An enemy on the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    /// Entity.
    pub id: EntityId,
    /// Position.
    pub position: Vec2Fixed,
    /// Velocity.
    pub velocity: Vec2Fixed,
    /// Health.
    pub health: Health,
    /// Identity and stats.
    pub enemy: Enemy,
    /// Path progress.
    pub path: PathFollowing,
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    /// Entity.
    pub id: EntityId,
    /// Position.
    pub position: Vec2Fixed,
    /// Flight data.
    pub projectile: Projectile,
}

/// Complete observable state at one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Ticks completed.
    pub tick: u64,
    /// Simulation clock.
    #[serde(with = "fixed_serde")]
    pub time: Fixed,
    /// Wave progression.
    pub game_state: GameState,
    /// Players in id order.
    pub players: Vec<PlayerSnapshot>,
    /// Towers in id order.
    pub towers: Vec<TowerSnapshot>,
    /// Enemies in id order.
    pub enemies: Vec<EnemySnapshot>,
    /// Projectiles in id order.
    pub projectiles: Vec<ProjectileSnapshot>,
}

impl GameSnapshot {
    /// Capture the world. Never modifies it.
    #[must_use]
    pub fn capture(world: &World, tick: u64, time: Fixed, game_state: GameState) -> Self {
        let mut players: Vec<PlayerSnapshot> = world
            .query::<(Player, PlayerResources)>()
            .map(|(_, (player, resources))| PlayerSnapshot {
                player: *player,
                resources: *resources,
            })
            .collect();
        players.sort_by_key(|p| p.player.id);

        let towers = world
            .query::<(TowerTag, Position, Tower, Targeting, Attack)>()
            .map(|(id, (_, position, tower, targeting, attack))| TowerSnapshot {
                id,
                position: position.value,
                tower: *tower,
                targeting: *targeting,
                attack: *attack,
            })
            .collect();

        let enemies = world
            .query::<(EnemyTag, Position, Health, Enemy, PathFollowing)>()
            .map(|(id, (_, position, health, enemy, path))| EnemySnapshot {
                id,
                position: position.value,
                velocity: world.get::<Velocity>(id).map_or(Vec2Fixed::ZERO, |v| v.value),
                health: *health,
                enemy: *enemy,
                path: *path,
            })
            .collect();

        let projectiles = world
            .query::<(ProjectileTag, Position, Projectile)>()
            .map(|(id, (_, position, projectile))| ProjectileSnapshot {
                id,
                position: position.value,
                projectile: *projectile,
            })
            .collect();

        Self {
            tick,
            time,
            game_state,
            players,
            towers,
            enemies,
            projectiles,
        }
    }

    /// Encode with bincode.
    ///
    /// # Errors
    ///
    /// [`GameError::Serialization`] if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to encode snapshot: {e}")))
    }

    /// Decode from bincode.
    ///
    /// # Errors
    ///
    /// [`GameError::Serialization`] if the bytes are not a snapshot.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to decode snapshot: {e}")))
    }
}
