//! Outbound notifications for the presentation layer.
//!
//! Events are appended in the order they happen and handed out once per
//! tick. Economy operations called between ticks queue their events so the
//! next [`TickEvents`] carries them ahead of that tick's own.

use serde::{Deserialize, Serialize};

use crate::components::{EnemyKind, GameOutcome, PlayerId, TowerKind};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::world::EntityId;

/// Something observable happened in the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An enemy entered the path.
    EnemySpawned {
        /// Enemy entity.
        id: EntityId,
        /// Archetype.
        kind: EnemyKind,
        /// Spawn position.
        position: Vec2Fixed,
        /// Starting health.
        health: u32,
        /// Maximum health.
        max_health: u32,
    },
    /// An enemy moved.
    EnemyPositionUpdated {
        /// Enemy entity.
        id: EntityId,
        /// New position.
        position: Vec2Fixed,
        /// Current segment.
        waypoint_index: usize,
        /// Fraction of the segment covered.
        #[serde(with = "fixed_serde")]
        progress: Fixed,
        /// Current health.
        health: u32,
    },
    /// A projectile hit an enemy.
    EnemyDamaged {
        /// Enemy entity.
        id: EntityId,
        /// Tower that fired.
        source: EntityId,
        /// Damage applied after armor.
        damage: u32,
        /// Health left.
        health: u32,
    },
    /// An enemy died and its reward was paid out.
    EnemyDefeated {
        /// Enemy entity (already destroyed).
        id: EntityId,
        /// Gold credited to every player.
        gold_reward: u32,
    },
    /// An enemy reached the end of the path.
    EnemyEscaped {
        /// Enemy entity (already destroyed).
        id: EntityId,
        /// Lives taken from every player.
        lives_lost: u32,
    },
    /// A tower was placed.
    TowerPlaced {
        /// Tower entity.
        id: EntityId,
        /// Archetype.
        kind: TowerKind,
        /// Position.
        position: Vec2Fixed,
        /// Level.
        level: u32,
        /// Owner.
        owner: PlayerId,
    },
    /// A tower gained a level.
    TowerUpgraded {
        /// Tower entity.
        id: EntityId,
        /// New level.
        level: u32,
        /// Owner.
        owner: PlayerId,
    },
    /// A tower was sold.
    TowerSold {
        /// Tower entity (already destroyed).
        id: EntityId,
        /// Former owner.
        owner: PlayerId,
        /// Gold refunded.
        refund: u32,
    },
    /// A tower fired.
    ProjectileCreated {
        /// Projectile entity.
        id: EntityId,
        /// Tower that fired.
        source: EntityId,
        /// Enemy targeted.
        target: EntityId,
        /// Launch position.
        position: Vec2Fixed,
        /// Target position at launch.
        target_position: Vec2Fixed,
    },
    /// A wave began spawning.
    WaveStarted {
        /// Wave number, from 1.
        wave: u32,
        /// Enemies the wave will spawn.
        enemies: u32,
    },
    /// Every enemy of a wave was defeated or escaped.
    WaveCompleted {
        /// Wave number.
        wave: u32,
    },
    /// Per-player summary, sent when anything in it changed.
    GameStateUpdated {
        /// Recipient.
        player: PlayerId,
        /// Current wave.
        wave: u32,
        /// Whether a wave is running.
        is_active: bool,
        /// Enemies left in the wave.
        enemies_remaining: u32,
        /// Player gold.
        gold: u32,
        /// Player lives.
        lives: u32,
        /// Player score.
        score: u64,
    },
    /// The session ended.
    GameOver {
        /// Victory or defeat.
        outcome: GameOutcome,
        /// Wave reached.
        wave: u32,
    },
}

/// Events produced during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Tick number these events belong to.
    pub tick: u64,
    /// Events in the order they happened.
    pub events: Vec<GameEvent>,
}

impl TickEvents {
    /// Check if nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over events.
    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }

    /// Enemies defeated this tick.
    pub fn defeated(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.events.iter().filter_map(|event| match event {
            GameEvent::EnemyDefeated { id, .. } => Some(*id),
            _ => None,
        })
    }

    /// Projectiles fired this tick.
    pub fn projectiles_created(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.events.iter().filter_map(|event| match event {
            GameEvent::ProjectileCreated { id, .. } => Some(*id),
            _ => None,
        })
    }

    /// Game outcome, if the game ended this tick.
    #[must_use]
    pub fn game_over(&self) -> Option<GameOutcome> {
        self.events.iter().find_map(|event| match event {
            GameEvent::GameOver { outcome, .. } => Some(*outcome),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a TickEvents {
    type Item = &'a GameEvent;
    type IntoIter = std::slice::Iter<'a, GameEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
