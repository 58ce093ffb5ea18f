//! Component definitions.
//!
//! Components are pure data with no behavior. Towers, enemies, projectiles,
//! players and the game state singleton are all composed of these.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, option_fixed_serde, Fixed, Vec2Fixed};
use crate::world::{Component, EntityId};

/// Identifier of a connected player, assigned by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.0)
    }
}

// ============================================================================
// Kinds
// ============================================================================

/// Tower archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TowerKind {
    /// Cheap all-rounder.
    Basic,
    /// Long range, slow, hard hitting.
    Archer,
    /// Splash damage.
    Mage,
    /// Rapid fire, low damage.
    Cannon,
}

impl TowerKind {
    /// Every tower kind, in declaration order.
    pub const ALL: [Self; 4] = [Self::Basic, Self::Archer, Self::Mage, Self::Cannon];
}

/// Enemy archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Baseline walker.
    Basic,
    /// Fast and fragile.
    Fast,
    /// Slow, armored, lots of health.
    Tank,
    /// Flies over the same path.
    Flying,
}

impl EnemyKind {
    /// Every enemy kind, in declaration order.
    pub const ALL: [Self; 4] = [Self::Basic, Self::Fast, Self::Tank, Self::Flying];
}

/// How a tower picks among enemies in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetPriority {
    /// Furthest along the path.
    #[default]
    First,
    /// Least far along the path.
    Last,
    /// Nearest to the tower.
    Closest,
    /// Highest current health.
    Strongest,
    /// Lowest current health.
    Weakest,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOutcome {
    /// Every configured wave was cleared.
    Victory,
    /// A player ran out of lives.
    Defeat,
}

// ============================================================================
// Shared Components
// ============================================================================

/// Position on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    /// World coordinates.
    pub value: Vec2Fixed,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(value: Vec2Fixed) -> Self {
        Self { value }
    }
}

impl Component for Position {}

/// Current velocity. Informational only; movement is driven by the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Velocity {
    /// Units per second.
    pub value: Vec2Fixed,
}

impl Component for Velocity {}

/// Hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current health, never above `maximum`.
    pub current: u32,
    /// Maximum health.
    pub maximum: u32,
}

impl Health {
    /// Full health.
    #[must_use]
    pub const fn new(maximum: u32) -> Self {
        Self {
            current: maximum,
            maximum,
        }
    }

    /// Subtract damage, clamping at zero. Returns the damage actually taken.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.current);
        self.current -= taken;
        taken
    }

    /// Check if health is depleted.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }
}

impl Component for Health {}

// ============================================================================
// Tower Components
// ============================================================================

/// Tower identity and progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tower {
    /// Archetype.
    pub kind: TowerKind,
    /// Upgrade level, starting at 1.
    pub level: u32,
    /// Total damage dealt.
    pub experience: u64,
    /// Owning player.
    pub owner: PlayerId,
}

impl Component for Tower {}

/// Target acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Targeting {
    /// Acquisition radius (inclusive).
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Selection policy.
    pub priority: TargetPriority,
    /// Weak reference to the chosen enemy. Revalidated every tick.
    pub current_target: Option<EntityId>,
}

impl Component for Targeting {}

/// Weapon stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    /// Damage per projectile.
    pub damage: u32,
    /// Shots per second.
    #[serde(with = "fixed_serde")]
    pub attack_speed: Fixed,
    /// Simulation time of the last shot; `None` until the first one.
    #[serde(with = "option_fixed_serde")]
    pub last_attack_time: Option<Fixed>,
    /// Projectile speed, or `None` to use the rules default.
    #[serde(with = "option_fixed_serde")]
    pub projectile_speed: Option<Fixed>,
    /// Reserved.
    pub piercing: bool,
    /// Splash radius on impact; zero for single target.
    #[serde(with = "fixed_serde")]
    pub splash_radius: Fixed,
}

impl Attack {
    /// Seconds between shots.
    ///
    /// A non-positive attack speed never fires again after the first shot.
    #[must_use]
    pub fn cooldown(&self) -> Option<Fixed> {
        if self.attack_speed <= Fixed::ZERO {
            return None;
        }
        Some(Fixed::ONE / self.attack_speed)
    }

    /// Check whether the weapon may fire at `now`.
    #[must_use]
    pub fn is_ready(&self, now: Fixed) -> bool {
        match self.last_attack_time {
            None => true,
            Some(last) => self.cooldown().is_some_and(|cooldown| now - last >= cooldown),
        }
    }
}

impl Component for Attack {}

// ============================================================================
// Enemy Components
// ============================================================================

/// Enemy identity and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    /// Archetype.
    pub kind: EnemyKind,
    /// Gold granted to every player on death.
    pub reward: u32,
    /// Units per second along the path.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Flat armor rating.
    pub armor: u32,
}

impl Enemy {
    /// Damage remaining after armor: `damage * 100 / (100 + armor)`.
    #[must_use]
    pub fn mitigate(&self, damage: u32) -> u32 {
        let scaled = u64::from(damage) * 100 / (100 + u64::from(self.armor));
        u32::try_from(scaled).unwrap_or(u32::MAX)
    }
}

impl Component for Enemy {}

/// Progress along the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathFollowing {
    /// Index of the waypoint the current segment starts at.
    pub waypoint_index: usize,
    /// Fraction of the current segment covered, in `[0, 1)`.
    #[serde(with = "fixed_serde")]
    pub progress: Fixed,
}

impl PathFollowing {
    /// Combined progress used by First/Last targeting.
    #[must_use]
    pub fn distance_along(&self) -> Fixed {
        Fixed::from_num(self.waypoint_index) + self.progress
    }
}

impl Component for PathFollowing {}

// ============================================================================
// Projectile Components
// ============================================================================

/// An in-flight shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Tower that fired it (weak reference).
    pub source: EntityId,
    /// Enemy it homes on (weak reference).
    pub target: EntityId,
    /// Damage on impact, before armor.
    pub damage: u32,
    /// Units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Reserved.
    pub piercing: bool,
    /// Splash radius on impact.
    #[serde(with = "fixed_serde")]
    pub splash_radius: Fixed,
}

impl Component for Projectile {}

// ============================================================================
// Player & Game State
// ============================================================================

/// Binds a player id to the entity holding its resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player id.
    pub id: PlayerId,
}

impl Component for Player {}

/// Per-player economy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerResources {
    /// Spendable gold.
    pub gold: u32,
    /// Remaining lives.
    pub lives: u32,
    /// Accumulated score.
    pub score: u64,
}

impl PlayerResources {
    /// Fresh resources with zero score.
    #[must_use]
    pub const fn new(gold: u32, lives: u32) -> Self {
        Self {
            gold,
            lives,
            score: 0,
        }
    }
}

impl Component for PlayerResources {}

/// Wave progression singleton. Written only by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameState {
    /// Last wave started (0 before the first).
    pub current_wave: u32,
    /// Whether a wave is in progress.
    pub is_wave_active: bool,
    /// Enemies of the current wave not yet defeated or escaped.
    pub enemies_remaining: u32,
    /// Simulation time the current wave started.
    #[serde(with = "fixed_serde")]
    pub wave_start_time: Fixed,
    /// Set once the game has ended.
    pub outcome: Option<GameOutcome>,
}

impl GameState {
    /// Check if the game has ended.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.outcome.is_some()
    }
}

impl Component for GameState {}

// ============================================================================
// Type Tags
// ============================================================================

/// Marks a tower entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TowerTag;

impl Component for TowerTag {
    const EXCLUSIVE_TAG: bool = true;
}

/// Marks an enemy entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnemyTag;

impl Component for EnemyTag {
    const EXCLUSIVE_TAG: bool = true;
}

/// Marks a projectile entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectileTag;

impl Component for ProjectileTag {
    const EXCLUSIVE_TAG: bool = true;
}
