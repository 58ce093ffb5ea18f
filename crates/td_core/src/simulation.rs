//! Core simulation loop.
//!
//! [`Simulation`] owns the world, the configuration and the coordinator and
//! runs every system once per tick in a fixed order. Economy operations are
//! exposed as methods so callers never touch the coordinator directly.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::{debug, trace};

use crate::components::{
    EnemyTag, GameState, Health, PathFollowing, PlayerId, PlayerResources, TargetPriority,
    TowerKind,
};
use crate::coordinator::Coordinator;
use crate::data::GameConfig;
use crate::error::{GameError, Result};
use crate::events::{GameEvent, TickEvents};
use crate::math::{Fixed, Vec2Fixed};
use crate::path::Path;
use crate::snapshot::GameSnapshot;
use crate::systems::{attack, health, movement, projectile, targeting};
use crate::world::{EntityId, World};

/// Default ticks per second.
pub const TICK_RATE: u32 = 20;

/// The tower defense simulation.
///
/// # System Execution Order
///
/// Each tick, systems run in this order:
/// 1. **Movement** - Enemies walk the path, projectiles home in
/// 2. **Targeting** - Towers pick an enemy in range
/// 3. **Attack** - Ready towers fire projectiles
/// 4. **Projectile** - Hits apply damage
/// 5. **Health** - Dead enemies are removed
/// 6. **Coordinator** - Rewards, lives, wave progression and spawning
///
/// Every system sees `now`, the clock at the start of the tick. The clock
/// advances by `dt` after the last system.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    config: GameConfig,
    path: Path,
    coordinator: Coordinator,
    tick: u64,
    time: Fixed,
    pending: Vec<GameEvent>,
}

impl Simulation {
    /// Create a session from a validated configuration.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidConfig`] if the configuration fails validation.
    pub fn new(config: GameConfig) -> Result<Self> {
        config.check()?;
        let path = config.build_path()?;
        let mut world = World::new();
        let coordinator = Coordinator::new(&mut world);

        debug!(
            waves = config.wave_count(),
            waypoints = path.len(),
            "Simulation created"
        );

        Ok(Self {
            world,
            config,
            path,
            coordinator,
            tick: 0,
            time: Fixed::ZERO,
            pending: Vec::new(),
        })
    }

    /// Default tick length, `1 / TICK_RATE` seconds.
    #[must_use]
    pub fn default_dt() -> Fixed {
        Fixed::ONE / Fixed::from_num(TICK_RATE)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The entity store.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the entity store, for scripted setups.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Enemy path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wave and economy coordinator.
    #[must_use]
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Ticks completed.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Simulation clock in seconds.
    #[must_use]
    pub fn time(&self) -> Fixed {
        self.time
    }

    /// Current wave state.
    #[must_use]
    pub fn game_state(&self) -> GameState {
        self.coordinator.game_state(&self.world)
    }

    /// Resources of a connected player.
    #[must_use]
    pub fn player_resources(&self, player: PlayerId) -> Option<PlayerResources> {
        self.coordinator.player_resources(&self.world, player)
    }

    /// Check if the game has ended.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.coordinator.is_over(&self.world)
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance the simulation by `dt` seconds.
    ///
    /// Returns the events of this tick, preceded by any queued by economy
    /// operations since the previous one. Once the game is over, ticks
    /// change nothing.
    pub fn tick(&mut self, dt: Fixed) -> TickEvents {
        let mut events = std::mem::take(&mut self.pending);

        if self.is_over() {
            return TickEvents {
                tick: self.tick,
                events,
            };
        }

        let now = self.time;
        let rules = &self.config.rules;

        let escaped = movement::run(&mut self.world, &self.path, rules, dt, &mut events);
        targeting::run(&mut self.world);
        attack::run(&mut self.world, rules, now, &mut events);
        projectile::run(&mut self.world, rules, &mut events);
        let defeats = health::run(&mut self.world, &mut events);
        self.coordinator.update(
            &mut self.world,
            &self.config,
            &self.path,
            now,
            &escaped,
            &defeats,
            &mut events,
        );

        self.tick += 1;
        self.time += dt;

        #[cfg(feature = "debug-validation")]
        if let Err(err) = self.check_invariants() {
            tracing::error!(tick = self.tick, %err, "World invariant violated");
        }

        if tracing::enabled!(tracing::Level::TRACE) {
            trace!(tick = self.tick, state_hash = self.state_hash(), "Simulation state hash");
        }

        TickEvents {
            tick: self.tick,
            events,
        }
    }

    /// Advance by the default tick length.
    pub fn step(&mut self) -> TickEvents {
        self.tick(Self::default_dt())
    }

    /// Run ticks of `dt` until `seconds` of simulation time have passed.
    ///
    /// Returns every tick's events in order.
    pub fn advance(&mut self, seconds: Fixed, dt: Fixed) -> Vec<TickEvents> {
        let mut all = Vec::new();
        if dt <= Fixed::ZERO {
            return all;
        }
        let end = self.time + seconds;
        while self.time < end && !self.is_over() {
            all.push(self.tick(dt));
        }
        all
    }

    // ========================================================================
    // Player intents
    // ========================================================================

    /// Connect a player with externally supplied resources, or the defaults.
    pub fn join_player(&mut self, player: PlayerId, initial: Option<PlayerResources>) -> Result<()> {
        self.coordinator.join_player(
            &mut self.world,
            &self.config.rules,
            player,
            initial,
            &mut self.pending,
        )
    }

    /// Disconnect a player and remove their towers.
    pub fn leave_player(&mut self, player: PlayerId) -> Result<()> {
        self.coordinator.leave_player(&mut self.world, player)
    }

    /// Buy and place a tower.
    pub fn place_tower(
        &mut self,
        player: PlayerId,
        kind: TowerKind,
        position: Vec2Fixed,
    ) -> Result<EntityId> {
        self.coordinator.place_tower(
            &mut self.world,
            &self.config,
            &self.path,
            player,
            kind,
            position,
            &mut self.pending,
        )
    }

    /// Upgrade a tower. Returns the new level.
    pub fn upgrade_tower(&mut self, player: PlayerId, tower: EntityId) -> Result<u32> {
        self.coordinator
            .upgrade_tower(&mut self.world, &self.config, player, tower, &mut self.pending)
    }

    /// Sell a tower. Returns the refund.
    pub fn sell_tower(&mut self, player: PlayerId, tower: EntityId) -> Result<u32> {
        self.coordinator
            .sell_tower(&mut self.world, &self.config, player, tower, &mut self.pending)
    }

    /// Change a tower's targeting priority.
    pub fn set_target_priority(
        &mut self,
        player: PlayerId,
        tower: EntityId,
        priority: TargetPriority,
    ) -> Result<()> {
        self.coordinator
            .set_target_priority(&mut self.world, player, tower, priority)
    }

    /// Start the next wave immediately. Returns its number.
    pub fn start_wave(&mut self) -> Result<u32> {
        self.coordinator
            .start_wave(&mut self.world, &self.config, self.time, &mut self.pending)
    }

    /// Clear the board and restore players' join-time resources.
    ///
    /// The tick counter and clock keep running.
    pub fn reset(&mut self) {
        self.coordinator
            .reset(&mut self.world, self.time, &mut self.pending);
    }

    // ========================================================================
    // Sync & validation
    // ========================================================================

    /// Capture the observable state.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::capture(&self.world, self.tick, self.time, self.game_state())
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Used for desync detection. Two simulations with identical state
    /// produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.time.to_bits().hash(&mut hasher);

        match self.snapshot().encode() {
            Ok(bytes) => bytes.hash(&mut hasher),
            Err(err) => {
                tracing::warn!(%err, "Snapshot encoding failed; hash covers clock only");
            }
        }

        hasher.finish()
    }

    /// Verify world invariants.
    ///
    /// # Errors
    ///
    /// [`GameError::InvariantViolated`] describing the first broken rule.
    pub fn check_invariants(&self) -> Result<()> {
        let last_segment = self.path.len().saturating_sub(1);

        for (id, (_, health, follow)) in self.world.query::<(EnemyTag, Health, PathFollowing)>() {
            if health.current > health.maximum {
                return Err(GameError::InvariantViolated(format!(
                    "enemy {id} health {} exceeds maximum {}",
                    health.current, health.maximum
                )));
            }
            if health.is_dead() {
                return Err(GameError::InvariantViolated(format!(
                    "enemy {id} survived at zero health"
                )));
            }
            if follow.waypoint_index >= last_segment {
                return Err(GameError::InvariantViolated(format!(
                    "enemy {id} waypoint index {} out of range",
                    follow.waypoint_index
                )));
            }
            if follow.progress < Fixed::ZERO || follow.progress >= Fixed::ONE {
                return Err(GameError::InvariantViolated(format!(
                    "enemy {id} progress {} outside [0, 1)",
                    follow.progress
                )));
            }
        }

        if !self
            .world
            .has::<GameState>(self.coordinator.game_state_entity())
        {
            return Err(GameError::InvariantViolated(
                "game state singleton missing".to_string(),
            ));
        }

        Ok(())
    }
}
