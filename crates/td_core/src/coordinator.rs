//! Wave state machine and player economy.
//!
//! The coordinator is the only writer of the `GameState` singleton and of
//! every `PlayerResources` record. Systems report escapes and deaths back to
//! it once per tick; economy operations call into it directly between ticks.
//!
//! # Wave cycle
//!
//! ```text
//! Idle ──start_wave / inter-wave delay──▶ WaveActive ──remaining == 0──▶ Idle
//!                                               │
//!                          final wave cleared ──┴──▶ GameOver(Victory)
//!                  any player out of lives (any state) ──▶ GameOver(Defeat)
//! ```

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::components::{
    Attack, Enemy, EnemyTag, GameOutcome, GameState, Health, PathFollowing, Player, PlayerId,
    PlayerResources, Position, ProjectileTag, TargetPriority, Targeting, Tower, TowerKind,
    TowerTag, Velocity,
};
use crate::data::{GameConfig, Rules, SpawnGroup, WaveData};
use crate::error::{GameError, PlacementError, Result};
use crate::events::GameEvent;
use crate::math::{squared, Fixed, Vec2Fixed};
use crate::path::Path;
use crate::systems::health::Defeat;
use crate::systems::movement::LIVES_PER_ESCAPE;
use crate::world::{EntityId, World};

/// Progress through the current wave's spawn list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SpawnCursor {
    /// Group being spawned.
    group: usize,
    /// Enemies of that group already spawned.
    spawned: u32,
    /// Simulation time the next enemy is due.
    next_spawn_at: Fixed,
}

impl SpawnCursor {
    /// The group the next enemy comes from, skipping empty groups.
    fn next_group<'a>(&mut self, wave: &'a WaveData) -> Option<&'a SpawnGroup> {
        while let Some(group) = wave.groups.get(self.group) {
            if self.spawned < group.count {
                return Some(group);
            }
            self.group += 1;
            self.spawned = 0;
        }
        None
    }
}

/// What a player was last told, so unchanged state is not re-sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Summary {
    state: GameState,
    resources: PlayerResources,
}

/// Owns the wave state machine, spawn scheduling and player economy.
///
/// One coordinator exists per session. It holds entity ids into the
/// [`World`] and is passed the world on every call.
#[derive(Debug, Clone)]
pub struct Coordinator {
    game_state: EntityId,
    players: BTreeMap<PlayerId, EntityId>,
    join_resources: BTreeMap<PlayerId, PlayerResources>,
    cursor: Option<SpawnCursor>,
    idle_since: Fixed,
    reported: BTreeMap<PlayerId, Summary>,
}

impl Coordinator {
    /// Create the coordinator and its `GameState` singleton.
    pub fn new(world: &mut World) -> Self {
        let game_state = world.spawn((GameState::default(),));
        Self {
            game_state,
            players: BTreeMap::new(),
            join_resources: BTreeMap::new(),
            cursor: None,
            idle_since: Fixed::ZERO,
            reported: BTreeMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// Current game state.
    #[must_use]
    pub fn game_state(&self, world: &World) -> GameState {
        world
            .get::<GameState>(self.game_state)
            .copied()
            .unwrap_or_default()
    }

    /// Entity holding the `GameState` singleton.
    #[must_use]
    pub fn game_state_entity(&self) -> EntityId {
        self.game_state
    }

    /// Resources of a connected player.
    #[must_use]
    pub fn player_resources(&self, world: &World, player: PlayerId) -> Option<PlayerResources> {
        let entity = self.players.get(&player)?;
        world.get::<PlayerResources>(*entity).copied()
    }

    /// Connected players in id order.
    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.keys().copied()
    }

    /// Check if the game has ended.
    #[must_use]
    pub fn is_over(&self, world: &World) -> bool {
        self.game_state(world).is_over()
    }

    /// Simulation time the session last went idle.
    #[must_use]
    pub fn idle_since(&self) -> Fixed {
        self.idle_since
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Connect a player.
    ///
    /// `initial` comes from the player-data service; `None` uses the rules'
    /// starting gold and lives.
    pub fn join_player(
        &mut self,
        world: &mut World,
        rules: &Rules,
        player: PlayerId,
        initial: Option<PlayerResources>,
        events: &mut Vec<GameEvent>,
    ) -> Result<()> {
        if self.players.contains_key(&player) {
            return Err(GameError::PlayerAlreadyJoined(player));
        }

        let resources = initial
            .unwrap_or_else(|| PlayerResources::new(rules.starting_gold, rules.starting_lives));
        let entity = world.spawn((Player { id: player }, resources));
        self.players.insert(player, entity);
        self.join_resources.insert(player, resources);

        debug!(%player, gold = resources.gold, lives = resources.lives, "Player joined");
        self.publish_state(world, events);
        Ok(())
    }

    /// Disconnect a player, removing their towers.
    pub fn leave_player(&mut self, world: &mut World, player: PlayerId) -> Result<()> {
        let entity = self
            .players
            .remove(&player)
            .ok_or(GameError::UnknownPlayer(player))?;

        let owned: Vec<EntityId> = world
            .query::<(TowerTag, Tower)>()
            .filter(|(_, (_, tower))| tower.owner == player)
            .map(|(id, _)| id)
            .collect();
        for tower in &owned {
            world.destroy(*tower);
        }

        world.destroy(entity);
        self.join_resources.remove(&player);
        self.reported.remove(&player);

        debug!(%player, towers_removed = owned.len(), "Player left");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Economy
    // ------------------------------------------------------------------

    /// Buy and place a tower.
    pub fn place_tower(
        &mut self,
        world: &mut World,
        config: &GameConfig,
        path: &Path,
        player: PlayerId,
        kind: TowerKind,
        position: Vec2Fixed,
        events: &mut Vec<GameEvent>,
    ) -> Result<EntityId> {
        self.ensure_running(world)?;
        let resources = self.resources(world, player)?;
        let data = config.tower(kind).ok_or(GameError::UnknownTowerKind(kind))?;
        let rules = &config.rules;

        if resources.gold < data.cost {
            return Err(GameError::InsufficientGold {
                required: data.cost,
                available: resources.gold,
            });
        }
        Self::check_placement(world, rules, path, position)?;

        self.resources_mut(world, player)?.gold -= data.cost;

        let tower = world.spawn((
            Position::new(position),
            Tower {
                kind,
                level: 1,
                experience: 0,
                owner: player,
            },
            Targeting {
                range: data.range,
                priority: TargetPriority::default(),
                current_target: None,
            },
            Attack {
                damage: data.damage,
                attack_speed: data.attack_speed,
                last_attack_time: None,
                projectile_speed: data.projectile_speed,
                piercing: data.piercing,
                splash_radius: data.splash_radius,
            },
            TowerTag,
        ));

        debug!(%player, %tower, ?kind, cost = data.cost, "Tower placed");
        events.push(GameEvent::TowerPlaced {
            id: tower,
            kind,
            position,
            level: 1,
            owner: player,
        });
        self.publish_state(world, events);
        Ok(tower)
    }

    fn check_placement(
        world: &World,
        rules: &Rules,
        path: &Path,
        position: Vec2Fixed,
    ) -> std::result::Result<(), PlacementError> {
        if world.count::<TowerTag>() >= rules.max_towers {
            return Err(PlacementError::TowerLimit(rules.max_towers));
        }

        if !path.within_bounds(position, rules.map_margin) {
            return Err(PlacementError::OutOfBounds);
        }

        if path.distance_squared_to(position) < squared(rules.path_clearance) {
            return Err(PlacementError::TooCloseToPath);
        }

        let clearance_sq = squared(rules.tower_clearance);
        let blocking = world
            .query::<(TowerTag, Position)>()
            .find(|(_, (_, other))| other.value.distance_squared(position) < clearance_sq);
        if let Some((other, _)) = blocking {
            return Err(PlacementError::TooCloseToTower(other));
        }

        Ok(())
    }

    /// Buy the next upgrade level. Returns the new level.
    pub fn upgrade_tower(
        &mut self,
        world: &mut World,
        config: &GameConfig,
        player: PlayerId,
        tower: EntityId,
        events: &mut Vec<GameEvent>,
    ) -> Result<u32> {
        self.ensure_running(world)?;
        let current = Self::owned_tower(world, player, tower)?;
        let resources = self.resources(world, player)?;
        let data = config
            .tower(current.kind)
            .ok_or(GameError::UnknownTowerKind(current.kind))?;
        let upgrade = *data
            .upgrade_from(current.level)
            .ok_or(GameError::MaxLevel(tower))?;

        let cost = config.rules.upgrade_cost(data.cost);
        if resources.gold < cost {
            return Err(GameError::InsufficientGold {
                required: cost,
                available: resources.gold,
            });
        }

        self.resources_mut(world, player)?.gold -= cost;

        let level = current.level + 1;
        if let Some(state) = world.get_mut::<Tower>(tower) {
            state.level = level;
        }
        if let Some(targeting) = world.get_mut::<Targeting>(tower) {
            targeting.range += upgrade.range_bonus;
        }
        if let Some(attack) = world.get_mut::<Attack>(tower) {
            attack.damage = attack.damage.saturating_add(upgrade.damage_bonus);
            attack.attack_speed += upgrade.attack_speed_bonus;
        }

        debug!(%player, %tower, level, cost, "Tower upgraded");
        events.push(GameEvent::TowerUpgraded {
            id: tower,
            level,
            owner: player,
        });
        self.publish_state(world, events);
        Ok(level)
    }

    /// Sell a tower. Returns the gold refunded.
    pub fn sell_tower(
        &mut self,
        world: &mut World,
        config: &GameConfig,
        player: PlayerId,
        tower: EntityId,
        events: &mut Vec<GameEvent>,
    ) -> Result<u32> {
        self.ensure_running(world)?;
        let current = Self::owned_tower(world, player, tower)?;
        let data = config
            .tower(current.kind)
            .ok_or(GameError::UnknownTowerKind(current.kind))?;
        let refund = config.rules.sell_refund(data.cost);

        let resources = self.resources_mut(world, player)?;
        resources.gold = resources.gold.saturating_add(refund);
        world.destroy(tower);

        debug!(%player, %tower, refund, "Tower sold");
        events.push(GameEvent::TowerSold {
            id: tower,
            owner: player,
            refund,
        });
        self.publish_state(world, events);
        Ok(refund)
    }

    /// Change how a tower picks targets.
    pub fn set_target_priority(
        &mut self,
        world: &mut World,
        player: PlayerId,
        tower: EntityId,
        priority: TargetPriority,
    ) -> Result<()> {
        self.ensure_running(world)?;
        Self::owned_tower(world, player, tower)?;
        let targeting = world
            .get_mut::<Targeting>(tower)
            .ok_or(GameError::InvalidEntity(tower))?;
        targeting.priority = priority;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Waves
    // ------------------------------------------------------------------

    /// Start the next wave now. Returns its number.
    ///
    /// Requesting a wave past the last configured one ends the game in
    /// victory and reports [`GameError::GameOver`].
    pub fn start_wave(
        &mut self,
        world: &mut World,
        config: &GameConfig,
        now: Fixed,
        events: &mut Vec<GameEvent>,
    ) -> Result<u32> {
        self.ensure_running(world)?;
        let state = self.game_state(world);
        if state.is_wave_active {
            return Err(GameError::WaveInProgress(state.current_wave));
        }

        match self.begin_wave(world, config, now, events) {
            Some(wave) => {
                self.publish_state(world, events);
                Ok(wave)
            }
            None => {
                self.finish(world, GameOutcome::Victory, events);
                Err(GameError::GameOver)
            }
        }
    }

    /// Transition Idle → WaveActive. `None` if no waves are left.
    fn begin_wave(
        &mut self,
        world: &mut World,
        config: &GameConfig,
        now: Fixed,
        events: &mut Vec<GameEvent>,
    ) -> Option<u32> {
        let number = self.game_state(world).current_wave + 1;
        let wave = config.wave(number)?;
        let enemies = wave.enemy_count();

        if let Some(state) = world.get_mut::<GameState>(self.game_state) {
            state.current_wave = number;
            state.is_wave_active = true;
            state.enemies_remaining = enemies;
            state.wave_start_time = now;
        }
        self.cursor = Some(SpawnCursor {
            group: 0,
            spawned: 0,
            next_spawn_at: now,
        });

        debug!(wave = number, enemies, "Wave started");
        events.push(GameEvent::WaveStarted {
            wave: number,
            enemies,
        });
        Some(number)
    }

    /// End-of-tick bookkeeping.
    ///
    /// Applies this tick's escapes and deaths, checks for defeat, completes
    /// or auto-starts waves, spawns due enemies and publishes changed
    /// player state.
    pub fn update(
        &mut self,
        world: &mut World,
        config: &GameConfig,
        path: &Path,
        now: Fixed,
        escaped: &[EntityId],
        defeats: &[Defeat],
        events: &mut Vec<GameEvent>,
    ) {
        if self.is_over(world) {
            return;
        }

        self.apply_escapes(world, escaped.len());
        self.apply_defeats(world, &config.rules, defeats);

        if self.any_player_out_of_lives(world, &config.rules) {
            self.finish(world, GameOutcome::Defeat, events);
            self.publish_state(world, events);
            return;
        }

        let state = self.game_state(world);
        if state.is_wave_active && state.enemies_remaining == 0 {
            self.complete_wave(world, now, events);
            if state.current_wave >= config.wave_count() {
                self.finish(world, GameOutcome::Victory, events);
                self.publish_state(world, events);
                return;
            }
        }

        let state = self.game_state(world);
        if !state.is_wave_active
            && now - self.idle_since >= config.rules.inter_wave_delay
            && self.begin_wave(world, config, now, events).is_none()
        {
            self.finish(world, GameOutcome::Victory, events);
            self.publish_state(world, events);
            return;
        }

        self.spawn_due(world, config, path, now, events);
        self.publish_state(world, events);
    }

    fn apply_escapes(&self, world: &mut World, count: usize) {
        if count == 0 {
            return;
        }
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        let lives_lost = count.saturating_mul(LIVES_PER_ESCAPE);

        for entity in self.players.values() {
            if let Some(resources) = world.get_mut::<PlayerResources>(*entity) {
                resources.lives = resources.lives.saturating_sub(lives_lost);
            }
        }
        if let Some(state) = world.get_mut::<GameState>(self.game_state) {
            state.enemies_remaining = state.enemies_remaining.saturating_sub(count);
        }
    }

    fn apply_defeats(&self, world: &mut World, rules: &Rules, defeats: &[Defeat]) {
        for defeat in defeats {
            let score = u64::from(defeat.reward) * u64::from(rules.score_per_reward);
            for entity in self.players.values() {
                if let Some(resources) = world.get_mut::<PlayerResources>(*entity) {
                    resources.gold = resources.gold.saturating_add(defeat.reward);
                    resources.score = resources.score.saturating_add(score);
                }
            }
            if let Some(state) = world.get_mut::<GameState>(self.game_state) {
                state.enemies_remaining = state.enemies_remaining.saturating_sub(1);
            }
        }
    }

    fn any_player_out_of_lives(&self, world: &World, rules: &Rules) -> bool {
        self.players.values().any(|entity| {
            world
                .get::<PlayerResources>(*entity)
                .is_some_and(|r| r.lives <= rules.defeat_lives_threshold)
        })
    }

    fn complete_wave(&mut self, world: &mut World, now: Fixed, events: &mut Vec<GameEvent>) {
        let Some(state) = world.get_mut::<GameState>(self.game_state) else {
            return;
        };
        state.is_wave_active = false;
        let wave = state.current_wave;

        self.cursor = None;
        self.idle_since = now;

        debug!(wave, "Wave completed");
        events.push(GameEvent::WaveCompleted { wave });
    }

    fn spawn_due(
        &mut self,
        world: &mut World,
        config: &GameConfig,
        path: &Path,
        now: Fixed,
        events: &mut Vec<GameEvent>,
    ) {
        let Some(mut cursor) = self.cursor else {
            return;
        };
        let Some(wave) = config.wave(self.game_state(world).current_wave) else {
            self.cursor = None;
            return;
        };

        while cursor.next_spawn_at <= now {
            let Some(group) = cursor.next_group(wave).copied() else {
                break;
            };
            self.spawn_enemy(world, config, path, &group, events);
            cursor.spawned += 1;

            match cursor.next_group(wave) {
                Some(next) => cursor.next_spawn_at += next.interval,
                None => break,
            }
        }

        self.cursor = Some(cursor);
    }

    fn spawn_enemy(
        &self,
        world: &mut World,
        config: &GameConfig,
        path: &Path,
        group: &SpawnGroup,
        events: &mut Vec<GameEvent>,
    ) {
        let Some(data) = config.enemy(group.enemy) else {
            warn!(kind = ?group.enemy, "No configuration for enemy kind; skipping spawn");
            if let Some(state) = world.get_mut::<GameState>(self.game_state) {
                state.enemies_remaining = state.enemies_remaining.saturating_sub(1);
            }
            return;
        };

        let health = scale(data.health, group.health_multiplier).max(1);
        let reward = scale(data.reward, group.reward_multiplier);
        let speed = data.speed.saturating_mul(group.speed_multiplier);
        let position = path.start();

        let id = world.spawn((
            Position::new(position),
            Velocity::default(),
            Health::new(health),
            Enemy {
                kind: data.kind,
                reward,
                speed,
                armor: data.armor,
            },
            PathFollowing::default(),
            EnemyTag,
        ));

        events.push(GameEvent::EnemySpawned {
            id,
            kind: data.kind,
            position,
            health,
            max_health: health,
        });
    }

    fn finish(&mut self, world: &mut World, outcome: GameOutcome, events: &mut Vec<GameEvent>) {
        self.cursor = None;
        let Some(state) = world.get_mut::<GameState>(self.game_state) else {
            return;
        };
        state.outcome = Some(outcome);
        let wave = state.current_wave;

        info!(?outcome, wave, "Game over");
        events.push(GameEvent::GameOver { outcome, wave });
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Clear the board and restore every player's join-time resources.
    ///
    /// The wave counter restarts; the inter-wave delay counts from `now`.
    pub fn reset(&mut self, world: &mut World, now: Fixed, events: &mut Vec<GameEvent>) {
        let doomed: Vec<EntityId> = world
            .entity_ids()
            .filter(|&id| {
                world.has::<TowerTag>(id)
                    || world.has::<EnemyTag>(id)
                    || world.has::<ProjectileTag>(id)
            })
            .collect();
        for id in &doomed {
            world.destroy(*id);
        }

        for (player, entity) in &self.players {
            if let (Some(resources), Some(initial)) = (
                world.get_mut::<PlayerResources>(*entity),
                self.join_resources.get(player),
            ) {
                *resources = *initial;
            }
        }

        if let Some(state) = world.get_mut::<GameState>(self.game_state) {
            *state = GameState::default();
        }
        self.cursor = None;
        self.idle_since = now;
        self.reported.clear();

        debug!(removed = doomed.len(), "Game reset");
        self.publish_state(world, events);
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn ensure_running(&self, world: &World) -> Result<()> {
        if self.is_over(world) {
            Err(GameError::GameOver)
        } else {
            Ok(())
        }
    }

    fn resources(&self, world: &World, player: PlayerId) -> Result<PlayerResources> {
        self.player_resources(world, player)
            .ok_or(GameError::UnknownPlayer(player))
    }

    fn resources_mut<'w>(
        &self,
        world: &'w mut World,
        player: PlayerId,
    ) -> Result<&'w mut PlayerResources> {
        let entity = self
            .players
            .get(&player)
            .ok_or(GameError::UnknownPlayer(player))?;
        world
            .get_mut::<PlayerResources>(*entity)
            .ok_or(GameError::UnknownPlayer(player))
    }

    fn owned_tower(world: &World, player: PlayerId, tower: EntityId) -> Result<Tower> {
        let state = world
            .get::<Tower>(tower)
            .copied()
            .ok_or(GameError::InvalidEntity(tower))?;
        if state.owner != player {
            return Err(GameError::NotOwner { player, tower });
        }
        Ok(state)
    }

    /// Emit `GameStateUpdated` for every player whose view changed.
    fn publish_state(&mut self, world: &World, events: &mut Vec<GameEvent>) {
        let state = self.game_state(world);
        for (player, entity) in &self.players {
            let Some(resources) = world.get::<PlayerResources>(*entity).copied() else {
                continue;
            };
            let summary = Summary { state, resources };
            if self.reported.get(player) == Some(&summary) {
                continue;
            }
            self.reported.insert(*player, summary);

            events.push(GameEvent::GameStateUpdated {
                player: *player,
                wave: state.current_wave,
                is_active: state.is_wave_active,
                enemies_remaining: state.enemies_remaining,
                gold: resources.gold,
                lives: resources.lives,
                score: resources.score,
            });
        }
    }
}

/// Scale an integer stat by a fixed-point multiplier, rounding down.
///
/// Works on the raw bits so every `u32` scales exactly; results clamp to
/// `0..=u32::MAX`.
fn scale(value: u32, multiplier: Fixed) -> u32 {
    let scaled = (i128::from(value) * i128::from(multiplier.to_bits())) >> Fixed::FRAC_NBITS;
    u32::try_from(scaled.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Harness {
        world: World,
        config: GameConfig,
        path: Path,
        coordinator: Coordinator,
        events: Vec<GameEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let mut world = World::new();
            let config = GameConfig::default();
            let path = config.build_path().unwrap();
            let coordinator = Coordinator::new(&mut world);
            Self {
                world,
                config,
                path,
                coordinator,
                events: Vec::new(),
            }
        }

        fn join(&mut self, id: u32) -> PlayerId {
            let player = PlayerId(id);
            self.coordinator
                .join_player(&mut self.world, &self.config.rules, player, None, &mut self.events)
                .unwrap();
            player
        }

        fn place(&mut self, player: PlayerId, kind: TowerKind, x: i32, y: i32) -> Result<EntityId> {
            self.coordinator.place_tower(
                &mut self.world,
                &self.config,
                &self.path,
                player,
                kind,
                Vec2Fixed::from_ints(x, y),
                &mut self.events,
            )
        }

        fn gold(&self, player: PlayerId) -> u32 {
            self.coordinator
                .player_resources(&self.world, player)
                .unwrap()
                .gold
        }

        fn update(&mut self, now: Fixed, escaped: &[EntityId], defeats: &[Defeat]) {
            self.coordinator.update(
                &mut self.world,
                &self.config,
                &self.path,
                now,
                escaped,
                defeats,
                &mut self.events,
            );
        }
    }

    #[test]
    fn test_join_twice_fails() {
        let mut h = Harness::new();
        let player = h.join(1);
        let err = h
            .coordinator
            .join_player(&mut h.world, &h.config.rules, player, None, &mut h.events)
            .unwrap_err();
        assert!(matches!(err, GameError::PlayerAlreadyJoined(_)));
    }

    #[test]
    fn test_join_with_supplied_resources() {
        let mut h = Harness::new();
        let player = PlayerId(9);
        let supplied = PlayerResources {
            gold: 1234,
            lives: 3,
            score: 77,
        };
        h.coordinator
            .join_player(&mut h.world, &h.config.rules, player, Some(supplied), &mut h.events)
            .unwrap();
        assert_eq!(h.coordinator.player_resources(&h.world, player), Some(supplied));
    }

    #[test]
    fn test_placement_rules() {
        let mut h = Harness::new();
        let player = h.join(1);

        // Path runs along y = 0 from x = -50 to -30.
        assert!(matches!(
            h.place(player, TowerKind::Basic, -40, 3),
            Err(GameError::InvalidPlacement(PlacementError::TooCloseToPath))
        ));
        let first = h.place(player, TowerKind::Basic, -40, 10).unwrap();
        assert!(matches!(
            h.place(player, TowerKind::Basic, -36, 10),
            Err(GameError::InvalidPlacement(PlacementError::TooCloseToTower(id))) if id == first
        ));
        assert!(matches!(
            h.place(PlayerId(2), TowerKind::Basic, -40, -10),
            Err(GameError::UnknownPlayer(_))
        ));
        assert_eq!(h.gold(player), 450);
    }

    #[test]
    fn test_placement_outside_map_is_rejected() {
        let mut h = Harness::new();
        let player = h.join(1);

        // Default path spans x in [-50, 50], y in [-20, 20]; margin is 50.
        assert!(h.place(player, TowerKind::Basic, -100, 70).is_ok());
        for (x, y) in [(-101, 0), (0, 71), (100_000, 0), (0, -2_000_000_000)] {
            assert!(matches!(
                h.place(player, TowerKind::Basic, x, y),
                Err(GameError::InvalidPlacement(PlacementError::OutOfBounds))
            ));
        }
        assert_eq!(h.gold(player), 450);
        assert_eq!(h.world.count::<TowerTag>(), 1);
    }

    #[test]
    fn test_scale_is_exact_for_large_stats() {
        assert_eq!(scale(3_000_000_000, Fixed::ONE), 3_000_000_000);
        assert_eq!(scale(u32::MAX, Fixed::from_num(2)), u32::MAX);
        assert_eq!(scale(300, Fixed::from_num(1.5)), 450);
        assert_eq!(scale(25, Fixed::from_num(0.5)), 12);
        assert_eq!(scale(100, Fixed::ZERO), 0);
    }

    #[test]
    fn test_insufficient_gold_changes_nothing() {
        let mut h = Harness::new();
        let player = h.join(1);
        h.place(player, TowerKind::Mage, -40, 10).unwrap();
        h.place(player, TowerKind::Mage, -40, -10).unwrap();

        let towers_before = h.world.count::<TowerTag>();
        let err = h.place(player, TowerKind::Mage, 15, 10).unwrap_err();
        assert!(matches!(
            err,
            GameError::InsufficientGold {
                required: 200,
                available: 100
            }
        ));
        assert_eq!(h.world.count::<TowerTag>(), towers_before);
        assert_eq!(h.gold(player), 100);
    }

    #[test]
    fn test_tower_limit() {
        let mut h = Harness::new();
        h.config.rules.max_towers = 1;
        let player = h.join(1);
        h.place(player, TowerKind::Basic, -40, 10).unwrap();
        assert!(matches!(
            h.place(player, TowerKind::Basic, -40, -10),
            Err(GameError::InvalidPlacement(PlacementError::TowerLimit(1)))
        ));
    }

    #[test]
    fn test_upgrade_and_sell() {
        let mut h = Harness::new();
        let owner = h.join(1);
        let other = h.join(2);
        let tower = h.place(owner, TowerKind::Basic, -40, 10).unwrap();

        assert!(matches!(
            h.coordinator
                .upgrade_tower(&mut h.world, &h.config, other, tower, &mut h.events),
            Err(GameError::NotOwner { .. })
        ));

        let level = h
            .coordinator
            .upgrade_tower(&mut h.world, &h.config, owner, tower, &mut h.events)
            .unwrap();
        assert_eq!(level, 2);
        assert_eq!(h.gold(owner), 500 - 50 - 75);
        assert_eq!(h.world.get::<Attack>(tower).unwrap().damage, 35);
        assert_eq!(h.world.get::<Targeting>(tower).unwrap().range, Fixed::from_num(17));

        h.coordinator
            .upgrade_tower(&mut h.world, &h.config, owner, tower, &mut h.events)
            .unwrap();
        assert!(matches!(
            h.coordinator
                .upgrade_tower(&mut h.world, &h.config, owner, tower, &mut h.events),
            Err(GameError::MaxLevel(_))
        ));

        let refund = h
            .coordinator
            .sell_tower(&mut h.world, &h.config, owner, tower, &mut h.events)
            .unwrap();
        assert_eq!(refund, 37);
        assert!(!h.world.contains(tower));

        assert!(matches!(
            h.coordinator
                .sell_tower(&mut h.world, &h.config, owner, tower, &mut h.events),
            Err(GameError::InvalidEntity(_))
        ));
    }

    #[test]
    fn test_set_target_priority_requires_owner() {
        let mut h = Harness::new();
        let owner = h.join(1);
        let tower = h.place(owner, TowerKind::Archer, -40, 10).unwrap();

        assert!(h
            .coordinator
            .set_target_priority(&mut h.world, PlayerId(5), tower, TargetPriority::Closest)
            .is_err());
        h.coordinator
            .set_target_priority(&mut h.world, owner, tower, TargetPriority::Closest)
            .unwrap();
        assert_eq!(
            h.world.get::<Targeting>(tower).unwrap().priority,
            TargetPriority::Closest
        );
    }

    #[test]
    fn test_wave_spawns_on_group_intervals() {
        let mut h = Harness::new();
        h.join(1);
        let wave = h
            .coordinator
            .start_wave(&mut h.world, &h.config, Fixed::ZERO, &mut h.events)
            .unwrap();
        assert_eq!(wave, 1);

        assert!(matches!(
            h.coordinator
                .start_wave(&mut h.world, &h.config, Fixed::ZERO, &mut h.events),
            Err(GameError::WaveInProgress(1))
        ));

        h.update(Fixed::ZERO, &[], &[]);
        assert_eq!(h.world.count::<EnemyTag>(), 1);
        h.update(Fixed::from_num(0.5), &[], &[]);
        assert_eq!(h.world.count::<EnemyTag>(), 1);
        h.update(Fixed::ONE, &[], &[]);
        assert_eq!(h.world.count::<EnemyTag>(), 2);

        let state = h.coordinator.game_state(&h.world);
        assert!(state.is_wave_active);
        assert_eq!(state.enemies_remaining, 10);
    }

    #[test]
    fn test_defeat_credits_every_player() {
        let mut h = Harness::new();
        let a = h.join(1);
        let b = h.join(2);
        h.coordinator
            .start_wave(&mut h.world, &h.config, Fixed::ZERO, &mut h.events)
            .unwrap();
        h.update(Fixed::ZERO, &[], &[]);

        let defeat = Defeat {
            id: EntityId(999),
            reward: 10,
        };
        h.update(Fixed::from_num(0.25), &[], &[defeat]);

        for player in [a, b] {
            let resources = h.coordinator.player_resources(&h.world, player).unwrap();
            assert_eq!(resources.gold, 510);
            assert_eq!(resources.score, 100);
        }
        assert_eq!(h.coordinator.game_state(&h.world).enemies_remaining, 9);
    }

    #[test]
    fn test_escape_to_zero_lives_is_defeat() {
        let mut h = Harness::new();
        let player = PlayerId(1);
        h.coordinator
            .join_player(
                &mut h.world,
                &h.config.rules,
                player,
                Some(PlayerResources::new(500, 1)),
                &mut h.events,
            )
            .unwrap();
        h.coordinator
            .start_wave(&mut h.world, &h.config, Fixed::ZERO, &mut h.events)
            .unwrap();

        h.update(Fixed::ZERO, &[EntityId(999)], &[]);

        assert_eq!(
            h.coordinator.game_state(&h.world).outcome,
            Some(GameOutcome::Defeat)
        );
        assert!(h.events.contains(&GameEvent::GameOver {
            outcome: GameOutcome::Defeat,
            wave: 1
        }));
        assert!(matches!(
            h.place(player, TowerKind::Basic, -40, 10),
            Err(GameError::GameOver)
        ));
    }

    #[test]
    fn test_game_state_update_only_on_change() {
        let mut h = Harness::new();
        h.join(1);
        h.events.clear();

        h.update(Fixed::ONE, &[], &[]);
        h.update(Fixed::from_num(2), &[], &[]);
        assert!(h.events.is_empty());
    }

    #[test]
    fn test_leave_removes_owned_towers() {
        let mut h = Harness::new();
        let a = h.join(1);
        let b = h.join(2);
        let mine = h.place(a, TowerKind::Basic, -40, 10).unwrap();
        let theirs = h.place(b, TowerKind::Basic, -40, -10).unwrap();

        h.coordinator.leave_player(&mut h.world, a).unwrap();

        assert!(!h.world.contains(mine));
        assert!(h.world.contains(theirs));
        assert!(h.coordinator.player_resources(&h.world, a).is_none());
        assert!(matches!(
            h.coordinator.leave_player(&mut h.world, a),
            Err(GameError::UnknownPlayer(_))
        ));
    }

    #[test]
    fn test_reset_restores_join_resources() {
        let mut h = Harness::new();
        let player = h.join(1);
        h.place(player, TowerKind::Archer, -40, 10).unwrap();
        h.coordinator
            .start_wave(&mut h.world, &h.config, Fixed::ZERO, &mut h.events)
            .unwrap();
        h.update(Fixed::ZERO, &[], &[]);

        h.coordinator.reset(&mut h.world, Fixed::ONE, &mut h.events);

        assert_eq!(h.world.count::<TowerTag>(), 0);
        assert_eq!(h.world.count::<EnemyTag>(), 0);
        assert_eq!(h.gold(player), 500);
        assert_eq!(h.coordinator.game_state(&h.world), GameState::default());
        assert_eq!(h.coordinator.idle_since(), Fixed::ONE);
    }

    #[test]
    fn test_wave_group_multipliers() {
        let mut h = Harness::new();
        h.config.waves = vec![h.config.waves[4].clone()];
        h.coordinator
            .start_wave(&mut h.world, &h.config, Fixed::ZERO, &mut h.events)
            .unwrap();
        h.update(Fixed::ZERO, &[], &[]);

        let (_, (health, enemy)) = h.world.query::<(Health, Enemy)>().next().unwrap();
        assert_eq!(health.maximum, 450);
        assert_eq!(enemy.reward, 50);
        assert_eq!(enemy.kind, crate::components::EnemyKind::Tank);
    }
}
