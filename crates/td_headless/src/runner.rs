//! Headless session runner implementation.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use td_core::components::{
    Attack, Enemy, EnemyTag, GameOutcome, Health, PathFollowing, Player, PlayerId, PlayerResources,
    Position, Projectile, ProjectileTag, Targeting, Tower, TowerTag,
};
use td_core::data::GameConfig;
use td_core::error::{GameError, PlacementError};
use td_core::events::{GameEvent, TickEvents};
use td_core::math::{Fixed, Vec2Fixed};
use td_core::simulation::Simulation;
use td_core::world::EntityId;
use tracing::{debug, info, warn};

use crate::protocol::{
    Command, EnemyState, EventRecord, GameResult, GameStatus, HealthState, PlayerState,
    ProjectileState, Response, StateReport, TowerState,
};
use crate::scenario::{Scenario, ScenarioAction, ScenarioError};

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Emit an `events` line even for ticks where nothing happened.
    pub emit_empty_ticks: bool,
}

/// Drives one [`Simulation`] from protocol commands.
#[derive(Debug)]
pub struct HeadlessRunner {
    sim: Simulation,
    config: HeadlessConfig,
    should_quit: bool,
}

impl HeadlessRunner {
    /// Create a runner on `game_config`.
    pub fn new(game_config: GameConfig) -> Result<Self, GameError> {
        Self::with_config(game_config, HeadlessConfig::default())
    }

    /// Create a runner with custom configuration.
    pub fn with_config(game_config: GameConfig, config: HeadlessConfig) -> Result<Self, GameError> {
        Ok(Self {
            sim: Simulation::new(game_config)?,
            config,
            should_quit: false,
        })
    }

    /// The simulation being driven.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Whether a `quit` command was received.
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Run the interactive loop.
    ///
    /// Reads JSON commands from `input` until it closes or `quit` arrives,
    /// writing responses to `output`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        write!(output, "{}", Response::ready(self.sim.current_tick()).to_json_line())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let responses = match Command::from_json(line) {
                Ok(cmd) => self.handle(cmd),
                Err(e) => vec![Response::error(format!("Parse error: {e}"), None)],
            };
            for response in &responses {
                write!(output, "{}", response.to_json_line())?;
            }
            output.flush()?;

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Execute one command and collect the responses.
    pub fn handle(&mut self, cmd: Command) -> Vec<Response> {
        let name = cmd.name();
        debug!(cmd = name, "Handling command");

        match self.dispatch(cmd) {
            Ok(responses) => responses,
            Err(err) => {
                debug!(cmd = name, %err, "Command rejected");
                vec![Response::error(err.to_string(), Some(name))]
            }
        }
    }

    fn dispatch(&mut self, cmd: Command) -> Result<Vec<Response>, GameError> {
        let name = cmd.name();
        let responses = match cmd {
            Command::Tick { count } => self.tick(count),
            Command::Join {
                player,
                gold,
                lives,
            } => {
                let initial = if gold.is_some() || lives.is_some() {
                    let rules = &self.sim.config().rules;
                    Some(PlayerResources::new(
                        gold.unwrap_or(rules.starting_gold),
                        lives.unwrap_or(rules.starting_lives),
                    ))
                } else {
                    None
                };
                self.sim.join_player(PlayerId(player), initial)?;
                vec![Response::ack(name)]
            }
            Command::Leave { player } => {
                self.sim.leave_player(PlayerId(player))?;
                vec![Response::ack(name)]
            }
            Command::PlaceTower { player, kind, x, y } => {
                let position = to_position(x, y)?;
                let tower = self.sim.place_tower(PlayerId(player), kind, position)?;
                vec![Response::Placed { tower_id: tower.0 }]
            }
            Command::UpgradeTower { player, tower_id } => {
                let level = self
                    .sim
                    .upgrade_tower(PlayerId(player), EntityId(tower_id))?;
                vec![Response::Upgraded { tower_id, level }]
            }
            Command::SellTower { player, tower_id } => {
                let refund = self.sim.sell_tower(PlayerId(player), EntityId(tower_id))?;
                vec![Response::Sold { tower_id, refund }]
            }
            Command::SetPriority {
                player,
                tower_id,
                priority,
            } => {
                self.sim
                    .set_target_priority(PlayerId(player), EntityId(tower_id), priority)?;
                vec![Response::ack(name)]
            }
            Command::StartWave => {
                let wave = self.sim.start_wave()?;
                vec![Response::WaveStarted { wave }]
            }
            Command::Query => vec![Response::State(Box::new(state_report(&self.sim)))],
            Command::Hash => vec![Response::StateHash {
                tick: self.sim.current_tick(),
                hash: self.sim.state_hash(),
            }],
            Command::Reset => {
                self.sim.reset();
                vec![Response::ack(name)]
            }
            Command::Quit => {
                self.should_quit = true;
                vec![Response::Bye]
            }
        };
        Ok(responses)
    }

    fn tick(&mut self, count: u32) -> Vec<Response> {
        let mut responses = Vec::new();

        for _ in 0..count {
            if self.sim.is_over() {
                break;
            }
            let events = self.sim.step();
            let outcome = events.game_over();

            if self.config.emit_empty_ticks || !events.is_empty() {
                responses.push(events_response(&events));
            }
            if let Some(outcome) = outcome {
                responses.push(self.game_over_response(outcome));
            }
        }

        if responses.is_empty() {
            responses.push(Response::ack("tick"));
        }
        responses
    }

    fn game_over_response(&self, outcome: GameOutcome) -> Response {
        Response::GameOver {
            result: outcome.into(),
            wave: self.sim.game_state().current_wave,
            ticks: self.sim.current_tick(),
        }
    }
}

fn to_position(x: f64, y: f64) -> Result<Vec2Fixed, GameError> {
    match (Fixed::checked_from_num(x), Fixed::checked_from_num(y)) {
        (Some(x), Some(y)) => Ok(Vec2Fixed::new(x, y)),
        _ => Err(PlacementError::OutOfBounds.into()),
    }
}

fn events_response(events: &TickEvents) -> Response {
    Response::Events {
        tick: events.tick,
        events: events.iter().map(EventRecord::from).collect(),
    }
}

/// Build the `query` response for the current state.
pub fn state_report(sim: &Simulation) -> StateReport {
    let world = sim.world();
    let state = sim.game_state();

    let status = match state.outcome {
        Some(GameOutcome::Victory) => GameStatus::Victory,
        Some(GameOutcome::Defeat) => GameStatus::Defeat,
        None if state.is_wave_active => GameStatus::WaveActive,
        None => GameStatus::Idle,
    };

    let mut players: Vec<PlayerState> = world
        .query::<(Player, PlayerResources)>()
        .map(|(_, (player, resources))| PlayerState {
            id: player.id.0,
            gold: resources.gold,
            lives: resources.lives,
            score: resources.score,
        })
        .collect();
    players.sort_by_key(|p| p.id);

    let towers = world
        .query::<(TowerTag, Position, Tower, Targeting, Attack)>()
        .map(|(id, (_, position, tower, targeting, attack))| {
            let (x, y) = position.value.to_f64();
            TowerState {
                id: id.0,
                kind: tower.kind,
                owner: tower.owner.0,
                level: tower.level,
                x,
                y,
                range: targeting.range.to_num(),
                damage: attack.damage,
                priority: targeting.priority,
                target: targeting.current_target.map(|t| t.0),
            }
        })
        .collect();

    let enemies = world
        .query::<(EnemyTag, Position, Health, PathFollowing)>()
        .filter_map(|(id, (_, position, health, follow))| {
            let kind = world.get::<Enemy>(id)?.kind;
            let (x, y) = position.value.to_f64();
            Some(EnemyState {
                id: id.0,
                kind,
                x,
                y,
                health: HealthState {
                    current: health.current,
                    max: health.maximum,
                },
                waypoint_index: follow.waypoint_index,
                progress: follow.progress.to_num(),
            })
        })
        .collect();

    let projectiles = world
        .query::<(ProjectileTag, Position, Projectile)>()
        .map(|(id, (_, position, projectile))| {
            let (x, y) = position.value.to_f64();
            ProjectileState {
                id: id.0,
                x,
                y,
                source: projectile.source.0,
                target: projectile.target.0,
            }
        })
        .collect();

    StateReport {
        tick: sim.current_tick(),
        time: sim.time().to_num(),
        status,
        wave: state.current_wave,
        wave_active: state.is_wave_active,
        enemies_remaining: state.enemies_remaining,
        players,
        towers,
        enemies,
        projectiles,
        hash: sim.state_hash(),
    }
}

// ============================================================================
// Scenario runs
// ============================================================================

/// Outcome of a scripted scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Scenario name.
    pub scenario: String,
    /// Ticks simulated.
    pub ticks: u64,
    /// How the session ended, if it did.
    pub result: Option<GameResult>,
    /// Wave reached.
    pub wave: u32,
    /// Enemies killed.
    pub enemies_defeated: u32,
    /// Enemies that escaped.
    pub enemies_escaped: u32,
    /// Projectiles fired.
    pub projectiles_fired: u32,
    /// Scripted actions the simulation rejected.
    pub rejected_actions: u32,
    /// Final player economies.
    pub players: Vec<PlayerState>,
    /// Final state hash.
    pub final_hash: u64,
    /// Whether the scenario's expectation held.
    pub passed: bool,
}

/// Run `scenario` on `config` until the game ends or `max_ticks` pass.
///
/// `max_ticks` overrides the scenario's own limit when given.
pub fn run_scenario(
    scenario: &Scenario,
    config: GameConfig,
    max_ticks: Option<u64>,
) -> Result<RunSummary, ScenarioError> {
    let mut sim = Simulation::new(config)?;
    for setup in &scenario.players {
        let initial = if setup.gold.is_some() || setup.lives.is_some() {
            let rules = &sim.config().rules;
            Some(PlayerResources::new(
                setup.gold.unwrap_or(rules.starting_gold),
                setup.lives.unwrap_or(rules.starting_lives),
            ))
        } else {
            None
        };
        sim.join_player(PlayerId(setup.id), initial)?;
    }

    let limit = max_ticks.unwrap_or(scenario.max_ticks);
    info!(scenario = %scenario.name, limit, "Running scenario");

    let mut placed: Vec<EntityId> = Vec::new();
    let mut summary = RunSummary {
        scenario: scenario.name.clone(),
        ticks: 0,
        result: None,
        wave: 0,
        enemies_defeated: 0,
        enemies_escaped: 0,
        projectiles_fired: 0,
        rejected_actions: 0,
        players: Vec::new(),
        final_hash: 0,
        passed: false,
    };

    while sim.current_tick() < limit && !sim.is_over() {
        let tick = sim.current_tick();
        for action in scenario.actions_at(tick) {
            if let Err(err) = apply_action(&mut sim, *action, &mut placed) {
                warn!(tick, ?action, %err, "Scripted action rejected");
                summary.rejected_actions += 1;
            }
        }

        let events = sim.step();
        for event in &events {
            match event {
                GameEvent::EnemyDefeated { .. } => summary.enemies_defeated += 1,
                GameEvent::EnemyEscaped { .. } => summary.enemies_escaped += 1,
                GameEvent::ProjectileCreated { .. } => {
                    summary.projectiles_fired += 1;
                }
                _ => {}
            }
        }
    }

    let report = state_report(&sim);
    let state = sim.game_state();
    summary.ticks = sim.current_tick();
    summary.result = state.outcome.map(GameResult::from);
    summary.wave = state.current_wave;
    summary.players = report.players;
    summary.final_hash = report.hash;
    summary.passed = scenario.expect.map_or(true, |expect| {
        let outcome_ok = expect.outcome.map_or(true, |o| state.outcome == Some(o));
        outcome_ok && state.current_wave >= expect.min_wave
    });

    info!(
        ticks = summary.ticks,
        wave = summary.wave,
        result = ?summary.result,
        passed = summary.passed,
        "Scenario finished"
    );
    Ok(summary)
}

fn apply_action(
    sim: &mut Simulation,
    action: ScenarioAction,
    placed: &mut Vec<EntityId>,
) -> Result<(), GameError> {
    let nth = |placed: &[EntityId], n: usize| {
        placed
            .get(n)
            .copied()
            .ok_or_else(|| GameError::InvalidConfig(format!("scenario has no tower #{n}")))
    };

    match action {
        ScenarioAction::PlaceTower { player, kind, x, y } => {
            let tower = sim.place_tower(PlayerId(player), kind, to_position(x, y)?)?;
            placed.push(tower);
        }
        ScenarioAction::UpgradeTower { player, tower } => {
            sim.upgrade_tower(PlayerId(player), nth(placed, tower)?)?;
        }
        ScenarioAction::SellTower { player, tower } => {
            sim.sell_tower(PlayerId(player), nth(placed, tower)?)?;
        }
        ScenarioAction::SetPriority {
            player,
            tower,
            priority,
        } => {
            sim.set_target_priority(PlayerId(player), nth(placed, tower)?, priority)?;
        }
        ScenarioAction::StartWave => {
            sim.start_wave()?;
        }
    }
    Ok(())
}
