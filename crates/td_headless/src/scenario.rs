//! Scripted sessions for headless runs.
//!
//! A scenario lists the players that join, the actions they take on given
//! ticks, and the result a CI run should see.

use std::path::Path;

use serde::{Deserialize, Serialize};
use td_core::components::{GameOutcome, TargetPriority, TowerKind};
use td_core::data::GameConfig;
use td_core::error::GameError;
use thiserror::Error;

/// Why a scenario or configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// The path does not exist.
    #[error("file not found: {0}")]
    FileNotFound(String),
    /// The file exists but could not be read.
    #[error("could not read file: {0}")]
    ReadError(#[from] std::io::Error),
    /// The text is not a valid scenario.
    #[error("invalid scenario RON: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The simulation rejected the configuration or a scripted action.
    #[error(transparent)]
    Game(#[from] GameError),
}

/// A complete scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Free-form notes for whoever runs it.
    #[serde(default)]
    pub description: String,
    /// Players joining before the first tick.
    pub players: Vec<PlayerSetup>,
    /// Scripted actions, applied before the tick they are scheduled at.
    #[serde(default)]
    pub actions: Vec<ScheduledAction>,
    /// Give up after this many ticks.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Expected result, checked by `run`.
    #[serde(default)]
    pub expect: Option<Expectation>,
}

fn default_max_ticks() -> u64 {
    20 * 60 * 10
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Default Defense".to_string(),
            description: "One player, a handful of towers, all default waves".to_string(),
            players: vec![PlayerSetup::new(1)],
            actions: vec![
                ScheduledAction::at(0, ScenarioAction::place(1, TowerKind::Archer, -40, 10)),
                ScheduledAction::at(0, ScenarioAction::place(1, TowerKind::Cannon, -20, 10)),
                ScheduledAction::at(0, ScenarioAction::place(1, TowerKind::Basic, 10, 0)),
                ScheduledAction::at(0, ScenarioAction::StartWave),
            ],
            max_ticks: default_max_ticks(),
            expect: None,
        }
    }
}

impl Scenario {
    /// Read and parse a scenario file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse scenario RON held in memory.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Actions scheduled for `tick`, in file order.
    pub fn actions_at(&self, tick: u64) -> impl Iterator<Item = &ScenarioAction> + '_ {
        self.actions
            .iter()
            .filter(move |a| a.tick == tick)
            .map(|a| &a.action)
    }
}

/// Read a game configuration file, or fall back to the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<GameConfig, ScenarioError> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let config = GameConfig::from_ron_str(&path.display().to_string(), &contents)?;
    config.check()?;
    Ok(config)
}

/// A player joining the scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    /// Player id.
    pub id: u32,
    /// Starting gold, if not the configured default.
    #[serde(default)]
    pub gold: Option<u32>,
    /// Starting lives, if not the configured default.
    #[serde(default)]
    pub lives: Option<u32>,
}

impl PlayerSetup {
    /// A player on default resources.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self {
            id,
            gold: None,
            lives: None,
        }
    }
}

/// An action pinned to a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAction {
    /// Tick the action is applied before.
    pub tick: u64,
    /// What to do.
    pub action: ScenarioAction,
}

impl ScheduledAction {
    /// Schedule `action` before `tick`.
    #[must_use]
    pub fn at(tick: u64, action: ScenarioAction) -> Self {
        Self { tick, action }
    }
}

/// A scripted player intent.
///
/// Towers are referred to by placement order, since entity ids are only
/// known once the session runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScenarioAction {
    /// Buy and place a tower.
    PlaceTower {
        /// Buyer.
        player: u32,
        /// Tower kind.
        kind: TowerKind,
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },
    /// Upgrade the n-th tower placed by this scenario.
    UpgradeTower {
        /// Owner.
        player: u32,
        /// Placement index, from 0.
        tower: usize,
    },
    /// Sell the n-th tower placed by this scenario.
    SellTower {
        /// Owner.
        player: u32,
        /// Placement index, from 0.
        tower: usize,
    },
    /// Retarget the n-th tower placed by this scenario.
    SetPriority {
        /// Owner.
        player: u32,
        /// Placement index, from 0.
        tower: usize,
        /// New priority.
        priority: TargetPriority,
    },
    /// Start the next wave.
    StartWave,
}

impl ScenarioAction {
    /// Place a tower at integer coordinates.
    #[must_use]
    pub fn place(player: u32, kind: TowerKind, x: i32, y: i32) -> Self {
        Self::PlaceTower {
            player,
            kind,
            x: f64::from(x),
            y: f64::from(y),
        }
    }
}

/// What a scenario run should end with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    /// Required outcome; `None` accepts any, including a session still running.
    #[serde(default)]
    pub outcome: Option<GameOutcome>,
    /// Lowest acceptable wave reached.
    #[serde(default)]
    pub min_wave: u32,
}
