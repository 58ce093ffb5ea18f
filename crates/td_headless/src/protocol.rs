//! JSON protocol for headless session control.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Events, state and acknowledgements
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","tick":0}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner outputs one `events` line per tick that produced events
//! 4. On game end, outputs `{"type":"game_over","result":"victory"|"defeat",...}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0}
//! -> {"cmd":"join","player":1}
//! <- {"type":"ack","cmd":"join"}
//! -> {"cmd":"place_tower","player":1,"kind":"Archer","x":-40.0,"y":10.0}
//! <- {"type":"placed","tower_id":3}
//! -> {"cmd":"tick","count":20}
//! <- {"type":"events","tick":1,"events":[...]}
//! -> {"cmd":"query"}
//! <- {"type":"state","tick":20,...}
//! ```
//!
//! Coordinates travel as decimals; the runner converts them to fixed-point
//! before they reach the simulation.

use serde::{Deserialize, Serialize};
use td_core::components::{EnemyKind, GameOutcome, TargetPriority, TowerKind};
use td_core::events::GameEvent;
use td_core::math::Vec2Fixed;

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance simulation by N default-length ticks (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Connect a player. Omitted resources use the configured defaults.
    Join {
        player: u32,
        #[serde(default)]
        gold: Option<u32>,
        #[serde(default)]
        lives: Option<u32>,
    },

    /// Disconnect a player and remove their towers.
    Leave { player: u32 },

    /// Buy and place a tower.
    PlaceTower {
        player: u32,
        kind: TowerKind,
        x: f64,
        y: f64,
    },

    /// Upgrade a tower.
    UpgradeTower { player: u32, tower_id: u64 },

    /// Sell a tower.
    SellTower { player: u32, tower_id: u64 },

    /// Change a tower's targeting priority.
    SetPriority {
        player: u32,
        tower_id: u64,
        priority: TargetPriority,
    },

    /// Start the next wave without waiting.
    StartWave,

    /// Query current session state without advancing time.
    Query,

    /// Report the state hash (for determinism verification).
    Hash,

    /// Clear the board and restore join-time resources.
    Reset,

    /// Quit the runner.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready { version: String, tick: u64 },

    /// Acknowledgment of a command.
    Ack { cmd: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// A tower was placed.
    Placed { tower_id: u64 },

    /// A tower was upgraded.
    Upgraded { tower_id: u64, level: u32 },

    /// A tower was sold.
    Sold { tower_id: u64, refund: u32 },

    /// A wave was started on request.
    WaveStarted { wave: u32 },

    /// Everything that happened during one tick.
    Events {
        tick: u64,
        events: Vec<EventRecord>,
    },

    /// Current session state.
    State(Box<StateReport>),

    /// Session has ended.
    GameOver {
        result: GameResult,
        wave: u32,
        ticks: u64,
    },

    /// State hash for determinism verification.
    StateHash { tick: u64, hash: u64 },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// Full state report returned by `query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateReport {
    pub tick: u64,
    pub time: f64,
    pub status: GameStatus,
    pub wave: u32,
    pub wave_active: bool,
    pub enemies_remaining: u32,
    pub players: Vec<PlayerState>,
    pub towers: Vec<TowerState>,
    pub enemies: Vec<EnemyState>,
    pub projectiles: Vec<ProjectileState>,
    pub hash: u64,
}

/// A connected player's economy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: u32,
    pub gold: u32,
    pub lives: u32,
    pub score: u64,
}

/// A placed tower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerState {
    pub id: u64,
    pub kind: TowerKind,
    pub owner: u32,
    pub level: u32,
    pub x: f64,
    pub y: f64,
    pub range: f64,
    pub damage: u32,
    pub priority: TargetPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u64>,
}

/// An enemy on the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyState {
    pub id: u64,
    pub kind: EnemyKind,
    pub x: f64,
    pub y: f64,
    pub health: HealthState,
    pub waypoint_index: usize,
    pub progress: f64,
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileState {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub source: u64,
    pub target: u64,
}

/// Health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthState {
    pub current: u32,
    pub max: u32,
}

/// Current session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Idle,
    WaveActive,
    Victory,
    Defeat,
}

/// Session result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Victory,
    Defeat,
}

impl From<GameOutcome> for GameResult {
    fn from(outcome: GameOutcome) -> Self {
        match outcome {
            GameOutcome::Victory => Self::Victory,
            GameOutcome::Defeat => Self::Defeat,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// A [`GameEvent`] with decimal coordinates and plain ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventRecord {
    EnemySpawned {
        id: u64,
        kind: EnemyKind,
        x: f64,
        y: f64,
        health: u32,
        max_health: u32,
    },
    EnemyPositionUpdated {
        id: u64,
        x: f64,
        y: f64,
        waypoint_index: usize,
        progress: f64,
        health: u32,
    },
    EnemyDamaged {
        id: u64,
        source: u64,
        damage: u32,
        health: u32,
    },
    EnemyDefeated {
        id: u64,
        gold_reward: u32,
    },
    EnemyEscaped {
        id: u64,
        lives_lost: u32,
    },
    TowerPlaced {
        id: u64,
        kind: TowerKind,
        x: f64,
        y: f64,
        level: u32,
        owner: u32,
    },
    TowerUpgraded {
        id: u64,
        level: u32,
        owner: u32,
    },
    TowerSold {
        id: u64,
        owner: u32,
        refund: u32,
    },
    ProjectileCreated {
        id: u64,
        source: u64,
        target: u64,
        x: f64,
        y: f64,
        target_x: f64,
        target_y: f64,
    },
    WaveStarted {
        wave: u32,
        enemies: u32,
    },
    WaveCompleted {
        wave: u32,
    },
    GameStateUpdated {
        player: u32,
        wave: u32,
        is_active: bool,
        enemies_remaining: u32,
        gold: u32,
        lives: u32,
        score: u64,
    },
    GameOver {
        result: GameResult,
        wave: u32,
    },
}

fn xy(position: Vec2Fixed) -> (f64, f64) {
    position.to_f64()
}

impl From<&GameEvent> for EventRecord {
    fn from(event: &GameEvent) -> Self {
        match *event {
            GameEvent::EnemySpawned {
                id,
                kind,
                position,
                health,
                max_health,
            } => {
                let (x, y) = xy(position);
                Self::EnemySpawned {
                    id: id.0,
                    kind,
                    x,
                    y,
                    health,
                    max_health,
                }
            }
            GameEvent::EnemyPositionUpdated {
                id,
                position,
                waypoint_index,
                progress,
                health,
            } => {
                let (x, y) = xy(position);
                Self::EnemyPositionUpdated {
                    id: id.0,
                    x,
                    y,
                    waypoint_index,
                    progress: progress.to_num(),
                    health,
                }
            }
            GameEvent::EnemyDamaged {
                id,
                source,
                damage,
                health,
            } => Self::EnemyDamaged {
                id: id.0,
                source: source.0,
                damage,
                health,
            },
            GameEvent::EnemyDefeated { id, gold_reward } => Self::EnemyDefeated {
                id: id.0,
                gold_reward,
            },
            GameEvent::EnemyEscaped { id, lives_lost } => Self::EnemyEscaped {
                id: id.0,
                lives_lost,
            },
            GameEvent::TowerPlaced {
                id,
                kind,
                position,
                level,
                owner,
            } => {
                let (x, y) = xy(position);
                Self::TowerPlaced {
                    id: id.0,
                    kind,
                    x,
                    y,
                    level,
                    owner: owner.0,
                }
            }
            GameEvent::TowerUpgraded { id, level, owner } => Self::TowerUpgraded {
                id: id.0,
                level,
                owner: owner.0,
            },
            GameEvent::TowerSold { id, owner, refund } => Self::TowerSold {
                id: id.0,
                owner: owner.0,
                refund,
            },
            GameEvent::ProjectileCreated {
                id,
                source,
                target,
                position,
                target_position,
            } => {
                let (x, y) = xy(position);
                let (target_x, target_y) = xy(target_position);
                Self::ProjectileCreated {
                    id: id.0,
                    source: source.0,
                    target: target.0,
                    x,
                    y,
                    target_x,
                    target_y,
                }
            }
            GameEvent::WaveStarted { wave, enemies } => Self::WaveStarted { wave, enemies },
            GameEvent::WaveCompleted { wave } => Self::WaveCompleted { wave },
            GameEvent::GameStateUpdated {
                player,
                wave,
                is_active,
                enemies_remaining,
                gold,
                lives,
                score,
            } => Self::GameStateUpdated {
                player: player.0,
                wave,
                is_active,
                enemies_remaining,
                gold,
                lives,
                score,
            },
            GameEvent::GameOver { outcome, wave } => Self::GameOver {
                result: outcome.into(),
                wave,
            },
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64) -> Self {
        Self::Ready {
            version: "1.0".to_string(),
            tick,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::PlaceTower { .. } => "place_tower",
            Self::UpgradeTower { .. } => "upgrade_tower",
            Self::SellTower { .. } => "sell_tower",
            Self::SetPriority { .. } => "set_priority",
            Self::StartWave => "start_wave",
            Self::Query => "query",
            Self::Hash => "hash",
            Self::Reset => "reset",
            Self::Quit => "quit",
        }
    }
}
