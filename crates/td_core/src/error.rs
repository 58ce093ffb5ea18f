//! Error types for the game simulation.

use thiserror::Error;

use crate::components::{PlayerId, TowerKind};
use crate::world::EntityId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Why a tower cannot be placed at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// Position lies outside the playable map.
    #[error("outside the map")]
    OutOfBounds,
    /// Position lies inside the path clearance.
    #[error("too close to the enemy path")]
    TooCloseToPath,
    /// Position overlaps another tower's footprint.
    #[error("too close to tower {0}")]
    TooCloseToTower(EntityId),
    /// The session tower limit is reached.
    #[error("tower limit of {0} reached")]
    TowerLimit(usize),
}

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Entity does not exist (or no longer exists).
    #[error("Invalid entity: {0}")]
    InvalidEntity(EntityId),

    /// Entity already carries a different exclusive type tag.
    #[error("Entity {0} already carries another type tag")]
    ConflictingTag(EntityId),

    /// Player is not connected to this session.
    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    /// Player joined twice.
    #[error("Player already joined: {0}")]
    PlayerAlreadyJoined(PlayerId),

    /// Configuration has no entry for this tower kind.
    #[error("No configuration for tower kind {0:?}")]
    UnknownTowerKind(TowerKind),

    /// Insufficient gold for an economy operation.
    #[error("Insufficient gold: need {required}, have {available}")]
    InsufficientGold {
        /// Gold required.
        required: u32,
        /// Gold available.
        available: u32,
    },

    /// Tower cannot be placed at the requested position.
    #[error("Invalid placement: {0}")]
    InvalidPlacement(#[from] PlacementError),

    /// Player does not own the tower.
    #[error("Player {player} does not own tower {tower}")]
    NotOwner {
        /// Requesting player.
        player: PlayerId,
        /// Tower entity.
        tower: EntityId,
    },

    /// Tower has no further upgrades.
    #[error("Tower {0} is already at max level")]
    MaxLevel(EntityId),

    /// A wave is already running.
    #[error("Wave {0} is still active")]
    WaveInProgress(u32),

    /// The game has ended; no further actions are accepted.
    #[error("Game is over")]
    GameOver,

    /// Failed to parse a configuration file.
    #[error("Failed to parse config '{path}': {message}")]
    ConfigParse {
        /// Path (or source name) that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Configuration parsed but is not usable.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Snapshot encoding or decoding failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A world invariant was violated.
    #[error("Invariant violated: {0}")]
    InvariantViolated(String),
}
