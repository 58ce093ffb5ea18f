//! Test fixtures and helpers.
//!
//! Pre-built sessions and entity configurations for consistent testing.

use fixed::types::I32F32;
use td_core::components::{
    Enemy, EnemyKind, EnemyTag, Health, PathFollowing, PlayerId, Position, Velocity,
};
use td_core::data::{GameConfig, SpawnGroup, WaveData};
use td_core::math::Vec2Fixed;
use td_core::simulation::Simulation;
use td_core::world::EntityId;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a position vector from integer coordinates.
#[must_use]
pub fn pos(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// The first player id used by fixtures.
pub const PLAYER_ONE: PlayerId = PlayerId(1);

/// The second player id used by fixtures.
pub const PLAYER_TWO: PlayerId = PlayerId(2);

/// A session on the default configuration with no players.
///
/// # Panics
///
/// Panics if the default configuration is invalid.
#[must_use]
pub fn default_sim() -> Simulation {
    Simulation::new(GameConfig::default()).expect("default config is valid")
}

/// A session on `config` with the given players joined on default resources.
///
/// # Panics
///
/// Panics if the configuration is invalid or a player id repeats.
#[must_use]
pub fn sim_with_players(config: GameConfig, players: &[PlayerId]) -> Simulation {
    let mut sim = Simulation::new(config).expect("config is valid");
    for &player in players {
        sim.join_player(player, None).expect("player joins");
    }
    sim
}

/// Default configuration whose waves are replaced by `waves`.
#[must_use]
pub fn config_with_waves(waves: Vec<WaveData>) -> GameConfig {
    GameConfig {
        waves,
        ..GameConfig::default()
    }
}

/// A wave of `count` identical enemies spawned `interval` seconds apart.
#[must_use]
pub fn single_group_wave(enemy: EnemyKind, count: u32, interval: f64) -> WaveData {
    WaveData {
        groups: vec![SpawnGroup::new(enemy, count, fixed_f(interval))],
    }
}

/// Place an enemy directly on the path, outside of any wave.
///
/// The enemy stands still (speed zero) unless `speed` says otherwise.
pub fn spawn_enemy(
    sim: &mut Simulation,
    health: u32,
    reward: u32,
    speed: i32,
    waypoint_index: usize,
) -> EntityId {
    let position = sim.path().point_at(waypoint_index, I32F32::ZERO);
    sim.world_mut().spawn((
        Position::new(position),
        Velocity::default(),
        Health::new(health),
        Enemy {
            kind: EnemyKind::Basic,
            reward,
            speed: fixed(speed),
            armor: 0,
        },
        PathFollowing {
            waypoint_index,
            progress: I32F32::ZERO,
        },
        EnemyTag,
    ))
}
