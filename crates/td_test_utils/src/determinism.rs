//! Replay harness for determinism checks.
//!
//! Two servers fed the same intents must agree bit for bit. The tick uses
//! [`td_core::math::Fixed`] only, every query walks ascending entity ids, and
//! spawning follows the wave table, so any disagreement here is a bug.

use td_core::math::Fixed;
use td_core::simulation::Simulation;
use td_core::snapshot::GameSnapshot;

/// Final state hashes of several replays of the same session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// One hash per replay, in run order.
    pub hashes: Vec<u64>,
    /// Ticks each replay ran after setup.
    pub ticks: u64,
}

impl DeterminismResult {
    /// True when every replay ended on the same hash.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|pair| pair[0] == pair[1])
    }

    /// Panic with every hash if the replays disagreed.
    ///
    /// # Panics
    ///
    /// Panics if the replays produced different hashes.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic(),
            "{} replays of {} ticks ended on different states: {:?}",
            self.hashes.len(),
            self.ticks,
            self.hashes
        );
    }
}

/// Build the session `runs` times, tick each one `ticks` times by `dt`, and
/// collect the final state hashes.
pub fn verify_determinism<F>(runs: usize, ticks: u64, dt: Fixed, setup: F) -> DeterminismResult
where
    F: Fn() -> Simulation,
{
    let hashes = (0..runs)
        .map(|_| {
            let mut sim = setup();
            for _ in 0..ticks {
                sim.tick(dt);
            }
            sim.state_hash()
        })
        .collect();

    DeterminismResult { hashes, ticks }
}

/// Step two copies of a session side by side and return the first tick on
/// which their events or state hashes disagree.
///
/// Tick 0 means the setup itself diverged. `None` means they agreed for all
/// `ticks` default-length steps.
pub fn find_first_divergence<F>(setup: F, ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let (mut left, mut right) = (setup(), setup());
    if left.state_hash() != right.state_hash() {
        return Some(0);
    }

    (1..=ticks).find(|&tick| {
        let diverged = left.step() != right.step() || left.state_hash() != right.state_hash();
        if diverged {
            tracing::debug!(tick, "Sessions diverged");
        }
        diverged
    })
}

/// Run a session for `ticks` steps and check its snapshot survives bincode
/// unchanged.
pub fn verify_snapshot_round_trip<F>(setup: F, ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup();
    for _ in 0..ticks {
        sim.step();
    }

    let snapshot = sim.snapshot();
    snapshot
        .encode()
        .and_then(|bytes| GameSnapshot::decode(&bytes))
        .is_ok_and(|restored| restored == snapshot)
}

/// Proptest strategies and random player intents.
pub mod strategies {
    use proptest::prelude::*;
    use td_core::components::{PlayerId, TargetPriority, TowerKind};
    use td_core::math::{Fixed, Vec2Fixed};
    use td_core::simulation::Simulation;
    use td_core::world::EntityId;

    /// Generate a tower kind.
    pub fn arb_tower_kind() -> impl Strategy<Value = TowerKind> {
        prop::sample::select(TowerKind::ALL.to_vec())
    }

    /// Generate a targeting priority.
    pub fn arb_priority() -> impl Strategy<Value = TargetPriority> {
        prop_oneof![
            Just(TargetPriority::First),
            Just(TargetPriority::Last),
            Just(TargetPriority::Closest),
            Just(TargetPriority::Strongest),
            Just(TargetPriority::Weakest),
        ]
    }

    /// Generate a position on the default map.
    ///
    /// Range: -60 to 60 on both axes.
    pub fn arb_map_position() -> impl Strategy<Value = Vec2Fixed> {
        (-60i32..=60, -60i32..=60).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
    }

    /// Generate a tick length that is exact in binary.
    pub fn arb_dt() -> impl Strategy<Value = Fixed> {
        prop::sample::select(vec![
            Fixed::from_num(0.125),
            Fixed::from_num(0.25),
            Fixed::from_num(0.5),
        ])
    }

    /// A player action or the passage of time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Intent {
        /// Place a tower.
        Place(TowerKind, Vec2Fixed),
        /// Upgrade the n-th placed tower (modulo the number placed).
        Upgrade(usize),
        /// Sell the n-th placed tower.
        Sell(usize),
        /// Retarget the n-th placed tower.
        Retarget(usize, TargetPriority),
        /// Start the next wave.
        StartWave,
        /// Run this many ticks.
        Wait(u8),
    }

    /// Generate an intent.
    pub fn arb_intent() -> impl Strategy<Value = Intent> {
        prop_oneof![
            3 => (arb_tower_kind(), arb_map_position()).prop_map(|(k, p)| Intent::Place(k, p)),
            1 => any::<usize>().prop_map(Intent::Upgrade),
            1 => any::<usize>().prop_map(Intent::Sell),
            1 => (any::<usize>(), arb_priority()).prop_map(|(i, p)| Intent::Retarget(i, p)),
            1 => Just(Intent::StartWave),
            4 => (1u8..=40).prop_map(Intent::Wait),
        ]
    }

    /// Apply an intent on behalf of `player`, ticking by `dt` for waits.
    ///
    /// Economy failures are expected and ignored; `placed` tracks towers
    /// that were successfully placed.
    pub fn apply_intent(
        sim: &mut Simulation,
        player: PlayerId,
        intent: Intent,
        dt: Fixed,
        placed: &mut Vec<EntityId>,
    ) {
        let pick = |placed: &[EntityId], n: usize| placed.get(n % placed.len().max(1)).copied();

        match intent {
            Intent::Place(kind, position) => {
                if let Ok(id) = sim.place_tower(player, kind, position) {
                    placed.push(id);
                }
            }
            Intent::Upgrade(n) => {
                if let Some(id) = pick(placed.as_slice(), n) {
                    let _ = sim.upgrade_tower(player, id);
                }
            }
            Intent::Sell(n) => {
                if let Some(id) = pick(placed.as_slice(), n) {
                    if sim.sell_tower(player, id).is_ok() {
                        placed.retain(|t| *t != id);
                    }
                }
            }
            Intent::Retarget(n, priority) => {
                if let Some(id) = pick(placed.as_slice(), n) {
                    let _ = sim.set_target_priority(player, id, priority);
                }
            }
            Intent::StartWave => {
                let _ = sim.start_wave();
            }
            Intent::Wait(ticks) => {
                for _ in 0..ticks {
                    sim.tick(dt);
                }
            }
        }
    }
}
