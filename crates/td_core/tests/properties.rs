//! Property tests over random player intents.
//!
//! Every run joins two players on the default configuration and replays a
//! generated list of intents against it.

use proptest::prelude::*;
use td_core::prelude::*;
use td_test_utils::determinism::strategies::{
    apply_intent, arb_dt, arb_intent, arb_map_position, arb_tower_kind, Intent,
};
use td_test_utils::determinism::{
    find_first_divergence, verify_determinism, verify_snapshot_round_trip,
};
use td_test_utils::fixtures::{sim_with_players, PLAYER_ONE, PLAYER_TWO};

fn two_player_sim() -> Simulation {
    sim_with_players(GameConfig::default(), &[PLAYER_ONE, PLAYER_TWO])
}

fn replay(intents: &[Intent], dt: Fixed) -> Simulation {
    let mut sim = two_player_sim();
    let mut placed = Vec::new();
    for (i, intent) in intents.iter().enumerate() {
        let player = if i % 2 == 0 { PLAYER_ONE } else { PLAYER_TWO };
        apply_intent(&mut sim, player, *intent, dt, &mut placed);
    }
    sim
}

#[test]
fn scripted_session_never_diverges() {
    let setup = || {
        let mut sim = two_player_sim();
        sim.place_tower(PLAYER_ONE, TowerKind::Mage, Vec2Fixed::from_ints(-20, 10))
            .unwrap();
        sim.place_tower(PLAYER_TWO, TowerKind::Cannon, Vec2Fixed::from_ints(10, 0))
            .unwrap();
        sim.start_wave().unwrap();
        sim
    };

    assert_eq!(find_first_divergence(setup, 600), None);
    assert!(verify_snapshot_round_trip(setup, 300));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Identical intent streams produce identical sessions.
    #[test]
    fn prop_intent_replay_is_deterministic(
        intents in prop::collection::vec(arb_intent(), 1..40),
        dt in arb_dt(),
    ) {
        let result = verify_determinism(3, 20, dt, || replay(&intents, dt));
        prop_assert!(result.is_deterministic(), "hashes: {:?}", result.hashes);
    }

    /// World invariants hold after every tick, and waves only move forward.
    #[test]
    fn prop_invariants_hold_every_tick(
        intents in prop::collection::vec(arb_intent(), 1..60),
        dt in arb_dt(),
    ) {
        let mut sim = two_player_sim();
        let mut placed = Vec::new();
        let mut last_wave = 0;

        for (i, intent) in intents.into_iter().enumerate() {
            let player = if i % 2 == 0 { PLAYER_ONE } else { PLAYER_TWO };
            let ticks = match intent {
                Intent::Wait(n) => n,
                other => {
                    apply_intent(&mut sim, player, other, dt, &mut placed);
                    1
                }
            };

            for _ in 0..ticks {
                sim.tick(dt);
                prop_assert!(sim.check_invariants().is_ok(), "{:?}", sim.check_invariants());

                let wave = sim.game_state().current_wave;
                prop_assert!(wave >= last_wave);
                last_wave = wave;

                for player in [PLAYER_ONE, PLAYER_TWO] {
                    let resources = sim.player_resources(player).unwrap();
                    prop_assert!(resources.lives <= 20);
                }
            }
        }
    }

    /// A projectile whose target is gone does not survive the next tick.
    #[test]
    fn prop_orphaned_projectiles_are_discarded(
        kind in arb_tower_kind(),
        warmup in 1u32..200,
    ) {
        let mut sim = two_player_sim();
        sim.place_tower(PLAYER_ONE, kind, Vec2Fixed::from_ints(-40, 10)).unwrap();
        sim.start_wave().unwrap();
        for _ in 0..warmup {
            sim.step();
        }

        let targets: Vec<EntityId> = sim
            .world()
            .query::<(ProjectileTag, Projectile)>()
            .map(|(_, (_, p))| p.target)
            .collect();
        for target in &targets {
            sim.world_mut().destroy(*target);
        }
        let orphans = sim.world().query_ids::<(ProjectileTag,)>();

        sim.step();

        for orphan in orphans {
            prop_assert!(!sim.world().contains(orphan));
        }
    }

    /// Failed placements leave gold and the board untouched.
    #[test]
    fn prop_rejected_placement_changes_nothing(
        kind in arb_tower_kind(),
        position in arb_map_position(),
    ) {
        let mut sim = two_player_sim();
        let before = sim.state_hash();
        let gold = sim.player_resources(PLAYER_ONE).unwrap().gold;

        match sim.place_tower(PLAYER_ONE, kind, position) {
            Ok(tower) => {
                let cost = sim.config().tower(kind).unwrap().cost;
                prop_assert_eq!(sim.player_resources(PLAYER_ONE).unwrap().gold, gold - cost);
                prop_assert!(sim.world().contains(tower));
            }
            Err(_) => {
                prop_assert_eq!(sim.state_hash(), before);
            }
        }
    }
}
