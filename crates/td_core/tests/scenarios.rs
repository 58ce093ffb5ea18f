//! End-to-end combat and economy scenarios.
//!
//! Each test drives a full `Simulation` through its public API and checks
//! the observable outcome.

use td_core::prelude::*;
use td_test_utils::fixtures::{
    config_with_waves, default_sim, fixed, fixed_f, pos, sim_with_players, single_group_wave,
    spawn_enemy, PLAYER_ONE, PLAYER_TWO,
};

fn gold(sim: &Simulation, player: PlayerId) -> u32 {
    sim.player_resources(player).unwrap().gold
}

fn fire_at(sim: &mut Simulation, target: EntityId, damage: u32) -> EntityId {
    let position = sim.world().get::<Position>(target).unwrap().value;
    sim.world_mut().spawn((
        Position::new(position),
        Projectile {
            source: EntityId(0),
            target,
            damage,
            speed: fixed(20),
            piercing: false,
            splash_radius: Fixed::ZERO,
        },
        ProjectileTag,
    ))
}

#[test]
fn archer_placed_clear_of_path_costs_its_price() {
    let mut sim = sim_with_players(GameConfig::default(), &[PLAYER_ONE]);
    let spot = pos(-40, 10);
    assert_eq!(sim.path().distance_squared_to(spot), fixed(100));

    let tower = sim.place_tower(PLAYER_ONE, TowerKind::Archer, spot).unwrap();

    assert_eq!(gold(&sim, PLAYER_ONE), 350);
    let placed = sim.world().get::<Tower>(tower).unwrap();
    assert_eq!(placed.kind, TowerKind::Archer);
    assert_eq!(placed.level, 1);
    assert_eq!(placed.owner, PLAYER_ONE);
    assert_eq!(
        sim.world().get::<Targeting>(tower).unwrap().priority,
        TargetPriority::First
    );
}

#[test]
fn placement_inside_path_clearance_fails_without_charge() {
    let mut sim = sim_with_players(GameConfig::default(), &[PLAYER_ONE]);

    let result = sim.place_tower(PLAYER_ONE, TowerKind::Archer, pos(-40, 3));

    assert!(matches!(
        result,
        Err(GameError::InvalidPlacement(PlacementError::TooCloseToPath))
    ));
    assert_eq!(gold(&sim, PLAYER_ONE), 500);
    assert_eq!(sim.world().count::<TowerTag>(), 0);
}

#[test]
fn two_hits_kill_and_reward_every_player() {
    let mut sim = sim_with_players(GameConfig::default(), &[PLAYER_ONE, PLAYER_TWO]);
    let enemy = spawn_enemy(&mut sim, 100, 10, 0, 1);
    let dt = fixed_f(0.25);

    fire_at(&mut sim, enemy, 60);
    let events = sim.tick(dt);
    assert_eq!(sim.world().get::<Health>(enemy).unwrap().current, 40);
    assert_eq!(events.defeated().count(), 0);

    fire_at(&mut sim, enemy, 60);
    let events = sim.tick(dt);
    assert!(!sim.world().contains(enemy));
    assert_eq!(events.defeated().collect::<Vec<_>>(), vec![enemy]);

    for player in [PLAYER_ONE, PLAYER_TWO] {
        let resources = sim.player_resources(player).unwrap();
        assert_eq!(resources.gold, 510);
        assert_eq!(resources.score, 100);
    }
    assert_eq!(sim.world().count::<ProjectileTag>(), 0);
}

#[test]
fn tower_fires_on_its_cooldown() {
    let mut sim = sim_with_players(GameConfig::default(), &[PLAYER_ONE]);
    let enemy = spawn_enemy(&mut sim, 10_000, 10, 0, 1);
    let cannon = sim
        .place_tower(PLAYER_ONE, TowerKind::Cannon, pos(-40, 10))
        .unwrap();
    assert_eq!(
        sim.world().get::<Attack>(cannon).unwrap().attack_speed,
        fixed(2)
    );
    let dt = fixed_f(0.25);

    let at_zero = sim.tick(dt);
    assert_eq!(at_zero.projectiles_created().count(), 1);
    assert_eq!(
        sim.world().get::<Targeting>(cannon).unwrap().current_target,
        Some(enemy)
    );

    let at_quarter = sim.tick(dt);
    assert_eq!(at_quarter.projectiles_created().count(), 0);

    let at_half = sim.tick(dt);
    assert_eq!(at_half.projectiles_created().count(), 1);
    assert_eq!(
        sim.world().get::<Attack>(cannon).unwrap().last_attack_time,
        Some(fixed_f(0.5))
    );
}

#[test]
fn escape_costs_every_player_a_life_and_pays_nothing() {
    let mut sim = sim_with_players(GameConfig::default(), &[PLAYER_ONE, PLAYER_TWO]);
    let last_segment = sim.path().len() - 2;
    let enemy = spawn_enemy(&mut sim, 100, 10, 100, last_segment);

    let events = sim.tick(fixed_f(0.25));

    assert!(!sim.world().contains(enemy));
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::EnemyEscaped { id, .. } if *id == enemy)));
    assert_eq!(events.defeated().count(), 0);
    for player in [PLAYER_ONE, PLAYER_TWO] {
        let resources = sim.player_resources(player).unwrap();
        assert_eq!(resources.lives, 19);
        assert_eq!(resources.gold, 500);
    }
}

#[test]
fn next_wave_starts_ten_seconds_after_clear() {
    let config = config_with_waves(vec![
        single_group_wave(EnemyKind::Basic, 1, 1.0),
        single_group_wave(EnemyKind::Basic, 1, 1.0),
    ]);
    let mut sim = sim_with_players(config, &[PLAYER_ONE]);
    let dt = fixed_f(0.5);

    assert_eq!(sim.start_wave().unwrap(), 1);
    let events = sim.tick(dt);
    let spawned = events
        .iter()
        .find_map(|e| match e {
            GameEvent::EnemySpawned { id, .. } => Some(*id),
            _ => None,
        })
        .unwrap();

    sim.world_mut().get_mut::<Health>(spawned).unwrap().current = 0;
    let cleared_at = sim.time();
    let events = sim.tick(dt);
    assert!(events.iter().any(|e| *e == GameEvent::WaveCompleted { wave: 1 }));
    assert!(!sim.game_state().is_wave_active);

    loop {
        let now = sim.time();
        let events = sim.tick(dt);
        let started = events
            .iter()
            .any(|e| matches!(e, GameEvent::WaveStarted { wave: 2, .. }));
        if started {
            assert_eq!(now - cleared_at, fixed(10));
            break;
        }
        assert!(now - cleared_at < fixed(10), "wave 2 never started");
    }
    assert_eq!(sim.game_state().current_wave, 2);
}

#[test]
fn place_then_sell_refunds_configured_fraction() {
    let mut sim = sim_with_players(GameConfig::default(), &[PLAYER_ONE]);
    let tower = sim
        .place_tower(PLAYER_ONE, TowerKind::Archer, pos(-40, 10))
        .unwrap();

    let refund = sim.sell_tower(PLAYER_ONE, tower).unwrap();

    assert_eq!(refund, 150 * 75 / 100);
    assert_eq!(gold(&sim, PLAYER_ONE), 500 - 150 + refund);
    assert!(matches!(
        sim.upgrade_tower(PLAYER_ONE, tower),
        Err(GameError::InvalidEntity(_))
    ));
}

#[test]
fn destroying_twice_matches_destroying_once() {
    let mut sim = default_sim();
    let enemy = spawn_enemy(&mut sim, 100, 10, 0, 0);

    assert!(sim.world_mut().destroy(enemy));
    let hash_once = sim.state_hash();
    assert!(!sim.world_mut().destroy(enemy));
    assert_eq!(sim.state_hash(), hash_once);
}

#[test]
fn clearing_the_final_wave_is_victory() {
    let config = config_with_waves(vec![single_group_wave(EnemyKind::Fast, 2, 0.5)]);
    let mut sim = sim_with_players(config, &[PLAYER_ONE]);
    sim.start_wave().unwrap();
    let dt = fixed_f(0.5);

    let mut outcome = None;
    for _ in 0..20 {
        let enemies = sim.world().query_ids::<(EnemyTag, Health)>();
        for id in enemies {
            sim.world_mut().get_mut::<Health>(id).unwrap().current = 0;
        }
        outcome = sim.tick(dt).game_over().or(outcome);
        if outcome.is_some() {
            break;
        }
    }

    assert_eq!(outcome, Some(GameOutcome::Victory));
    assert!(sim.is_over());

    let tick = sim.current_tick();
    let hash = sim.state_hash();
    assert!(sim.tick(dt).is_empty());
    assert_eq!(sim.current_tick(), tick);
    assert_eq!(sim.state_hash(), hash);
    assert!(matches!(
        sim.place_tower(PLAYER_ONE, TowerKind::Basic, pos(-40, 10)),
        Err(GameError::GameOver)
    ));
    assert!(matches!(sim.start_wave(), Err(GameError::GameOver)));
    assert_eq!(sim.tick(dt).game_over(), None);
}

#[test]
fn starting_past_the_last_wave_is_victory() {
    let config = config_with_waves(vec![single_group_wave(EnemyKind::Basic, 1, 1.0)]);
    let mut sim = sim_with_players(config, &[PLAYER_ONE]);

    // Idle with the wave counter already on the only configured wave.
    let state_entity = sim.coordinator().game_state_entity();
    sim.world_mut().get_mut::<GameState>(state_entity).unwrap().current_wave = 1;
    assert!(!sim.is_over());

    assert!(matches!(sim.start_wave(), Err(GameError::GameOver)));
    assert!(sim.is_over());
    assert_eq!(sim.game_state().outcome, Some(GameOutcome::Victory));

    let events = sim.step();
    assert_eq!(events.game_over(), Some(GameOutcome::Victory));
    assert!(events
        .iter()
        .all(|e| !matches!(e, GameEvent::WaveStarted { .. } | GameEvent::EnemySpawned { .. })));
}

#[test]
fn placement_far_outside_the_map_fails_without_charge() {
    let mut sim = sim_with_players(GameConfig::default(), &[PLAYER_ONE]);

    for spot in [pos(100_000, 0), pos(0, -100_000), pos(i32::MAX, i32::MIN)] {
        assert!(matches!(
            sim.place_tower(PLAYER_ONE, TowerKind::Basic, spot),
            Err(GameError::InvalidPlacement(PlacementError::OutOfBounds))
        ));
    }
    assert_eq!(gold(&sim, PLAYER_ONE), 500);
    assert_eq!(sim.world().count::<TowerTag>(), 0);
}

#[test]
fn enormous_enemy_health_ticks_cleanly() {
    let mut config = GameConfig::default();
    for enemy in &mut config.enemies {
        enemy.health = 3_000_000_000;
    }
    assert!(config.validate().is_empty());

    let mut sim = sim_with_players(config, &[PLAYER_ONE]);
    let strongest = sim
        .place_tower(PLAYER_ONE, TowerKind::Archer, pos(-40, 10))
        .unwrap();
    let weakest = sim
        .place_tower(PLAYER_ONE, TowerKind::Basic, pos(-40, -10))
        .unwrap();
    sim.set_target_priority(PLAYER_ONE, strongest, TargetPriority::Strongest)
        .unwrap();
    sim.set_target_priority(PLAYER_ONE, weakest, TargetPriority::Weakest)
        .unwrap();
    sim.start_wave().unwrap();

    for _ in 0..40 {
        sim.step();
        sim.check_invariants().unwrap();
    }

    let (_, (_, health)) = sim.world().query::<(EnemyTag, Health)>().next().unwrap();
    assert_eq!(health.maximum, 3_000_000_000);
    assert!(health.current < health.maximum);
    let target = |tower| sim.world().get::<Targeting>(tower).unwrap().current_target;
    assert!(target(strongest).is_some());
    assert!(target(weakest).is_some());
}

#[test]
fn running_out_of_lives_is_defeat() {
    let config = config_with_waves(vec![single_group_wave(EnemyKind::Fast, 3, 0.25)]);
    let mut sim = Simulation::new(config).unwrap();
    sim.join_player(PLAYER_ONE, Some(PlayerResources::new(500, 2)))
        .unwrap();
    sim.start_wave().unwrap();

    let all = sim.advance(fixed(60), fixed_f(0.25));
    let outcome = all.iter().find_map(TickEvents::game_over);

    assert_eq!(outcome, Some(GameOutcome::Defeat));
    assert_eq!(sim.player_resources(PLAYER_ONE).unwrap().lives, 0);
}

#[test]
fn reset_clears_board_and_restores_join_resources() {
    let mut sim = sim_with_players(GameConfig::default(), &[PLAYER_ONE]);
    sim.place_tower(PLAYER_ONE, TowerKind::Mage, pos(40, 30))
        .unwrap();
    sim.start_wave().unwrap();
    sim.advance(fixed(3), fixed_f(0.25));
    assert!(sim.world().count::<EnemyTag>() > 0);

    sim.reset();

    assert_eq!(sim.world().count::<TowerTag>(), 0);
    assert_eq!(sim.world().count::<EnemyTag>(), 0);
    assert_eq!(sim.world().count::<ProjectileTag>(), 0);
    assert_eq!(gold(&sim, PLAYER_ONE), 500);
    assert_eq!(sim.game_state().current_wave, 0);
}

#[test]
fn leaving_player_takes_towers_along() {
    let mut sim = sim_with_players(GameConfig::default(), &[PLAYER_ONE, PLAYER_TWO]);
    let mine = sim
        .place_tower(PLAYER_ONE, TowerKind::Basic, pos(-40, 10))
        .unwrap();
    let theirs = sim
        .place_tower(PLAYER_TWO, TowerKind::Basic, pos(-40, -10))
        .unwrap();

    sim.leave_player(PLAYER_ONE).unwrap();

    assert!(!sim.world().contains(mine));
    assert!(sim.world().contains(theirs));
    assert!(sim.player_resources(PLAYER_ONE).is_none());
}

#[test]
fn events_keep_their_order_within_a_tick() {
    let mut sim = sim_with_players(GameConfig::default(), &[PLAYER_ONE]);
    let enemy = spawn_enemy(&mut sim, 50, 10, 0, 1);
    fire_at(&mut sim, enemy, 60);

    let events = sim.tick(fixed_f(0.25));
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            GameEvent::EnemyPositionUpdated { .. } => "moved",
            GameEvent::EnemyDamaged { .. } => "damaged",
            GameEvent::EnemyDefeated { .. } => "defeated",
            GameEvent::GameStateUpdated { .. } => "state",
            _ => "other",
        })
        .collect();

    assert_eq!(kinds, vec!["state", "moved", "damaged", "defeated", "state"]);
}
