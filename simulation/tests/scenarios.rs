use std::time::Duration;

use skyline_defence_core::{EntityKind, Era, Event, GimmickCatalog, Settings, Vec2};
use skyline_defence_simulation::Simulation;
use skyline_defence_world::query;

const FRAME: Duration = Duration::from_millis(16);

fn session(seed: u64) -> Simulation {
    Simulation::new(seed, GimmickCatalog::embedded(), Settings::default())
}

fn run(simulation: &mut Simulation, frames: usize) -> Vec<Event> {
    let mut log = Vec::new();
    for _ in 0..frames {
        log.extend(simulation.step(FRAME).iter().cloned());
    }
    log
}

#[test]
fn identical_seeds_replay_identically() {
    let mut first = session(0x5eed);
    let mut second = session(0x5eed);

    let first_log = run(&mut first, 1_800);
    let second_log = run(&mut second, 1_800);

    assert!(
        first_log
            .iter()
            .any(|event| matches!(event, Event::EnemySpawned { .. })),
        "thirty seconds of play must spawn enemies"
    );
    assert_eq!(first_log, second_log, "replay diverged between runs");
    assert_eq!(first.frame_snapshot(), second.frame_snapshot());
    assert_eq!(first.stats(), second.stats());
}

#[test]
fn first_spawn_lands_on_the_frame_that_crosses_the_interval() {
    let mut simulation = session(11);
    let frame = Duration::from_millis(33);
    let spawned = |events: &[Event]| {
        events
            .iter()
            .filter(|event| matches!(event, Event::EnemySpawned { .. }))
            .count()
    };

    // Wave one releases an enemy every 1/0.6 s; fifty frames stop at 1.65 s.
    for _ in 0..50 {
        assert_eq!(spawned(simulation.step(frame)), 0);
    }
    assert_eq!(spawned(simulation.step(frame)), 1);
    assert_eq!(query::active_enemy_count(simulation.world()), 1);
}

#[test]
fn city_health_stays_within_bounds_over_a_long_run() {
    let mut simulation = Simulation::new(
        17,
        GimmickCatalog::embedded(),
        Settings {
            difficulty: 1.0,
            ..Settings::default()
        },
    );
    for _ in 0..6_000 {
        let _ = simulation.step(FRAME);
        for city in query::city_view(simulation.world()).iter() {
            assert!(city.health >= 0.0 && city.health <= city.max_health);
            if city.destroyed {
                assert_eq!(city.health, 0.0);
            }
        }
    }
    assert!(simulation.stats().frames > 0);
}

#[test]
fn skipping_waves_and_eras_drives_progression() {
    let mut simulation = session(1);
    assert_eq!(simulation.progression().wave, 1);

    simulation.skip_wave();
    assert_eq!(simulation.progression().wave, 2);
    assert_eq!(simulation.stats().waves_completed, 1);

    simulation.skip_era();
    let progression = simulation.progression();
    assert_eq!(progression.era, Era::ArcadeInvaders);
    assert_eq!(progression.wave, 20);

    let events = run(&mut simulation, 240);
    assert!(events.iter().any(|event| matches!(event, Event::EnemySpawned { .. })));
}

#[test]
fn city_count_changes_rebuild_the_topology() {
    let mut simulation = session(2);
    simulation.set_city_count(6);
    assert_eq!(query::city_view(simulation.world()).len(), 6);
    assert_eq!(query::truck_view(simulation.world()).len(), 5);

    simulation.set_city_count(40);
    assert_eq!(simulation.settings().city_count, 8);
    assert_eq!(query::city_view(simulation.world()).len(), 8);
}

#[test]
fn settings_setters_sanitize_their_input() {
    let mut simulation = session(3);
    simulation.set_difficulty(4.0);
    simulation.set_ai_accuracy(f32::NAN);
    simulation.set_game_speed(0.0);
    simulation.set_repair_rate_multiplier(2.0);
    simulation.set_coordination_override(Some(-1.0));

    let settings = simulation.settings();
    assert_eq!(settings.difficulty, 1.0);
    assert_eq!(settings.ai_accuracy, Settings::default().ai_accuracy);
    assert!(settings.game_speed > 0.0);
    assert_eq!(settings.repair_rate_multiplier, 2.0);
    assert_eq!(settings.coordination_override, Some(0.0));
}

#[test]
fn manual_shot_uses_an_eligible_tower() {
    let mut simulation = session(4);
    let shooter = simulation.manual_shot(Vec2::new(200.0, 150.0));
    assert!(shooter.is_some());

    let projectiles = simulation
        .frame_snapshot()
        .entities
        .iter()
        .filter(|entity| entity.kind == EntityKind::Projectile)
        .count();
    assert_eq!(projectiles, 1);

    assert_eq!(simulation.manual_shot(Vec2::new(f32::NAN, 0.0)), None);
}

#[test]
fn destroying_every_city_ends_the_session() {
    let mut simulation = session(5);
    let centers: Vec<Vec2> = query::city_view(simulation.world())
        .iter()
        .map(|city| city.position)
        .collect();
    assert_eq!(centers.len(), 4);

    for center in &centers {
        assert!(simulation.destroy_at(*center));
    }
    assert!(!simulation.destroy_at(Vec2::new(400.0, 50.0)));
    assert!(simulation.is_game_over());
    assert!(query::tower_view(simulation.world()).is_empty());

    let _ = simulation.step(FRAME);
    let frames = simulation.stats().frames;
    assert!(simulation.step(FRAME).is_empty());
    assert_eq!(simulation.stats().frames, frames);
}

#[test]
fn destroying_a_tower_leaves_its_city_standing() {
    let mut simulation = session(6);
    let tower = query::tower_view(simulation.world())
        .iter()
        .next()
        .copied()
        .expect("a tower");
    assert!(simulation.destroy_at(tower.position));
    assert!(query::tower_view(simulation.world()).get(tower.id).is_none());
    assert_eq!(query::living_city_count(simulation.world()), 4);
}

#[test]
fn debug_spawns_bypass_the_wave_budget() {
    let mut simulation = session(7);
    simulation.death_wave();
    simulation.spawn_boss();
    assert_eq!(query::active_enemy_count(simulation.world()), 41);
}

#[test]
fn restart_returns_to_wave_one_with_fresh_stats() {
    let mut simulation = session(8);
    simulation.skip_wave();
    let _ = run(&mut simulation, 120);

    simulation.restart();
    assert_eq!(simulation.progression().wave, 1);
    assert_eq!(simulation.stats().frames, 0);
    assert_eq!(query::living_city_count(simulation.world()), 4);
}
