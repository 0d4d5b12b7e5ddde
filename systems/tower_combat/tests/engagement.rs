use std::{sync::Arc, time::Duration};

use skyline_defence_core::{
    Behavior, Command, DestructionCause, Event, Gimmick, Settings,
};
use skyline_defence_system_tower_combat::TowerCombat;
use skyline_defence_system_tower_targeting::{Config, TargetingContext, TowerTargeting};
use skyline_defence_world::{self as world, query, World};

const FRAME: Duration = Duration::from_millis(16);

#[test]
fn towers_bring_down_a_lone_falling_enemy_without_rejections() {
    let mut world = World::with_seed(21);
    let settings = Settings {
        ai_accuracy: 1.0,
        ..Settings::default()
    };
    let mut targeting = TowerTargeting::new(Config::new(21));
    let mut combat = TowerCombat::new();
    let mut targets = Vec::new();
    let mut events = Vec::new();

    let gimmick = Arc::new(Gimmick::new("pebble", 20.0, 1.0, 10.0, Behavior::Falling));
    world::apply(
        &mut world,
        Command::SpawnEnemy {
            gimmick,
            x: 400.0,
            boss: false,
        },
        &mut events,
    );

    for _ in 0..900 {
        world::apply(&mut world, Command::Tick { dt: FRAME }, &mut events);

        let cities = query::city_view(&world);
        let towers = query::tower_view(&world);
        let enemies = query::enemy_view(&world);
        targeting.handle(
            TargetingContext {
                now: query::clock(&world),
                progression: query::progression(&world),
                settings: &settings,
                field: query::field(&world),
                cities: &cities,
                towers: &towers,
                enemies: &enemies,
            },
            &mut targets,
        );
        let mut commands = Vec::new();
        combat.handle(&cities, &towers, &targets, &mut commands);
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }
        world::apply(
            &mut world,
            Command::ResolveCollisions {
                dt: FRAME,
                settings,
            },
            &mut events,
        );
        world::apply(&mut world, Command::Sweep, &mut events);

        if query::active_enemy_count(&world) == 0 {
            break;
        }
    }

    assert!(events
        .iter()
        .any(|event| matches!(event, Event::ProjectileFired { .. })));
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, Event::FireRejected { .. })),
        "combat only issues shots for ready towers"
    );
    let destroyed: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            Event::EnemyDestroyed { cause, .. } => Some(*cause),
            _ => None,
        })
        .collect();
    assert_eq!(destroyed.len(), 1);
    assert_ne!(destroyed[0], DestructionCause::GroundImpact);
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::GroundImpact { .. })));
}
