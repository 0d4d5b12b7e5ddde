use std::{collections::BTreeMap, time::Duration};

use skyline_defence_core::{CityId, Command, Event, Stance, TruckId};
use skyline_defence_system_cooperation::Cooperation;
use skyline_defence_world::{self as world, query, World};

/// Trades help back and forth over the shared truck until both cities turn
/// cooperative while their ledgers cancel out.
fn build_mutual_goodwill(world: &mut World, events: &mut Vec<Event>) {
    for round in 0..6u32 {
        let (requester, helper) = if round % 2 == 0 {
            (CityId::new(0), CityId::new(1))
        } else {
            (CityId::new(1), CityId::new(0))
        };
        let target_x = query::city_view(world)
            .get(requester)
            .map(|city| city.position.x)
            .expect("requester");
        world::apply(
            world,
            Command::DeploySharedTruck {
                truck: TruckId::new(0),
                requester,
                helper,
                target_x,
            },
            events,
        );
        world::apply(
            world,
            Command::Tick {
                dt: Duration::from_secs(61),
            },
            events,
        );
    }
}

#[test]
fn cooperative_neighbor_helps_once_per_truck_cooldown() {
    let mut world = World::with_seed(8);
    let mut events = Vec::new();
    world::apply(&mut world, Command::ConfigureCities { count: 2 }, &mut events);
    build_mutual_goodwill(&mut world, &mut events);

    let cities = query::city_view(&world);
    for city in cities.iter() {
        assert_eq!(city.stance, Stance::Cooperative);
        assert!((city.helpfulness - 45.0).abs() < 1e-4);
    }
    assert_eq!(cities.get(CityId::new(0)).map(|c| c.balance_with(CityId::new(1))), Some(0));
    assert!(query::truck_view(&world)
        .get(TruckId::new(0))
        .is_some_and(|truck| truck.available));

    let threats = BTreeMap::from([(CityId::new(0), 0.8), (CityId::new(1), 0.6)]);
    let mut cooperation = Cooperation::new();
    let mut deployments = Vec::new();

    for second in 0..60u64 {
        let now = query::clock(&world);
        let cities = query::city_view(&world);
        let trucks = query::truck_view(&world);
        let mut commands = Vec::new();
        cooperation.negotiate(now, &cities, &trucks, &threats, &mut commands);

        events.clear();
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }
        world::apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );

        assert!(
            !events.iter().any(|event| matches!(
                event,
                Event::TruckRejected { .. } | Event::AssistanceRefused { .. }
            )),
            "a cooperative neighbor with a free truck neither refuses nor collides"
        );
        for event in &events {
            if let Event::TruckDeployed {
                requester, helper, ..
            } = event
            {
                assert_eq!(*requester, CityId::new(0));
                assert_eq!(*helper, CityId::new(1));
                deployments.push(second);
            }
        }
    }

    assert_eq!(deployments, vec![0]);

    let cities = query::city_view(&world);
    let requester = cities.get(CityId::new(0)).expect("requester");
    let helper = cities.get(CityId::new(1)).expect("helper");
    assert_eq!(requester.balance_with(CityId::new(1)), -1);
    assert_eq!(helper.balance_with(CityId::new(0)), 1);
    assert!((requester.helpfulness - 50.0).abs() < 1e-4);
    assert!((helper.helpfulness - 55.0).abs() < 1e-4);
    assert_eq!(helper.stance, Stance::Cooperative);
}

#[test]
fn refusals_shift_the_ledger_toward_the_requester() {
    let mut world = World::with_seed(9);
    let mut events = Vec::new();
    world::apply(&mut world, Command::ConfigureCities { count: 2 }, &mut events);

    let threats = BTreeMap::from([(CityId::new(0), 0.9), (CityId::new(1), 0.1)]);
    let mut cooperation = Cooperation::new();
    let mut refusals = 0;

    for _ in 0..12 {
        let now = query::clock(&world);
        let cities = query::city_view(&world);
        let trucks = query::truck_view(&world);
        let mut commands = Vec::new();
        cooperation.negotiate(now, &cities, &trucks, &threats, &mut commands);
        events.clear();
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }
        refusals += events
            .iter()
            .filter(|event| matches!(event, Event::AssistanceRefused { .. }))
            .count();
        world::apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );
    }

    // Asked at 0 s, 5 s, and 10 s.
    assert_eq!(refusals, 3);
    let cities = query::city_view(&world);
    let requester = cities.get(CityId::new(0)).expect("requester");
    let neighbor = cities.get(CityId::new(1)).expect("neighbor");
    assert_eq!(requester.balance_with(CityId::new(1)), 3);
    assert_eq!(neighbor.balance_with(CityId::new(0)), -3);
    assert!((neighbor.helpfulness + 30.0).abs() < 1e-4);
}
