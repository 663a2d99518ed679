//! End-to-end scenarios driven through the public API

use cell_arena::config::GameModeKind;
use cell_arena::sim::{Node, NodeKind, PlayerInput, SimEvent, World};
use cell_arena::{Config, Poll, TickScheduler, size_to_mass};
use glam::Vec2;

fn quiet_config() -> Config {
    Config {
        food_amount: 0,
        virus_amount: 0,
        player_decay_rate: 0.0,
        ..Config::default()
    }
}

fn player_mass(world: &World, player: u32) -> f32 {
    world
        .player(player)
        .map(|p| {
            p.cells
                .iter()
                .filter_map(|&c| world.node(c))
                .map(|n| n.mass())
                .sum()
        })
        .unwrap_or(0.0)
}

#[test]
fn test_same_owner_cells_merge_only_after_recombine_time() {
    let mut world = World::new(Config {
        player_recombine_time: 30.0,
        ..quiet_config()
    });
    let p = world.add_player("merger");
    world
        .add_node(Node::player_cell(p, Vec2::new(0.0, -20.0), 60.0))
        .expect("cell");
    world
        .add_node(Node::player_cell(p, Vec2::new(0.0, 20.0), 60.0))
        .expect("cell");
    world.player_mut(p).expect("player").target = Some(Vec2::ZERO);
    let mass = player_mass(&world, p);

    // max(30, 60 * 0.2) * 25 ticks
    for _ in 0..750 {
        world.step();
        assert_eq!(world.player(p).expect("player").cells.len(), 2);
    }

    // Rigid contact held them a full diameter apart; they now close in and fuse
    for _ in 0..10 {
        world.step();
        if world.player(p).expect("player").cells.len() == 1 {
            break;
        }
    }
    let cells = &world.player(p).expect("player").cells;
    assert_eq!(cells.len(), 1, "cells merge once both are old enough");
    assert!((player_mass(&world, p) - mass).abs() < 1e-2);
}

#[test]
fn test_virus_pops_after_absorbing_ejected_mass() {
    let mut world = World::new(quiet_config());
    let virus = world
        .add_node(Node::new(NodeKind::Virus, Vec2::ZERO, 100.0))
        .expect("virus");

    let mut shot = Vec::new();
    let mut pre_pop_mass = 0.0;
    for fed in 1..=8 {
        let mut eject = Node::new(NodeKind::EjectedMass, Vec2::new(20.0, 0.0), 36.06);
        eject.set_boost(10.0, 0.0);
        let eject_mass = eject.mass();
        world.add_node(eject).expect("eject");

        pre_pop_mass = world.node(virus).expect("virus").mass() + eject_mass;
        world.step();

        for event in world.drain_events() {
            if let SimEvent::VirusShot { parent, child } = event {
                assert_eq!(parent, virus);
                shot.push(child);
            }
        }
        if fed < 8 {
            assert!(shot.is_empty(), "popped early after {fed} ejects");
        }
    }

    assert_eq!(shot.len(), 1);
    assert_eq!(world.registry.count(NodeKind::Virus), 2);
    let child_mass: f32 = shot
        .iter()
        .filter_map(|&c| world.node(c))
        .map(|n| n.mass())
        .sum();
    assert!(child_mass <= pre_pop_mass);
    assert!(
        (world.node(virus).expect("virus").size() - world.config.virus_min_size).abs() < 1e-3
    );
    let child = world.node(shot[0]).expect("child");
    assert!(child.boost.direction.x > 0.99, "shot along the eject's path");
}

#[test]
fn test_food_is_eaten_unconditionally() {
    let mut world = World::new(Config {
        game_mode: GameModeKind::Teams,
        ..quiet_config()
    });
    let p = world.add_player("eater");
    let cell = world
        .add_node(Node::player_cell(p, Vec2::ZERO, 40.0))
        .expect("cell");
    let food = world
        .add_node(Node::new(NodeKind::Food, Vec2::new(10.0, 0.0), 15.0))
        .expect("food");
    let before = world.node(cell).expect("cell").mass() + world.node(food).expect("food").mass();

    world.step();
    assert!(world.node(food).is_none());
    assert!((world.node(cell).expect("cell").mass() - before).abs() < 1e-3);

    let events = world.drain_events();
    assert!(events.contains(&SimEvent::Eaten {
        eaten: food,
        eaten_kind: NodeKind::Food,
        eater: cell,
    }));
}

#[test]
fn test_player_cell_bursts_on_virus_and_keeps_its_mass() {
    let mut world = World::new(quiet_config());
    let p = world.add_player("popper");
    let cell = world
        .add_node(Node::player_cell(p, Vec2::ZERO, 300.0))
        .expect("cell");
    let virus = world
        .add_node(Node::new(NodeKind::Virus, Vec2::new(50.0, 0.0), 100.0))
        .expect("virus");
    let before = player_mass(&world, p) + world.node(virus).expect("virus").mass();

    world.step();
    assert!(world.node(virus).is_none());
    assert_eq!(world.player(p).expect("player").cells.len(), 15);
    assert!((player_mass(&world, p) - before).abs() < 0.5);

    let popped = world
        .drain_events()
        .into_iter()
        .find_map(|e| match e {
            SimEvent::VirusPopped { cell: c, pieces, .. } => Some((c, pieces)),
            _ => None,
        });
    assert_eq!(popped, Some((cell, 14)));
}

#[test]
fn test_split_conserves_mass_and_rejects_undersized() {
    let mut world = World::new(quiet_config());
    let p = world.add_player("splitter");
    let parent = world
        .add_node(Node::player_cell(p, Vec2::ZERO, 120.0))
        .expect("cell");
    let before = world.node(parent).expect("parent").mass();

    let child = world
        .split_player_cell(parent, 1.0, 60.0, 780.0)
        .expect("split");
    let after = world.node(parent).expect("parent").mass() + world.node(child).expect("child").mass();
    assert!((after - before).abs() < 1e-2);

    // Remaining parent mass is 84; shedding 80 would leave it under the minimum
    let snapshot = world.node(parent).expect("parent").clone();
    assert!(world.split_player_cell(parent, 1.0, 80.0, 780.0).is_none());
    let unchanged = world.node(parent).expect("parent");
    assert_eq!(unchanged.size(), snapshot.size());
    assert_eq!(unchanged.position, snapshot.position);
    assert_eq!(world.player(p).expect("player").cells.len(), 2);
}

#[test]
fn test_teammates_exempt_during_grace_then_rigid() {
    let mut world = World::new(Config {
        game_mode: GameModeKind::Teams,
        team_count: 1,
        ..quiet_config()
    });
    let a = world.add_player("a");
    let b = world.add_player("b");
    let big = world
        .add_node(Node::player_cell(a, Vec2::ZERO, 200.0))
        .expect("cell");
    let small = world
        .add_node(Node::player_cell(b, Vec2::new(30.0, 0.0), 40.0))
        .expect("cell");

    for _ in 0..12 {
        world.step();
        let d = world
            .node(big)
            .expect("big")
            .position
            .distance(world.node(small).expect("small").position);
        assert!((d - 30.0).abs() < 1e-4, "no push or eat inside the grace period");
    }

    world.step();
    world.step();
    assert!(world.node(small).is_some(), "teammates never eat each other");
    let d = world
        .node(big)
        .expect("big")
        .position
        .distance(world.node(small).expect("small").position);
    assert!(d >= 239.9, "pushed apart once the grace period ends, got {d}");
}

#[test]
fn test_invariants_hold_under_play() {
    let mut world = World::new(Config {
        food_amount: 300,
        virus_amount: 10,
        border_width: 3000.0,
        border_height: 3000.0,
        player_max_cells: 8,
        ..Config::default()
    });
    world.populate();
    let players: Vec<u32> = (0..4).map(|i| world.add_player(format!("p{i}"))).collect();
    for &p in &players {
        world.player_mut(p).expect("player").spawn_size = Some(150.0);
        world.request_spawn(p).expect("spawned");
    }

    for t in 0..600u64 {
        for (i, &p) in players.iter().enumerate() {
            let angle = (t as f32 * 0.05) + i as f32;
            world.latch_input(
                p,
                PlayerInput {
                    target: Some(Vec2::new(angle.cos(), angle.sin()) * 800.0),
                    split: t % 97 == i as u64,
                    eject: t % 13 == i as u64,
                    ..Default::default()
                },
            );
        }
        world.step();

        let min = world.config.player_min_size;
        for node in world.registry.iter() {
            let expected = (node.mass() * 100.0).sqrt();
            assert!((node.size() - expected).abs() <= node.size() * 1e-4);
            if node.kind == NodeKind::PlayerCell {
                assert!(node.size() >= min - 1e-3, "cell {} below minimum", node.id);
                assert!(node.owner.is_some());
            }
            let bounds = world.registry.index().item_bounds(node.id);
            assert_eq!(bounds, Some(node.bounds), "index out of sync for {}", node.id);
        }
        for player in world.players.values() {
            assert!(player.cells.len() <= world.config.max_cells(player.privileged));
        }
    }
}

#[test]
fn test_same_seed_same_outcome() {
    let run = || {
        let mut world = World::new(Config {
            food_amount: 200,
            virus_amount: 5,
            border_width: 2000.0,
            border_height: 2000.0,
            ..Config::default()
        });
        world.populate();
        let p = world.add_player("det");
        world.player_mut(p).expect("player").spawn_size = Some(120.0);
        world.request_spawn(p);
        for t in 0..200u64 {
            world.latch_input(
                p,
                PlayerInput {
                    target: Some(Vec2::new(t as f32, -(t as f32))),
                    split: t == 50,
                    eject: t % 20 == 0,
                    ..Default::default()
                },
            );
            world.step();
        }
        world
            .registry
            .iter()
            .map(|n| (n.id, n.position, n.size()))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_scheduler_survives_long_stall() {
    let mut world = World::new(quiet_config());
    let mut scheduler = TickScheduler::new(0.0);
    let mut clock = 0.0;

    let drive = |world: &mut World, scheduler: &mut TickScheduler, until: f64, clock: &mut f64| {
        let mut steps = 0;
        while *clock < until {
            while scheduler.poll(*clock) == Poll::Step {
                world.step();
                steps += 1;
            }
            *clock += 1.0;
        }
        steps
    };

    let warmup = drive(&mut world, &mut scheduler, 400.0, &mut clock);
    assert_eq!(warmup, 10);

    // The process freezes for five seconds
    clock += 5000.0;
    let after_stall = drive(&mut world, &mut scheduler, clock + 1.0, &mut clock);
    assert_eq!(after_stall, 1, "no backlog replay, let alone ~125 steps");
    assert_eq!(scheduler.stalls(), 1);

    let resumed = drive(&mut world, &mut scheduler, clock + 400.0, &mut clock);
    assert!((9..=11).contains(&resumed));
    assert_eq!(world.tick, scheduler.steps());
}

#[test]
fn test_spawn_from_idle_ejected_mass() {
    let mut world = World::new(Config {
        eject_spawn_percent: 1.0,
        ..quiet_config()
    });
    let eject = world
        .add_node(Node::new(NodeKind::EjectedMass, Vec2::new(400.0, 400.0), 36.06))
        .expect("eject");
    let p = world.add_player("recycled");
    let cell = world.request_spawn(p).expect("spawned");

    let node = world.node(cell).expect("cell");
    assert_eq!(node.position, Vec2::new(400.0, 400.0));
    let size = (36.06f32 * 1.15).max(world.config.player_start_size);
    assert!((node.size() - size).abs() < 1e-3);
    let total = node.mass() + world.node(eject).expect("eject left in place").mass();

    // The recycled mass is eaten by the new cell, not lost
    world.step();
    assert!(world.node(eject).is_none());
    assert!((world.node(cell).expect("cell").mass() - total).abs() < 1e-3);
    assert!(world.drain_events().contains(&SimEvent::Eaten {
        eaten: eject,
        eaten_kind: NodeKind::EjectedMass,
        eater: cell,
    }));
    assert!(size_to_mass(size) > 10.0);
}
