//! Fixed timestep simulation tick
//!
//! One call advances the world by exactly one step. Order matters and is fixed:
//! movement, moving-node collisions, player-cell collisions, auto-split,
//! periodic decay, the game-mode hook, the tick counter, the per-player update
//! phase, the periodic leaderboard and finally the purge of tombstoned nodes.

use std::collections::BTreeSet;

use glam::Vec2;

use super::collision;
use super::lifecycle;
use super::node::{NodeId, NodeKind, PlayerId};
use super::physics;
use super::player::{PlayerInput, ViewDelta};
use super::quadtree::Bounds;
use super::world::World;
use crate::consts::*;

/// Advance the world by one fixed step
pub fn tick(world: &mut World) {
    physics::step(world);
    collision::moving_pass(world);
    collision::player_pass(world);

    lifecycle::auto_split(world);
    if (world.tick + DECAY_TICK_OFFSET) % TICKS_PER_SECOND == 0 {
        lifecycle::decay(world);
    }

    world.with_game_mode(|mode, world| mode.on_tick(world));
    world.tick += 1;

    update_players(world);

    if (world.tick + LEADERBOARD_TICK_OFFSET) % TICKS_PER_SECOND == 0 {
        world.leaderboard = world.mode.update_leaderboard(world);
    }

    world.registry.purge();
}

/// Per-player update phase: liveness, latched input, stats and visibility
pub fn update_players(world: &mut World) {
    let ids: Vec<PlayerId> = world.players.keys().copied().collect();
    for id in ids {
        if !check_connection(world, id) {
            continue;
        }
        apply_input(world, id);
        update_stats(world, id);
        update_view(world, id);
    }
}

/// Drop a player whose disconnect grace has run out. Returns false if it was dropped.
fn check_connection(world: &mut World, id: PlayerId) -> bool {
    let Some(player) = world.players.get(&id) else {
        return false;
    };
    if player.connected {
        return true;
    }
    let since = player.disconnected_at.unwrap_or(world.tick);
    let linger = world.config.player_disconnect_time * TICKS_PER_SECOND;
    if world.tick.saturating_sub(since) >= linger {
        world.remove_player(id);
        return false;
    }
    true
}

/// Consume the input latched since the last update, exactly once
fn apply_input(world: &mut World, id: PlayerId) {
    let Some(player) = world.players.get_mut(&id) else {
        return;
    };
    let input = std::mem::take(&mut player.input);
    if !player.connected {
        return;
    }
    let PlayerInput {
        target,
        split,
        eject,
        toggle_minion_control,
        spectate,
    } = input;

    if target.is_some() {
        player.target = target;
    }
    if toggle_minion_control {
        player.minion_control = !player.minion_control;
        log::debug!("Player {} minion control {}", id, player.minion_control);
    }
    if spectate && !player.is_alive() {
        player.spectating = true;
    }

    let minion_control = player.minion_control;
    if split {
        if minion_control {
            player.minion_split = true;
        } else {
            lifecycle::split_cells(world, id);
        }
    }
    if eject {
        if minion_control {
            if let Some(player) = world.players.get_mut(&id) {
                player.minion_eject = true;
            }
        } else {
            lifecycle::eject_mass(world, id);
        }
    }
}

/// Recompute score, total size and mass-weighted center
fn update_stats(world: &mut World, id: PlayerId) {
    let Some(player) = world.players.get(&id) else {
        return;
    };
    let mut mass = 0.0;
    let mut size = 0.0;
    let mut weighted = Vec2::ZERO;
    for node in player.cells.iter().filter_map(|&c| world.registry.get_live(c)) {
        mass += node.mass();
        size += node.size();
        weighted += node.position * node.mass();
    }
    let Some(player) = world.players.get_mut(&id) else {
        return;
    };
    player.score = mass;
    player.total_size = size;
    if mass > 0.0 {
        player.center = weighted / mass;
    }
}

/// Half-extents of the view box for a player whose cells sum to `total_size`
pub fn view_half_extents(total_size: f32) -> Vec2 {
    let scale = if total_size > 0.0 {
        (64.0 / total_size).min(1.0).powf(0.4)
    } else {
        1.0
    };
    Vec2::new(VIEW_BASE_WIDTH, VIEW_BASE_HEIGHT) / scale * 0.5
}

/// Diff the visible node set against the previous update
fn update_view(world: &mut World, id: PlayerId) {
    let Some(player) = world.players.get(&id) else {
        return;
    };
    let region = Bounds::centered(player.center, view_half_extents(player.total_size));
    let mut visible = BTreeSet::new();
    world.registry.query(&region, |n| {
        visible.insert(n);
    });

    let delta = diff_view(world, &player.visible, &visible);
    if let Some(player) = world.players.get_mut(&id) {
        player.visible = visible;
        player.view = delta;
    }
}

fn diff_view(world: &World, old: &BTreeSet<NodeId>, new: &BTreeSet<NodeId>) -> ViewDelta {
    ViewDelta {
        added: new.difference(old).copied().collect(),
        removed: old.difference(new).copied().collect(),
        updated: new
            .intersection(old)
            .copied()
            .filter(|&n| {
                world
                    .registry
                    .get_live(n)
                    .is_some_and(|node| node.kind != NodeKind::Food)
            })
            .collect(),
    }
}
