//! Per-tick movement: boost integration, cursor-following, border clamping
//! and remerge eligibility.

use glam::Vec2;

use super::node::{Node, NodeId, NodeKind};
use super::quadtree::Bounds;
use super::world::World;
use crate::consts::*;

/// Per-tick speed cap of a player cell (larger cells move slower)
#[inline]
pub fn cell_speed(size: f32, player_speed: f32) -> f32 {
    2.2 * size.powf(-0.439) * 40.0 * player_speed
}

/// Keep a node's center inside the border inset by half its size, bouncing
/// any outward boost off the wall.
pub fn check_border(node: &mut Node, border: &Bounds) {
    let r = node.size() / 2.0;
    let min = border.min + Vec2::splat(r);
    let max = border.max - Vec2::splat(r);

    if node.position.x < min.x || node.position.x > max.x {
        if node.boost.is_active() {
            node.boost.direction.x = -node.boost.direction.x;
        }
        node.position.x = if min.x <= max.x {
            node.position.x.clamp(min.x, max.x)
        } else {
            border.center().x
        };
    }
    if node.position.y < min.y || node.position.y > max.y {
        if node.boost.is_active() {
            node.boost.direction.y = -node.boost.direction.y;
        }
        node.position.y = if min.y <= max.y {
            node.position.y.clamp(min.y, max.y)
        } else {
            border.center().y
        };
    }
}

/// Advance one node's boost by a ninth of the remaining distance.
/// Runs the border check and index refresh even when idle.
pub fn boost_node(world: &mut World, id: NodeId) {
    let border = world.border();
    let Some(node) = world.registry.get_mut(id) else {
        return;
    };
    if node.removed {
        return;
    }

    if node.boost.is_active() {
        let step = node.boost.distance / BOOST_DIVISOR;
        node.boost.distance -= step;
        node.position += node.boost.direction * step;
        if node.boost.distance < BOOST_STOP_DISTANCE {
            node.boost.stop();
        }
    }
    check_border(node, &border);
    world.registry.refresh(id);
}

/// Boost every unowned moving node
pub fn boost_moving(world: &mut World) {
    for id in world.registry.moving().to_vec() {
        boost_node(world, id);
    }
}

/// Move a player cell toward its owner's target, then apply its boost.
pub fn move_player_cell(world: &mut World, id: NodeId) {
    let player_speed = world.config.player_speed;
    let target = world
        .registry
        .get_live(id)
        .and_then(|n| n.owner)
        .and_then(|owner| world.players.get(&owner))
        .filter(|p| p.connected && !p.frozen)
        .and_then(|p| p.target);

    if let Some(target) = target {
        if let Some(node) = world.registry.get_mut(id) {
            let d = target - node.position;
            let dist = d.length();
            if dist > 0.0 {
                let speed = cell_speed(node.size(), player_speed);
                node.position += d * (dist.min(speed) / dist);
            }
        }
    }
    boost_node(world, id);
}

/// Movement for every player cell
pub fn move_player_cells(world: &mut World) {
    for id in world.registry.ids(NodeKind::PlayerCell).to_vec() {
        move_player_cell(world, id);
    }
}

/// Ticks a cell must live before it may remerge, when merging is not instant
#[inline]
pub fn remerge_age(recombine_time: f32, size: f32) -> f32 {
    recombine_time.max(size * REMERGE_SIZE_FACTOR) * TICKS_PER_SECOND as f32
}

/// Refresh `can_remerge` on every live player cell
pub fn update_remerge(world: &mut World) {
    let tick = world.tick;
    let time = world.config.player_recombine_time;
    for id in world.registry.ids(NodeKind::PlayerCell).to_vec() {
        let instant = world
            .registry
            .get(id)
            .and_then(|n| n.owner)
            .and_then(|owner| world.players.get(&owner))
            .is_some_and(|p| p.merges_instantly());
        let Some(node) = world.registry.get_mut(id) else {
            continue;
        };
        node.can_remerge = if time <= 0.0 || instant {
            node.boost.distance < INSTANT_MERGE_BOOST
        } else {
            node.age(tick) as f32 >= remerge_age(time, node.size())
        };
    }
}

/// Movement phase of a tick
pub fn step(world: &mut World) {
    boost_moving(world);
    move_player_cells(world);
    update_remerge(world);
}
