//! Split, eject, auto-split, decay, spawning and virus pops
//!
//! Every operation that would push a cell under the minimum size, or a player
//! over its cell cap, returns early and leaves the world untouched.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::node::{Node, NodeId, NodeKind, PlayerId};
use super::player::Player;
use super::world::{SimEvent, World};
use crate::consts::*;
use crate::{direction_to_angle, mass_to_size, size_to_mass};

/// Shed `mass` from `parent` into a new cell launched along `angle`.
///
/// Launch distance is `speed · size^0.0122` of the new piece. Returns the new
/// cell, or `None` (world unchanged) when the owner is at its cell cap or
/// either side would end up under the minimum size.
pub fn split_player_cell(
    world: &mut World,
    parent: NodeId,
    angle: f32,
    mass: f32,
    speed: f32,
) -> Option<NodeId> {
    let node = world.registry.get_live(parent)?;
    let owner = node.owner?;
    let player = world.players.get(&owner)?;
    if player.cells.len() >= world.config.max_cells(player.privileged) {
        return None;
    }

    let min = world.config.player_min_size;
    let size = mass_to_size(mass);
    let remaining_sq = node.size_sq() - size * size;
    if !mass.is_finite() || mass <= 0.0 || size < min || remaining_sq < min * min {
        return None;
    }
    let position = node.position;

    if let Some(node) = world.registry.get_mut(parent) {
        node.set_size(remaining_sq.sqrt());
    }
    world.registry.refresh(parent);

    let mut cell = Node::player_cell(owner, position, size);
    cell.set_boost(speed * size.powf(SPLIT_SPEED_EXPONENT), angle);
    let id = world.add_node(cell)?;
    log::debug!("Player {owner} split cell {parent} -> {id} ({mass:.1} mass)");
    Some(id)
}

/// Split every cell of a player large enough to split, toward the cursor.
/// Returns the number of new cells.
pub fn split_cells(world: &mut World, player: PlayerId) -> usize {
    let tick = world.tick;
    let cooldown = world.config.split_cooldown;
    let speed = world.config.split_velocity;
    let Some(p) = world.players.get_mut(&player) else {
        return 0;
    };
    if p.frozen || p.spectating || !Player::try_cooldown(&mut p.last_split, tick, cooldown) {
        return 0;
    }
    let target = p.target;
    let cells = p.cells.clone();

    let mut split = 0;
    for id in cells {
        let Some(node) = world.registry.get_live(id) else {
            continue;
        };
        if node.size() < world.config.player_min_split_size {
            continue;
        }
        let mut d = target.unwrap_or(node.position) - node.position;
        if d.length_squared() < 1.0 {
            d = Vec2::X;
        }
        let mass = node.mass() * 0.5;
        if split_player_cell(world, id, direction_to_angle(d), mass, speed).is_some() {
            split += 1;
        }
    }
    split
}

/// Eject mass from every cell of a player large enough to eject.
/// Returns the number of ejected nodes.
pub fn eject_mass(world: &mut World, player: PlayerId) -> usize {
    let tick = world.tick;
    let cooldown = world.config.eject_cooldown;
    let Some(p) = world.players.get_mut(&player) else {
        return 0;
    };
    if p.frozen || p.spectating || !Player::try_cooldown(&mut p.last_eject, tick, cooldown) {
        return 0;
    }
    let target = p.target;
    let cells = p.cells.clone();

    let min = world.config.player_min_size;
    let loss = world.config.eject_size_loss;
    let size = world.config.eject_size;
    let speed = world.config.eject_velocity;
    let kind = if world.config.eject_virus {
        NodeKind::Virus
    } else {
        NodeKind::EjectedMass
    };

    let mut ejected = 0;
    for id in cells {
        let Some(node) = world.registry.get_live(id) else {
            continue;
        };
        if node.size() < world.config.player_min_eject_size {
            continue;
        }
        let remaining_sq = node.size_sq() - loss * loss;
        if remaining_sq < min * min {
            continue;
        }

        let position = node.position;
        let d = target.unwrap_or(position) - position;
        let dist = d.length();
        let dir = if dist > 1.0 { d / dist } else { Vec2::X };

        let Some(node) = world.registry.get_mut(id) else {
            continue;
        };
        node.set_size(remaining_sq.sqrt());
        let spawn_at = position + dir * node.size();
        world.registry.refresh(id);

        let jitter = world.rng.random_range(-EJECT_ANGLE_JITTER..EJECT_ANGLE_JITTER);
        let mut eject = Node::new(kind, spawn_at, size);
        eject.set_boost(speed, direction_to_angle(dir) + jitter);
        if world.add_node(eject).is_some() {
            ejected += 1;
        }
    }
    if ejected > 0 {
        log::debug!("Player {player} ejected {ejected} {}", kind.as_str());
    }
    ejected
}

/// Split or clamp every player cell above its owner's size limit
pub fn auto_split(world: &mut World) {
    let speed = world.config.split_velocity;
    for id in world.registry.ids(NodeKind::PlayerCell).to_vec() {
        let Some(node) = world.registry.get_live(id) else {
            continue;
        };
        let Some(player) = node.owner.and_then(|o| world.players.get(&o)) else {
            continue;
        };
        let max_size = world.config.max_size(player.privileged);
        if player.merge_override || node.size() < max_size {
            continue;
        }

        let at_cap = player.cells.len() >= world.config.max_cells(player.privileged);
        if at_cap || world.config.mobile_physics {
            if let Some(node) = world.registry.get_mut(id) {
                node.set_size(max_size);
            }
            world.registry.refresh(id);
        } else {
            let mass = node.mass() * 0.5;
            let angle = world.rng.random::<f32>() * TAU;
            split_player_cell(world, id, angle, mass, speed);
        }
    }
}

/// Shrink every player cell once; never below the minimum size
pub fn decay(world: &mut World) {
    let base_rate = world.config.player_decay_rate;
    if base_rate <= 0.0 {
        return;
    }
    let cap = world.config.player_decay_cap;
    let min = world.config.player_min_size;
    let modifier = world.mode.decay_modifier();

    for id in world.registry.ids(NodeKind::PlayerCell).to_vec() {
        let Some(node) = world.registry.get_mut(id) else {
            continue;
        };
        if node.removed || node.size() <= min {
            continue;
        }
        let rate = if cap > 0.0 && node.mass() > cap {
            base_rate * DECAY_CAP_MULTIPLIER
        } else {
            base_rate
        };
        let factor = 1.0 - rate * modifier;
        let mass = (node.mass() * factor).max(size_to_mass(min));
        node.set_mass(mass);
        world.registry.refresh(id);
    }
}

/// Food at a random position, sized between the food min and max
pub fn spawn_food(world: &mut World) -> Option<NodeId> {
    let position = world.random_position();
    let mut size = world.config.food_min_size;
    if world.config.food_mass_grow {
        size += (world.config.food_max_size - size) * world.rng.random::<f32>();
    }
    world.add_node(Node::new(NodeKind::Food, position, size))
}

/// Virus at a random position clear of every player cell.
/// Gives up after the configured number of probes.
pub fn spawn_virus(world: &mut World) -> Option<NodeId> {
    let size = world.config.virus_min_size;
    for _ in 0..world.config.virus_spawn_attempts.max(1) {
        let position = world.random_position();
        if !world.will_collide(position, size) {
            return world.add_node(Node::new(NodeKind::Virus, position, size));
        }
    }
    log::warn!(
        "No free spot for a virus after {} attempts",
        world.config.virus_spawn_attempts
    );
    None
}

/// Shoot child viruses from `origin`, one per angle, while their combined
/// mass stays within `mass_budget`.
pub fn shoot_virus(world: &mut World, origin: Vec2, angles: &[f32], mass_budget: f32) -> Vec<NodeId> {
    let size = world.config.virus_min_size;
    let child_mass = size_to_mass(size);
    let mut spent = 0.0;
    let mut children = Vec::new();
    for &angle in angles {
        if spent + child_mass > mass_budget {
            break;
        }
        let mut virus = Node::new(NodeKind::Virus, origin, size);
        virus.set_boost(world.config.virus_velocity, angle);
        if let Some(id) = world.add_node(virus) {
            spent += child_mass;
            children.push(id);
        }
    }
    children
}

/// A virus that has grown to its maximum size resets to its minimum and
/// shoots a child along the direction of the mass that filled it.
pub fn virus_overflow(world: &mut World, virus: NodeId, direction: Vec2) {
    let Some(node) = world.registry.get_live(virus) else {
        return;
    };
    if node.size() < world.config.virus_max_size {
        return;
    }
    let pre_pop_mass = node.mass();
    let origin = node.position;

    let min = world.config.virus_min_size;
    if let Some(node) = world.registry.get_mut(virus) {
        node.set_size(min);
    }
    world.registry.refresh(virus);

    let angle = if direction == Vec2::ZERO {
        0.0
    } else {
        direction_to_angle(direction)
    };
    for child in shoot_virus(world, origin, &[angle], pre_pop_mass) {
        log::debug!("Virus {virus} shot {child}");
        world.emit(SimEvent::VirusShot {
            parent: virus,
            child,
        });
    }
}

/// Masses of the pieces a cell of `mass` bursts into on a virus.
///
/// `cells_left` is how many more cells the owner may have; `split_min` is the
/// mass of the largest piece a pop may produce.
pub fn pop_masses(mass: f32, cells_left: usize, split_min: f32, equal: bool) -> Vec<f32> {
    if cells_left == 0 || mass <= 0.0 {
        return Vec::new();
    }

    if equal {
        let count = ((mass / split_min).floor() as usize).min(cells_left);
        let piece = mass / (1 + count) as f32;
        return vec![piece; count];
    }

    if mass / (cells_left as f32) < split_min {
        let mut count = 2;
        let mut piece = mass / count as f32;
        while piece > split_min && count * 2 < cells_left {
            count *= 2;
            piece = mass / count as f32;
        }
        let piece = mass / (count + 1) as f32;
        return vec![piece; count.min(cells_left)];
    }

    // Halving: each piece half the previous, until the rest must be shared out
    let mut pieces = Vec::with_capacity(cells_left);
    let mut piece = mass / 2.0;
    let mut left = mass / 2.0;
    let mut remaining = cells_left;
    while remaining > 0 {
        remaining -= 1;
        if remaining > 0 && left / (remaining as f32) < split_min {
            let share = left / remaining as f32;
            pieces.extend(std::iter::repeat_n(share, remaining));
            break;
        }
        while piece >= left && remaining > 0 {
            piece /= 2.0;
        }
        pieces.push(piece);
        left -= piece;
    }
    pieces
}

/// Burst a player cell that just ate a virus. Returns the number of pieces created.
pub fn pop_player_cell(world: &mut World, cell: NodeId) -> usize {
    let Some(node) = world.registry.get_live(cell) else {
        return 0;
    };
    let Some(player) = node.owner.and_then(|o| world.players.get(&o)) else {
        return 0;
    };
    let cells_left = world
        .config
        .virus_pop_max_cells()
        .saturating_sub(player.cells.len());
    let split_min = size_to_mass(world.config.virus_max_popped_size);
    let masses = pop_masses(
        node.mass(),
        cells_left,
        split_min,
        world.config.virus_equal_pop_size,
    );

    let speed = world.config.split_velocity;
    let mut pieces = 0;
    for mass in masses {
        let angle = world.rng.random::<f32>() * TAU;
        if split_player_cell(world, cell, angle, mass, speed).is_some() {
            pieces += 1;
        }
    }
    log::debug!("Cell {cell} popped into {pieces} pieces");
    pieces
}

/// Spawn a player's cell.
///
/// With the eject-spawn chance and an idle ejected mass at hand, the player
/// spawns on top of that mass, large enough to eat it. Otherwise it lands at
/// `position` or a random spot, re-rolled once if the spot overlaps a player
/// cell.
pub fn spawn_player(world: &mut World, player: PlayerId, position: Option<Vec2>) -> Option<NodeId> {
    let p = world.players.get(&player)?;
    let mut size = p.spawn_size.unwrap_or(world.config.player_start_size);
    let is_minion = p.is_minion;

    let mut position = position.unwrap_or_else(|| world.random_position());

    let ejected = world.registry.ids(NodeKind::EjectedMass);
    if !ejected.is_empty() {
        let pick = ejected[world.rng.random_range(0..ejected.len())];
        let roll = world.rng.random::<f32>();
        if roll <= world.config.eject_spawn_percent {
            // The mass stays put; the new cell outgrows it and eats it next tick
            if let Some(eject) = world.registry.get_live(pick).filter(|e| e.boost.distance < 1.0) {
                position = eject.position;
                size = size.max(eject.size() * EAT_SIZE_RATIO);
            }
        }
    }

    if world.will_collide(position, size) && !is_minion {
        position = world.random_position();
    }

    let id = world.add_node(Node::player_cell(player, position, size))?;
    if let Some(p) = world.players.get_mut(&player) {
        p.target = Some(position);
        p.spectating = false;
        log::info!("Player {} ({}) spawned at ({:.0}, {:.0})", p.id, p.name, position.x, position.y);
    }
    Some(id)
}
