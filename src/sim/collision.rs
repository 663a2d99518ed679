//! Collision classification and resolution
//!
//! Two passes per tick. The moving pass resolves every contact of a boosting
//! unowned node immediately. The player pass resolves rigid pushes immediately
//! but buffers eat candidates until the whole pass has run, so who gets eaten
//! never depends on the order cells were visited in.

use glam::Vec2;

use super::lifecycle;
use super::node::{Node, NodeId, NodeKind};
use super::world::{SimEvent, World};
use crate::consts::EAT_SIZE_RATIO;

/// Contact between two nodes, captured when the pair was found
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manifold {
    pub a: NodeId,
    pub b: NodeId,
    /// Distance between centers
    pub distance: f32,
    /// `b.position - a.position`
    pub displacement: Vec2,
}

impl Manifold {
    pub fn between(a: &Node, b: &Node) -> Self {
        let displacement = b.position - a.position;
        Self {
            a: a.id,
            b: b.id,
            distance: displacement.length(),
            displacement,
        }
    }
}

/// How a player-pass contact is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Push apart now
    Rigid,
    /// Buffer for eat resolution after the pass
    Eat,
    /// Fresh split siblings or teammates: ignore entirely
    Exempt,
}

/// Classify a contact found in the player pass.
///
/// Same owner: exempt while either cell is inside the split grace period,
/// rigid while either cell cannot remerge yet, otherwise an eat (merge).
/// Different owners on the same team: exempt inside the grace period, rigid
/// after it, unless a minion is involved and minions ignore their team.
pub fn classify(world: &World, a: &Node, b: &Node) -> Interaction {
    let (Some(owner_a), Some(owner_b)) = (a.owner, b.owner) else {
        return Interaction::Eat;
    };
    let grace = world.config.split_grace_ticks();
    let young = a.age(world.tick) < grace || b.age(world.tick) < grace;

    if owner_a == owner_b {
        return if young {
            Interaction::Exempt
        } else if !a.can_remerge || !b.can_remerge {
            Interaction::Rigid
        } else {
            Interaction::Eat
        };
    }

    if !world.have_teams() {
        return Interaction::Eat;
    }
    let (Some(pa), Some(pb)) = (world.players.get(&owner_a), world.players.get(&owner_b)) else {
        return Interaction::Eat;
    };
    if pa.team.is_none() || pa.team != pb.team {
        return Interaction::Eat;
    }
    if (pa.is_minion || pb.is_minion) && !world.config.minion_collide_team {
        // Teammates never eat each other, so this pair passes through
        return Interaction::Eat;
    }
    if young {
        Interaction::Exempt
    } else {
        Interaction::Rigid
    }
}

/// Positions after pushing two overlapping circles apart.
///
/// Each side moves by the other side's share of the combined `size²`, so the
/// larger side moves less. `None` when there is no overlap or the centers
/// coincide.
pub fn rigid_push(a_pos: Vec2, a_size: f32, b_pos: Vec2, b_size: f32) -> Option<(Vec2, Vec2)> {
    let p = b_pos - a_pos;
    let d = p.length();
    if d == 0.0 {
        return None;
    }
    let push = (a_size + b_size - d) / d;
    if push <= 0.0 {
        return None;
    }
    let ra = a_size * a_size;
    let rb = b_size * b_size;
    let rt = ra + rb;
    Some((a_pos - p * (push * rb / rt), b_pos + p * (push * ra / rt)))
}

/// Push two nodes apart. Returns true if either moved.
pub fn resolve_rigid(world: &mut World, a: NodeId, b: NodeId) -> bool {
    let Some((na, nb)) = world.registry.pair_mut(a, b) else {
        return false;
    };
    let Some((pa, pb)) = rigid_push(na.position, na.size(), nb.position, nb.size()) else {
        return false;
    };
    na.position = pa;
    nb.position = pb;
    world.registry.refresh(a);
    world.registry.refresh(b);
    true
}

/// World-aware eat predicate on top of the kind rules table
pub fn can_eat(world: &World, eater: &Node, prey: &Node) -> bool {
    if !eater.kind.can_eat(prey.kind) {
        return false;
    }
    match eater.kind {
        NodeKind::Virus => world.registry.count(NodeKind::Virus) < world.config.virus_max_amount,
        NodeKind::PlayerCell => {
            if prey.kind != NodeKind::PlayerCell || !world.have_teams() {
                return true;
            }
            let team = |node: &Node| {
                node.owner
                    .and_then(|o| world.players.get(&o))
                    .and_then(|p| p.team)
            };
            eater.owner == prey.owner || team(eater).is_none() || team(eater) != team(prey)
        }
        NodeKind::Food | NodeKind::EjectedMass => false,
    }
}

/// Resolve a possible eat. Returns true if a node was eaten.
///
/// Records whose sides were tombstoned earlier in the tick are skipped.
pub fn resolve_eat(world: &mut World, m: &Manifold) -> bool {
    let (Some(a), Some(b)) = (world.registry.get(m.a), world.registry.get(m.b)) else {
        return false;
    };
    if a.removed || b.removed {
        return false;
    }
    let (small, big) = if a.size() > b.size() { (b, a) } else { (a, b) };

    if m.distance >= big.size() - small.size() / world.config.eat_divisor() {
        return false;
    }

    match (small.owner, big.owner) {
        (Some(x), Some(y)) if x == y => {
            let grace = world.config.split_grace_ticks();
            if small.age(world.tick) < grace || big.age(world.tick) < grace {
                return false;
            }
        }
        _ => {
            if big.size() < small.size() * EAT_SIZE_RATIO || !can_eat(world, big, small) {
                return false;
            }
        }
    }

    let (small, small_kind, big, big_kind) = (small.id, small.kind, big.id, big.kind);
    absorb(world, big, big_kind, small);
    on_eaten(world, small, small_kind, big, big_kind);
    if let Some(node) = world.registry.get_mut(small) {
        node.killer = Some(big);
    }
    world.remove_node(small);
    world.emit(SimEvent::Eaten {
        eaten: small,
        eaten_kind: small_kind,
        eater: big,
    });
    true
}

/// Eater-side effect: gain the prey's mass
fn absorb(world: &mut World, eater: NodeId, eater_kind: NodeKind, prey: NodeId) {
    let Some((prey_size_sq, prey_direction)) = world
        .registry
        .get(prey)
        .map(|n| (n.size_sq(), n.boost.direction))
    else {
        return;
    };
    if let Some(node) = world.registry.get_mut(eater) {
        node.set_size((node.size_sq() + prey_size_sq).sqrt());
    }
    world.registry.refresh(eater);

    if eater_kind == NodeKind::Virus {
        lifecycle::virus_overflow(world, eater, prey_direction);
    }
}

/// Prey-side effect: a virus bursts the player cell that ate it
fn on_eaten(world: &mut World, prey: NodeId, prey_kind: NodeKind, eater: NodeId, eater_kind: NodeKind) {
    if prey_kind == NodeKind::Virus && eater_kind == NodeKind::PlayerCell {
        let pieces = lifecycle::pop_player_cell(world, eater);
        world.emit(SimEvent::VirusPopped {
            virus: prey,
            cell: eater,
            pieces,
        });
    }
}

/// Contacts of `id` with every other live node whose box overlaps its own
fn contacts(world: &World, id: NodeId) -> Vec<Manifold> {
    let Some(node) = world.registry.get_live(id) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    world.registry.query(&node.bounds, |other| {
        if other == id {
            return;
        }
        if let Some(check) = world.registry.get_live(other) {
            out.push(Manifold::between(node, check));
        }
    });
    out
}

/// Resolve every contact of the boosting unowned nodes
pub fn moving_pass(world: &mut World) {
    let mobile = world.config.mobile_physics;
    for id in world.registry.moving().to_vec() {
        for m in contacts(world, id) {
            if !world.registry.is_live(id) {
                break;
            }
            let same_rigid_kind = match (world.registry.get_live(m.a), world.registry.get_live(m.b)) {
                (Some(a), Some(b)) => a.kind == b.kind && a.kind.rules().rigid_with_own_kind,
                _ => continue,
            };
            if same_rigid_kind && !mobile {
                resolve_rigid(world, m.a, m.b);
            } else {
                resolve_eat(world, &m);
            }
        }
    }
    world.registry.retain_moving();
}

/// Player-cell pass: rigid now, eats after the pass
pub fn player_pass(world: &mut World) {
    let mut eats = Vec::new();
    for id in world.registry.ids(NodeKind::PlayerCell).to_vec() {
        if !world.registry.is_live(id) {
            continue;
        }
        let region = match world.registry.get_live(id) {
            Some(node) => node.bounds,
            None => continue,
        };
        for other in world.registry.query_ids(&region) {
            if other == id {
                continue;
            }
            let (Some(a), Some(b)) = (world.registry.get_live(id), world.registry.get_live(other))
            else {
                continue;
            };
            match classify(world, a, b) {
                Interaction::Rigid => {
                    resolve_rigid(world, id, other);
                }
                Interaction::Eat => eats.push(Manifold::between(a, b)),
                Interaction::Exempt => {}
            }
        }
    }

    for m in &eats {
        resolve_eat(world, m);
    }
}
