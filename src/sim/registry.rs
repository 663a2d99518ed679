//! Authoritative node set, kept in step with the spatial index
//!
//! Removal tombstones a node and takes it out of the index and partitions at
//! once, but the node body stays reachable by id until [`NodeRegistry::purge`]
//! runs at the end of the tick. Ids buffered earlier in the same tick therefore
//! always resolve, and callers check `removed` before acting on them.

use std::collections::HashMap;

use super::node::{Node, NodeId, NodeKind};
use super::quadtree::{Bounds, QuadTree};

#[derive(Debug, Clone)]
pub struct NodeRegistry {
    nodes: HashMap<NodeId, Node>,
    next_id: NodeId,
    /// Insertion-ordered partitions by kind
    food: Vec<NodeId>,
    viruses: Vec<NodeId>,
    ejected: Vec<NodeId>,
    player_cells: Vec<NodeId>,
    /// Unowned nodes with an active boost
    moving: Vec<NodeId>,
    /// Tombstoned this tick, dropped on purge
    graveyard: Vec<NodeId>,
    index: QuadTree,
}

impl NodeRegistry {
    pub fn new(border: Bounds) -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 1,
            food: Vec::new(),
            viruses: Vec::new(),
            ejected: Vec::new(),
            player_cells: Vec::new(),
            moving: Vec::new(),
            graveyard: Vec::new(),
            index: QuadTree::new(border),
        }
    }

    /// Register a node: assign its id, index it and file it by kind
    pub fn add(&mut self, mut node: Node) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;

        node.id = id;
        node.removed = false;
        node.bounds = node.compute_bounds();
        self.index.insert(id, node.bounds);
        self.partition_mut(node.kind).push(id);
        if node.owner.is_none() && node.boost.is_active() {
            self.moving.push(id);
        }
        self.nodes.insert(id, node);
        id
    }

    /// Tombstone a node and unlink it from the index and partitions.
    /// Returns the removed node, or `None` if it was absent or already removed.
    pub fn remove(&mut self, id: NodeId) -> Option<&Node> {
        let kind = {
            let node = self.nodes.get_mut(&id)?;
            if node.removed {
                return None;
            }
            node.removed = true;
            node.kind
        };
        self.index.remove(id);
        Self::unlink(self.partition_mut(kind), id);
        Self::unlink(&mut self.moving, id);
        self.graveyard.push(id);
        self.nodes.get(&id)
    }

    fn unlink(list: &mut Vec<NodeId>, id: NodeId) {
        if let Some(pos) = list.iter().position(|&n| n == id) {
            list.remove(pos);
        }
    }

    /// Drop tombstoned nodes. Runs once per tick after every pass is done.
    pub fn purge(&mut self) {
        for id in self.graveyard.drain(..) {
            self.nodes.remove(&id);
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Node exists and is not tombstoned
    pub fn get_live(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id).filter(|n| !n.removed)
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.get_live(id).is_some()
    }

    /// Two live nodes at once
    pub fn pair_mut(&mut self, a: NodeId, b: NodeId) -> Option<(&mut Node, &mut Node)> {
        if a == b {
            return None;
        }
        let [na, nb] = self.nodes.get_disjoint_mut([&a, &b]);
        match (na, nb) {
            (Some(na), Some(nb)) if !na.removed && !nb.removed => Some((na, nb)),
            _ => None,
        }
    }

    /// Re-sync a node's index entry after its position or size changed
    pub fn refresh(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.removed {
            return;
        }
        node.bounds = node.compute_bounds();
        self.index.update(id, node.bounds);
    }

    /// Drop nodes whose boost has run out from the moving list
    pub fn retain_moving(&mut self) {
        let nodes = &self.nodes;
        self.moving
            .retain(|id| nodes.get(id).is_some_and(|n| !n.removed && n.boost.is_active()));
    }

    pub fn ids(&self, kind: NodeKind) -> &[NodeId] {
        match kind {
            NodeKind::Food => &self.food,
            NodeKind::Virus => &self.viruses,
            NodeKind::EjectedMass => &self.ejected,
            NodeKind::PlayerCell => &self.player_cells,
        }
    }

    pub fn moving(&self) -> &[NodeId] {
        &self.moving
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.ids(kind).len()
    }

    /// Live node count across all kinds
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Live nodes in insertion order, kind by kind
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        NodeKind::ALL
            .into_iter()
            .flat_map(move |kind| self.ids(kind).iter())
            .filter_map(move |id| self.nodes.get(id))
    }

    /// Visit every live node whose box may intersect `region`
    pub fn query(&self, region: &Bounds, visit: impl FnMut(NodeId)) {
        self.index.query(region, visit);
    }

    /// Live node ids whose box may intersect `region`
    pub fn query_ids(&self, region: &Bounds) -> Vec<NodeId> {
        self.index.collect(region)
    }

    /// Whether any live node of `kind` has a box intersecting `region`
    pub fn any_of_kind(&self, region: &Bounds, kind: NodeKind) -> bool {
        self.index
            .find(region, |id| self.nodes.get(&id).is_some_and(|n| n.kind == kind))
    }

    pub fn index(&self) -> &QuadTree {
        &self.index
    }

    fn partition_mut(&mut self, kind: NodeKind) -> &mut Vec<NodeId> {
        match kind {
            NodeKind::Food => &mut self.food,
            NodeKind::Virus => &mut self.viruses,
            NodeKind::EjectedMass => &mut self.ejected,
            NodeKind::PlayerCell => &mut self.player_cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn registry() -> NodeRegistry {
        NodeRegistry::new(Bounds::new(Vec2::splat(-500.0), Vec2::splat(500.0)))
    }

    #[test]
    fn test_add_indexes_and_partitions() {
        let mut reg = registry();
        let food = reg.add(Node::new(NodeKind::Food, Vec2::new(10.0, 10.0), 10.0));
        let cell = reg.add(Node::player_cell(1, Vec2::new(-100.0, 0.0), 40.0));

        assert_ne!(food, cell);
        assert_eq!(reg.count(NodeKind::Food), 1);
        assert_eq!(reg.count(NodeKind::PlayerCell), 1);
        assert_eq!(reg.len(), 2);
        assert_eq!(
            reg.query_ids(&Bounds::around(Vec2::new(10.0, 10.0), 1.0)),
            vec![food]
        );
    }

    #[test]
    fn test_remove_tombstones_until_purge() {
        let mut reg = registry();
        let id = reg.add(Node::new(NodeKind::Virus, Vec2::ZERO, 100.0));

        assert!(reg.remove(id).is_some());
        assert!(reg.remove(id).is_none(), "second removal is a no-op");
        assert!(reg.get(id).is_some_and(|n| n.removed));
        assert!(!reg.is_live(id));
        assert_eq!(reg.count(NodeKind::Virus), 0);
        assert!(reg.query_ids(&Bounds::around(Vec2::ZERO, 5.0)).is_empty());

        reg.purge();
        assert!(reg.get(id).is_none());
    }

    #[test]
    fn test_moving_list() {
        let mut reg = registry();
        let mut eject = Node::new(NodeKind::EjectedMass, Vec2::ZERO, 36.0);
        eject.set_boost(780.0, 0.0);
        let id = reg.add(eject);
        assert_eq!(reg.moving(), &[id]);

        // Owned nodes boost in the player pass instead
        let mut cell = Node::player_cell(1, Vec2::ZERO, 40.0);
        cell.set_boost(780.0, 0.0);
        reg.add(cell);
        assert_eq!(reg.moving().len(), 1);

        if let Some(node) = reg.get_mut(id) {
            node.boost.stop();
        }
        reg.retain_moving();
        assert!(reg.moving().is_empty());
    }

    #[test]
    fn test_refresh_follows_position() {
        let mut reg = registry();
        let id = reg.add(Node::new(NodeKind::Food, Vec2::ZERO, 10.0));
        if let Some(node) = reg.get_mut(id) {
            node.position = Vec2::new(300.0, 300.0);
        }
        reg.refresh(id);
        assert!(reg.query_ids(&Bounds::around(Vec2::ZERO, 1.0)).is_empty());
        assert_eq!(
            reg.query_ids(&Bounds::around(Vec2::new(300.0, 300.0), 1.0)),
            vec![id]
        );
    }

    #[test]
    fn test_pair_mut() {
        let mut reg = registry();
        let a = reg.add(Node::new(NodeKind::Food, Vec2::ZERO, 10.0));
        let b = reg.add(Node::new(NodeKind::Food, Vec2::ONE, 10.0));
        assert!(reg.pair_mut(a, b).is_some());
        assert!(reg.pair_mut(a, a).is_none());
        reg.remove(b);
        assert!(reg.pair_mut(a, b).is_none());
    }
}
