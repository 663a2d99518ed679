//! Quad-tree spatial index over axis-aligned bounding boxes
//!
//! Bounds are fixed to the world border for the lifetime of the tree. Items are
//! stored in the deepest quad that fully contains their box; boxes straddling a
//! split line stay in the parent. Queries return a conservative superset of the
//! items whose box may intersect the region, so callers re-check exact geometry.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// Items a quad holds before it splits
const MAX_ITEMS: usize = 64;
/// Quads at this depth never split
const MAX_DEPTH: u32 = 12;

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Square box of half-extent `half` around `center`
    #[inline]
    pub fn around(center: Vec2, half: f32) -> Self {
        Self::new(center - Vec2::splat(half), center + Vec2::splat(half))
    }

    /// Box centered on `center` with the given half-extents
    #[inline]
    pub fn centered(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Boxes overlap or touch
    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// `other` lies entirely inside `self`
    #[inline]
    pub fn contains(&self, other: &Bounds) -> bool {
        other.min.x >= self.min.x
            && other.max.x <= self.max.x
            && other.min.y >= self.min.y
            && other.max.y <= self.max.y
    }

    #[inline]
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// The four quadrants: top-left, top-right, bottom-left, bottom-right
    fn quadrants(&self) -> [Bounds; 4] {
        let c = self.center();
        [
            Bounds::new(self.min, c),
            Bounds::new(Vec2::new(c.x, self.min.y), Vec2::new(self.max.x, c.y)),
            Bounds::new(Vec2::new(self.min.x, c.y), Vec2::new(c.x, self.max.y)),
            Bounds::new(c, self.max),
        ]
    }
}

#[derive(Debug, Clone)]
struct Quad {
    bounds: Bounds,
    depth: u32,
    children: Option<[usize; 4]>,
    items: Vec<(NodeId, Bounds)>,
}

impl Quad {
    fn new(bounds: Bounds, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            children: None,
            items: Vec::new(),
        }
    }
}

/// Spatial index mapping node ids to their bounding boxes
#[derive(Debug, Clone)]
pub struct QuadTree {
    quads: Vec<Quad>,
    /// Quad currently holding each item
    locations: HashMap<NodeId, usize>,
}

impl QuadTree {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            quads: vec![Quad::new(bounds, 0)],
            locations: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.locations.contains_key(&id)
    }

    /// Stored box for an item
    pub fn item_bounds(&self, id: NodeId) -> Option<Bounds> {
        let quad = *self.locations.get(&id)?;
        self.quads[quad]
            .items
            .iter()
            .find(|(item, _)| *item == id)
            .map(|(_, b)| *b)
    }

    /// Insert an item. An id already present is moved to the new box.
    pub fn insert(&mut self, id: NodeId, bounds: Bounds) {
        if self.locations.contains_key(&id) {
            self.remove(id);
        }

        let mut index = 0;
        loop {
            match self.quads[index].children {
                Some(children) => {
                    match children
                        .iter()
                        .copied()
                        .find(|&c| self.quads[c].bounds.contains(&bounds))
                    {
                        Some(child) => index = child,
                        None => break,
                    }
                }
                None => break,
            }
        }

        self.quads[index].items.push((id, bounds));
        self.locations.insert(id, index);

        let quad = &self.quads[index];
        if quad.children.is_none() && quad.items.len() > MAX_ITEMS && quad.depth < MAX_DEPTH {
            self.split(index);
        }
    }

    /// Remove an item. Returns false if it was not present.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(index) = self.locations.remove(&id) else {
            return false;
        };
        let items = &mut self.quads[index].items;
        if let Some(pos) = items.iter().position(|(item, _)| *item == id) {
            items.swap_remove(pos);
        }
        true
    }

    /// Refresh an item's box (remove then insert)
    pub fn update(&mut self, id: NodeId, bounds: Bounds) {
        self.remove(id);
        self.insert(id, bounds);
    }

    /// Visit every item whose box intersects `region`
    pub fn query(&self, region: &Bounds, mut visit: impl FnMut(NodeId)) {
        self.find(region, |id| {
            visit(id);
            false
        });
    }

    /// Returns true as soon as `pred` accepts an item whose box intersects `region`
    pub fn find(&self, region: &Bounds, mut pred: impl FnMut(NodeId) -> bool) -> bool {
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let quad = &self.quads[index];
            // The root also holds boxes poking past the border, so it is always scanned
            if index != 0 && !quad.bounds.intersects(region) {
                continue;
            }
            for (id, bounds) in &quad.items {
                if bounds.intersects(region) && pred(*id) {
                    return true;
                }
            }
            if let Some(children) = quad.children {
                stack.extend_from_slice(&children);
            }
        }
        false
    }

    /// Collect ids in `region` into a vector
    pub fn collect(&self, region: &Bounds) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.query(region, |id| out.push(id));
        out
    }

    fn split(&mut self, index: usize) {
        let depth = self.quads[index].depth + 1;
        let quadrants = self.quads[index].bounds.quadrants();
        let first = self.quads.len();
        for bounds in quadrants {
            self.quads.push(Quad::new(bounds, depth));
        }
        let children = [first, first + 1, first + 2, first + 3];
        self.quads[index].children = Some(children);

        let items = std::mem::take(&mut self.quads[index].items);
        for (id, bounds) in items {
            let target = children
                .iter()
                .copied()
                .find(|&c| self.quads[c].bounds.contains(&bounds))
                .unwrap_or(index);
            self.quads[target].items.push((id, bounds));
            self.locations.insert(id, target);
        }

        // Children may themselves be over capacity when everything landed in one quadrant
        for child in children {
            if self.quads[child].items.len() > MAX_ITEMS && depth < MAX_DEPTH {
                self.split(child);
            }
        }
    }
}
