//! Simulated entities and per-kind rules

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::quadtree::Bounds;
use crate::{angle_to_direction, mass_to_size, size_to_mass};

/// Node identity, unique for the lifetime of a world
pub type NodeId = u32;
/// Player identity
pub type PlayerId = u32;

/// Entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Food,
    Virus,
    EjectedMass,
    PlayerCell,
}

/// Static behaviour of a node kind
#[derive(Debug)]
pub struct KindRules {
    /// Kinds this kind may eat, subject to the eat distance and size checks
    pub prey: &'static [NodeKind],
    /// Two boosting nodes of this kind push each other apart instead of eating
    pub rigid_with_own_kind: bool,
}

const FOOD_RULES: KindRules = KindRules {
    prey: &[],
    rigid_with_own_kind: false,
};

const VIRUS_RULES: KindRules = KindRules {
    prey: &[NodeKind::EjectedMass],
    rigid_with_own_kind: false,
};

const EJECTED_RULES: KindRules = KindRules {
    prey: &[],
    rigid_with_own_kind: true,
};

const PLAYER_CELL_RULES: KindRules = KindRules {
    prey: &[
        NodeKind::Food,
        NodeKind::Virus,
        NodeKind::EjectedMass,
        NodeKind::PlayerCell,
    ],
    rigid_with_own_kind: false,
};

impl NodeKind {
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Food,
        NodeKind::Virus,
        NodeKind::EjectedMass,
        NodeKind::PlayerCell,
    ];

    pub fn rules(self) -> &'static KindRules {
        match self {
            NodeKind::Food => &FOOD_RULES,
            NodeKind::Virus => &VIRUS_RULES,
            NodeKind::EjectedMass => &EJECTED_RULES,
            NodeKind::PlayerCell => &PLAYER_CELL_RULES,
        }
    }

    /// Kind-level eat predicate (world-dependent checks live in the collision system)
    pub fn can_eat(self, prey: NodeKind) -> bool {
        self.rules().prey.contains(&prey)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Food => "food",
            NodeKind::Virus => "virus",
            NodeKind::EjectedMass => "ejected mass",
            NodeKind::PlayerCell => "player cell",
        }
    }
}

/// Straight-line boost, consumed geometrically each tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Boost {
    /// Unit direction (zero when idle)
    pub direction: Vec2,
    /// Remaining travel distance
    pub distance: f32,
}

impl Boost {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.distance > 0.0
    }

    pub fn stop(&mut self) {
        self.direction = Vec2::ZERO;
        self.distance = 0.0;
    }
}

/// A simulated entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Assigned by the registry on insertion (0 = not registered)
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: Vec2,
    size: f32,
    mass: f32,
    pub owner: Option<PlayerId>,
    pub boost: Boost,
    /// Tick the node was registered on
    pub birth_tick: u64,
    /// Tombstone: set on removal, checked by anything holding a stale id
    pub removed: bool,
    /// Node that ate this one
    pub killer: Option<NodeId>,
    /// Player cell may fuse with siblings
    pub can_remerge: bool,
    /// Box last written to the spatial index
    pub bounds: Bounds,
}

impl Node {
    pub fn new(kind: NodeKind, position: Vec2, size: f32) -> Self {
        Self {
            id: 0,
            kind,
            position,
            size,
            mass: size_to_mass(size),
            owner: None,
            boost: Boost::default(),
            birth_tick: 0,
            removed: false,
            killer: None,
            can_remerge: false,
            bounds: Bounds::around(position, size),
        }
    }

    /// A player cell owned by `owner`
    pub fn player_cell(owner: PlayerId, position: Vec2, size: f32) -> Self {
        Self {
            owner: Some(owner),
            ..Self::new(NodeKind::PlayerCell, position, size)
        }
    }

    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Size squared (the additive quantity when cells combine)
    #[inline]
    pub fn size_sq(&self) -> f32 {
        self.size * self.size
    }

    /// Set size, keeping mass in step
    pub fn set_size(&mut self, size: f32) {
        self.size = size;
        self.mass = size_to_mass(size);
    }

    /// Set mass, keeping size in step
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.size = mass_to_size(mass);
    }

    /// Ticks since registration
    #[inline]
    pub fn age(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.birth_tick)
    }

    /// Launch along `angle` for `distance` units
    pub fn set_boost(&mut self, distance: f32, angle: f32) {
        self.boost = Boost {
            direction: angle_to_direction(angle),
            distance,
        };
    }

    /// Bounding box for the current position and size
    #[inline]
    pub fn compute_bounds(&self) -> Bounds {
        Bounds::around(self.position, self.size)
    }
}
