//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - One fixed step per call, no wall clock
//! - Seeded RNG only
//! - Stable iteration order (insertion-ordered partitions, players by id)
//! - No transport or platform dependencies

pub mod collision;
pub mod lifecycle;
pub mod mode;
pub mod node;
pub mod physics;
pub mod player;
pub mod quadtree;
pub mod registry;
pub mod tick;
pub mod world;

pub use collision::{Interaction, Manifold, classify, rigid_push};
pub use lifecycle::pop_masses;
pub use mode::{Ffa, GameMode, Teams};
pub use node::{Boost, KindRules, Node, NodeId, NodeKind, PlayerId};
pub use player::{Player, PlayerInput, ViewDelta};
pub use quadtree::{Bounds, QuadTree};
pub use registry::NodeRegistry;
pub use tick::tick;
pub use world::{SimEvent, World};
