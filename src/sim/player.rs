//! Player state and latched input

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::node::{NodeId, PlayerId};

/// Input latched by the transport between ticks.
///
/// Applied once in the per-player update phase, then cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Cursor position in world coordinates
    pub target: Option<Vec2>,
    pub split: bool,
    pub eject: bool,
    pub toggle_minion_control: bool,
    pub spectate: bool,
}

/// Visibility change since the previous update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewDelta {
    /// Entered the view
    pub added: Vec<NodeId>,
    /// Left the view or were removed
    pub removed: Vec<NodeId>,
    /// Still visible and may have changed
    pub updated: Vec<NodeId>,
}

impl ViewDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Owned cells in creation order
    pub cells: Vec<NodeId>,
    /// Applied movement target
    pub target: Option<Vec2>,
    pub frozen: bool,
    pub spectating: bool,
    /// "rec" mode: higher cell and size limits, instant merge
    pub privileged: bool,
    /// Force-merge override: instant merge, no auto-split
    pub merge_override: bool,
    /// Split/eject requests drive this player's minions instead
    pub minion_control: bool,
    /// This player is itself a minion
    pub is_minion: bool,
    pub team: Option<u8>,
    /// Tick of the last accepted split / eject
    pub last_split: Option<u64>,
    pub last_eject: Option<u64>,
    pub connected: bool,
    pub disconnected_at: Option<u64>,
    /// Spawn size override
    pub spawn_size: Option<f32>,
    /// Input waiting for the next update phase
    pub input: PlayerInput,
    /// Re-latched for the minion collaborator while minion control is on
    pub minion_split: bool,
    pub minion_eject: bool,
    /// Mass-weighted center of owned cells
    pub center: Vec2,
    /// Total mass of owned cells
    pub score: f32,
    /// Sum of cell sizes, drives view scale
    pub total_size: f32,
    pub(crate) visible: BTreeSet<NodeId>,
    pub(crate) view: ViewDelta,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cells: Vec::new(),
            target: None,
            frozen: false,
            spectating: false,
            privileged: false,
            merge_override: false,
            minion_control: false,
            is_minion: false,
            team: None,
            last_split: None,
            last_eject: None,
            connected: true,
            disconnected_at: None,
            spawn_size: None,
            input: PlayerInput::default(),
            minion_split: false,
            minion_eject: false,
            center: Vec2::ZERO,
            score: 0.0,
            total_size: 0.0,
            visible: BTreeSet::new(),
            view: ViewDelta::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.cells.is_empty()
    }

    /// Instant-merge conditions: privileged or force-merge
    pub fn merges_instantly(&self) -> bool {
        self.privileged || self.merge_override
    }

    /// Node ids currently visible
    pub fn visible(&self) -> &BTreeSet<NodeId> {
        &self.visible
    }

    /// Visibility change computed in the last update
    pub fn view_delta(&self) -> &ViewDelta {
        &self.view
    }

    /// Hand the last visibility change to the transport
    pub fn take_view_delta(&mut self) -> ViewDelta {
        std::mem::take(&mut self.view)
    }

    /// Accept a split/eject at `tick` if `cooldown` ticks have passed since `last`.
    /// The first request is always accepted.
    pub(crate) fn try_cooldown(last: &mut Option<u64>, tick: u64, cooldown: u64) -> bool {
        if let Some(prev) = *last {
            if tick.saturating_sub(prev) < cooldown {
                return false;
            }
        }
        *last = Some(tick);
        true
    }
}
