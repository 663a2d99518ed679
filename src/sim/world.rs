//! Simulation context
//!
//! [`World`] owns the node registry (and with it the spatial index), the
//! players, the game mode and the seeded RNG. Every subsystem takes it by
//! mutable reference; nothing in the simulation is process-global.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::lifecycle;
use super::mode::{self, Ffa, GameMode};
use super::node::{Node, NodeId, NodeKind, PlayerId};
use super::player::{Player, PlayerInput};
use super::quadtree::Bounds;
use super::registry::NodeRegistry;
use crate::config::Config;
use crate::leaderboard::Leaderboard;

/// Something the transport may want to tell clients about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// `eaten` was absorbed by `eater`
    Eaten {
        eaten: NodeId,
        eaten_kind: NodeKind,
        eater: NodeId,
    },
    /// A player cell ate a virus and burst into `pieces` extra cells
    VirusPopped {
        virus: NodeId,
        cell: NodeId,
        pieces: usize,
    },
    /// A virus overflowed and shot a child
    VirusShot { parent: NodeId, child: NodeId },
    /// A player lost its last cell
    PlayerDied { player: PlayerId },
}

#[derive(Debug)]
pub struct World {
    pub config: Config,
    pub registry: NodeRegistry,
    /// Players by id (ordered for deterministic iteration)
    pub players: BTreeMap<PlayerId, Player>,
    pub(crate) mode: Box<dyn GameMode>,
    pub(crate) rng: Pcg32,
    /// Completed simulation steps
    pub tick: u64,
    pub leaderboard: Leaderboard,
    events: Vec<SimEvent>,
    next_player_id: PlayerId,
    border: Bounds,
    /// Cached from the mode so it holds while the mode is parked
    teams: bool,
}

impl World {
    /// Empty world using the game mode named in the config
    pub fn new(config: Config) -> Self {
        let mode = mode::for_config(&config);
        Self::with_mode(config, mode)
    }

    pub fn with_mode(config: Config, mode: Box<dyn GameMode>) -> Self {
        let half = Vec2::new(config.border_width, config.border_height) * 0.5;
        let border = Bounds::centered(Vec2::ZERO, half);
        let teams = mode.have_teams();
        log::info!(
            "World created: {} mode, border {:.0}x{:.0}, seed {:#x}",
            mode.name(),
            config.border_width,
            config.border_height,
            config.seed
        );
        Self {
            rng: Pcg32::seed_from_u64(config.seed),
            registry: NodeRegistry::new(border),
            players: BTreeMap::new(),
            mode,
            tick: 0,
            leaderboard: Leaderboard::Empty,
            events: Vec::new(),
            next_player_id: 1,
            border,
            teams,
            config,
        }
    }

    /// Spawn the configured starting food and viruses
    pub fn populate(&mut self) {
        for _ in 0..self.config.food_amount {
            lifecycle::spawn_food(self);
        }
        for _ in 0..self.config.virus_amount {
            if lifecycle::spawn_virus(self).is_none() {
                break;
            }
        }
        log::info!(
            "Spawned {} food and {} viruses",
            self.registry.count(NodeKind::Food),
            self.registry.count(NodeKind::Virus)
        );
    }

    pub fn border(&self) -> Bounds {
        self.border
    }

    pub fn mode(&self) -> &dyn GameMode {
        self.mode.as_ref()
    }

    pub fn have_teams(&self) -> bool {
        self.teams
    }

    /// Run a game-mode hook with mutable access to the world.
    /// The mode is parked outside the world for the duration of the call, so
    /// inside the hook `world.mode()` is a placeholder `Ffa`. `have_teams`
    /// still reports the real mode.
    pub(crate) fn with_game_mode<R>(
        &mut self,
        f: impl FnOnce(&mut dyn GameMode, &mut World) -> R,
    ) -> R {
        let mut mode = std::mem::replace(&mut self.mode, Box::new(Ffa));
        let out = f(mode.as_mut(), self);
        self.mode = mode;
        out
    }

    /// Advance the simulation by one step
    pub fn step(&mut self) {
        super::tick::tick(self);
    }

    /// Events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub(crate) fn emit(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    // === Nodes ===

    /// Register a node born on the current tick.
    ///
    /// A player cell whose owner is not registered is rejected.
    pub fn add_node(&mut self, mut node: Node) -> Option<NodeId> {
        node.birth_tick = self.tick;
        let owner = match node.owner {
            Some(owner) if node.kind == NodeKind::PlayerCell => {
                if !self.players.contains_key(&owner) {
                    log::warn!("Rejected player cell for unknown player {owner}");
                    return None;
                }
                Some(owner)
            }
            Some(_) => {
                node.owner = None;
                None
            }
            None if node.kind == NodeKind::PlayerCell => {
                log::warn!("Rejected player cell without an owner");
                return None;
            }
            None => None,
        };

        let id = self.registry.add(node);
        if let Some(player) = owner.and_then(|o| self.players.get_mut(&o)) {
            player.cells.push(id);
        }
        Some(id)
    }

    /// Tombstone a node, detaching it from its owner.
    /// Returns false if it was already gone.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(owner) = self.registry.remove(id).map(|n| n.owner) else {
            return false;
        };
        if let Some(player) = owner.and_then(|o| self.players.get_mut(&o)) {
            player.cells.retain(|&c| c != id);
            if player.cells.is_empty() {
                let player_id = player.id;
                log::debug!("Player {} ({}) lost its last cell", player_id, player.name);
                self.emit(SimEvent::PlayerDied { player: player_id });
            }
        }
        true
    }

    /// Live node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.registry.get_live(id)
    }

    /// Uniformly random point inside the border
    pub fn random_position(&mut self) -> Vec2 {
        let x = self.border.min.x + self.border.width() * self.rng.random::<f32>();
        let y = self.border.min.y + self.border.height() * self.rng.random::<f32>();
        Vec2::new(x, y)
    }

    /// Whether a circle's box at `position` would overlap any player cell
    pub fn will_collide(&self, position: Vec2, size: f32) -> bool {
        self.registry
            .any_of_kind(&Bounds::around(position, size), NodeKind::PlayerCell)
    }

    pub fn spawn_food(&mut self) -> Option<NodeId> {
        lifecycle::spawn_food(self)
    }

    pub fn spawn_virus(&mut self) -> Option<NodeId> {
        lifecycle::spawn_virus(self)
    }

    pub fn split_player_cell(
        &mut self,
        parent: NodeId,
        angle: f32,
        mass: f32,
        speed: f32,
    ) -> Option<NodeId> {
        lifecycle::split_player_cell(self, parent, angle, mass, speed)
    }

    // === Players ===

    /// Register a connected player and let the game mode place it on a team
    pub fn add_player(&mut self, name: impl Into<String>) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        let player = Player::new(id, name);
        log::info!("Player {} ({}) joined", id, player.name);
        self.players.insert(id, player);
        self.with_game_mode(|mode, world| mode.on_player_join(world, id));
        id
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Ask the game mode to spawn a player's first cell
    pub fn request_spawn(&mut self, player: PlayerId) -> Option<NodeId> {
        if self.players.get(&player).is_none_or(|p| !p.connected) {
            return None;
        }
        self.with_game_mode(|mode, world| mode.on_player_spawn(world, player))
    }

    /// Spawn a player's cell, at `position` or wherever the spawn rules pick
    pub fn spawn_player(&mut self, player: PlayerId, position: Option<Vec2>) -> Option<NodeId> {
        lifecycle::spawn_player(self, player, position)
    }

    /// Latch input from the transport. Targets overwrite, action flags accumulate
    /// until the next update phase consumes them.
    pub fn latch_input(&mut self, player: PlayerId, input: PlayerInput) {
        let Some(player) = self.players.get_mut(&player) else {
            return;
        };
        let latched = &mut player.input;
        if input.target.is_some() {
            latched.target = input.target;
        }
        latched.split |= input.split;
        latched.eject |= input.eject;
        latched.toggle_minion_control |= input.toggle_minion_control;
        latched.spectate |= input.spectate;
    }

    /// Mark a player's connection as lost; its cells linger for the disconnect time
    pub fn disconnect(&mut self, player: PlayerId) {
        let tick = self.tick;
        if let Some(player) = self.players.get_mut(&player) {
            if player.connected {
                player.connected = false;
                player.disconnected_at = Some(tick);
                log::info!("Player {} ({}) disconnected", player.id, player.name);
            }
        }
    }

    /// Remove a player and every cell it owns
    pub fn remove_player(&mut self, player: PlayerId) -> bool {
        let Some(cells) = self.players.get(&player).map(|p| p.cells.clone()) else {
            return false;
        };
        for id in cells {
            self.remove_node(id);
        }
        if let Some(removed) = self.players.remove(&player) {
            log::info!("Player {} ({}) removed", removed.id, removed.name);
        }
        true
    }
}
