//! Game modes
//!
//! A mode decides team assignment, spawn placement, the per-tick world
//! upkeep and how the leaderboard is built. The world calls into the mode at
//! fixed points of the tick.

use std::fmt;

use super::node::{NodeId, NodeKind, PlayerId};
use super::world::World;
use crate::config::{Config, GameModeKind};
use crate::leaderboard::{Leaderboard, LeaderboardEntry};

pub trait GameMode: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Players are grouped into teams that never eat each other
    fn have_teams(&self) -> bool {
        false
    }

    /// Multiplier on the player decay rate
    fn decay_modifier(&self) -> f32 {
        1.0
    }

    /// Runs once per tick after collisions and lifecycle rules
    fn on_tick(&mut self, world: &mut World) {
        top_up(world);
    }

    /// A player was registered
    fn on_player_join(&mut self, _world: &mut World, _player: PlayerId) {}

    /// Place a player's first cell
    fn on_player_spawn(&mut self, world: &mut World, player: PlayerId) -> Option<NodeId> {
        world.spawn_player(player, None)
    }

    fn update_leaderboard(&self, world: &World) -> Leaderboard;
}

/// Game mode selected by the config
pub fn for_config(config: &Config) -> Box<dyn GameMode> {
    match config.game_mode {
        GameModeKind::Ffa => Box::new(Ffa),
        GameModeKind::Teams => Box::new(Teams::new(config.team_count)),
    }
}

/// Spawn food and viruses back toward their configured amounts
pub fn top_up(world: &mut World) {
    let food_missing = world
        .config
        .food_amount
        .saturating_sub(world.registry.count(NodeKind::Food));
    for _ in 0..food_missing.min(world.config.food_spawn_per_tick) {
        world.spawn_food();
    }

    while world.registry.count(NodeKind::Virus) < world.config.virus_amount {
        if world.spawn_virus().is_none() {
            break;
        }
    }
}

/// Free for all
#[derive(Debug, Clone, Copy, Default)]
pub struct Ffa;

impl GameMode for Ffa {
    fn name(&self) -> &'static str {
        GameModeKind::Ffa.as_str()
    }

    fn update_leaderboard(&self, world: &World) -> Leaderboard {
        let entries = world
            .players
            .values()
            .filter(|p| p.is_alive())
            .map(|p| LeaderboardEntry {
                player: p.id,
                name: p.name.clone(),
                score: p.score,
            });
        Leaderboard::ranked(entries, world.config.max_leaderboard)
    }
}

/// Fixed number of teams; new players join the smallest
#[derive(Debug, Clone)]
pub struct Teams {
    team_count: u8,
}

impl Teams {
    pub fn new(team_count: u8) -> Self {
        Self {
            team_count: team_count.max(1),
        }
    }

    /// Team with the fewest members, lowest index on ties
    fn smallest_team(&self, world: &World, joining: PlayerId) -> u8 {
        let mut counts = vec![0usize; self.team_count as usize];
        for p in world.players.values().filter(|p| p.id != joining) {
            if let Some(team) = p.team.filter(|&t| t < self.team_count) {
                counts[team as usize] += 1;
            }
        }
        counts
            .iter()
            .enumerate()
            .min_by_key(|&(i, &n)| (n, i))
            .map(|(i, _)| i as u8)
            .unwrap_or(0)
    }
}

impl GameMode for Teams {
    fn name(&self) -> &'static str {
        GameModeKind::Teams.as_str()
    }

    fn have_teams(&self) -> bool {
        true
    }

    fn on_player_join(&mut self, world: &mut World, player: PlayerId) {
        let team = self.smallest_team(world, player);
        if let Some(p) = world.player_mut(player) {
            p.team = Some(team);
            log::info!("Player {} ({}) joined team {}", p.id, p.name, team);
        }
    }

    fn update_leaderboard(&self, world: &World) -> Leaderboard {
        let mut team_mass = vec![0.0f32; self.team_count as usize];
        for p in world.players.values() {
            if let Some(mass) = p.team.and_then(|t| team_mass.get_mut(t as usize)) {
                *mass += p.score;
            }
        }
        Leaderboard::team_shares(&team_mass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::node::Node;
    use glam::Vec2;

    fn config(mode: GameModeKind) -> Config {
        Config {
            game_mode: mode,
            food_amount: 0,
            virus_amount: 0,
            ..Config::default()
        }
    }

    #[test]
    fn test_teams_balance_on_join() {
        let mut world = World::new(config(GameModeKind::Teams));
        let teams: Vec<Option<u8>> = (0..5)
            .map(|i| {
                let id = world.add_player(format!("p{i}"));
                world.player(id).and_then(|p| p.team)
            })
            .collect();
        assert_eq!(
            teams,
            vec![Some(0), Some(1), Some(2), Some(0), Some(1)]
        );
    }

    #[test]
    fn test_top_up_is_rate_limited() {
        let mut world = World::new(Config {
            food_amount: 25,
            food_spawn_per_tick: 10,
            virus_amount: 2,
            ..Config::default()
        });
        top_up(&mut world);
        assert_eq!(world.registry.count(NodeKind::Food), 10);
        assert_eq!(world.registry.count(NodeKind::Virus), 2);
        top_up(&mut world);
        top_up(&mut world);
        top_up(&mut world);
        assert_eq!(world.registry.count(NodeKind::Food), 25);
    }

    #[test]
    fn test_ffa_leaderboard_skips_dead_players() {
        let mut world = World::new(config(GameModeKind::Ffa));
        let a = world.add_player("a");
        let _b = world.add_player("b");
        world
            .add_node(Node::player_cell(a, Vec2::ZERO, 100.0))
            .expect("cell");
        if let Some(p) = world.player_mut(a) {
            p.score = 100.0;
        }
        let lb = world.mode().update_leaderboard(&world);
        let Leaderboard::Ffa(entries) = lb else {
            panic!("expected ffa leaderboard");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].player, a);
    }

    #[test]
    fn test_teams_never_eat_each_other() {
        let mut world = World::new(config(GameModeKind::Teams));
        let a = world.add_player("a");
        let b = world.add_player("b");
        world.player_mut(b).expect("player").team = Some(0);
        let big = world
            .add_node(Node::player_cell(a, Vec2::ZERO, 200.0))
            .expect("cell");
        let small = world
            .add_node(Node::player_cell(b, Vec2::new(10.0, 0.0), 40.0))
            .expect("cell");
        let (big, small) = (
            world.node(big).expect("big"),
            world.node(small).expect("small"),
        );
        assert!(!crate::sim::collision::can_eat(&world, big, small));
    }
}
