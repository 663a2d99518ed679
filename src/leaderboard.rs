//! Leaderboard values
//!
//! Recomputed once per second by the active game mode and handed to the
//! transport layer, which owns the wire formatting.

use serde::{Deserialize, Serialize};

use crate::sim::PlayerId;

/// A single ranked player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player: PlayerId,
    pub name: String,
    /// Total mass of the player's cells
    pub score: f32,
}

/// Leaderboard for the active game mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Leaderboard {
    /// Not computed yet
    #[default]
    Empty,
    /// Players ranked by score, highest first
    Ffa(Vec<LeaderboardEntry>),
    /// Share of total player mass held by each team (sums to 1 when any mass exists)
    Teams(Vec<f32>),
}

impl Leaderboard {
    /// Rank entries by score and keep the top `max`
    pub fn ranked(entries: impl IntoIterator<Item = LeaderboardEntry>, max: usize) -> Self {
        let mut ranked: Vec<LeaderboardEntry> = Vec::new();
        for entry in entries {
            if entry.score <= 0.0 {
                continue;
            }
            // Find insertion point (sorted descending by score, ties keep arrival order)
            let pos = ranked.iter().position(|e| entry.score > e.score);
            match pos {
                Some(i) => ranked.insert(i, entry),
                None => ranked.push(entry),
            }
        }
        ranked.truncate(max);
        Leaderboard::Ffa(ranked)
    }

    /// Team shares from per-team mass totals
    pub fn team_shares(team_mass: &[f32]) -> Self {
        let total: f32 = team_mass.iter().sum();
        let shares = if total > 0.0 {
            team_mass.iter().map(|m| m / total).collect()
        } else {
            vec![0.0; team_mass.len()]
        };
        Leaderboard::Teams(shares)
    }

    /// 1-indexed rank of a player, if listed
    pub fn rank_of(&self, player: PlayerId) -> Option<usize> {
        match self {
            Leaderboard::Ffa(entries) => entries
                .iter()
                .position(|e| e.player == player)
                .map(|i| i + 1),
            _ => None,
        }
    }

    /// Player in first place
    pub fn leader(&self) -> Option<&LeaderboardEntry> {
        match self {
            Leaderboard::Ffa(entries) => entries.first(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Leaderboard::Empty => true,
            Leaderboard::Ffa(entries) => entries.is_empty(),
            Leaderboard::Teams(shares) => shares.is_empty(),
        }
    }
}
