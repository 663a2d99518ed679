//! Server configuration
//!
//! Loaded once at startup from a JSON file. Every key is optional: missing keys
//! keep the default, so a config file only needs the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{PRIVILEGED_MAX_CELLS, PRIVILEGED_MAX_SIZE};

/// Errors raised while loading a config file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON for [`Config`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid config value `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Game mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameModeKind {
    #[default]
    Ffa,
    Teams,
}

impl GameModeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameModeKind::Ffa => "Free For All",
            GameModeKind::Teams => "Teams",
        }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // === Server ===
    /// RNG seed for the world
    pub seed: u64,
    pub game_mode: GameModeKind,
    /// Number of teams in team modes
    pub team_count: u8,
    /// Leaderboard length
    pub max_leaderboard: usize,
    /// Stricter eating and shorter split grace ("mobile" physics)
    pub mobile_physics: bool,

    // === Border ===
    pub border_width: f32,
    pub border_height: f32,

    // === Food ===
    pub food_min_size: f32,
    pub food_max_size: f32,
    pub food_amount: usize,
    /// Spawn food at a random size between min and max
    pub food_mass_grow: bool,
    /// Food spawned per tick while below `food_amount`
    pub food_spawn_per_tick: usize,

    // === Virus ===
    pub virus_min_size: f32,
    /// A virus that reaches this size pops and shoots a child
    pub virus_max_size: f32,
    /// Largest piece a virus pop may produce
    pub virus_max_popped_size: f32,
    /// Pop into equal pieces instead of the halving distribution
    pub virus_equal_pop_size: bool,
    pub virus_amount: usize,
    pub virus_max_amount: usize,
    pub virus_velocity: f32,
    /// Cell cap when popped by a virus (0 = player max cells)
    pub virus_max_cells: usize,
    /// Position probes per virus spawn before giving up
    pub virus_spawn_attempts: u32,

    // === Ejected mass ===
    pub eject_size: f32,
    /// Size lost by the ejecting cell (applied in size² units)
    pub eject_size_loss: f32,
    /// Minimum ticks between ejects
    pub eject_cooldown: u64,
    /// Chance a player spawns from an idle ejected mass
    pub eject_spawn_percent: f32,
    /// Eject viruses instead of ejected mass
    pub eject_virus: bool,
    pub eject_velocity: f32,

    // === Player ===
    pub player_min_size: f32,
    pub player_max_size: f32,
    pub player_min_split_size: f32,
    pub player_min_eject_size: f32,
    pub player_start_size: f32,
    pub player_max_cells: usize,
    pub player_speed: f32,
    pub player_decay_rate: f32,
    /// Decay rate is multiplied by 10 above this mass (0 = off)
    pub player_decay_cap: f32,
    /// Seconds before split cells may remerge (0 = instant)
    pub player_recombine_time: f32,
    /// Seconds a disconnected player's cells stay in the world
    pub player_disconnect_time: u64,
    /// Minimum ticks between splits
    pub split_cooldown: u64,
    pub split_velocity: f32,

    // === Minions ===
    /// Minions rigidly collide with their team
    pub minion_collide_team: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            game_mode: GameModeKind::Ffa,
            team_count: 3,
            max_leaderboard: 10,
            mobile_physics: false,

            border_width: 14_142.136,
            border_height: 14_142.136,

            food_min_size: 10.0,
            food_max_size: 20.0,
            food_amount: 1500,
            food_mass_grow: true,
            food_spawn_per_tick: 10,

            virus_min_size: 100.0,
            virus_max_size: 141.421_36,
            virus_max_popped_size: 60.0,
            virus_equal_pop_size: false,
            virus_amount: 50,
            virus_max_amount: 100,
            virus_velocity: 780.0,
            virus_max_cells: 0,
            virus_spawn_attempts: 64,

            eject_size: 36.06,
            eject_size_loss: 42.43,
            eject_cooldown: 3,
            eject_spawn_percent: 0.5,
            eject_virus: false,
            eject_velocity: 780.0,

            player_min_size: 31.622_776,
            player_max_size: 1500.0,
            player_min_split_size: 59.160_8,
            player_min_eject_size: 59.160_8,
            player_start_size: 31.622_776,
            player_max_cells: 16,
            player_speed: 1.0,
            player_decay_rate: 0.002,
            player_decay_cap: 0.0,
            player_recombine_time: 30.0,
            player_disconnect_time: 0,
            split_cooldown: 0,
            split_velocity: 780.0,

            minion_collide_team: false,
        }
    }
}

impl Config {
    /// Parse a config from JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(key: &'static str, value: f32) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    key,
                    reason: format!("must be positive, got {value}"),
                })
            }
        }

        positive("border_width", self.border_width)?;
        positive("border_height", self.border_height)?;
        positive("food_min_size", self.food_min_size)?;
        positive("virus_min_size", self.virus_min_size)?;
        positive("eject_size", self.eject_size)?;
        positive("player_min_size", self.player_min_size)?;
        positive("player_start_size", self.player_start_size)?;

        if self.food_max_size < self.food_min_size {
            return Err(ConfigError::Invalid {
                key: "food_max_size",
                reason: "below food_min_size".into(),
            });
        }
        if self.virus_max_size <= self.virus_min_size {
            return Err(ConfigError::Invalid {
                key: "virus_max_size",
                reason: "must exceed virus_min_size".into(),
            });
        }
        if self.player_max_size < self.player_min_size {
            return Err(ConfigError::Invalid {
                key: "player_max_size",
                reason: "below player_min_size".into(),
            });
        }
        if self.player_max_cells == 0 {
            return Err(ConfigError::Invalid {
                key: "player_max_cells",
                reason: "must be at least 1".into(),
            });
        }
        if self.game_mode == GameModeKind::Teams && self.team_count == 0 {
            return Err(ConfigError::Invalid {
                key: "team_count",
                reason: "teams mode needs at least one team".into(),
            });
        }
        Ok(())
    }

    /// Split grace period in ticks
    pub fn split_grace_ticks(&self) -> u64 {
        if self.mobile_physics {
            crate::consts::SPLIT_GRACE_TICKS_MOBILE
        } else {
            crate::consts::SPLIT_GRACE_TICKS
        }
    }

    /// Eat distance divisor
    pub fn eat_divisor(&self) -> f32 {
        if self.mobile_physics {
            crate::consts::EAT_DIVISOR_MOBILE
        } else {
            crate::consts::EAT_DIVISOR
        }
    }

    /// Cell limit for a player
    pub fn max_cells(&self, privileged: bool) -> usize {
        if privileged {
            PRIVILEGED_MAX_CELLS
        } else {
            self.player_max_cells
        }
    }

    /// Size limit before auto-split
    pub fn max_size(&self, privileged: bool) -> f32 {
        if privileged {
            PRIVILEGED_MAX_SIZE
        } else {
            self.player_max_size
        }
    }

    /// Cell limit when exploding on a virus
    pub fn virus_pop_max_cells(&self) -> usize {
        if self.virus_max_cells > 0 {
            self.virus_max_cells
        } else {
            self.player_max_cells
        }
    }
}
