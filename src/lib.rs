//! Cell Arena - authoritative simulation core for a cell-growth arena game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spatial index, registry, physics, collisions, lifecycle)
//! - `scheduler`: Self-correcting fixed-interval tick driver
//! - `config`: Data-driven game balance (serde, JSON)
//! - `leaderboard`: Leaderboard values handed to the transport layer

pub mod config;
pub mod leaderboard;
pub mod scheduler;
pub mod sim;

pub use config::{Config, ConfigError};
pub use leaderboard::{Leaderboard, LeaderboardEntry};
pub use scheduler::{Poll, TickScheduler};

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// Target interval between simulation steps (milliseconds)
    pub const TICK_INTERVAL_MS: f64 = 40.0;
    /// Scheduler fires a step once it is within this much of the target
    pub const TICK_SLACK_MS: f64 = 5.0;
    /// A gap larger than this is a stall: re-baseline instead of catching up
    pub const TICK_STALL_MS: f64 = 120.0;
    /// Weight of a new sample in the step-duration moving average
    pub const STEP_TIME_ALPHA: f64 = 0.5;

    /// Steps per simulated second
    pub const TICKS_PER_SECOND: u64 = 25;

    /// Boost travels this fraction (1/n) of its remaining distance per tick
    pub const BOOST_DIVISOR: f32 = 9.0;
    /// Remaining boost below this is dropped to zero
    pub const BOOST_STOP_DISTANCE: f32 = 1.0;

    /// Age (ticks) below which freshly split siblings ignore each other
    pub const SPLIT_GRACE_TICKS: u64 = 13;
    /// Grace period under mobile physics
    pub const SPLIT_GRACE_TICKS_MOBILE: u64 = 1;

    /// Eat distance divisor: `distance < big - small / divisor`
    pub const EAT_DIVISOR: f32 = 3.0;
    /// Eat distance divisor under mobile physics
    pub const EAT_DIVISOR_MOBILE: f32 = 20.0;
    /// An eater must be this much larger than a foreign prey
    pub const EAT_SIZE_RATIO: f32 = 1.15;

    /// Instant-merge cells may remerge once boost falls below this
    pub const INSTANT_MERGE_BOOST: f32 = 100.0;
    /// Remerge time scales with size by this factor (seconds per unit size)
    pub const REMERGE_SIZE_FACTOR: f32 = 0.2;

    /// Split launch speed scales with `size ^ SPLIT_SPEED_EXPONENT`
    pub const SPLIT_SPEED_EXPONENT: f32 = 0.0122;
    /// Random angular jitter applied to ejected mass (radians, ±)
    pub const EJECT_ANGLE_JITTER: f32 = 0.3;

    /// Decay and leaderboard run once per second, offset from each other
    pub const DECAY_TICK_OFFSET: u64 = 3;
    pub const LEADERBOARD_TICK_OFFSET: u64 = 7;

    /// Decay rate multiplier once mass passes the decay cap
    pub const DECAY_CAP_MULTIPLIER: f32 = 10.0;

    /// Cell limit for privileged ("rec") players
    pub const PRIVILEGED_MAX_CELLS: usize = 200;
    /// Size limit for privileged players
    pub const PRIVILEGED_MAX_SIZE: f32 = 1e9;

    /// Base view box (full width/height) before size scaling
    pub const VIEW_BASE_WIDTH: f32 = 1920.0;
    pub const VIEW_BASE_HEIGHT: f32 = 1080.0;
}

/// Mass of a node with the given size: `size² / 100`
#[inline]
pub fn size_to_mass(size: f32) -> f32 {
    size * size / 100.0
}

/// Size of a node with the given mass: `sqrt(mass · 100)`
#[inline]
pub fn mass_to_size(mass: f32) -> f32 {
    (mass * 100.0).sqrt()
}

/// Unit vector for an angle measured from +x toward +y
#[inline]
pub fn angle_to_direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle of a direction vector (inverse of [`angle_to_direction`])
#[inline]
pub fn direction_to_angle(dir: Vec2) -> f32 {
    dir.y.atan2(dir.x)
}
