//! Deterministic reward calculator for approved datasets.
//!
//! ```text
//! base_reward(size, fields) = BASE + min(floor(size / 1 MiB), SIZE_CAP) + fields * METADATA_UNIT
//! retroactive_reward(delta)  = min(floor(delta * RATE_MILLI / 1000), RETRO_CAP)
//! ```
//!
//! Everything here is a pure function of its inputs: no clock, no storage, no
//! floating point. All arithmetic saturates instead of overflowing.

pub mod calculator;
pub mod schedule;

pub use calculator::{RewardBreakdown, RewardCalculator};
pub use schedule::RewardSchedule;
