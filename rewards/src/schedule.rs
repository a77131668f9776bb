//! Reward constants, sourced from the governable protocol parameters.

use daiv_types::params::{MIB, MILLI};
use daiv_types::ProtocolParams;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSchedule {
    pub base: u64,
    pub size_unit_bytes: u64,
    pub size_bonus_cap: u64,
    pub metadata_unit: u64,
    /// Thousandths of a token per download.
    pub retro_rate_milli: u64,
    pub retro_cap: u64,
}

impl RewardSchedule {
    pub fn from_params(params: &ProtocolParams) -> Self {
        Self {
            base: params.base_reward,
            size_unit_bytes: params.size_unit_bytes,
            size_bonus_cap: params.size_bonus_cap,
            metadata_unit: params.metadata_unit,
            retro_rate_milli: params.retro_rate_milli,
            retro_cap: params.retro_cap,
        }
    }
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            base: 50,
            size_unit_bytes: MIB,
            size_bonus_cap: 100,
            metadata_unit: 10,
            retro_rate_milli: MILLI / 10,
            retro_cap: 1_000,
        }
    }
}
