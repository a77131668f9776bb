//! Protocol parameters: reward schedule, staking, voting and timelock values.
//!
//! Every field is governable through an executed `ParameterChange` proposal.
//! Values are kept as `u64` so they round-trip through TOML configuration files.

use serde::{Deserialize, Serialize};

use crate::amount::TokenAmount;

/// One mebibyte, the unit of the size bonus.
pub const MIB: u64 = 1024 * 1024;

/// Fixed-point denominator for per-download retroactive rates.
pub const MILLI: u64 = 1_000;

/// Default timelock delay: 2 days.
pub const DEFAULT_TIMELOCK_DELAY_SECS: u64 = 2 * 24 * 60 * 60;

/// All protocol parameters held by the running context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParams {
    // ── Rewards ──────────────────────────────────────────────────────────
    /// Flat reward for every approved dataset.
    pub base_reward: u64,

    /// Bytes per size-bonus token.
    pub size_unit_bytes: u64,

    /// Upper bound on the size bonus.
    pub size_bonus_cap: u64,

    /// Reward per filled metadata field.
    pub metadata_unit: u64,

    /// Retroactive reward per download, in thousandths of a token.
    pub retro_rate_milli: u64,

    /// Upper bound on a single retroactive payout.
    pub retro_cap: u64,

    // ── Staking ──────────────────────────────────────────────────────────
    /// Minimum anti-spam deposit for a submission.
    pub min_stake: u64,

    // ── Voting ───────────────────────────────────────────────────────────
    /// Minimum total voting power cast for a proposal to be binding.
    pub quorum_threshold: u64,

    /// Length of the voting window, in seconds.
    pub voting_period_secs: u64,

    /// Maximum transitive delegation chain length.
    pub max_delegation_depth: u32,

    // ── Timelock ─────────────────────────────────────────────────────────
    /// Delay between queueing and earliest execution, in seconds.
    pub timelock_delay_secs: u64,

    // ── Reputation ───────────────────────────────────────────────────────
    /// Reputation gained when a contributor's dataset is approved.
    pub reputation_per_approval: u64,

    /// Reputation lost when a contributor's stake is slashed.
    pub reputation_slash_penalty: u64,
}

impl ProtocolParams {
    pub fn min_stake_amount(&self) -> TokenAmount {
        TokenAmount::from(self.min_stake)
    }

    /// Short governance timelines for local development networks.
    pub fn dev_defaults() -> Self {
        Self {
            voting_period_secs: 300,
            timelock_delay_secs: 60,
            ..Self::default()
        }
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            base_reward: 50,
            size_unit_bytes: MIB,
            size_bonus_cap: 100,
            metadata_unit: 10,
            retro_rate_milli: 100,
            retro_cap: 1_000,
            min_stake: 10,
            quorum_threshold: 1_000,
            voting_period_secs: 7 * 24 * 60 * 60,
            max_delegation_depth: 10,
            timelock_delay_secs: DEFAULT_TIMELOCK_DELAY_SECS,
            reputation_per_approval: 10,
            reputation_slash_penalty: 50,
        }
    }
}
