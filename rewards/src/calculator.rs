//! Reward computation.

use daiv_types::params::MILLI;
use daiv_types::TokenAmount;
use serde::{Deserialize, Serialize};

use crate::schedule::RewardSchedule;

/// The components of a base reward, for display and audit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub base: TokenAmount,
    pub size_bonus: TokenAmount,
    pub metadata_bonus: TokenAmount,
    pub total: TokenAmount,
}

/// Stateless calculator over a [`RewardSchedule`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewardCalculator {
    schedule: RewardSchedule,
}

impl RewardCalculator {
    pub fn new(schedule: RewardSchedule) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &RewardSchedule {
        &self.schedule
    }

    /// Reward paid when a dataset is approved.
    pub fn base_reward(&self, size_bytes: u64, filled_fields: u32) -> TokenAmount {
        self.breakdown(size_bytes, filled_fields).total
    }

    /// Base reward split into its components.
    ///
    /// A zero `size_unit_bytes` disables the size bonus.
    pub fn breakdown(&self, size_bytes: u64, filled_fields: u32) -> RewardBreakdown {
        let s = &self.schedule;
        let base = s.base as u128;
        let size_bonus = size_bytes
            .checked_div(s.size_unit_bytes)
            .unwrap_or(0)
            .min(s.size_bonus_cap) as u128;
        let metadata_bonus = (filled_fields as u128).saturating_mul(s.metadata_unit as u128);
        let total = base.saturating_add(size_bonus).saturating_add(metadata_bonus);
        RewardBreakdown {
            base: TokenAmount::new(base),
            size_bonus: TokenAmount::new(size_bonus),
            metadata_bonus: TokenAmount::new(metadata_bonus),
            total: TokenAmount::new(total),
        }
    }

    /// Reward for usage growth since the last charged baseline.
    ///
    /// Takes the *delta* only; the caller owns the baseline, so repeated calls
    /// with the same cumulative counter can never double-pay.
    pub fn retroactive_reward(&self, download_delta: u64) -> TokenAmount {
        let s = &self.schedule;
        let raw = (download_delta as u128).saturating_mul(s.retro_rate_milli as u128) / MILLI as u128;
        TokenAmount::new(raw.min(s.retro_cap as u128))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daiv_types::params::MIB;

    fn calc() -> RewardCalculator {
        RewardCalculator::default()
    }

    #[test]
    fn two_mib_three_fields() {
        assert_eq!(calc().base_reward(2 * MIB, 3), TokenAmount::new(82));
    }

    #[test]
    fn five_mib_four_fields() {
        let b = calc().breakdown(5 * MIB, 4);
        assert_eq!(b.base, TokenAmount::new(50));
        assert_eq!(b.size_bonus, TokenAmount::new(5));
        assert_eq!(b.metadata_bonus, TokenAmount::new(40));
        assert_eq!(b.total, TokenAmount::new(95));
    }

    #[test]
    fn size_bonus_floors_partial_mebibytes() {
        assert_eq!(calc().base_reward(MIB - 1, 0), TokenAmount::new(50));
        assert_eq!(calc().base_reward(MIB, 0), TokenAmount::new(51));
    }

    #[test]
    fn size_bonus_is_capped() {
        assert_eq!(calc().base_reward(10_000 * MIB, 0), TokenAmount::new(150));
        assert_eq!(calc().base_reward(u64::MAX, 0), TokenAmount::new(150));
    }

    #[test]
    fn zero_size_unit_disables_size_bonus() {
        let c = RewardCalculator::new(RewardSchedule {
            size_unit_bytes: 0,
            ..RewardSchedule::default()
        });
        assert_eq!(c.base_reward(50 * MIB, 1), TokenAmount::new(60));
    }

    #[test]
    fn retroactive_uses_fixed_point_rate() {
        // 0.1 token per download
        assert_eq!(calc().retroactive_reward(0), TokenAmount::ZERO);
        assert_eq!(calc().retroactive_reward(9), TokenAmount::ZERO);
        assert_eq!(calc().retroactive_reward(750), TokenAmount::new(75));
    }

    #[test]
    fn retroactive_is_capped() {
        assert_eq!(calc().retroactive_reward(u64::MAX), TokenAmount::new(1_000));
    }

    #[test]
    fn governed_schedule_changes_base() {
        let c = RewardCalculator::new(RewardSchedule {
            base: 75,
            ..RewardSchedule::default()
        });
        assert_eq!(c.base_reward(0, 0), TokenAmount::new(75));
    }
}
