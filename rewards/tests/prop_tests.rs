use proptest::prelude::*;

use daiv_rewards::{RewardCalculator, RewardSchedule};
use daiv_types::params::MIB;

proptest! {
    /// Identical inputs always yield identical outputs.
    #[test]
    fn base_reward_is_deterministic(size in 0u64..u64::MAX, fields in 0u32..64) {
        let a = RewardCalculator::default().base_reward(size, fields);
        let b = RewardCalculator::default().base_reward(size, fields);
        prop_assert_eq!(a, b);
    }

    /// The breakdown always sums to the total.
    #[test]
    fn breakdown_sums_to_total(size in 0u64..u64::MAX, fields in 0u32..1_000) {
        let b = RewardCalculator::default().breakdown(size, fields);
        let sum = b.base.raw() + b.size_bonus.raw() + b.metadata_bonus.raw();
        prop_assert_eq!(sum, b.total.raw());
    }

    /// Base reward never decreases as size or metadata grow.
    #[test]
    fn base_reward_is_monotonic(size in 0u64..(500 * MIB), extra in 0u64..(10 * MIB), fields in 0u32..10) {
        let c = RewardCalculator::default();
        prop_assert!(c.base_reward(size + extra, fields) >= c.base_reward(size, fields));
        prop_assert!(c.base_reward(size, fields + 1) > c.base_reward(size, fields));
    }

    /// The size bonus never exceeds its cap.
    #[test]
    fn size_bonus_respects_cap(size in 0u64..u64::MAX, cap in 0u64..1_000) {
        let c = RewardCalculator::new(RewardSchedule { size_bonus_cap: cap, ..RewardSchedule::default() });
        prop_assert!(c.breakdown(size, 0).size_bonus.raw() <= cap as u128);
    }

    /// Splitting a usage delta never pays more than charging it at once (below the cap).
    #[test]
    fn retroactive_split_never_overpays(a in 0u64..4_000, b in 0u64..4_000) {
        let c = RewardCalculator::default();
        let split = c.retroactive_reward(a).raw() + c.retroactive_reward(b).raw();
        let whole = c.retroactive_reward(a + b).raw();
        prop_assert!(split <= whole);
    }
}
