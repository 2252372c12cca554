//! Reward calculation.

use questweave_core::config::RewardConfig;
use questweave_core::vocabulary::{QuestResult, QuestRewards, SeedTier};

/// Rewards for a quest of `tier` ending in `result`.
///
/// Base values come from the per-tier table (tier 1 largest). Success pays
/// in full and partial success pays half. Failure pays nothing and costs
/// half the base affinity and trust with the giver; abandoning costs all of
/// it.
#[must_use]
pub fn calculate_rewards(
    tier: SeedTier,
    result: QuestResult,
    config: &RewardConfig,
) -> QuestRewards {
    let i = tier.index();
    let (experience, gold, affinity, trust) = (
        config.experience[i],
        config.gold[i],
        config.affinity[i],
        config.trust[i],
    );

    match result {
        QuestResult::Success => QuestRewards {
            experience,
            gold,
            affinity,
            trust,
        },
        QuestResult::Partial => QuestRewards {
            experience: experience / 2,
            gold: gold / 2,
            affinity: affinity * 0.5,
            trust: trust * 0.5,
        },
        QuestResult::Failure => QuestRewards {
            experience: 0,
            gold: 0,
            affinity: -affinity * 0.5,
            trust: -trust * 0.5,
        },
        QuestResult::Abandoned => QuestRewards {
            experience: 0,
            gold: 0,
            affinity: -affinity,
            trust: -trust,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_one_pays_most() {
        let config = RewardConfig::default();

        let one = calculate_rewards(SeedTier::ONE, QuestResult::Success, &config);
        let three = calculate_rewards(SeedTier::THREE, QuestResult::Success, &config);

        assert!(one.experience > three.experience);
        assert!(one.gold > three.gold);
        assert!(one.affinity > three.affinity);
    }

    #[test]
    fn test_partial_pays_half() {
        let config = RewardConfig::default();

        let rewards = calculate_rewards(SeedTier::TWO, QuestResult::Partial, &config);

        assert_eq!(rewards.experience, 75);
        assert_eq!(rewards.gold, 30);
        assert!((rewards.affinity - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failure_and_abandonment_cost_standing() {
        let config = RewardConfig::default();

        let failed = calculate_rewards(SeedTier::THREE, QuestResult::Failure, &config);
        let abandoned = calculate_rewards(SeedTier::THREE, QuestResult::Abandoned, &config);

        assert_eq!(failed.experience, 0);
        assert!((failed.affinity + 2.5).abs() < f64::EPSILON);
        assert!((abandoned.trust + 3.0).abs() < f64::EPSILON);
    }
}
