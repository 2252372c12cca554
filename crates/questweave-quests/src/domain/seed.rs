//! Quest seeds: dormant hooks planted in conversation.
//!
//! Everything here is a pure function of its inputs and the injected RNG.

use questweave_core::config::{SeedConfig, SeedTtlConfig};
use questweave_core::event::ObjectiveHint;
use questweave_core::repository::Record;
use questweave_core::rng::DeterministicRng;
use questweave_core::vocabulary::{SeedTier, SeedType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedStatus {
    /// Planted and waiting for the player.
    Active,
    /// Turned into a quest.
    Accepted,
    /// Lifespan ran out before the player took it up.
    Expired,
    /// Settled by the world without the player.
    ResolvedOffscreen,
}

/// A dormant quest hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestSeed {
    pub id: Uuid,
    pub npc_id: String,
    pub player_id: String,
    pub seed_type: SeedType,
    pub seed_tier: SeedTier,
    pub created_turn: u32,
    /// The NPC's conversation count when the seed was planted.
    pub created_conversation: u32,
    pub ttl_turns: u32,
    pub status: SeedStatus,
    pub chain_id: Option<Uuid>,
    pub context_tags: Vec<String>,
    pub unresolved_threads: Vec<String>,
    pub objective_hints: Vec<ObjectiveHint>,
}

impl QuestSeed {
    /// Whether the seed's lifespan has run out at `turn`.
    #[must_use]
    pub fn is_expired_at(&self, turn: u32) -> bool {
        turn >= self.created_turn.saturating_add(self.ttl_turns)
    }
}

impl Record for QuestSeed {
    type Kind = SeedStatus;
    const NAME: &'static str = "quest seed";

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> Self::Kind {
        self.status
    }

    fn is_active(&self) -> bool {
        self.status == SeedStatus::Active
    }
}

/// Whether an NPC may plant another seed. Requires at least `cooldown`
/// conversations since the NPC's last seed; always true without one.
#[must_use]
pub fn can_generate_seed(
    last_seed_conversation: Option<u32>,
    current_conversation: u32,
    cooldown: u32,
) -> bool {
    last_seed_conversation
        .is_none_or(|last| current_conversation.saturating_sub(last) >= cooldown)
}

/// Independent per-conversation seed roll.
pub fn roll_seed(rng: &mut dyn DeterministicRng, config: &SeedConfig) -> bool {
    rng.roll(config.generation_chance)
}

/// Draws a tier from the configured weights (tier 1 rarest by default).
pub fn draw_seed_tier(rng: &mut dyn DeterministicRng, weights: [u32; 3]) -> SeedTier {
    let total: u32 = weights.iter().sum();
    if total == 0 {
        return SeedTier::THREE;
    }
    let mut pick = rng.next_u32_range(1, total);
    for (tier, weight) in [SeedTier::ONE, SeedTier::TWO, SeedTier::THREE]
        .into_iter()
        .zip(weights)
    {
        if pick <= weight {
            return tier;
        }
        pick -= weight;
    }
    SeedTier::THREE
}

/// Chain continuation roll; lower tiers chain far more often.
pub fn roll_chain_continuation(
    rng: &mut dyn DeterministicRng,
    tier: SeedTier,
    config: &SeedConfig,
) -> bool {
    rng.roll(config.chain_chance_for(tier))
}

/// Resolves a seed type named by the narrative layer. Unknown names fall
/// back to a `request` with the configured fallback lifespan.
#[must_use]
pub fn resolve_seed_type(name: &str, ttl: &SeedTtlConfig) -> (SeedType, u32, bool) {
    match name.parse::<SeedType>() {
        Ok(seed_type) => (seed_type, ttl.for_type(seed_type), true),
        Err(_) => (SeedType::Request, ttl.fallback, false),
    }
}

/// Flips an active seed to `expired` once its lifespan has run out.
/// Idempotent; returns whether the seed changed.
pub fn process_seed_ttl(seed: &mut QuestSeed, current_turn: u32) -> bool {
    if seed.status != SeedStatus::Active || !seed.is_expired_at(current_turn) {
        return false;
    }
    seed.status = SeedStatus::Expired;
    true
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use questweave_test_support::{MockRng, SequenceRng};

    use super::*;

    fn seed(created_turn: u32, ttl_turns: u32) -> QuestSeed {
        QuestSeed {
            id: Uuid::from_u128(1),
            npc_id: "miller".into(),
            player_id: "p1".into(),
            seed_type: SeedType::Request,
            seed_tier: SeedTier::THREE,
            created_turn,
            created_conversation: 2,
            ttl_turns,
            status: SeedStatus::Active,
            chain_id: None,
            context_tags: vec![],
            unresolved_threads: vec![],
            objective_hints: vec![],
        }
    }

    #[test]
    fn test_cooldown_blocks_recent_seed() {
        assert!(!can_generate_seed(Some(8), 10, 5));
        assert!(can_generate_seed(Some(5), 10, 5));
    }

    #[test]
    fn test_first_seed_is_always_eligible() {
        assert!(can_generate_seed(None, 0, 5));
    }

    #[test]
    fn test_ttl_expires_exactly_at_boundary() {
        let mut s = seed(10, 20);

        assert!(!process_seed_ttl(&mut s, 29));
        assert_eq!(s.status, SeedStatus::Active);
        assert!(process_seed_ttl(&mut s, 30));
        assert_eq!(s.status, SeedStatus::Expired);
    }

    #[test]
    fn test_ttl_processing_is_idempotent() {
        let mut s = seed(0, 10);
        assert!(process_seed_ttl(&mut s, 12));

        assert!(!process_seed_ttl(&mut s, 13));
        assert_eq!(s.status, SeedStatus::Expired);
    }

    #[test]
    fn test_accepted_seed_never_expires() {
        let mut s = seed(0, 10);
        s.status = SeedStatus::Accepted;

        assert!(!process_seed_ttl(&mut s, 100));
        assert_eq!(s.status, SeedStatus::Accepted);
    }

    #[test]
    fn test_tier_draw_walks_cumulative_weights() {
        let mut rng = SequenceRng::new(vec![1, 10, 11, 40, 41, 100]);
        let weights = [10, 30, 60];

        let tiers: Vec<u8> = (0..6)
            .map(|_| draw_seed_tier(&mut rng, weights).get())
            .collect();

        assert_eq!(tiers, vec![1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn test_seed_roll_uses_generation_chance() {
        let config = SeedConfig::default();

        assert!(roll_seed(&mut SequenceRng::floats(vec![0.049]), &config));
        assert!(!roll_seed(&mut SequenceRng::floats(vec![0.05]), &config));
    }

    #[test]
    fn test_chain_roll_scales_with_tier() {
        let config = SeedConfig::default();

        assert!(roll_chain_continuation(
            &mut SequenceRng::floats(vec![0.5]),
            SeedTier::ONE,
            &config
        ));
        assert!(!roll_chain_continuation(
            &mut SequenceRng::floats(vec![0.5]),
            SeedTier::THREE,
            &config
        ));
        assert!(roll_chain_continuation(&mut MockRng, SeedTier::THREE, &config));
    }

    #[test]
    fn test_unknown_seed_type_falls_back() {
        let ttl = SeedTtlConfig::default();

        assert_eq!(resolve_seed_type("warning", &ttl), (SeedType::Warning, 10, true));
        assert_eq!(resolve_seed_type("prophecy", &ttl), (SeedType::Request, 20, false));
    }

    proptest! {
        #[test]
        fn prop_ttl_expires_exactly_once(
            created in 0u32..1_000,
            ttl in 1u32..60,
            turn in 0u32..1_200,
        ) {
            let mut s = seed(created, ttl);

            let first = process_seed_ttl(&mut s, turn);
            let second = process_seed_ttl(&mut s, turn + 1);

            prop_assert_eq!(first, turn >= created + ttl);
            prop_assert!(!(first && second));
        }

        #[test]
        fn prop_drawn_tier_follows_weights(draw in 1u32..=100) {
            let mut rng = SequenceRng::new(vec![draw]);

            let tier = draw_seed_tier(&mut rng, [10, 30, 60]);

            let expected = match draw {
                1..=10 => SeedTier::ONE,
                11..=40 => SeedTier::TWO,
                _ => SeedTier::THREE,
            };
            prop_assert_eq!(tier, expected);
        }
    }
}
