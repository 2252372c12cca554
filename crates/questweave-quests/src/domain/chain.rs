//! Chain continuation: who may carry a story forward, and when it ends.

use questweave_core::config::QuestConfig;
use questweave_core::rng::DeterministicRng;
use questweave_core::vocabulary::SeedTier;

use super::quest::{ChainEligibleNpc, NpcRefType, Quest};

/// NPCs who may continue `quest`'s story.
///
/// The giver is always eligible. Tier 1 and 2 quests add up to
/// `max_witnesses` related NPCs. Tier 1 quests also propose up to
/// `max_unborn_slots` NPCs that do not exist yet, one per quest tag, to be
/// filled by a later promotion.
#[must_use]
pub fn build_chain_eligible_npcs(quest: &Quest, config: &QuestConfig) -> Vec<ChainEligibleNpc> {
    let mut eligible = vec![ChainEligibleNpc {
        npc_ref: quest.giver_npc_id.clone(),
        ref_type: NpcRefType::Existing,
        node_hint: None,
        reason: "quest_giver".to_owned(),
        matched_npc_id: None,
    }];

    if quest.seed_tier <= SeedTier::TWO {
        eligible.extend(
            quest
                .related_npc_ids
                .iter()
                .filter(|id| **id != quest.giver_npc_id)
                .take(config.max_witnesses)
                .map(|id| ChainEligibleNpc {
                    npc_ref: id.clone(),
                    ref_type: NpcRefType::Existing,
                    node_hint: None,
                    reason: "witness".to_owned(),
                    matched_npc_id: None,
                }),
        );
    }

    if quest.seed_tier == SeedTier::ONE {
        let node_hint = quest.target_node_ids.first().cloned();
        eligible.extend(
            quest
                .tags
                .iter()
                .take(config.max_unborn_slots)
                .map(|tag| ChainEligibleNpc {
                    npc_ref: tag.clone(),
                    ref_type: NpcRefType::Unborn,
                    node_hint: node_hint.clone(),
                    reason: format!("unborn:{tag}"),
                    matched_npc_id: None,
                }),
        );
    }

    eligible
}

/// Whether a newly promoted NPC fills an unborn slot: its tags must contain
/// the slot's reference and, if the slot names a node, it must be there.
#[must_use]
pub fn match_unborn_npc(
    eligible: &ChainEligibleNpc,
    candidate_tags: &[String],
    candidate_node: Option<&str>,
) -> bool {
    if eligible.ref_type != NpcRefType::Unborn || eligible.matched_npc_id.is_some() {
        return false;
    }
    if !candidate_tags.iter().any(|tag| *tag == eligible.npc_ref) {
        return false;
    }
    match &eligible.node_hint {
        Some(node) => candidate_node == Some(node.as_str()),
        None => true,
    }
}

/// Chance that a chain of `chain_length` quests finalizes now.
#[must_use]
pub fn finalization_chance(chain_length: usize, config: &QuestConfig) -> f64 {
    if chain_length <= 1 {
        return 0.0;
    }
    config
        .finalization_chance
        .get(chain_length - 1)
        .or(config.finalization_chance.last())
        .copied()
        .unwrap_or(0.0)
}

/// Rolls chain finalization. A one-quest chain never finalizes and never
/// consumes a draw.
pub fn roll_chain_finalization(
    rng: &mut dyn DeterministicRng,
    chain_length: usize,
    config: &QuestConfig,
) -> bool {
    let chance = finalization_chance(chain_length, config);
    chance > 0.0 && rng.roll(chance)
}
