//! Matching gameplay events against objectives.
//!
//! [`evaluate`] dispatches exhaustively on the objective's target, so a new
//! objective type cannot be added without deciding how it matches.

use questweave_core::collaborators::CompanionDirectory;
use questweave_core::event::EventPayload;
use questweave_core::vocabulary::{FailReason, ObjectiveType};
use questweave_quests::domain::objective::{Objective, ObjectiveTarget};

/// Outcome of testing one event against one objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The event does not concern this objective.
    Ignore,
    /// Partial delivery; the new running total.
    Progress { delivered: u32 },
    Complete,
    Fail(FailReason),
}

/// What the matcher needs besides the event.
pub struct MatchContext<'a> {
    pub companions: &'a dyn CompanionDirectory,
    /// Quantity already delivered towards a `deliver` objective.
    pub delivered_so_far: u32,
}

/// Objective types an event can move.
#[must_use]
pub fn candidate_types(payload: &EventPayload) -> &'static [ObjectiveType] {
    match payload {
        EventPayload::PlayerMoved(_) => &[ObjectiveType::ReachNode, ObjectiveType::Escort],
        EventPayload::ActionCompleted(_) => &[ObjectiveType::ReachNode],
        EventPayload::DialogueStarted(_) | EventPayload::DialogueEnded(_) => {
            &[ObjectiveType::TalkToNpc]
        }
        EventPayload::ItemGiven(_) => &[ObjectiveType::Deliver],
        EventPayload::CheckResult(_) => &[ObjectiveType::ResolveCheck],
        EventPayload::NpcDied(_) => &[
            ObjectiveType::Escort,
            ObjectiveType::TalkToNpc,
            ObjectiveType::Deliver,
        ],
        _ => &[],
    }
}

fn verdict(matched: bool) -> Verdict {
    if matched {
        Verdict::Complete
    } else {
        Verdict::Ignore
    }
}

/// Tests `payload` against `objective`.
#[must_use]
pub fn evaluate(objective: &Objective, payload: &EventPayload, ctx: &MatchContext<'_>) -> Verdict {
    if let EventPayload::NpcDied(p) = payload {
        // A death fails the objective whoever's quest it is.
        return if objective.target.dependent_npc() == Some(p.npc_id.as_str()) {
            Verdict::Fail(FailReason::TargetDead)
        } else {
            Verdict::Ignore
        };
    }
    let mine = |player_id: &str| objective.player_id == player_id;

    match &objective.target {
        ObjectiveTarget::ReachNode {
            node_id,
            require_action: None,
        } => match payload {
            EventPayload::PlayerMoved(p) => verdict(mine(&p.player_id) && p.node_id == *node_id),
            _ => Verdict::Ignore,
        },
        ObjectiveTarget::ReachNode {
            node_id,
            require_action: Some(action),
        } => match payload {
            EventPayload::ActionCompleted(p) => verdict(
                mine(&p.player_id) && p.node_id == *node_id && p.action_type == *action,
            ),
            _ => Verdict::Ignore,
        },
        ObjectiveTarget::Deliver {
            item_id,
            item_tag,
            quantity,
            recipient_id,
        } => match payload {
            EventPayload::ItemGiven(p) => {
                let item_matches = item_id.as_deref() == Some(p.item_id.as_str())
                    || item_tag
                        .as_ref()
                        .is_some_and(|tag| p.item_tags.contains(tag));
                if !mine(&p.player_id) || p.recipient_id != *recipient_id || !item_matches {
                    return Verdict::Ignore;
                }
                let delivered = ctx.delivered_so_far.saturating_add(p.quantity);
                if delivered >= *quantity {
                    Verdict::Complete
                } else {
                    Verdict::Progress { delivered }
                }
            }
            _ => Verdict::Ignore,
        },
        ObjectiveTarget::Escort {
            npc_id,
            destination_node_id,
        } => match payload {
            EventPayload::PlayerMoved(p) => verdict(
                mine(&p.player_id)
                    && p.node_id == *destination_node_id
                    && ctx.companions.is_companion(&p.player_id, npc_id),
            ),
            _ => Verdict::Ignore,
        },
        ObjectiveTarget::TalkToNpc { npc_id, topic } => match (topic, payload) {
            (None, EventPayload::DialogueStarted(p)) => {
                verdict(mine(&p.player_id) && p.npc_id == *npc_id)
            }
            (Some(topic), EventPayload::DialogueEnded(p)) => verdict(
                mine(&p.player_id)
                    && p.npc_id == *npc_id
                    && (p.topic_tags.contains(topic) || p.memory_tags.contains(topic)),
            ),
            _ => Verdict::Ignore,
        },
        ObjectiveTarget::ResolveCheck {
            min_tier,
            stat,
            context_tags,
        } => match payload {
            EventPayload::CheckResult(p) => verdict(
                mine(&p.player_id)
                    && p.tier >= *min_tier
                    && stat.as_ref().is_none_or(|s| p.stat.as_ref() == Some(s))
                    && context_tags.iter().all(|tag| p.context_tags.contains(tag)),
            ),
            _ => Verdict::Ignore,
        },
    }
}
