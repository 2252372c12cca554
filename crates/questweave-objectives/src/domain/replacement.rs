//! Replacement objectives for failed ones.

use questweave_core::vocabulary::FailReason;
use questweave_quests::domain::objective::{Objective, ObjectiveTarget, ReplacementOrigin};
use questweave_quests::domain::quest::Quest;
use uuid::Uuid;

/// Where the failure happened and who commissioned the work.
#[derive(Debug, Clone, Copy)]
pub struct ReplacementContext<'a> {
    pub client_npc_id: &'a str,
    /// Node where the target died, if known.
    pub death_node_id: Option<&'a str>,
}

impl<'a> ReplacementContext<'a> {
    /// Context whose client is the quest giver.
    #[must_use]
    pub fn for_quest(quest: &'a Quest, death_node_id: Option<&'a str>) -> Self {
        Self {
            client_npc_id: &quest.giver_npc_id,
            death_node_id,
        }
    }
}

fn replacement(
    failed: &Objective,
    origin: ReplacementOrigin,
    description: String,
    target: ObjectiveTarget,
) -> Objective {
    // Derived ids: the same failure always yields the same replacements.
    let id = Uuid::new_v5(&failed.id, origin.as_str().as_bytes());
    Objective::new(id, failed.quest_id, failed.player_id.clone(), description, target)
        .replacing(failed.id, origin)
}

/// Successor objectives for `failed`, which failed for `reason`.
///
/// The client is consulted unless the client is the one who died. A dead
/// target additionally opens a type-specific way to salvage the job:
/// remains to retrieve, goods to hand to the client, or belongings to
/// search. No successor ever depends on the NPC whose death caused the
/// failure; a dead client is mourned where they fell, if that is known.
#[must_use]
pub fn generate_replacements(
    failed: &Objective,
    reason: FailReason,
    ctx: ReplacementContext<'_>,
) -> Vec<Objective> {
    let client = ctx.client_npc_id;
    let mut out = vec![replacement(
        failed,
        ReplacementOrigin::ClientConsult,
        format!("Report to {client} about: {}", failed.description),
        ObjectiveTarget::TalkToNpc {
            npc_id: client.to_owned(),
            topic: None,
        },
    )];

    if reason != FailReason::TargetDead {
        return out;
    }

    match &failed.target {
        ObjectiveTarget::Escort {
            npc_id,
            destination_node_id,
        } => {
            let node = ctx.death_node_id.unwrap_or(destination_node_id);
            out.push(replacement(
                failed,
                ReplacementOrigin::RetrieveRemains,
                format!("Retrieve the remains of {npc_id}"),
                ObjectiveTarget::ReachNode {
                    node_id: node.to_owned(),
                    require_action: Some(ReplacementOrigin::RetrieveRemains.as_str().to_owned()),
                },
            ));
        }
        ObjectiveTarget::Deliver {
            item_id,
            item_tag,
            quantity,
            recipient_id,
        } => {
            out.push(replacement(
                failed,
                ReplacementOrigin::HandToClient,
                format!("Hand the goods meant for {recipient_id} to {client}"),
                ObjectiveTarget::Deliver {
                    item_id: item_id.clone(),
                    item_tag: item_tag.clone(),
                    quantity: *quantity,
                    recipient_id: client.to_owned(),
                },
            ));
        }
        ObjectiveTarget::TalkToNpc { npc_id, .. } => {
            if let Some(node) = ctx.death_node_id {
                out.push(replacement(
                    failed,
                    ReplacementOrigin::SearchBelongings,
                    format!("Search the belongings of {npc_id}"),
                    ObjectiveTarget::ReachNode {
                        node_id: node.to_owned(),
                        require_action: Some(
                            ReplacementOrigin::SearchBelongings.as_str().to_owned(),
                        ),
                    },
                ));
            }
        }
        ObjectiveTarget::ReachNode { .. } | ObjectiveTarget::ResolveCheck { .. } => {}
    }

    let Some(dead) = failed.target.dependent_npc() else {
        return out;
    };
    out.retain(|o| o.target.dependent_npc() != Some(dead));
    if dead == client {
        if let Some(node) = ctx.death_node_id {
            out.push(replacement(
                failed,
                ReplacementOrigin::PayRespects,
                format!("Visit the place where {client} fell"),
                ObjectiveTarget::ReachNode {
                    node_id: node.to_owned(),
                    require_action: None,
                },
            ));
        }
    }
    out
}
