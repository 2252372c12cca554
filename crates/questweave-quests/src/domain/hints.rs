//! Turning narrative objective hints into objective targets.

use questweave_core::event::ObjectiveHint;
use questweave_core::vocabulary::SeedType;
use tracing::warn;

use super::objective::ObjectiveTarget;

/// A validated objective ready to be instantiated.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedObjective {
    pub description: String,
    pub target: ObjectiveTarget,
}

/// Validates every hint and keeps the ones that parse. Invalid hints are
/// logged and dropped. If none survive, a single fallback objective is
/// returned instead, so the result is never empty.
#[must_use]
pub fn plan_objectives(
    hints: &[ObjectiveHint],
    seed_type: SeedType,
    giver_npc_id: &str,
    target_node_ids: &[String],
) -> Vec<PlannedObjective> {
    let planned: Vec<PlannedObjective> = hints
        .iter()
        .filter_map(|hint| {
            match ObjectiveTarget::from_hint(&hint.objective_type, &hint.target) {
                Ok(target) => Some(PlannedObjective {
                    description: hint.description.clone(),
                    target,
                }),
                Err(e) => {
                    warn!(objective_type = %hint.objective_type, error = %e, "dropping objective hint");
                    None
                }
            }
        })
        .collect();

    if planned.is_empty() {
        vec![fallback_objective(seed_type, giver_npc_id, target_node_ids)]
    } else {
        planned
    }
}

/// The objective used when no hint survives validation. Rumors and
/// warnings point at a place when one is known; everything else sends the
/// player back to the quest giver.
#[must_use]
pub fn fallback_objective(
    seed_type: SeedType,
    giver_npc_id: &str,
    target_node_ids: &[String],
) -> PlannedObjective {
    match (seed_type, target_node_ids.first()) {
        (SeedType::Rumor | SeedType::Warning, Some(node_id)) => PlannedObjective {
            description: format!("Investigate {node_id}"),
            target: ObjectiveTarget::ReachNode {
                node_id: node_id.clone(),
                require_action: None,
            },
        },
        _ => PlannedObjective {
            description: format!("Speak with {giver_npc_id}"),
            target: ObjectiveTarget::TalkToNpc {
                npc_id: giver_npc_id.to_owned(),
                topic: None,
            },
        },
    }
}
