//! Deriving a quest's result from its objectives.

use questweave_core::vocabulary::QuestResult;

use super::objective::{Objective, ObjectiveStatus};
use super::quest::Quest;

/// Decides whether `quest` is resolved at `turn`.
///
/// * An urgent quest past its time limit fails regardless of objectives.
/// * While any objective is active, there is no result yet.
/// * All completed: `success`. All failed: `failure`.
/// * A mix is `partial` when at least one replacement completed, and
///   `failure` otherwise.
#[must_use]
pub fn resolve_quest(quest: &Quest, objectives: &[Objective], turn: u32) -> Option<QuestResult> {
    if !quest.is_active() {
        return None;
    }
    if quest.is_past_time_limit(turn) {
        return Some(QuestResult::Failure);
    }
    if objectives.is_empty()
        || objectives
            .iter()
            .any(|o| o.status == ObjectiveStatus::Active)
    {
        return None;
    }

    let completed = objectives
        .iter()
        .filter(|o| o.status == ObjectiveStatus::Completed)
        .count();
    if completed == objectives.len() {
        return Some(QuestResult::Success);
    }
    if completed == 0 {
        return Some(QuestResult::Failure);
    }
    let replacement_succeeded = objectives
        .iter()
        .any(|o| o.is_replacement && o.status == ObjectiveStatus::Completed);
    Some(if replacement_succeeded {
        QuestResult::Partial
    } else {
        QuestResult::Failure
    })
}

#[cfg(test)]
mod tests {
    use questweave_core::vocabulary::FailReason;
    use uuid::Uuid;

    use super::*;
    use crate::domain::objective::{ObjectiveFailure, ObjectiveTarget, ReplacementOrigin};
    use crate::domain::quest::Urgency;
    use crate::domain::quest::fixtures::quest;

    fn objective(n: u128, status: ObjectiveStatus) -> Objective {
        let mut o = Objective::new(
            Uuid::from_u128(n),
            Uuid::from_u128(100),
            "p1",
            "",
            ObjectiveTarget::ReachNode {
                node_id: format!("node-{n}"),
                require_action: None,
            },
        );
        match status {
            ObjectiveStatus::Active => {}
            ObjectiveStatus::Completed => {
                o.complete();
            }
            ObjectiveStatus::Failed => {
                o.fail(ObjectiveFailure {
                    reason: FailReason::TargetDead,
                    node_id: None,
                    turn: 1,
                });
            }
        }
        o
    }

    #[test]
    fn test_open_objective_means_no_result() {
        let objectives = vec![
            objective(1, ObjectiveStatus::Completed),
            objective(2, ObjectiveStatus::Active),
        ];

        assert_eq!(resolve_quest(&quest(), &objectives, 12), None);
    }

    #[test]
    fn test_all_completed_is_success() {
        let objectives = vec![
            objective(1, ObjectiveStatus::Completed),
            objective(2, ObjectiveStatus::Completed),
        ];

        assert_eq!(
            resolve_quest(&quest(), &objectives, 12),
            Some(QuestResult::Success)
        );
    }

    #[test]
    fn test_all_failed_is_failure() {
        let objectives = vec![objective(1, ObjectiveStatus::Failed)];

        assert_eq!(
            resolve_quest(&quest(), &objectives, 12),
            Some(QuestResult::Failure)
        );
    }

    #[test]
    fn test_completed_replacement_makes_partial() {
        let consult = objective(2, ObjectiveStatus::Completed)
            .replacing(Uuid::from_u128(1), ReplacementOrigin::ClientConsult);
        let objectives = vec![objective(1, ObjectiveStatus::Failed), consult];

        assert_eq!(
            resolve_quest(&quest(), &objectives, 12),
            Some(QuestResult::Partial)
        );
    }

    #[test]
    fn test_mix_without_replacement_is_failure() {
        let objectives = vec![
            objective(1, ObjectiveStatus::Failed),
            objective(2, ObjectiveStatus::Completed),
        ];

        assert_eq!(
            resolve_quest(&quest(), &objectives, 12),
            Some(QuestResult::Failure)
        );
    }

    #[test]
    fn test_urgent_quest_past_limit_fails_despite_progress() {
        let mut q = quest();
        q.urgency = Urgency::Urgent;
        q.time_limit = Some(3);
        let objectives = vec![objective(1, ObjectiveStatus::Active)];

        assert_eq!(resolve_quest(&q, &objectives, 13), Some(QuestResult::Failure));
    }
}
