//! Objectives: concrete, matchable sub-goals of a quest.

use questweave_core::error::DomainError;
use questweave_core::repository::Record;
use questweave_core::vocabulary::{CheckTier, FailReason, ObjectiveType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an objective. Terminal once it leaves `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveStatus {
    Active,
    Completed,
    Failed,
}

/// What an objective asks for. The variant fixes the objective type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "objective_type", rename_all = "snake_case")]
pub enum ObjectiveTarget {
    /// Reach a node; with `require_action`, also perform that action there.
    ReachNode {
        node_id: String,
        #[serde(default)]
        require_action: Option<String>,
    },
    /// Hand `quantity` items to `recipient_id`, matched by exact item or by
    /// a shared tag.
    Deliver {
        #[serde(default)]
        item_id: Option<String>,
        #[serde(default)]
        item_tag: Option<String>,
        #[serde(default = "one")]
        quantity: u32,
        recipient_id: String,
    },
    /// Arrive at `destination_node_id` with `npc_id` as a companion.
    Escort {
        npc_id: String,
        destination_node_id: String,
    },
    /// Speak with `npc_id`; with `topic`, the topic must come up.
    TalkToNpc {
        npc_id: String,
        #[serde(default)]
        topic: Option<String>,
    },
    /// Pass a check at or above `min_tier`.
    ResolveCheck {
        min_tier: CheckTier,
        #[serde(default)]
        stat: Option<String>,
        #[serde(default)]
        context_tags: Vec<String>,
    },
}

fn one() -> u32 {
    1
}

impl ObjectiveTarget {
    #[must_use]
    pub fn objective_type(&self) -> ObjectiveType {
        match self {
            Self::ReachNode { .. } => ObjectiveType::ReachNode,
            Self::Deliver { .. } => ObjectiveType::Deliver,
            Self::Escort { .. } => ObjectiveType::Escort,
            Self::TalkToNpc { .. } => ObjectiveType::TalkToNpc,
            Self::ResolveCheck { .. } => ObjectiveType::ResolveCheck,
        }
    }

    /// The NPC whose death makes this objective impossible, if any.
    #[must_use]
    pub fn dependent_npc(&self) -> Option<&str> {
        match self {
            Self::Escort { npc_id, .. } | Self::TalkToNpc { npc_id, .. } => Some(npc_id),
            Self::Deliver { recipient_id, .. } => Some(recipient_id),
            Self::ReachNode { .. } | Self::ResolveCheck { .. } => None,
        }
    }

    /// Parses a narrative hint (`objective_type` name plus a loose target
    /// map) into a validated target.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for unknown types, non-object
    /// targets, missing or empty fields.
    pub fn from_hint(
        objective_type: &str,
        target: &serde_json::Value,
    ) -> Result<Self, DomainError> {
        let objective_type: ObjectiveType = objective_type
            .parse()
            .map_err(|e| DomainError::Validation(format!("{e}")))?;
        let serde_json::Value::Object(map) = target else {
            return Err(DomainError::Validation(format!(
                "{objective_type} target must be an object"
            )));
        };
        let mut tagged = map.clone();
        tagged.insert(
            "objective_type".to_owned(),
            serde_json::Value::String(objective_type.as_str().to_owned()),
        );
        let parsed: Self = serde_json::from_value(serde_json::Value::Object(tagged))
            .map_err(|e| DomainError::Validation(format!("{objective_type} target: {e}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Checks field-level constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` naming the offending field.
    pub fn validate(&self) -> Result<(), DomainError> {
        fn required(field: &str, value: &str) -> Result<(), DomainError> {
            if value.trim().is_empty() {
                return Err(DomainError::Validation(format!("{field} must not be empty")));
            }
            Ok(())
        }

        match self {
            Self::ReachNode { node_id, .. } => required("node_id", node_id),
            Self::Deliver {
                item_id,
                item_tag,
                quantity,
                recipient_id,
            } => {
                required("recipient_id", recipient_id)?;
                if *quantity == 0 {
                    return Err(DomainError::Validation("quantity must be positive".into()));
                }
                if item_id.is_none() && item_tag.is_none() {
                    return Err(DomainError::Validation(
                        "deliver needs an item_id or an item_tag".into(),
                    ));
                }
                Ok(())
            }
            Self::Escort {
                npc_id,
                destination_node_id,
            } => {
                required("npc_id", npc_id)?;
                required("destination_node_id", destination_node_id)
            }
            Self::TalkToNpc { npc_id, .. } => required("npc_id", npc_id),
            Self::ResolveCheck { .. } => Ok(()),
        }
    }
}

/// Why a replacement objective was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementOrigin {
    /// Go back to the client and report.
    ClientConsult,
    /// Recover the remains of an escorted NPC.
    RetrieveRemains,
    /// Give the goods to the client instead of the dead recipient.
    HandToClient,
    /// Search a dead contact's belongings for what they knew.
    SearchBelongings,
    /// Visit the place where the client fell.
    PayRespects,
}

impl ReplacementOrigin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientConsult => "client_consult",
            Self::RetrieveRemains => "retrieve_remains",
            Self::HandToClient => "hand_to_client",
            Self::SearchBelongings => "search_belongings",
            Self::PayRespects => "pay_respects",
        }
    }
}

/// Why and where an objective failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveFailure {
    pub reason: FailReason,
    pub node_id: Option<String>,
    pub turn: u32,
}

/// One sub-goal of a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub id: Uuid,
    pub quest_id: Uuid,
    /// Player pursuing the parent quest.
    pub player_id: String,
    pub description: String,
    pub target: ObjectiveTarget,
    pub status: ObjectiveStatus,
    pub is_replacement: bool,
    pub replaced_objective_id: Option<Uuid>,
    pub replacement_origin: Option<ReplacementOrigin>,
    pub failure: Option<ObjectiveFailure>,
}

impl Objective {
    /// A fresh, active objective.
    #[must_use]
    pub fn new(
        id: Uuid,
        quest_id: Uuid,
        player_id: impl Into<String>,
        description: impl Into<String>,
        target: ObjectiveTarget,
    ) -> Self {
        Self {
            id,
            quest_id,
            player_id: player_id.into(),
            description: description.into(),
            target,
            status: ObjectiveStatus::Active,
            is_replacement: false,
            replaced_objective_id: None,
            replacement_origin: None,
            failure: None,
        }
    }

    /// Marks this objective as a successor of `replaced`.
    #[must_use]
    pub fn replacing(mut self, replaced: Uuid, origin: ReplacementOrigin) -> Self {
        self.is_replacement = true;
        self.replaced_objective_id = Some(replaced);
        self.replacement_origin = Some(origin);
        self
    }

    #[must_use]
    pub fn objective_type(&self) -> ObjectiveType {
        self.target.objective_type()
    }

    /// Completes an active objective. Returns false if it was already
    /// terminal.
    pub fn complete(&mut self) -> bool {
        if self.status != ObjectiveStatus::Active {
            return false;
        }
        self.status = ObjectiveStatus::Completed;
        true
    }

    /// Fails an active objective. Returns false if it was already terminal.
    pub fn fail(&mut self, failure: ObjectiveFailure) -> bool {
        if self.status != ObjectiveStatus::Active {
            return false;
        }
        self.status = ObjectiveStatus::Failed;
        self.failure = Some(failure);
        true
    }
}

impl Record for Objective {
    type Kind = ObjectiveType;
    const NAME: &'static str = "objective";

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> Self::Kind {
        self.objective_type()
    }

    fn is_active(&self) -> bool {
        self.status == ObjectiveStatus::Active
    }
}
