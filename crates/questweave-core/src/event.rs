//! Event envelope, event vocabulary and typed payloads.
//!
//! Every event name in the kernel's vocabulary has exactly one payload
//! struct. Only the envelope ([`GameEvent`]) is generic; handlers match on
//! [`EventPayload`] to get at typed data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::vocabulary::{
    CheckTier, FailReason, ObjectiveType, QuestResult, QuestRewards, RelationshipStatus,
    ReversalKind, SeedTier, SeedType, UnknownVariant,
};

/// Names of every event the kernel publishes or consumes. The wire names
/// are shared with the rest of the game and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DialogueStarted,
    DialogueEnded,
    PlayerMoved,
    ActionCompleted,
    ItemGiven,
    CheckResult,
    NpcDied,
    NpcPromoted,
    QuestActivated,
    QuestCompleted,
    QuestFailed,
    QuestAbandoned,
    QuestSeedCreated,
    QuestSeedExpired,
    QuestChainFormed,
    QuestChainFinalized,
    ChainEligibleMatched,
    ObjectiveCompleted,
    ObjectiveFailed,
    RelationshipChanged,
    RelationshipReversed,
    AttitudeRequest,
    AttitudeResponse,
    TurnProcessed,
}

impl EventType {
    /// Every event type, in vocabulary order.
    pub const ALL: [Self; 24] = [
        Self::DialogueStarted,
        Self::DialogueEnded,
        Self::PlayerMoved,
        Self::ActionCompleted,
        Self::ItemGiven,
        Self::CheckResult,
        Self::NpcDied,
        Self::NpcPromoted,
        Self::QuestActivated,
        Self::QuestCompleted,
        Self::QuestFailed,
        Self::QuestAbandoned,
        Self::QuestSeedCreated,
        Self::QuestSeedExpired,
        Self::QuestChainFormed,
        Self::QuestChainFinalized,
        Self::ChainEligibleMatched,
        Self::ObjectiveCompleted,
        Self::ObjectiveFailed,
        Self::RelationshipChanged,
        Self::RelationshipReversed,
        Self::AttitudeRequest,
        Self::AttitudeResponse,
        Self::TurnProcessed,
    ];

    /// Returns the wire name of this event type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DialogueStarted => "dialogue_started",
            Self::DialogueEnded => "dialogue_ended",
            Self::PlayerMoved => "player_moved",
            Self::ActionCompleted => "action_completed",
            Self::ItemGiven => "item_given",
            Self::CheckResult => "check_result",
            Self::NpcDied => "npc_died",
            Self::NpcPromoted => "npc_promoted",
            Self::QuestActivated => "quest_activated",
            Self::QuestCompleted => "quest_completed",
            Self::QuestFailed => "quest_failed",
            Self::QuestAbandoned => "quest_abandoned",
            Self::QuestSeedCreated => "quest_seed_created",
            Self::QuestSeedExpired => "quest_seed_expired",
            Self::QuestChainFormed => "quest_chain_formed",
            Self::QuestChainFinalized => "quest_chain_finalized",
            Self::ChainEligibleMatched => "chain_eligible_matched",
            Self::ObjectiveCompleted => "objective_completed",
            Self::ObjectiveFailed => "objective_failed",
            Self::RelationshipChanged => "relationship_changed",
            Self::RelationshipReversed => "relationship_reversed",
            Self::AttitudeRequest => "attitude_request",
            Self::AttitudeResponse => "attitude_response",
            Self::TurnProcessed => "turn_processed",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event_type| event_type.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "EventType",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Collaborator data carried by dialogue payloads
// ---------------------------------------------------------------------------

/// Relationship change proposed by the narrative collaborator at the end of
/// a conversation. Values are raw; the relationship service clamps them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationshipDelta {
    /// Proposed affinity change.
    pub affinity: f64,
    /// Proposed trust change.
    pub trust: f64,
}

/// An objective suggested by the narrative collaborator, not yet validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveHint {
    /// Claimed objective type (free text until validated).
    pub objective_type: String,
    /// Player-facing description.
    #[serde(default)]
    pub description: String,
    /// Type-specific target fields.
    #[serde(default)]
    pub target: serde_json::Value,
}

/// Seed content produced by the narrative collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestSeedResponse {
    /// Claimed seed type (`personal`, `rumor`, `request`, `warning`).
    pub seed_type: String,
    /// Tags describing the seed's narrative context.
    #[serde(default)]
    pub context_tags: Vec<String>,
    /// Open narrative threads the seed hints at.
    #[serde(default)]
    pub unresolved_threads: Vec<String>,
    /// Suggested objectives for the quest this seed may become.
    #[serde(default)]
    pub objective_hints: Vec<ObjectiveHint>,
}

// ---------------------------------------------------------------------------
// Gameplay payloads
// ---------------------------------------------------------------------------

/// A conversation between the player and an NPC began.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueStarted {
    pub player_id: String,
    pub npc_id: String,
    pub turn: u32,
}

/// A conversation ended; carries everything the narrative layer produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueEnded {
    pub player_id: String,
    pub npc_id: String,
    pub turn: u32,
    /// How many conversations the player has had with this NPC, this one
    /// included.
    pub conversation_count: u32,
    #[serde(default)]
    pub relationship_delta: Option<RelationshipDelta>,
    #[serde(default)]
    pub memory_tags: Vec<String>,
    #[serde(default)]
    pub topic_tags: Vec<String>,
    #[serde(default)]
    pub quest_seed_response: Option<QuestSeedResponse>,
}

/// The player arrived at a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMoved {
    pub player_id: String,
    #[serde(default)]
    pub from_node_id: Option<String>,
    pub node_id: String,
    pub turn: u32,
}

/// The player performed a named action at a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCompleted {
    pub player_id: String,
    pub node_id: String,
    pub action_type: String,
    pub turn: u32,
}

/// The player handed items to someone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemGiven {
    pub player_id: String,
    pub recipient_id: String,
    pub item_id: String,
    #[serde(default)]
    pub item_tags: Vec<String>,
    pub quantity: u32,
    pub turn: u32,
}

/// A dice check was resolved by the check engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub player_id: String,
    pub tier: CheckTier,
    #[serde(default)]
    pub stat: Option<String>,
    #[serde(default)]
    pub context_tags: Vec<String>,
    pub turn: u32,
}

/// An NPC died.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcDied {
    pub npc_id: String,
    #[serde(default)]
    pub node_id: Option<String>,
    pub turn: u32,
}

/// A background NPC was promoted to a full character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcPromoted {
    pub npc_id: String,
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub node_id: Option<String>,
    /// Interactions the player already had with the NPC before promotion.
    #[serde(default)]
    pub prior_interactions: u32,
    pub turn: u32,
}

// ---------------------------------------------------------------------------
// Quest payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestActivated {
    pub quest_id: Uuid,
    pub seed_id: Option<Uuid>,
    pub player_id: String,
    pub npc_id: String,
    pub objective_ids: Vec<Uuid>,
    pub turn: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestCompleted {
    pub quest_id: Uuid,
    pub player_id: String,
    pub npc_id: String,
    pub result: QuestResult,
    pub rewards: QuestRewards,
    pub chain_id: Option<Uuid>,
    pub turn: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestFailed {
    pub quest_id: Uuid,
    pub player_id: String,
    pub npc_id: String,
    pub rewards: QuestRewards,
    pub chain_id: Option<Uuid>,
    pub turn: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestAbandoned {
    pub quest_id: Uuid,
    pub player_id: String,
    pub npc_id: String,
    pub rewards: QuestRewards,
    pub turn: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestSeedCreated {
    pub seed_id: Uuid,
    pub npc_id: String,
    pub player_id: String,
    pub seed_type: SeedType,
    pub seed_tier: SeedTier,
    pub chain_id: Option<Uuid>,
    pub ttl_turns: u32,
    pub turn: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestSeedExpired {
    pub seed_id: Uuid,
    pub npc_id: String,
    pub turn: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestChainFormed {
    pub chain_id: Uuid,
    pub seed_id: Uuid,
    pub npc_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestChainFinalized {
    pub chain_id: Uuid,
    pub quest_id: Uuid,
    pub chain_length: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEligibleMatched {
    pub quest_id: Uuid,
    pub chain_id: Option<Uuid>,
    /// The unborn slot reference (a tag) that was filled.
    pub npc_ref: String,
    pub npc_id: String,
}

// ---------------------------------------------------------------------------
// Objective payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveCompleted {
    pub objective_id: Uuid,
    pub quest_id: Uuid,
    pub objective_type: ObjectiveType,
    pub turn: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveFailed {
    pub objective_id: Uuid,
    pub quest_id: Uuid,
    pub objective_type: ObjectiveType,
    pub reason: FailReason,
    pub replacement_ids: Vec<Uuid>,
    pub turn: u32,
}

// ---------------------------------------------------------------------------
// Relationship payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipChanged {
    pub relationship_id: Uuid,
    pub source_id: String,
    pub target_id: String,
    pub affinity: f64,
    pub trust: f64,
    pub familiarity: u32,
    pub previous_status: RelationshipStatus,
    pub status: RelationshipStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipReversed {
    pub relationship_id: Uuid,
    pub source_id: String,
    pub target_id: String,
    pub kind: ReversalKind,
    pub status: RelationshipStatus,
}

/// Another module asks how `source_id` regards `target_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttitudeRequest {
    pub requester: String,
    pub source_id: String,
    pub target_id: String,
}

/// Answer to an [`AttitudeRequest`]; `status` is `None` when the two have
/// never interacted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttitudeResponse {
    pub requester: String,
    pub source_id: String,
    pub target_id: String,
    pub status: Option<RelationshipStatus>,
    pub affinity: f64,
    pub trust: f64,
    pub familiarity: u32,
}

/// All per-turn effects have settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnProcessed {
    pub turn: u32,
}

// ---------------------------------------------------------------------------
// Payload union and envelope
// ---------------------------------------------------------------------------

macro_rules! payloads {
    ($($variant:ident),+ $(,)?) => {
        /// Typed payload of an event; the variant determines the event type.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
        pub enum EventPayload {
            $($variant($variant)),+
        }

        impl EventPayload {
            /// Returns the event type this payload belongs to.
            #[must_use]
            pub fn event_type(&self) -> EventType {
                match self {
                    $(Self::$variant(_) => EventType::$variant),+
                }
            }
        }

        $(
            impl From<$variant> for EventPayload {
                fn from(payload: $variant) -> Self {
                    Self::$variant(payload)
                }
            }
        )+
    };
}

payloads!(
    DialogueStarted,
    DialogueEnded,
    PlayerMoved,
    ActionCompleted,
    ItemGiven,
    CheckResult,
    NpcDied,
    NpcPromoted,
    QuestActivated,
    QuestCompleted,
    QuestFailed,
    QuestAbandoned,
    QuestSeedCreated,
    QuestSeedExpired,
    QuestChainFormed,
    QuestChainFinalized,
    ChainEligibleMatched,
    ObjectiveCompleted,
    ObjectiveFailed,
    RelationshipChanged,
    RelationshipReversed,
    AttitudeRequest,
    AttitudeResponse,
    TurnProcessed,
);

impl EventPayload {
    /// The game turn the payload refers to, when it carries one.
    #[must_use]
    pub fn turn(&self) -> Option<u32> {
        match self {
            Self::DialogueStarted(p) => Some(p.turn),
            Self::DialogueEnded(p) => Some(p.turn),
            Self::PlayerMoved(p) => Some(p.turn),
            Self::ActionCompleted(p) => Some(p.turn),
            Self::ItemGiven(p) => Some(p.turn),
            Self::CheckResult(p) => Some(p.turn),
            Self::NpcDied(p) => Some(p.turn),
            Self::NpcPromoted(p) => Some(p.turn),
            Self::QuestActivated(p) => Some(p.turn),
            Self::QuestCompleted(p) => Some(p.turn),
            Self::QuestFailed(p) => Some(p.turn),
            Self::QuestAbandoned(p) => Some(p.turn),
            Self::QuestSeedCreated(p) => Some(p.turn),
            Self::QuestSeedExpired(p) => Some(p.turn),
            Self::ObjectiveCompleted(p) => Some(p.turn),
            Self::ObjectiveFailed(p) => Some(p.turn),
            Self::TurnProcessed(p) => Some(p.turn),
            Self::QuestChainFormed(_)
            | Self::QuestChainFinalized(_)
            | Self::ChainEligibleMatched(_)
            | Self::RelationshipChanged(_)
            | Self::RelationshipReversed(_)
            | Self::AttitudeRequest(_)
            | Self::AttitudeResponse(_) => None,
        }
    }
}

/// Transient event envelope routed by the bus. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Who caused the event (part of the dedup key).
    pub source: String,
    /// Nesting level at which the bus delivered the event; stamped by the bus.
    pub depth: u32,
    /// Typed payload.
    pub payload: EventPayload,
}

impl GameEvent {
    /// Creates an event at depth 0; the bus stamps the real depth on emit.
    pub fn new(source: impl Into<String>, payload: impl Into<EventPayload>) -> Self {
        Self {
            source: source.into(),
            depth: 0,
            payload: payload.into(),
        }
    }

    /// Returns the event type.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// Identity used to suppress duplicate emissions within one chain.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.source, self.event_type())
    }

    /// The payload rendered as a generic JSON map.
    #[must_use]
    pub fn data(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.payload)
            .map(|mut value| value["data"].take())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names_round_trip() {
        for event_type in EventType::ALL {
            let parsed: EventType = event_type.as_str().parse().unwrap();
            assert_eq!(parsed, event_type);
            assert_eq!(
                serde_json::to_value(event_type).unwrap(),
                serde_json::json!(event_type.as_str())
            );
        }
    }

    #[test]
    fn test_unknown_event_name_is_rejected() {
        assert!("quest_exploded".parse::<EventType>().is_err());
    }

    #[test]
    fn test_dedup_key_combines_source_and_type() {
        let event = GameEvent::new("player:1", TurnProcessed { turn: 3 });
        assert_eq!(event.dedup_key(), "player:1:turn_processed");
    }

    #[test]
    fn test_envelope_serializes_with_event_type_and_data() {
        let event = GameEvent::new(
            "npc:miller",
            NpcDied {
                npc_id: "miller".to_owned(),
                node_id: Some("mill".to_owned()),
                turn: 9,
            },
        );

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["payload"]["event_type"], "npc_died");
        assert_eq!(json["source"], "npc:miller");
        assert_eq!(json["payload"]["data"]["node_id"], "mill");
        assert_eq!(event.data()["npc_id"], "miller");
    }

    #[test]
    fn test_dialogue_ended_defaults_optional_collaborator_fields() {
        let payload: DialogueEnded = serde_json::from_value(serde_json::json!({
            "player_id": "p1",
            "npc_id": "n1",
            "turn": 4,
            "conversation_count": 2
        }))
        .unwrap();

        assert!(payload.relationship_delta.is_none());
        assert!(payload.topic_tags.is_empty());
        assert!(payload.quest_seed_response.is_none());
    }
}
