//! Quests and narrative chains.

use questweave_core::repository::Record;
use questweave_core::vocabulary::{QuestResult, QuestRewards, SeedTier, SeedType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a quest. Terminal once it leaves `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Active,
    Completed,
    Failed,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Normal,
    /// Force-failed once `time_limit` turns have passed since activation.
    Urgent,
}

/// Whether a chain-eligible NPC already exists in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NpcRefType {
    Existing,
    /// A slot to be filled by a future NPC promotion.
    Unborn,
}

/// An NPC who may carry a quest's story forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEligibleNpc {
    /// NPC id for existing NPCs; the tag an unborn NPC must carry otherwise.
    pub npc_ref: String,
    pub ref_type: NpcRefType,
    pub node_hint: Option<String>,
    pub reason: String,
    /// The promoted NPC that filled an unborn slot.
    pub matched_npc_id: Option<String>,
}

impl ChainEligibleNpc {
    /// Whether this entry currently designates `npc_id`.
    #[must_use]
    pub fn designates(&self, npc_id: &str) -> bool {
        match self.ref_type {
            NpcRefType::Existing => self.npc_ref == npc_id,
            NpcRefType::Unborn => self.matched_npc_id.as_deref() == Some(npc_id),
        }
    }
}

/// An accepted seed turned into a pursuable quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub origin_seed_id: Option<Uuid>,
    pub quest_type: SeedType,
    pub seed_tier: SeedTier,
    pub urgency: Urgency,
    /// Turns allowed after activation (urgent quests only).
    pub time_limit: Option<u32>,
    pub status: QuestStatus,
    pub result: Option<QuestResult>,
    pub activated_turn: u32,
    pub completed_turn: Option<u32>,
    pub chain_id: Option<Uuid>,
    pub chain_eligible_npcs: Vec<ChainEligibleNpc>,
    pub related_npc_ids: Vec<String>,
    pub target_node_ids: Vec<String>,
    pub rewards: Option<QuestRewards>,
    pub player_id: String,
    pub giver_npc_id: String,
    pub tags: Vec<String>,
}

impl Quest {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == QuestStatus::Active
    }

    /// Whether an urgent quest's time limit has elapsed at `turn`.
    #[must_use]
    pub fn is_past_time_limit(&self, turn: u32) -> bool {
        match (self.urgency, self.time_limit) {
            (Urgency::Urgent, Some(limit)) => turn >= self.activated_turn.saturating_add(limit),
            _ => false,
        }
    }

    /// Moves the quest into its terminal state for `result`.
    pub fn conclude(&mut self, result: QuestResult, rewards: QuestRewards, turn: u32) {
        self.status = match result {
            QuestResult::Success | QuestResult::Partial => QuestStatus::Completed,
            QuestResult::Failure => QuestStatus::Failed,
            QuestResult::Abandoned => QuestStatus::Abandoned,
        };
        self.result = Some(result);
        self.rewards = Some(rewards);
        self.completed_turn = Some(turn);
    }
}

impl Record for Quest {
    type Kind = QuestStatus;
    const NAME: &'static str = "quest";

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> Self::Kind {
        self.status
    }

    fn is_active(&self) -> bool {
        Quest::is_active(self)
    }
}

/// Whether a chain still accepts new quests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainState {
    Open,
    Finalized,
}

/// A linked sequence of quests sharing narrative continuity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestChain {
    pub id: Uuid,
    pub origin_npc_id: String,
    /// Member quests in the order they joined.
    pub quest_ids: Vec<Uuid>,
    pub state: ChainState,
}

impl QuestChain {
    #[must_use]
    pub fn len(&self) -> usize {
        self.quest_ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quest_ids.is_empty()
    }

    /// Appends a quest unless it is already a member.
    pub fn push(&mut self, quest_id: Uuid) {
        if !self.quest_ids.contains(&quest_id) {
            self.quest_ids.push(quest_id);
        }
    }
}

impl Record for QuestChain {
    type Kind = ChainState;
    const NAME: &'static str = "quest chain";

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> Self::Kind {
        self.state
    }

    fn is_active(&self) -> bool {
        self.state == ChainState::Open
    }
}
