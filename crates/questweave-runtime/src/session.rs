//! Scripted sessions: replay a list of steps against a kernel.
//!
//! Scripts are JSON arrays of [`Step`]s. The game normally drives the
//! kernel itself; scripts exist for demos and for reproducing a session
//! from a recorded seed.

use std::path::Path;
use std::sync::Arc;

use questweave_core::error::DomainError;
use questweave_core::event::{
    DialogueEnded, DialogueStarted, EventPayload, ItemGiven, ObjectiveHint, PlayerMoved,
    QuestSeedResponse, RelationshipDelta,
};
use questweave_core::vocabulary::{QuestResult, RelationshipStatus};
use questweave_quests::application::service::QuestDetails;
use questweave_quests::domain::quest::{QuestStatus, Urgency};
use questweave_relationships::domain::relationship::EntityRef;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::companions::CompanionRoster;
use crate::kernel::Kernel;

/// Player the built-in script plays as.
pub const DEMO_PLAYER: &str = "player";

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Publishes a gameplay event.
    Publish { source: String, event: EventPayload },
    /// The player accepts the oldest seed `npc_id` is offering, if any.
    AcceptOffer {
        npc_id: String,
        turn: u32,
        #[serde(default)]
        urgency: Urgency,
        #[serde(default)]
        time_limit: Option<u32>,
        #[serde(default)]
        target_node_ids: Vec<String>,
    },
    /// An NPC joins the player's party.
    Join { player_id: String, npc_id: String },
    /// An NPC leaves the player's party.
    Leave { player_id: String, npc_id: String },
    /// The player gives up on the most recently accepted quest.
    Abandon { turn: u32 },
    /// Closes a turn.
    EndTurn { turn: u32 },
}

/// Parses a JSON script.
///
/// # Errors
///
/// Returns `DomainError::Config` if the JSON is not a list of steps.
pub fn parse_script(json: &str) -> Result<Vec<Step>, DomainError> {
    serde_json::from_str(json).map_err(|e| DomainError::Config(format!("invalid script: {e}")))
}

/// Loads a JSON script from disk.
///
/// # Errors
///
/// Returns `DomainError::Config` if the file cannot be read or parsed.
pub fn load_script(path: &Path) -> Result<Vec<Step>, DomainError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| DomainError::Config(format!("{}: {e}", path.display())))?;
    parse_script(&content)
}

/// Final state of a quest accepted during the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestSummary {
    pub quest_id: Uuid,
    pub title: String,
    pub status: QuestStatus,
    pub result: Option<QuestResult>,
    pub experience: u32,
    pub gold: u32,
}

/// How an NPC regards the player at the end of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingSummary {
    pub npc_id: String,
    pub status: RelationshipStatus,
    pub affinity: f64,
    pub trust: f64,
    pub familiarity: u32,
}

/// What a scripted session did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionReport {
    pub steps: usize,
    pub events_delivered: usize,
    pub events_dropped: usize,
    pub offers_missed: usize,
    pub quests: Vec<QuestSummary>,
    pub standings: Vec<StandingSummary>,
}

/// Replays steps for one player.
pub struct Session<'a> {
    kernel: &'a Kernel,
    roster: Arc<CompanionRoster>,
    player_id: String,
}

impl<'a> Session<'a> {
    #[must_use]
    pub fn new(kernel: &'a Kernel, roster: Arc<CompanionRoster>, player_id: &str) -> Self {
        Self {
            kernel,
            roster,
            player_id: player_id.to_owned(),
        }
    }

    /// Runs every step in order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a service call. Handler errors
    /// inside the bus are logged there and do not stop the session.
    #[instrument(skip_all, fields(player_id = %self.player_id, steps = steps.len()))]
    pub fn run(&self, steps: &[Step]) -> Result<SessionReport, DomainError> {
        let mut report = SessionReport::default();
        let mut accepted: Vec<Uuid> = Vec::new();
        let mut npcs: Vec<String> = Vec::new();

        for step in steps {
            report.steps += 1;
            match step {
                Step::Publish { source, event } => {
                    if let Some(npc_id) = npc_of(event) {
                        if !npcs.iter().any(|n| n == npc_id) {
                            npcs.push(npc_id.to_owned());
                        }
                    }
                    if self.kernel.publish(source, event.clone()).is_delivered() {
                        report.events_delivered += 1;
                    } else {
                        report.events_dropped += 1;
                    }
                }
                Step::AcceptOffer {
                    npc_id,
                    turn,
                    urgency,
                    time_limit,
                    target_node_ids,
                } => {
                    let offers = self.kernel.quests().active_seeds_of(npc_id)?;
                    let Some(seed) = offers.into_iter().min_by_key(|s| s.created_turn) else {
                        debug!(%npc_id, "no offer to accept");
                        report.offers_missed += 1;
                        continue;
                    };
                    let details = QuestDetails {
                        urgency: *urgency,
                        time_limit: *time_limit,
                        target_node_ids: target_node_ids.clone(),
                        ..QuestDetails::default()
                    };
                    let quest =
                        self.kernel
                            .quests()
                            .accept_seed(self.kernel.bus(), seed.id, *turn, details)?;
                    info!(quest_id = %quest.id, title = %quest.title, "offer accepted");
                    accepted.push(quest.id);
                }
                Step::Join { player_id, npc_id } => {
                    self.roster.join(player_id, npc_id);
                }
                Step::Leave { player_id, npc_id } => {
                    self.roster.leave(player_id, npc_id);
                }
                Step::Abandon { turn } => {
                    if let Some(quest_id) = accepted.last() {
                        let quest = self.kernel.quests().quest(*quest_id)?;
                        if quest.is_active() {
                            self.kernel
                                .quests()
                                .abandon_quest(self.kernel.bus(), *quest_id, *turn)?;
                        }
                    }
                }
                Step::EndTurn { turn } => {
                    self.kernel.end_turn(*turn);
                }
            }
        }

        for quest_id in accepted {
            let quest = self.kernel.quests().quest(quest_id)?;
            let rewards = quest.rewards.unwrap_or_default();
            report.quests.push(QuestSummary {
                quest_id,
                title: quest.title,
                status: quest.status,
                result: quest.result,
                experience: rewards.experience,
                gold: rewards.gold,
            });
        }
        let player = EntityRef::player(&self.player_id);
        for npc_id in npcs {
            if let Some(attitude) = self
                .kernel
                .relationships()
                .attitude_of(&EntityRef::npc(&npc_id), &player)?
            {
                report.standings.push(StandingSummary {
                    npc_id,
                    status: attitude.status,
                    affinity: attitude.affinity,
                    trust: attitude.trust,
                    familiarity: attitude.familiarity,
                });
            }
        }
        Ok(report)
    }
}

fn npc_of(event: &EventPayload) -> Option<&str> {
    match event {
        EventPayload::DialogueStarted(p) => Some(&p.npc_id),
        EventPayload::DialogueEnded(p) => Some(&p.npc_id),
        _ => None,
    }
}

fn talk(npc_id: &str, turn: u32) -> Step {
    Step::Publish {
        source: "player:player".into(),
        event: DialogueStarted {
            player_id: DEMO_PLAYER.into(),
            npc_id: npc_id.into(),
            turn,
        }
        .into(),
    }
}

/// The built-in demo: the miller asks for flour, the player fetches it.
#[must_use]
pub fn builtin_script() -> Vec<Step> {
    let mut steps = Vec::new();
    for (turn, conversation) in (1..=6).zip((5..).step_by(5)) {
        steps.push(talk("miller", turn));
        steps.push(Step::Publish {
            source: "dialogue:miller".into(),
            event: DialogueEnded {
                player_id: DEMO_PLAYER.into(),
                npc_id: "miller".into(),
                turn,
                conversation_count: conversation,
                relationship_delta: Some(RelationshipDelta {
                    affinity: 4.0,
                    trust: 3.0,
                }),
                memory_tags: vec!["flour".into()],
                topic_tags: vec!["harvest".into()],
                quest_seed_response: Some(QuestSeedResponse {
                    seed_type: "request".into(),
                    context_tags: vec!["flour".into(), "festival".into()],
                    unresolved_threads: vec!["the granary was robbed".into()],
                    objective_hints: vec![
                        ObjectiveHint {
                            objective_type: "reach_node".into(),
                            description: "Search the granary".into(),
                            target: json!({"node_id": "granary"}),
                        },
                        ObjectiveHint {
                            objective_type: "deliver".into(),
                            description: "Bring five sacks of flour to the miller".into(),
                            target: json!({"item_tag": "flour", "quantity": 5, "recipient_id": "miller"}),
                        },
                    ],
                }),
            }
            .into(),
        });
        steps.push(Step::EndTurn { turn });
    }

    steps.push(Step::AcceptOffer {
        npc_id: "miller".into(),
        turn: 7,
        urgency: Urgency::Normal,
        time_limit: None,
        target_node_ids: vec!["granary".into()],
    });
    steps.push(Step::Publish {
        source: "player:player".into(),
        event: PlayerMoved {
            player_id: DEMO_PLAYER.into(),
            from_node_id: Some("mill".into()),
            node_id: "granary".into(),
            turn: 7,
        }
        .into(),
    });
    steps.push(Step::EndTurn { turn: 7 });
    for (turn, quantity) in [(8, 2), (9, 3)] {
        steps.push(Step::Publish {
            source: "player:player".into(),
            event: ItemGiven {
                player_id: DEMO_PLAYER.into(),
                recipient_id: "miller".into(),
                item_id: "flour_sack".into(),
                item_tags: vec!["flour".into()],
                quantity,
                turn,
            }
            .into(),
        });
        steps.push(Step::EndTurn { turn });
    }
    steps
}
