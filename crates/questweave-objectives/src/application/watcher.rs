//! Objective Watcher: turns gameplay events into objective progress.
//!
//! The watcher owns no records. It reads the active objective set through
//! the quest service, decides which objectives an event completes or fails,
//! and hands those decisions back to the service, which persists them and
//! resolves the parent quest.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use questweave_bus::{EventBus, EventHandler};
use questweave_core::collaborators::CompanionDirectory;
use questweave_core::error::DomainError;
use questweave_core::event::{EventPayload, EventType, GameEvent};
use questweave_core::vocabulary::FailReason;
use questweave_quests::application::service::QuestService;
use questweave_quests::domain::objective::{Objective, ObjectiveFailure, ObjectiveStatus};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::matching::{MatchContext, Verdict, candidate_types, evaluate};
use crate::domain::replacement::{ReplacementContext, generate_replacements};

/// Watches gameplay events for objective completion and failure.
pub struct ObjectiveWatcher {
    quests: Arc<QuestService>,
    companions: Arc<dyn CompanionDirectory>,
    /// Running totals of partially delivered `deliver` objectives.
    deliveries: Mutex<HashMap<Uuid, u32>>,
}

impl std::fmt::Debug for ObjectiveWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectiveWatcher").finish_non_exhaustive()
    }
}

impl ObjectiveWatcher {
    /// Gameplay events that can move an objective.
    pub const SUBSCRIPTIONS: [EventType; 7] = [
        EventType::PlayerMoved,
        EventType::ActionCompleted,
        EventType::DialogueStarted,
        EventType::DialogueEnded,
        EventType::ItemGiven,
        EventType::CheckResult,
        EventType::NpcDied,
    ];

    /// Outcomes that close objectives behind the watcher's back and retire
    /// their delivery counters.
    pub const RETIREMENTS: [EventType; 4] = [
        EventType::ObjectiveFailed,
        EventType::QuestCompleted,
        EventType::QuestFailed,
        EventType::QuestAbandoned,
    ];

    #[must_use]
    pub fn new(quests: Arc<QuestService>, companions: Arc<dyn CompanionDirectory>) -> Self {
        Self {
            quests,
            companions,
            deliveries: Mutex::new(HashMap::new()),
        }
    }

    /// Registers the watcher on `bus` for every event in
    /// [`Self::SUBSCRIPTIONS`] and [`Self::RETIREMENTS`].
    pub fn subscribe(self: &Arc<Self>, bus: &EventBus) {
        for event_type in Self::SUBSCRIPTIONS.into_iter().chain(Self::RETIREMENTS) {
            bus.subscribe(event_type, Arc::clone(self) as Arc<dyn EventHandler>);
        }
    }

    fn with_deliveries<T>(&self, f: impl FnOnce(&mut HashMap<Uuid, u32>) -> T) -> T {
        let mut deliveries = self.deliveries.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut deliveries)
    }

    /// Quantity delivered so far towards an unfinished `deliver` objective.
    #[must_use]
    pub fn delivered(&self, objective_id: Uuid) -> u32 {
        self.with_deliveries(|d| d.get(&objective_id).copied().unwrap_or(0))
    }

    /// Number of `deliver` objectives with a partial delivery on record.
    #[must_use]
    pub fn pending_deliveries(&self) -> usize {
        self.with_deliveries(|d| d.len())
    }

    /// Drops the delivery counters of every objective of `quest_id`.
    fn retire_quest(&self, quest_id: Uuid) -> Result<(), DomainError> {
        if self.pending_deliveries() == 0 {
            return Ok(());
        }
        let objective_ids: Vec<Uuid> = self
            .quests
            .objectives_of(quest_id)?
            .iter()
            .map(|o| o.id)
            .collect();
        self.with_deliveries(|d| {
            for id in &objective_ids {
                d.remove(id);
            }
        });
        Ok(())
    }

    /// Tests one gameplay event against every active objective it could
    /// concern. Returns the number of objectives that completed or failed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a repository fails.
    #[instrument(skip_all, fields(event_type = %payload.event_type()))]
    pub fn observe(&self, bus: &EventBus, payload: &EventPayload) -> Result<usize, DomainError> {
        let turn = payload.turn().unwrap_or_default();
        let node_id = match payload {
            EventPayload::NpcDied(p) => p.node_id.as_deref(),
            _ => None,
        };

        let mut settled = 0;
        for objective_type in candidate_types(payload) {
            for objective in self.quests.active_objectives(*objective_type)? {
                let ctx = MatchContext {
                    companions: self.companions.as_ref(),
                    delivered_so_far: self.delivered(objective.id),
                };
                match evaluate(&objective, payload, &ctx) {
                    Verdict::Ignore => {}
                    Verdict::Progress { delivered } => {
                        debug!(objective_id = %objective.id, delivered, "delivery progress");
                        self.with_deliveries(|d| d.insert(objective.id, delivered));
                    }
                    Verdict::Complete => {
                        self.with_deliveries(|d| d.remove(&objective.id));
                        if self.quests.complete_objective(bus, objective.id, turn)? {
                            settled += 1;
                        }
                    }
                    Verdict::Fail(reason) => {
                        self.with_deliveries(|d| d.remove(&objective.id));
                        let failure = ObjectiveFailure {
                            reason,
                            node_id: node_id.map(str::to_owned),
                            turn,
                        };
                        if self.fail(bus, &objective, failure)?.is_some() {
                            settled += 1;
                        }
                    }
                }
            }
        }
        Ok(settled)
    }

    /// Fails `objective` and, while its quest is still active, offers
    /// replacement objectives. Returns the ids of the stored replacements,
    /// or `None` if the objective was already terminal.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the objective or its quest is
    /// unknown and `DomainError::Infrastructure` if a repository fails.
    pub fn fail(
        &self,
        bus: &EventBus,
        objective: &Objective,
        failure: ObjectiveFailure,
    ) -> Result<Option<Vec<Uuid>>, DomainError> {
        if self.quests.objective(objective.id)?.status != ObjectiveStatus::Active {
            return Ok(None);
        }
        let quest = self.quests.quest(objective.quest_id)?;
        let replacements = if quest.is_active() {
            let ctx = ReplacementContext::for_quest(&quest, failure.node_id.as_deref());
            generate_replacements(objective, failure.reason, ctx)
        } else {
            Vec::new()
        };

        self.quests
            .fail_objective(bus, objective.id, failure, replacements)
            .map(Some)
    }

    /// Fails an objective for a reason decided outside the watcher, such as
    /// a scripted event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the objective or its quest is
    /// unknown and `DomainError::Infrastructure` if a repository fails.
    pub fn fail_by_id(
        &self,
        bus: &EventBus,
        objective_id: Uuid,
        reason: FailReason,
        turn: u32,
    ) -> Result<Option<Vec<Uuid>>, DomainError> {
        let objective = self.quests.objective(objective_id)?;
        self.with_deliveries(|d| d.remove(&objective_id));
        self.fail(
            bus,
            &objective,
            ObjectiveFailure {
                reason,
                node_id: None,
                turn,
            },
        )
    }
}

impl EventHandler for ObjectiveWatcher {
    fn name(&self) -> &str {
        "objective-watcher"
    }

    fn handle(&self, event: &GameEvent, bus: &EventBus) -> Result<(), DomainError> {
        match &event.payload {
            EventPayload::ObjectiveFailed(p) => {
                self.with_deliveries(|d| d.remove(&p.objective_id));
                Ok(())
            }
            EventPayload::QuestCompleted(p) => self.retire_quest(p.quest_id),
            EventPayload::QuestFailed(p) => self.retire_quest(p.quest_id),
            EventPayload::QuestAbandoned(p) => self.retire_quest(p.quest_id),
            payload => self.observe(bus, payload).map(|_| ()),
        }
    }
}
