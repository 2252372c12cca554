//! Quest service: owns seeds, quests, objectives and chains.
//!
//! Every write to a quest-context record goes through this service, which
//! persists the change and then publishes the matching event. The Objective
//! Watcher decides *when* an objective completes or fails; the service
//! records it and resolves the parent quest in reaction to the resulting
//! `objective_completed` / `objective_failed` events.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use questweave_bus::{EventBus, EventHandler};
use questweave_core::config::{KernelConfig, QuestConfig, SeedConfig};
use questweave_core::error::DomainError;
use questweave_core::event::{
    ChainEligibleMatched, DialogueEnded, EventPayload, EventType, GameEvent, NpcPromoted,
    ObjectiveCompleted, ObjectiveFailed, QuestAbandoned, QuestActivated, QuestChainFinalized,
    QuestChainFormed, QuestCompleted, QuestFailed, QuestSeedCreated, QuestSeedExpired,
};
use questweave_core::id::IdSource;
use questweave_core::rng::DeterministicRng;
use questweave_core::vocabulary::{FailReason, ObjectiveType, QuestResult, SeedTier};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::stores::QuestStores;
use crate::domain::chain::{build_chain_eligible_npcs, match_unborn_npc, roll_chain_finalization};
use crate::domain::hints::plan_objectives;
use crate::domain::objective::{Objective, ObjectiveFailure, ObjectiveStatus};
use crate::domain::quest::{ChainState, NpcRefType, Quest, QuestChain, QuestStatus, Urgency};
use crate::domain::resolution::resolve_quest;
use crate::domain::rewards::calculate_rewards;
use crate::domain::seed::{
    QuestSeed, SeedStatus, can_generate_seed, draw_seed_tier, process_seed_ttl,
    resolve_seed_type, roll_chain_continuation, roll_seed,
};

/// Quest details decided by the caller when the player accepts a seed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestDetails {
    /// Defaults to a title derived from the seed when `None`.
    pub title: Option<String>,
    pub description: String,
    pub urgency: Urgency,
    pub time_limit: Option<u32>,
    pub related_npc_ids: Vec<String>,
    pub target_node_ids: Vec<String>,
}

/// Owning service of the quest context.
pub struct QuestService {
    stores: QuestStores,
    seeds: SeedConfig,
    quests: QuestConfig,
    rng: Mutex<Box<dyn DeterministicRng>>,
    ids: Arc<dyn IdSource>,
}

impl std::fmt::Debug for QuestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestService")
            .field("seeds", &self.seeds)
            .field("quests", &self.quests)
            .finish_non_exhaustive()
    }
}

fn quest_source(id: Uuid) -> String {
    format!("quest:{id}")
}

fn seed_source(id: Uuid) -> String {
    format!("seed:{id}")
}

fn objective_source(id: Uuid) -> String {
    format!("objective:{id}")
}

fn chain_source(id: Uuid) -> String {
    format!("chain:{id}")
}

impl QuestService {
    /// Event types this service reacts to.
    pub const SUBSCRIPTIONS: [EventType; 5] = [
        EventType::DialogueEnded,
        EventType::TurnProcessed,
        EventType::ObjectiveCompleted,
        EventType::ObjectiveFailed,
        EventType::NpcPromoted,
    ];

    #[must_use]
    pub fn new(
        stores: QuestStores,
        config: &KernelConfig,
        rng: Box<dyn DeterministicRng>,
        ids: Arc<dyn IdSource>,
    ) -> Self {
        Self {
            stores,
            seeds: config.seeds.clone(),
            quests: config.quests.clone(),
            rng: Mutex::new(rng),
            ids,
        }
    }

    /// Registers the service on `bus` for every event in
    /// [`Self::SUBSCRIPTIONS`].
    pub fn subscribe(self: &Arc<Self>, bus: &EventBus) {
        for event_type in Self::SUBSCRIPTIONS {
            bus.subscribe(event_type, Arc::clone(self) as Arc<dyn EventHandler>);
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut dyn DeterministicRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(rng.as_mut())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Loads a quest.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if no quest has the identifier.
    pub fn quest(&self, quest_id: Uuid) -> Result<Quest, DomainError> {
        self.stores.quests.require(quest_id)
    }

    /// Loads a seed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if no seed has the identifier.
    pub fn seed(&self, seed_id: Uuid) -> Result<QuestSeed, DomainError> {
        self.stores.seeds.require(seed_id)
    }

    /// Loads an objective.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if no objective has the identifier.
    pub fn objective(&self, objective_id: Uuid) -> Result<Objective, DomainError> {
        self.stores.objectives.require(objective_id)
    }

    /// Every objective of a quest, replacements included.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the repository fails.
    pub fn objectives_of(&self, quest_id: Uuid) -> Result<Vec<Objective>, DomainError> {
        self.stores.objectives.find(&|o| o.quest_id == quest_id)
    }

    /// The active objective set of one type, as watched by the Objective
    /// Watcher.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the repository fails.
    pub fn active_objectives(
        &self,
        objective_type: ObjectiveType,
    ) -> Result<Vec<Objective>, DomainError> {
        self.stores.objectives.active_by_kind(&objective_type)
    }

    /// Seeds an NPC is currently offering.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the repository fails.
    pub fn active_seeds_of(&self, npc_id: &str) -> Result<Vec<QuestSeed>, DomainError> {
        self.stores
            .seeds
            .find(&|s| s.status == SeedStatus::Active && s.npc_id == npc_id)
    }

    // -----------------------------------------------------------------------
    // Seeds
    // -----------------------------------------------------------------------

    /// Considers planting a seed at the end of a conversation.
    ///
    /// Needs a seed proposal from the narrative layer, an NPC off cooldown,
    /// and a successful seed roll. The tier is drawn next; if the NPC can
    /// carry an earlier quest's story forward, a chain roll decides whether
    /// the seed continues that chain.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a repository fails.
    #[instrument(skip_all, fields(npc_id = %event.npc_id, conversation = event.conversation_count))]
    pub fn consider_seed(
        &self,
        bus: &EventBus,
        event: &DialogueEnded,
    ) -> Result<Option<QuestSeed>, DomainError> {
        let Some(response) = &event.quest_seed_response else {
            return Ok(None);
        };

        let last_seed_conversation = self
            .stores
            .seeds
            .find(&|s| s.npc_id == event.npc_id)?
            .iter()
            .map(|s| s.created_conversation)
            .max();
        if !can_generate_seed(
            last_seed_conversation,
            event.conversation_count,
            self.seeds.cooldown_conversations,
        ) {
            debug!(?last_seed_conversation, "seed on cooldown");
            return Ok(None);
        }

        let Some(tier) = self.with_rng(|rng| {
            roll_seed(rng, &self.seeds).then(|| draw_seed_tier(rng, self.seeds.tier_weights))
        }) else {
            debug!("seed roll missed");
            return Ok(None);
        };

        let (seed_type, ttl_turns, known) = resolve_seed_type(&response.seed_type, &self.seeds.ttl);
        if !known {
            warn!(seed_type = %response.seed_type, fallback = %seed_type, "unknown seed type");
        }

        let seed_id = self.ids.next_id();
        let (chain_id, formed) = self.continue_chain(&event.npc_id, tier)?;

        let seed = QuestSeed {
            id: seed_id,
            npc_id: event.npc_id.clone(),
            player_id: event.player_id.clone(),
            seed_type,
            seed_tier: tier,
            created_turn: event.turn,
            created_conversation: event.conversation_count,
            ttl_turns,
            status: SeedStatus::Active,
            chain_id,
            context_tags: response.context_tags.clone(),
            unresolved_threads: response.unresolved_threads.clone(),
            objective_hints: response.objective_hints.clone(),
        };
        self.stores.seeds.upsert(seed.clone())?;
        info!(%seed_id, %seed_type, %tier, ?chain_id, "quest seed planted");

        bus.emit(GameEvent::new(
            seed_source(seed_id),
            QuestSeedCreated {
                seed_id,
                npc_id: seed.npc_id.clone(),
                player_id: seed.player_id.clone(),
                seed_type,
                seed_tier: tier,
                chain_id,
                ttl_turns,
                turn: event.turn,
            },
        ));
        if let (true, Some(chain_id)) = (formed, chain_id) {
            bus.emit(GameEvent::new(
                chain_source(chain_id),
                QuestChainFormed {
                    chain_id,
                    seed_id,
                    npc_id: seed.npc_id.clone(),
                },
            ));
        }
        Ok(Some(seed))
    }

    /// Picks the chain a new seed from `npc_id` continues, if any. Returns
    /// the chain id and whether it was minted just now.
    fn continue_chain(
        &self,
        npc_id: &str,
        tier: SeedTier,
    ) -> Result<(Option<Uuid>, bool), DomainError> {
        let finalized: HashSet<Uuid> = self
            .stores
            .chains
            .find(&|c| c.state == ChainState::Finalized)?
            .into_iter()
            .map(|c| c.id)
            .collect();
        let candidate = self
            .stores
            .quests
            .find(&|q| {
                matches!(q.status, QuestStatus::Completed | QuestStatus::Failed)
                    && q.chain_eligible_npcs.iter().any(|e| e.designates(npc_id))
                    && q.chain_id.is_none_or(|id| !finalized.contains(&id))
            })?
            .into_iter()
            .max_by_key(|q| q.completed_turn);
        let Some(mut predecessor) = candidate else {
            return Ok((None, false));
        };

        if !self.with_rng(|rng| roll_chain_continuation(rng, tier, &self.seeds)) {
            debug!(quest_id = %predecessor.id, "chain roll missed");
            return Ok((None, false));
        }

        if let Some(chain_id) = predecessor.chain_id {
            return Ok((Some(chain_id), false));
        }

        let chain = QuestChain {
            id: self.ids.next_id(),
            origin_npc_id: predecessor.giver_npc_id.clone(),
            quest_ids: vec![predecessor.id],
            state: ChainState::Open,
        };
        predecessor.chain_id = Some(chain.id);
        self.stores.chains.upsert(chain.clone())?;
        self.stores.quests.upsert(predecessor)?;
        info!(chain_id = %chain.id, "quest chain formed");
        Ok((Some(chain.id), true))
    }

    /// Expires every active seed whose lifespan has run out at `turn`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a repository fails.
    pub fn expire_seeds(&self, bus: &EventBus, turn: u32) -> Result<Vec<QuestSeed>, DomainError> {
        let mut expired = Vec::new();
        for mut seed in self.stores.seeds.active_by_kind(&SeedStatus::Active)? {
            if self.lapse(bus, &mut seed, turn)? {
                expired.push(seed);
            }
        }
        Ok(expired)
    }

    /// Expires `seed` if its lifespan has run out at `turn`, persisting it
    /// and publishing `quest_seed_expired`. Returns true if it expired now.
    fn lapse(
        &self,
        bus: &EventBus,
        seed: &mut QuestSeed,
        turn: u32,
    ) -> Result<bool, DomainError> {
        if !process_seed_ttl(seed, turn) {
            return Ok(false);
        }
        self.stores.seeds.upsert(seed.clone())?;
        debug!(seed_id = %seed.id, turn, "quest seed expired");
        bus.emit(GameEvent::new(
            seed_source(seed.id),
            QuestSeedExpired {
                seed_id: seed.id,
                npc_id: seed.npc_id.clone(),
                turn,
            },
        ));
        Ok(true)
    }

    /// Turns an active seed into an active quest with validated objectives.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for an unknown seed,
    /// `DomainError::Validation` if the seed is no longer active or its
    /// lifespan ran out before `turn`, and `DomainError::Infrastructure` if
    /// a repository fails. A lapsed seed is expired on the spot.
    #[instrument(skip(self, bus, details))]
    pub fn accept_seed(
        &self,
        bus: &EventBus,
        seed_id: Uuid,
        turn: u32,
        details: QuestDetails,
    ) -> Result<Quest, DomainError> {
        let mut seed = self.stores.seeds.require(seed_id)?;
        if seed.status != SeedStatus::Active {
            return Err(DomainError::Validation(format!(
                "seed {seed_id} is {:?}, not active",
                seed.status
            )));
        }
        if self.lapse(bus, &mut seed, turn)? {
            return Err(DomainError::Validation(format!(
                "seed {seed_id} expired at turn {}",
                seed.created_turn.saturating_add(seed.ttl_turns)
            )));
        }

        let quest_id = self.ids.next_id();
        let objectives: Vec<Objective> = plan_objectives(
            &seed.objective_hints,
            seed.seed_type,
            &seed.npc_id,
            &details.target_node_ids,
        )
        .into_iter()
        .map(|planned| {
            Objective::new(
                self.ids.next_id(),
                quest_id,
                seed.player_id.clone(),
                planned.description,
                planned.target,
            )
        })
        .collect();

        let quest = Quest {
            id: quest_id,
            title: details
                .title
                .unwrap_or_else(|| format!("{} from {}", seed.seed_type, seed.npc_id)),
            description: details.description,
            origin_seed_id: Some(seed.id),
            quest_type: seed.seed_type,
            seed_tier: seed.seed_tier,
            urgency: details.urgency,
            time_limit: details.time_limit,
            status: QuestStatus::Active,
            result: None,
            activated_turn: turn,
            completed_turn: None,
            chain_id: seed.chain_id,
            chain_eligible_npcs: Vec::new(),
            related_npc_ids: details.related_npc_ids,
            target_node_ids: details.target_node_ids,
            rewards: None,
            player_id: seed.player_id.clone(),
            giver_npc_id: seed.npc_id.clone(),
            tags: seed.context_tags.clone(),
        };

        seed.status = SeedStatus::Accepted;
        if let Some(chain_id) = seed.chain_id {
            if let Some(mut chain) = self.stores.chains.get(chain_id)? {
                chain.push(quest_id);
                self.stores.chains.upsert(chain)?;
            }
        }
        for objective in &objectives {
            self.stores.objectives.upsert(objective.clone())?;
        }
        self.stores.quests.upsert(quest.clone())?;
        self.stores.seeds.upsert(seed.clone())?;
        info!(%quest_id, objectives = objectives.len(), "quest activated");

        bus.emit(GameEvent::new(
            quest_source(quest_id),
            QuestActivated {
                quest_id,
                seed_id: Some(seed.id),
                player_id: quest.player_id.clone(),
                npc_id: quest.giver_npc_id.clone(),
                objective_ids: objectives.iter().map(|o| o.id).collect(),
                turn,
            },
        ));
        Ok(quest)
    }

    // -----------------------------------------------------------------------
    // Objectives
    // -----------------------------------------------------------------------

    /// Completes an active objective. Returns false if it was already
    /// terminal.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for an unknown objective and
    /// `DomainError::Infrastructure` if a repository fails.
    pub fn complete_objective(
        &self,
        bus: &EventBus,
        objective_id: Uuid,
        turn: u32,
    ) -> Result<bool, DomainError> {
        let mut objective = self.stores.objectives.require(objective_id)?;
        if !objective.complete() {
            return Ok(false);
        }
        self.stores.objectives.upsert(objective.clone())?;
        info!(%objective_id, quest_id = %objective.quest_id, "objective completed");

        bus.emit(GameEvent::new(
            objective_source(objective_id),
            ObjectiveCompleted {
                objective_id,
                quest_id: objective.quest_id,
                objective_type: objective.objective_type(),
                turn,
            },
        ));
        Ok(true)
    }

    /// Fails an active objective and stores its replacements. Returns the
    /// ids of the replacements actually stored; none are stored once the
    /// parent quest is over.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for an unknown objective and
    /// `DomainError::Infrastructure` if a repository fails.
    pub fn fail_objective(
        &self,
        bus: &EventBus,
        objective_id: Uuid,
        failure: ObjectiveFailure,
        replacements: Vec<Objective>,
    ) -> Result<Vec<Uuid>, DomainError> {
        let mut objective = self.stores.objectives.require(objective_id)?;
        let reason = failure.reason;
        let turn = failure.turn;
        if !objective.fail(failure) {
            return Ok(Vec::new());
        }
        self.stores.objectives.upsert(objective.clone())?;
        let replacement_ids = self.add_replacements(replacements)?;
        info!(%objective_id, %reason, replacements = replacement_ids.len(), "objective failed");

        bus.emit(GameEvent::new(
            objective_source(objective_id),
            ObjectiveFailed {
                objective_id,
                quest_id: objective.quest_id,
                objective_type: objective.objective_type(),
                reason,
                replacement_ids: replacement_ids.clone(),
                turn,
            },
        ));
        Ok(replacement_ids)
    }

    /// Stores replacement objectives whose parent quest is still active.
    /// Replacements already stored are skipped.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a repository fails.
    pub fn add_replacements(&self, replacements: Vec<Objective>) -> Result<Vec<Uuid>, DomainError> {
        let mut stored = Vec::new();
        for replacement in replacements {
            let parent_active = self
                .stores
                .quests
                .get(replacement.quest_id)?
                .is_some_and(|q| q.is_active());
            if !parent_active || self.stores.objectives.get(replacement.id)?.is_some() {
                continue;
            }
            stored.push(replacement.id);
            self.stores.objectives.upsert(replacement)?;
        }
        Ok(stored)
    }

    // -----------------------------------------------------------------------
    // Quests
    // -----------------------------------------------------------------------

    /// Resolves the quest if its objectives (or its time limit) settle it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for an unknown quest and
    /// `DomainError::Infrastructure` if a repository fails.
    pub fn evaluate_quest(
        &self,
        bus: &EventBus,
        quest_id: Uuid,
        turn: u32,
    ) -> Result<Option<QuestResult>, DomainError> {
        let quest = self.stores.quests.require(quest_id)?;
        let objectives = self.objectives_of(quest_id)?;
        let Some(result) = resolve_quest(&quest, &objectives, turn) else {
            return Ok(None);
        };
        self.conclude(bus, quest, result, turn)?;
        Ok(Some(result))
    }

    /// Forces an active quest to `result`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the quest is already over.
    pub fn resolve_quest(
        &self,
        bus: &EventBus,
        quest_id: Uuid,
        result: QuestResult,
        turn: u32,
    ) -> Result<Quest, DomainError> {
        let quest = self.require_active(quest_id)?;
        self.conclude(bus, quest, result, turn)
    }

    /// The player gives up on a quest. Open objectives are closed without
    /// replacements and the giver's regard suffers.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the quest is already over.
    pub fn abandon_quest(
        &self,
        bus: &EventBus,
        quest_id: Uuid,
        turn: u32,
    ) -> Result<Quest, DomainError> {
        let quest = self.require_active(quest_id)?;
        self.close_open_objectives(quest_id, FailReason::Other, turn)?;
        self.conclude(bus, quest, QuestResult::Abandoned, turn)
    }

    /// Fails every urgent quest whose time limit has elapsed at `turn`. Open
    /// objectives fail with `time_expired`. Returns the failed quest ids.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a repository fails.
    pub fn enforce_time_limits(&self, bus: &EventBus, turn: u32) -> Result<Vec<Uuid>, DomainError> {
        let overdue = self
            .stores
            .quests
            .find(&|q| q.is_active() && q.is_past_time_limit(turn))?;
        let mut failed = Vec::with_capacity(overdue.len());
        for quest in overdue {
            let quest_id = quest.id;
            let closed = self.close_open_objectives(quest_id, FailReason::TimeExpired, turn)?;
            warn!(%quest_id, turn, "urgent quest ran out of time");
            self.conclude(bus, quest, QuestResult::Failure, turn)?;
            for objective in closed {
                bus.emit(GameEvent::new(
                    objective_source(objective.id),
                    ObjectiveFailed {
                        objective_id: objective.id,
                        quest_id,
                        objective_type: objective.objective_type(),
                        reason: FailReason::TimeExpired,
                        replacement_ids: Vec::new(),
                        turn,
                    },
                ));
            }
            failed.push(quest_id);
        }
        Ok(failed)
    }

    /// Fills unborn chain slots with a newly promoted NPC. Each quest takes
    /// at most one match per promotion. Returns the number of matches.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a repository fails.
    pub fn match_unborn(
        &self,
        bus: &EventBus,
        promoted: &NpcPromoted,
    ) -> Result<usize, DomainError> {
        let candidates = self.stores.quests.find(&|q| {
            q.chain_eligible_npcs
                .iter()
                .any(|e| e.ref_type == NpcRefType::Unborn && e.matched_npc_id.is_none())
        })?;

        let mut matched = 0;
        for mut quest in candidates {
            let Some(slot) = quest.chain_eligible_npcs.iter_mut().find(|e| {
                match_unborn_npc(e, &promoted.tags, promoted.node_id.as_deref())
            }) else {
                continue;
            };
            slot.matched_npc_id = Some(promoted.npc_id.clone());
            let npc_ref = slot.npc_ref.clone();
            self.stores.quests.upsert(quest.clone())?;
            matched += 1;
            info!(quest_id = %quest.id, %npc_ref, npc_id = %promoted.npc_id, "unborn chain slot filled");

            bus.emit(GameEvent::new(
                quest_source(quest.id),
                ChainEligibleMatched {
                    quest_id: quest.id,
                    chain_id: quest.chain_id,
                    npc_ref,
                    npc_id: promoted.npc_id.clone(),
                },
            ));
        }
        Ok(matched)
    }

    fn require_active(&self, quest_id: Uuid) -> Result<Quest, DomainError> {
        let quest = self.stores.quests.require(quest_id)?;
        if !quest.is_active() {
            return Err(DomainError::Validation(format!(
                "quest {quest_id} is {:?}, not active",
                quest.status
            )));
        }
        Ok(quest)
    }

    fn close_open_objectives(
        &self,
        quest_id: Uuid,
        reason: FailReason,
        turn: u32,
    ) -> Result<Vec<Objective>, DomainError> {
        let mut closed = Vec::new();
        for mut objective in self.objectives_of(quest_id)? {
            if objective.status != ObjectiveStatus::Active {
                continue;
            }
            objective.fail(ObjectiveFailure {
                reason,
                node_id: None,
                turn,
            });
            self.stores.objectives.upsert(objective.clone())?;
            closed.push(objective);
        }
        Ok(closed)
    }

    /// Moves a quest into its terminal state, publishes the outcome and
    /// rolls chain finalization.
    fn conclude(
        &self,
        bus: &EventBus,
        mut quest: Quest,
        result: QuestResult,
        turn: u32,
    ) -> Result<Quest, DomainError> {
        let rewards = calculate_rewards(quest.seed_tier, result, &self.quests.rewards);
        quest.conclude(result, rewards, turn);
        if result != QuestResult::Abandoned {
            quest.chain_eligible_npcs = build_chain_eligible_npcs(&quest, &self.quests);
        }
        self.stores.quests.upsert(quest.clone())?;
        info!(quest_id = %quest.id, %result, turn, "quest resolved");

        let source = quest_source(quest.id);
        let player_id = quest.player_id.clone();
        let npc_id = quest.giver_npc_id.clone();
        let payload: EventPayload = match result {
            QuestResult::Success | QuestResult::Partial => QuestCompleted {
                quest_id: quest.id,
                player_id,
                npc_id,
                result,
                rewards,
                chain_id: quest.chain_id,
                turn,
            }
            .into(),
            QuestResult::Failure => QuestFailed {
                quest_id: quest.id,
                player_id,
                npc_id,
                rewards,
                chain_id: quest.chain_id,
                turn,
            }
            .into(),
            QuestResult::Abandoned => QuestAbandoned {
                quest_id: quest.id,
                player_id,
                npc_id,
                rewards,
                turn,
            }
            .into(),
        };
        bus.emit(GameEvent::new(source, payload));

        if result != QuestResult::Abandoned {
            self.roll_finalization(bus, &quest)?;
        }
        Ok(quest)
    }

    fn roll_finalization(&self, bus: &EventBus, quest: &Quest) -> Result<(), DomainError> {
        let Some(chain_id) = quest.chain_id else {
            return Ok(());
        };
        let Some(mut chain) = self.stores.chains.get(chain_id)? else {
            return Ok(());
        };
        if chain.state == ChainState::Finalized {
            return Ok(());
        }
        let chain_length = chain.len();
        if !self.with_rng(|rng| roll_chain_finalization(rng, chain_length, &self.quests)) {
            return Ok(());
        }

        chain.state = ChainState::Finalized;
        self.stores.chains.upsert(chain)?;
        info!(%chain_id, chain_length, "quest chain finalized");
        bus.emit(GameEvent::new(
            chain_source(chain_id),
            QuestChainFinalized {
                chain_id,
                quest_id: quest.id,
                chain_length: u32::try_from(chain_length).unwrap_or(u32::MAX),
            },
        ));
        Ok(())
    }
}

impl EventHandler for QuestService {
    fn name(&self) -> &str {
        "quest-service"
    }

    fn handle(&self, event: &GameEvent, bus: &EventBus) -> Result<(), DomainError> {
        match &event.payload {
            EventPayload::DialogueEnded(p) => self.consider_seed(bus, p).map(|_| ()),
            EventPayload::TurnProcessed(p) => {
                self.expire_seeds(bus, p.turn)?;
                self.enforce_time_limits(bus, p.turn)?;
                Ok(())
            }
            EventPayload::ObjectiveCompleted(p) => {
                self.evaluate_quest(bus, p.quest_id, p.turn).map(|_| ())
            }
            EventPayload::ObjectiveFailed(p) => {
                self.evaluate_quest(bus, p.quest_id, p.turn).map(|_| ())
            }
            EventPayload::NpcPromoted(p) => self.match_unborn(bus, p).map(|_| ()),
            _ => Ok(()),
        }
    }
}
