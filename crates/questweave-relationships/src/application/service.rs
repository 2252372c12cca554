//! Relationship service: loads, mutates, persists and publishes relationships.
//!
//! The service owns every write to relationship records. Other contexts
//! influence relationships only through events (`dialogue_ended`,
//! `npc_promoted`, quest resolutions) or by asking for an attitude with
//! `attitude_request`.

use std::sync::Arc;

use questweave_bus::{EventBus, EventHandler};
use questweave_core::clock::Clock;
use questweave_core::error::DomainError;
use questweave_core::event::{
    AttitudeRequest, AttitudeResponse, DialogueEnded, EventPayload, EventType, GameEvent,
    NpcPromoted, RelationshipChanged, RelationshipDelta, RelationshipReversed,
};
use questweave_core::id::IdSource;
use questweave_core::repository::Repository;
use questweave_core::vocabulary::{QuestRewards, RelationshipStatus, ReversalKind};
use tracing::{debug, info, instrument, warn};

use crate::domain::dynamics::clamp_meta_delta;
use crate::domain::relationship::{EntityRef, Relationship};
use crate::domain::reversal::apply_reversal;
use crate::domain::transitions::TransitionTable;

/// Tag added to relationships created or touched by an NPC promotion.
pub const PROMOTED_TAG: &str = "promoted";

/// Read-only view of how one entity regards another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    pub status: RelationshipStatus,
    pub affinity: f64,
    pub trust: f64,
    pub familiarity: u32,
}

impl From<&Relationship> for Attitude {
    fn from(rel: &Relationship) -> Self {
        Self {
            status: rel.status(),
            affinity: rel.affinity(),
            trust: rel.trust(),
            familiarity: rel.familiarity(),
        }
    }
}

/// Owning service of the relationship context.
pub struct RelationshipService {
    repo: Arc<dyn Repository<Relationship>>,
    table: TransitionTable,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
}

impl std::fmt::Debug for RelationshipService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipService")
            .field("rules", &self.table.rules().len())
            .finish_non_exhaustive()
    }
}

impl RelationshipService {
    /// Event types this service reacts to.
    pub const SUBSCRIPTIONS: [EventType; 6] = [
        EventType::DialogueEnded,
        EventType::NpcPromoted,
        EventType::QuestCompleted,
        EventType::QuestFailed,
        EventType::QuestAbandoned,
        EventType::AttitudeRequest,
    ];

    #[must_use]
    pub fn new(
        repo: Arc<dyn Repository<Relationship>>,
        table: TransitionTable,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
    ) -> Self {
        Self {
            repo,
            table,
            clock,
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

    /// Looks up the relationship held by `source` towards `target`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the repository fails.
    pub fn find(
        &self,
        source: &EntityRef,
        target: &EntityRef,
    ) -> Result<Option<Relationship>, DomainError> {
        let mut found = self
            .repo
            .find(&|rel| rel.source == *source && rel.target == *target)?;
        Ok(found.pop())
    }

    /// Returns the relationship, creating and persisting a `stranger` one
    /// if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the repository fails.
    pub fn get_or_create(
        &self,
        source: &EntityRef,
        target: &EntityRef,
        turn: u32,
    ) -> Result<Relationship, DomainError> {
        if let Some(existing) = self.find(source, target)? {
            return Ok(existing);
        }
        let rel = Relationship::new(
            self.ids.next_id(),
            source.clone(),
            target.clone(),
            turn,
            self.clock.now(),
        );
        debug!(relationship_id = %rel.id, %source, %target, "relationship created");
        self.repo.upsert(rel.clone())?;
        Ok(rel)
    }

    /// Applies the relationship change proposed at the end of a
    /// conversation. The NPC's view of the player moves: each axis is first
    /// bounded to the narrative delta limit, then damped. The interaction
    /// also adds familiarity after lazy decay for the time spent apart.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the repository fails.
    #[instrument(skip_all, fields(npc_id = %npc_id, player_id = %player_id, turn))]
    pub fn apply_dialogue_outcome(
        &self,
        bus: &EventBus,
        npc_id: &str,
        player_id: &str,
        delta: RelationshipDelta,
        turn: u32,
    ) -> Result<Relationship, DomainError> {
        let mut rel =
            self.get_or_create(&EntityRef::npc(npc_id), &EntityRef::player(player_id), turn)?;
        let previous = rel.status();

        rel.record_interaction(
            clamp_meta_delta(delta.affinity),
            clamp_meta_delta(delta.trust),
            turn,
            self.clock.now(),
            &self.table,
        );

        self.repo.upsert(rel.clone())?;
        publish_changed(bus, &rel, previous);
        Ok(rel)
    }

    /// Applies a change produced by game code (quest outcomes, scripted
    /// events). Changes are damped but not bounded to the narrative limit.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the repository fails.
    #[instrument(skip_all, fields(source = %source, target = %target, turn))]
    pub fn apply_action_delta(
        &self,
        bus: &EventBus,
        source: &EntityRef,
        target: &EntityRef,
        affinity: f64,
        trust: f64,
        turn: u32,
    ) -> Result<Relationship, DomainError> {
        let mut rel = self.get_or_create(source, target, turn)?;
        let previous = rel.status();

        rel.apply_change(affinity, trust, &self.table);
        rel.last_interaction_turn = turn;

        self.repo.upsert(rel.clone())?;
        publish_changed(bus, &rel, previous);
        Ok(rel)
    }

    /// Applies a named reversal. Unknown kinds are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the repository fails.
    #[instrument(skip_all, fields(source = %source, target = %target, kind))]
    pub fn apply_reversal(
        &self,
        bus: &EventBus,
        source: &EntityRef,
        target: &EntityRef,
        kind: &str,
        turn: u32,
    ) -> Result<Option<Relationship>, DomainError> {
        let kind: ReversalKind = match kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                warn!(error = %e, "ignoring reversal");
                return Ok(None);
            }
        };

        let current = self.get_or_create(source, target, turn)?;
        let mut reversed = apply_reversal(&current, kind, &self.table);
        reversed.last_interaction_turn = turn;
        self.repo.upsert(reversed.clone())?;

        info!(
            relationship_id = %reversed.id,
            %kind,
            from = %current.status(),
            to = %reversed.status(),
            "relationship reversed"
        );

        bus.emit(GameEvent::new(
            source_of(&reversed),
            RelationshipReversed {
                relationship_id: reversed.id,
                source_id: reversed.source.id.clone(),
                target_id: reversed.target.id.clone(),
                kind,
                status: reversed.status(),
            },
        ));
        publish_changed(bus, &reversed, current.status());
        Ok(Some(reversed))
    }

    /// How `source` currently regards `target`, if they have ever met.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the repository fails.
    pub fn attitude_of(
        &self,
        source: &EntityRef,
        target: &EntityRef,
    ) -> Result<Option<Attitude>, DomainError> {
        Ok(self.find(source, target)?.as_ref().map(Attitude::from))
    }

    fn on_dialogue_ended(
        &self,
        bus: &EventBus,
        event: &DialogueEnded,
    ) -> Result<(), DomainError> {
        let delta = event.relationship_delta.unwrap_or_default();
        self.apply_dialogue_outcome(bus, &event.npc_id, &event.player_id, delta, event.turn)?;
        Ok(())
    }

    fn on_npc_promoted(&self, bus: &EventBus, event: &NpcPromoted) -> Result<(), DomainError> {
        let Some(player_id) = event.player_id.as_deref() else {
            return Ok(());
        };
        let mut rel = self.get_or_create(
            &EntityRef::npc(&event.npc_id),
            &EntityRef::player(player_id),
            event.turn,
        )?;
        let previous = rel.status();

        rel.tags.insert(PROMOTED_TAG.to_owned());
        rel.add_familiarity(event.prior_interactions, &self.table);
        self.repo.upsert(rel.clone())?;

        if rel.status() != previous {
            publish_changed(bus, &rel, previous);
        }
        Ok(())
    }

    fn on_quest_resolved(
        &self,
        bus: &EventBus,
        npc_id: &str,
        player_id: &str,
        rewards: &QuestRewards,
        turn: u32,
    ) -> Result<(), DomainError> {
        if rewards.affinity.abs() < f64::EPSILON && rewards.trust.abs() < f64::EPSILON {
            return Ok(());
        }
        self.apply_action_delta(
            bus,
            &EntityRef::npc(npc_id),
            &EntityRef::player(player_id),
            rewards.affinity,
            rewards.trust,
            turn,
        )?;
        Ok(())
    }

    fn on_attitude_request(
        &self,
        bus: &EventBus,
        request: &AttitudeRequest,
    ) -> Result<(), DomainError> {
        let found = self.repo.find(&|rel| {
            rel.source.id == request.source_id && rel.target.id == request.target_id
        })?;
        let attitude = found.last().map(Attitude::from);

        bus.emit(GameEvent::new(
            format!("attitude:{}", request.requester),
            AttitudeResponse {
                requester: request.requester.clone(),
                source_id: request.source_id.clone(),
                target_id: request.target_id.clone(),
                status: attitude.map(|a| a.status),
                affinity: attitude.map_or(0.0, |a| a.affinity),
                trust: attitude.map_or(0.0, |a| a.trust),
                familiarity: attitude.map_or(0, |a| a.familiarity),
            },
        ));
        Ok(())
    }
}

impl EventHandler for RelationshipService {
    fn name(&self) -> &str {
        "relationship-service"
    }

    fn handle(&self, event: &GameEvent, bus: &EventBus) -> Result<(), DomainError> {
        match &event.payload {
            EventPayload::DialogueEnded(p) => self.on_dialogue_ended(bus, p),
            EventPayload::NpcPromoted(p) => self.on_npc_promoted(bus, p),
            EventPayload::QuestCompleted(p) => {
                self.on_quest_resolved(bus, &p.npc_id, &p.player_id, &p.rewards, p.turn)
            }
            EventPayload::QuestFailed(p) => {
                self.on_quest_resolved(bus, &p.npc_id, &p.player_id, &p.rewards, p.turn)
            }
            EventPayload::QuestAbandoned(p) => {
                self.on_quest_resolved(bus, &p.npc_id, &p.player_id, &p.rewards, p.turn)
            }
            EventPayload::AttitudeRequest(p) => self.on_attitude_request(bus, p),
            _ => Ok(()),
        }
    }
}

fn source_of(rel: &Relationship) -> String {
    format!("relationship:{}", rel.id)
}

fn publish_changed(bus: &EventBus, rel: &Relationship, previous_status: RelationshipStatus) {
    if rel.status() != previous_status {
        info!(
            relationship_id = %rel.id,
            from = %previous_status,
            to = %rel.status(),
            "relationship status changed"
        );
    }
    bus.emit(GameEvent::new(
        source_of(rel),
        RelationshipChanged {
            relationship_id: rel.id,
            source_id: rel.source.id.clone(),
            target_id: rel.target.id.clone(),
            affinity: rel.affinity(),
            trust: rel.trust(),
            familiarity: rel.familiarity(),
            previous_status,
            status: rel.status(),
        },
    ));
}
