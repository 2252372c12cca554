//! Composition root: wires the bus, the stores and the owning services.

use std::sync::Arc;

use questweave_bus::{EmitOutcome, EventBus};
use questweave_core::clock::{Clock, SystemClock};
use questweave_core::collaborators::CompanionDirectory;
use questweave_core::config::KernelConfig;
use questweave_core::event::{EventPayload, GameEvent, TurnProcessed};
use questweave_core::id::{IdSource, RandomIds};
use questweave_core::repository::Repository;
use questweave_core::rng::DeterministicRng;
use questweave_objectives::application::watcher::ObjectiveWatcher;
use questweave_quests::application::service::QuestService;
use questweave_quests::application::stores::QuestStores;
use questweave_relationships::application::service::RelationshipService;
use questweave_relationships::domain::relationship::Relationship;
use questweave_relationships::domain::transitions::TransitionTable;
use questweave_store::InMemoryRepository;
use tracing::info;

/// Source used for events the kernel publishes on its own behalf.
pub const KERNEL_SOURCE: &str = "kernel";

/// Collaborators and adapters the kernel is built from.
pub struct KernelDeps {
    pub relationships: Arc<dyn Repository<Relationship>>,
    pub quest_stores: QuestStores,
    pub transitions: TransitionTable,
    pub clock: Arc<dyn Clock>,
    pub rng: Box<dyn DeterministicRng>,
    pub ids: Arc<dyn IdSource>,
    pub companions: Arc<dyn CompanionDirectory>,
}

impl KernelDeps {
    /// In-memory stores, the system clock and random record ids.
    #[must_use]
    pub fn in_memory(
        rng: Box<dyn DeterministicRng>,
        companions: Arc<dyn CompanionDirectory>,
    ) -> Self {
        Self {
            relationships: Arc::new(InMemoryRepository::<Relationship>::new()),
            quest_stores: QuestStores {
                seeds: Arc::new(InMemoryRepository::new()),
                quests: Arc::new(InMemoryRepository::new()),
                objectives: Arc::new(InMemoryRepository::new()),
                chains: Arc::new(InMemoryRepository::new()),
            },
            transitions: TransitionTable::standard(),
            clock: Arc::new(SystemClock),
            rng,
            ids: Arc::new(RandomIds),
            companions,
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the record id source.
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }
}

/// The progression kernel of one game session.
pub struct Kernel {
    bus: Arc<EventBus>,
    relationships: Arc<RelationshipService>,
    quests: Arc<QuestService>,
    watcher: Arc<ObjectiveWatcher>,
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("max_depth", &self.bus.max_depth())
            .finish_non_exhaustive()
    }
}

impl Kernel {
    /// Builds the services and subscribes them to a fresh bus.
    #[must_use]
    pub fn new(config: &KernelConfig, deps: KernelDeps) -> Self {
        let bus = Arc::new(EventBus::new(&config.bus));

        let relationships = Arc::new(RelationshipService::new(
            deps.relationships,
            deps.transitions,
            deps.clock,
            Arc::clone(&deps.ids),
        ));
        let quests = Arc::new(QuestService::new(
            deps.quest_stores,
            config,
            deps.rng,
            deps.ids,
        ));
        let watcher = Arc::new(ObjectiveWatcher::new(Arc::clone(&quests), deps.companions));

        relationships.subscribe(&bus);
        quests.subscribe(&bus);
        watcher.subscribe(&bus);
        info!(max_depth = bus.max_depth(), "progression kernel started");

        Self {
            bus,
            relationships,
            quests,
            watcher,
        }
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    #[must_use]
    pub fn relationships(&self) -> &RelationshipService {
        &self.relationships
    }

    #[must_use]
    pub fn quests(&self) -> &QuestService {
        &self.quests
    }

    #[must_use]
    pub fn watcher(&self) -> &ObjectiveWatcher {
        &self.watcher
    }

    /// Publishes a gameplay event from `source`.
    pub fn publish(&self, source: &str, payload: impl Into<EventPayload>) -> EmitOutcome {
        self.bus.emit(GameEvent::new(source, payload))
    }

    /// Closes a turn: publishes `turn_processed`, then ends the event chain.
    pub fn end_turn(&self, turn: u32) -> EmitOutcome {
        let outcome = self.publish(KERNEL_SOURCE, TurnProcessed { turn });
        self.bus.reset_chain();
        outcome
    }

    /// Unsubscribes every handler.
    pub fn shutdown(&self) {
        self.bus.clear();
        info!("progression kernel stopped");
    }
}
