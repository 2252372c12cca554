//! The event bus.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use questweave_core::config::BusConfig;
use questweave_core::event::{EventType, GameEvent};
use tracing::{debug, error, warn};

use crate::handler::EventHandler;

/// What happened to an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /// The event was routed to every handler registered for its type.
    Delivered {
        /// Handlers invoked.
        handlers: usize,
        /// Handlers that returned an error or panicked.
        failed: usize,
    },
    /// The chain was already at the depth limit.
    DroppedDepth,
    /// The same `source:event_type` already fired in this chain.
    DroppedDuplicate,
}

impl EmitOutcome {
    /// Whether the event reached the handler stage.
    #[must_use]
    pub fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

#[derive(Default)]
struct BusState {
    handlers: HashMap<EventType, Vec<Arc<dyn EventHandler>>>,
    seen: HashSet<String>,
    depth: u32,
}

/// Synchronous publish/subscribe hub for one game session.
///
/// The registry, dedup set and depth counter live behind a mutex that is
/// never held while handlers run, so handlers may subscribe, unsubscribe and
/// emit re-entrantly.
pub struct EventBus {
    max_depth: u32,
    state: Mutex<BusState>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new(config: &BusConfig) -> Self {
        Self::with_max_depth(config.max_depth)
    }

    /// Creates an empty bus with an explicit depth limit.
    #[must_use]
    pub fn with_max_depth(max_depth: u32) -> Self {
        Self {
            max_depth,
            state: Mutex::new(BusState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        // A panicking handler never holds this lock, so the state is intact.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `handler` for `event_type`, after any existing handlers.
    pub fn subscribe(&self, event_type: EventType, handler: Arc<dyn EventHandler>) {
        debug!(%event_type, handler = handler.name(), "subscribing handler");
        self.lock()
            .handlers
            .entry(event_type)
            .or_default()
            .push(handler);
    }

    /// Registers `handler` for an event given by name. Unknown names are
    /// logged and ignored; returns whether the subscription was made.
    pub fn subscribe_named(&self, event_name: &str, handler: Arc<dyn EventHandler>) -> bool {
        match event_name.parse::<EventType>() {
            Ok(event_type) => {
                self.subscribe(event_type, handler);
                true
            }
            Err(e) => {
                warn!(event_name, handler = handler.name(), error = %e, "subscribe to unknown event type ignored");
                false
            }
        }
    }

    /// Removes `handler` from `event_type`. Returns whether it was registered.
    pub fn unsubscribe(&self, event_type: EventType, handler: &Arc<dyn EventHandler>) -> bool {
        let mut state = self.lock();
        let Some(handlers) = state.handlers.get_mut(&event_type) else {
            warn!(%event_type, handler = handler.name(), "unsubscribe from event type with no handlers");
            return false;
        };
        let before = handlers.len();
        handlers.retain(|registered| !Arc::ptr_eq(registered, handler));
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            state.handlers.remove(&event_type);
        }
        if !removed {
            warn!(%event_type, handler = handler.name(), "unsubscribe of unregistered handler");
        }
        removed
    }

    /// Removes `handler` from an event given by name. Unknown names are
    /// logged and ignored.
    pub fn unsubscribe_named(&self, event_name: &str, handler: &Arc<dyn EventHandler>) -> bool {
        match event_name.parse::<EventType>() {
            Ok(event_type) => self.unsubscribe(event_type, handler),
            Err(e) => {
                warn!(event_name, handler = handler.name(), error = %e, "unsubscribe from unknown event type ignored");
                false
            }
        }
    }

    /// Publishes `event` to every handler registered for its type.
    ///
    /// The depth limit is checked first, then the dedup key. Delivered
    /// events carry the nesting level at which they were emitted in `depth`.
    pub fn emit(&self, mut event: GameEvent) -> EmitOutcome {
        let event_type = event.event_type();
        let (handlers, depth) = {
            let mut state = self.lock();
            if state.depth >= self.max_depth {
                warn!(
                    %event_type,
                    source = %event.source,
                    depth = state.depth,
                    max_depth = self.max_depth,
                    "propagation depth exceeded, event dropped"
                );
                return EmitOutcome::DroppedDepth;
            }
            let key = event.dedup_key();
            if !state.seen.insert(key) {
                debug!(%event_type, source = %event.source, "duplicate emission in chain, event dropped");
                return EmitOutcome::DroppedDuplicate;
            }
            let handlers = state.handlers.get(&event_type).cloned().unwrap_or_default();
            let depth = state.depth;
            state.depth += 1;
            (handlers, depth)
        };

        event.depth = depth;
        debug!(%event_type, source = %event.source, depth, handlers = handlers.len(), "dispatching event");

        let mut failed = 0;
        for handler in &handlers {
            match catch_unwind(AssertUnwindSafe(|| handler.handle(&event, self))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failed += 1;
                    error!(%event_type, handler = handler.name(), error = %e, "event handler failed");
                }
                Err(panic) => {
                    failed += 1;
                    error!(
                        %event_type,
                        handler = handler.name(),
                        panic = panic_message(panic.as_ref()),
                        "event handler panicked"
                    );
                }
            }
        }

        let mut state = self.lock();
        state.depth = state.depth.saturating_sub(1);

        EmitOutcome::Delivered {
            handlers: handlers.len(),
            failed,
        }
    }

    /// Ends the current chain: forgets every dedup key and resets depth.
    /// Call exactly once per completed turn.
    pub fn reset_chain(&self) {
        let mut state = self.lock();
        if state.depth != 0 {
            warn!(depth = state.depth, "chain reset while events are still propagating");
        }
        state.seen.clear();
        state.depth = 0;
    }

    /// Drops every subscription and resets the chain.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.handlers.clear();
        state.seen.clear();
        state.depth = 0;
    }

    /// Number of handlers registered for `event_type`.
    #[must_use]
    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.lock().handlers.get(&event_type).map_or(0, Vec::len)
    }

    /// Current nesting level (0 outside of `emit`).
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.lock().depth
    }

    /// The configured depth limit.
    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(&BusConfig::default())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("EventBus")
            .field("max_depth", &self.max_depth)
            .field("event_types", &state.handlers.len())
            .field("seen", &state.seen.len())
            .field("depth", &state.depth)
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use proptest::prelude::*;
    use questweave_core::error::DomainError;
    use questweave_core::event::TurnProcessed;

    use super::*;
    use crate::handler::FnHandler;

    fn turn_event(source: &str) -> GameEvent {
        GameEvent::new(source, TurnProcessed { turn: 1 })
    }

    fn counting_handler(counter: &Arc<AtomicUsize>) -> Arc<dyn EventHandler> {
        let counter = Arc::clone(counter);
        FnHandler::shared("counter", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    /// A handler that re-emits the same event type under a fresh source on
    /// every invocation.
    fn re_emitting_handler(counter: &Arc<AtomicUsize>) -> Arc<dyn EventHandler> {
        let counter = Arc::clone(counter);
        FnHandler::shared("re-emitter", move |_, bus| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            bus.emit(turn_event(&format!("generation-{n}")));
            Ok(())
        })
    }

    #[test]
    fn test_re_emitting_chain_stops_at_depth_five() {
        // Arrange
        let bus = EventBus::default();
        let invocations = Arc::new(AtomicUsize::new(0));
        bus.subscribe(EventType::TurnProcessed, re_emitting_handler(&invocations));

        // Act
        let outcome = bus.emit(turn_event("origin"));

        // Assert
        assert!(outcome.is_delivered());
        assert_eq!(invocations.load(Ordering::SeqCst), 5);
        assert_eq!(bus.depth(), 0);
    }

    #[test]
    fn test_duplicate_emission_in_chain_is_dropped_until_reset() {
        let bus = EventBus::default();
        let calls = Arc::new(AtomicUsize::new(0));
        bus.subscribe(EventType::TurnProcessed, counting_handler(&calls));

        let first = bus.emit(turn_event("s"));
        let second = bus.emit(turn_event("s"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second, EmitOutcome::DroppedDuplicate);
        assert!(first.is_delivered());

        bus.reset_chain();
        let third = bus.emit(turn_event("s"));

        assert!(third.is_delivered());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_same_source_different_type_is_not_a_duplicate() {
        let bus = EventBus::default();
        let calls = Arc::new(AtomicUsize::new(0));
        bus.subscribe(EventType::TurnProcessed, counting_handler(&calls));
        bus.subscribe(EventType::NpcDied, counting_handler(&calls));

        bus.emit(turn_event("s"));
        bus.emit(GameEvent::new(
            "s",
            questweave_core::event::NpcDied {
                npc_id: "n".to_owned(),
                node_id: None,
                turn: 1,
            },
        ));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let bus = EventBus::default();
        let order = Arc::new(Mutex::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe(
                EventType::TurnProcessed,
                FnHandler::shared(label, move |_, _| {
                    order.lock().unwrap().push(label);
                    Ok(())
                }),
            );
        }

        bus.emit(turn_event("s"));

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_failing_handler_does_not_stop_siblings() {
        let bus = EventBus::default();
        let calls = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            EventType::TurnProcessed,
            FnHandler::shared("broken", |_, _| {
                Err(DomainError::Validation("bad payload".to_owned()))
            }),
        );
        bus.subscribe(EventType::TurnProcessed, counting_handler(&calls));

        let outcome = bus.emit(turn_event("s"));

        assert_eq!(
            outcome,
            EmitOutcome::Delivered {
                handlers: 2,
                failed: 1
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_handler_is_isolated_and_depth_restored() {
        let bus = EventBus::default();
        let calls = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            EventType::TurnProcessed,
            FnHandler::shared("panicky", |_, _| panic!("handler blew up")),
        );
        bus.subscribe(EventType::TurnProcessed, counting_handler(&calls));

        let outcome = bus.emit(turn_event("s"));

        assert_eq!(
            outcome,
            EmitOutcome::Delivered {
                handlers: 2,
                failed: 1
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.depth(), 0);
    }

    #[test]
    fn test_delivered_event_carries_nesting_depth() {
        let bus = EventBus::default();
        let depths = Arc::new(Mutex::new(Vec::new()));
        {
            let depths = Arc::clone(&depths);
            bus.subscribe(
                EventType::TurnProcessed,
                FnHandler::shared("nest", move |event, bus| {
                    depths.lock().unwrap().push(event.depth);
                    if event.depth == 0 {
                        bus.emit(turn_event("nested"));
                    }
                    Ok(())
                }),
            );
        }

        bus.emit(turn_event("outer"));

        assert_eq!(*depths.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_handler() {
        let bus = EventBus::default();
        let a_calls = Arc::new(AtomicUsize::new(0));
        let b_calls = Arc::new(AtomicUsize::new(0));
        let a = counting_handler(&a_calls);
        let b = counting_handler(&b_calls);
        bus.subscribe(EventType::TurnProcessed, Arc::clone(&a));
        bus.subscribe(EventType::TurnProcessed, Arc::clone(&b));

        assert!(bus.unsubscribe(EventType::TurnProcessed, &a));
        assert!(!bus.unsubscribe(EventType::TurnProcessed, &a));
        bus.emit(turn_event("s"));

        assert_eq!(a_calls.load(Ordering::SeqCst), 0);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count(EventType::TurnProcessed), 1);
    }

    #[test]
    fn test_named_subscription_rejects_unknown_event_type() {
        let bus = EventBus::default();
        let calls = Arc::new(AtomicUsize::new(0));

        assert!(!bus.subscribe_named("quest_exploded", counting_handler(&calls)));
        assert!(bus.subscribe_named("turn_processed", counting_handler(&calls)));
        assert!(!bus.unsubscribe_named("quest_exploded", &counting_handler(&calls)));
        assert_eq!(bus.handler_count(EventType::TurnProcessed), 1);
    }

    #[test]
    fn test_event_without_handlers_is_still_recorded_for_dedup() {
        let bus = EventBus::default();

        let first = bus.emit(turn_event("s"));
        let second = bus.emit(turn_event("s"));

        assert_eq!(
            first,
            EmitOutcome::Delivered {
                handlers: 0,
                failed: 0
            }
        );
        assert_eq!(second, EmitOutcome::DroppedDuplicate);
    }

    #[test]
    fn test_clear_drops_all_subscriptions() {
        let bus = EventBus::default();
        let calls = Arc::new(AtomicUsize::new(0));
        bus.subscribe(EventType::TurnProcessed, counting_handler(&calls));

        bus.clear();
        bus.emit(turn_event("s"));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(bus.handler_count(EventType::TurnProcessed), 0);
    }

    proptest! {
        #[test]
        fn prop_re_emission_is_bounded_by_max_depth(max_depth in 1u32..10) {
            let bus = EventBus::with_max_depth(max_depth);
            let invocations = Arc::new(AtomicUsize::new(0));
            bus.subscribe(EventType::TurnProcessed, re_emitting_handler(&invocations));

            bus.emit(turn_event("origin"));

            prop_assert_eq!(invocations.load(Ordering::SeqCst), max_depth as usize);
            prop_assert_eq!(bus.depth(), 0);
        }
    }
}
