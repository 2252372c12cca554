//! Test handler — records every event it receives.

use std::sync::{Arc, Mutex};

use questweave_bus::{EventBus, EventHandler};
use questweave_core::error::DomainError;
use questweave_core::event::{EventType, GameEvent};

/// A handler that records every delivered event.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<GameEvent>>,
}

impl RecordingHandler {
    /// Creates a recorder and subscribes it to every given event type.
    #[must_use]
    pub fn attach(bus: &EventBus, event_types: &[EventType]) -> Arc<Self> {
        let recorder = Arc::new(Self::default());
        for event_type in event_types {
            bus.subscribe(*event_type, Arc::clone(&recorder) as Arc<dyn EventHandler>);
        }
        recorder
    }

    /// Returns a snapshot of all recorded events.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self) -> Vec<GameEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Returns the recorded events of one type.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn of_type(&self, event_type: EventType) -> Vec<GameEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.event_type() == event_type)
            .collect()
    }

    /// Returns the types of all recorded events, in delivery order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn types(&self) -> Vec<EventType> {
        self.events().iter().map(GameEvent::event_type).collect()
    }
}

impl EventHandler for RecordingHandler {
    fn name(&self) -> &str {
        "recording-handler"
    }

    fn handle(&self, event: &GameEvent, _bus: &EventBus) -> Result<(), DomainError> {
        self.events
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("recorder mutex poisoned: {e}")))?
            .push(event.clone());
        Ok(())
    }
}
