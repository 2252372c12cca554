//! Event handler abstraction.

use std::fmt;
use std::sync::Arc;

use questweave_core::error::DomainError;
use questweave_core::event::GameEvent;

use crate::bus::EventBus;

/// A subscriber to one or more event types.
///
/// Handlers run synchronously inside [`EventBus::emit`] and may emit further
/// events through the `bus` they are handed. An `Err` (or a panic) is logged
/// by the bus and does not stop sibling handlers.
pub trait EventHandler: Send + Sync {
    /// Identity used in logs.
    fn name(&self) -> &str;

    /// Reacts to one event.
    ///
    /// # Errors
    ///
    /// Any error is caught and logged by the bus.
    fn handle(&self, event: &GameEvent, bus: &EventBus) -> Result<(), DomainError>;
}

/// Adapts a closure into an [`EventHandler`].
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&GameEvent, &EventBus) -> Result<(), DomainError> + Send + Sync + 'static,
{
    /// Wraps `f` under the given handler name.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Wraps `f` and returns it ready for [`EventBus::subscribe`].
    pub fn shared(name: impl Into<String>, f: F) -> Arc<dyn EventHandler> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&GameEvent, &EventBus) -> Result<(), DomainError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, event: &GameEvent, bus: &EventBus) -> Result<(), DomainError> {
        (self.f)(event, bus)
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish()
    }
}
