//! Questweave — Event Bus.
//!
//! Routes typed game events to registered handlers synchronously, with a
//! fixed propagation depth limit and same-chain deduplication on
//! `source:event_type`.

mod bus;
mod handler;

pub use bus::{EmitOutcome, EventBus};
pub use handler::{EventHandler, FnHandler};
