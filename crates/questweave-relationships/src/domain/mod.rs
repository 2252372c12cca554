//! Domain layer for the Relationship State Machine context.

pub mod dynamics;
pub mod relationship;
pub mod reversal;
pub mod transitions;
