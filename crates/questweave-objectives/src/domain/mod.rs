//! Domain layer for the Objective Watcher context.

pub mod matching;
pub mod replacement;
