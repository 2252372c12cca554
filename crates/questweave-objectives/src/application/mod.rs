//! Application layer for the Objective Watcher context.

pub mod watcher;
