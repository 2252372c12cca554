//! Questweave — Objective Watcher bounded context.
//!
//! Matches gameplay events against the active objective set, completes or
//! fails objectives through the quest service, and generates replacement
//! objectives when one fails.

pub mod application;
pub mod domain;
