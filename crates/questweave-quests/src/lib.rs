//! Questweave — Quest & Seed Lifecycle bounded context.
//!
//! Responsible for planting quest seeds during conversations, expiring them,
//! activating accepted seeds into quests with validated objectives, resolving
//! quests into rewards, and carrying narrative chains from quest to quest.

pub mod application;
pub mod domain;
