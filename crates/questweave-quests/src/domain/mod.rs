//! Domain layer for the Quest & Seed Lifecycle context.

pub mod chain;
pub mod hints;
pub mod objective;
pub mod quest;
pub mod resolution;
pub mod rewards;
pub mod seed;
