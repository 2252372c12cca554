//! Application layer for the Quest & Seed Lifecycle context.

pub mod service;
pub mod stores;
