//! Application layer for the Relationship State Machine context.

pub mod service;
