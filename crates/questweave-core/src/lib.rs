//! Questweave Core — shared kernel abstractions.
//!
//! This crate defines the fundamental traits and types that every bounded
//! context of the progression kernel depends on: errors, determinism seams
//! (clock, RNG, id source), the persistence and collaborator boundaries,
//! the event envelope and vocabulary, and configuration. It contains no
//! infrastructure code.

pub mod clock;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod event;
pub mod id;
pub mod repository;
pub mod rng;
pub mod vocabulary;
