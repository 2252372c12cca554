//! Questweave — Relationship State Machine bounded context.
//!
//! Responsible for affinity, trust and familiarity between entities, the
//! status transitions they drive, and irreversible reversal events.

pub mod application;
pub mod domain;
