//! Questweave runtime — wires the progression kernel together.
//!
//! [`kernel::Kernel`] is the composition root: it owns the event bus and
//! subscribes the relationship, quest and objective services to it.
//! [`session`] replays scripted steps against a kernel.

pub mod companions;
pub mod kernel;
pub mod session;
