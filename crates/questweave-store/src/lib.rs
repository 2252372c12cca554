//! In-memory adapter for the kernel's persistence boundary.
//!
//! Records are kept in insertion order, which keeps every scan (and so
//! every objective match) deterministic.

pub mod memory_repository;

pub use memory_repository::InMemoryRepository;
