//! Shared test mocks and utilities for the Questweave progression kernel.

mod clock;
mod companions;
mod handler;
mod repository;
mod rng;

pub use clock::FixedClock;
pub use companions::StaticCompanions;
pub use handler::RecordingHandler;
pub use repository::FailingRepository;
pub use rng::{MockRng, SequenceRng};
