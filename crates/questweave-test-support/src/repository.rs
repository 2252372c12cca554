//! Test repositories — `Repository` implementations for error paths.

use std::marker::PhantomData;

use questweave_core::error::DomainError;
use questweave_core::repository::{Record, Repository};
use uuid::Uuid;

/// A repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingRepository<R>(PhantomData<fn() -> R>);

impl<R> FailingRepository<R> {
    /// Creates the failing repository.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<R> Default for FailingRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn refused() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

impl<R: Record> Repository<R> for FailingRepository<R> {
    fn get(&self, _id: Uuid) -> Result<Option<R>, DomainError> {
        Err(refused())
    }

    fn find(&self, _predicate: &dyn Fn(&R) -> bool) -> Result<Vec<R>, DomainError> {
        Err(refused())
    }

    fn upsert(&self, _record: R) -> Result<(), DomainError> {
        Err(refused())
    }

    fn delete(&self, _id: Uuid) -> Result<bool, DomainError> {
        Err(refused())
    }
}
