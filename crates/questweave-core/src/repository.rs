//! Persistence boundary.
//!
//! The kernel never performs I/O itself. Owning services read and write
//! their records through this narrow, synchronous contract; adapters decide
//! how (and whether) records are stored durably.

use uuid::Uuid;

use crate::error::DomainError;

/// A record that can be stored behind a [`Repository`].
pub trait Record: Clone + Send + Sync + 'static {
    /// Classification used by [`Repository::active_by_kind`].
    type Kind: PartialEq + Send + Sync;

    /// Human-readable record name (used in `NotFound` errors and logs).
    const NAME: &'static str;

    /// Returns the record identifier.
    fn record_id(&self) -> Uuid;

    /// Returns the record's classification.
    fn kind(&self) -> Self::Kind;

    /// Whether the record is still live (not terminal).
    fn is_active(&self) -> bool;
}

/// Repository trait for loading and saving kernel records.
pub trait Repository<R: Record>: Send + Sync {
    /// Load a record by identifier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store is unavailable.
    fn get(&self, id: Uuid) -> Result<Option<R>, DomainError>;

    /// Return every record matching `predicate`, in storage order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store is unavailable.
    fn find(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Vec<R>, DomainError>;

    /// Insert a record, replacing any record with the same identifier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store is unavailable.
    fn upsert(&self, record: R) -> Result<(), DomainError>;

    /// Delete a record. Returns whether a record was removed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store is unavailable.
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;

    /// Return every active record of the given kind.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store is unavailable.
    fn active_by_kind(&self, kind: &R::Kind) -> Result<Vec<R>, DomainError> {
        self.find(&|record| record.is_active() && record.kind() == *kind)
    }

    /// Load a record that must exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if no record has the identifier.
    fn require(&self, id: Uuid) -> Result<R, DomainError> {
        self.get(id)?
            .ok_or_else(|| DomainError::not_found(R::NAME, id))
    }
}
