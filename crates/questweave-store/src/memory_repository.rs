//! `Repository` implementation backed by a mutex-guarded vector.

use std::sync::{Mutex, MutexGuard};

use questweave_core::error::DomainError;
use questweave_core::repository::{Record, Repository};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

/// A process-local store for one record type.
#[derive(Debug)]
pub struct InMemoryRepository<R> {
    records: Mutex<Vec<R>>,
}

impl<R: Record> InMemoryRepository<R> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Creates a store pre-populated with `records`.
    #[must_use]
    pub fn with_records(records: Vec<R>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<R>>, DomainError> {
        self.records
            .lock()
            .map_err(|e| {
                DomainError::Infrastructure(format!("{} store mutex poisoned: {e}", R::NAME))
            })
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store mutex is poisoned.
    pub fn len(&self) -> Result<usize, DomainError> {
        Ok(self.lock()?.len())
    }

    /// Whether the store is empty.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store mutex is poisoned.
    pub fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.lock()?.is_empty())
    }
}

impl<R: Record + Serialize + DeserializeOwned> InMemoryRepository<R> {
    /// Serializes every record to a JSON array, in storage order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if serialization fails.
    pub fn snapshot(&self) -> Result<serde_json::Value, DomainError> {
        let records = self.lock()?;
        serde_json::to_value(&*records)
            .map_err(|e| DomainError::Infrastructure(format!("{} snapshot failed: {e}", R::NAME)))
    }

    /// Replaces the store's content with the records in a JSON array
    /// produced by [`snapshot`](Self::snapshot).
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the JSON does not describe
    /// records of this type.
    pub fn restore(&self, snapshot: serde_json::Value) -> Result<(), DomainError> {
        let records: Vec<R> = serde_json::from_value(snapshot)
            .map_err(|e| DomainError::Infrastructure(format!("{} restore failed: {e}", R::NAME)))?;
        *self.lock()? = records;
        Ok(())
    }
}

impl<R: Record> Default for InMemoryRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Repository<R> for InMemoryRepository<R> {
    fn get(&self, id: Uuid) -> Result<Option<R>, DomainError> {
        Ok(self
            .lock()?
            .iter()
            .find(|record| record.record_id() == id)
            .cloned())
    }

    fn find(&self, predicate: &dyn Fn(&R) -> bool) -> Result<Vec<R>, DomainError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|record| predicate(record))
            .cloned()
            .collect())
    }

    fn upsert(&self, record: R) -> Result<(), DomainError> {
        let mut records = self.lock()?;
        let id = record.record_id();
        if let Some(existing) = records.iter_mut().find(|r| r.record_id() == id) {
            *existing = record;
        } else {
            debug!(record = R::NAME, %id, "inserting record");
            records.push(record);
        }
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|record| record.record_id() != id);
        Ok(records.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Lantern {
        id: Uuid,
        colour: &'static str,
        lit: bool,
    }

    impl Record for Lantern {
        type Kind = &'static str;
        const NAME: &'static str = "lantern";

        fn record_id(&self) -> Uuid {
            self.id
        }

        fn kind(&self) -> Self::Kind {
            self.colour
        }

        fn is_active(&self) -> bool {
            self.lit
        }
    }

    fn lantern(n: u128, colour: &'static str, lit: bool) -> Lantern {
        Lantern {
            id: Uuid::from_u128(n),
            colour,
            lit,
        }
    }

    #[test]
    fn test_upsert_inserts_then_replaces_in_place() {
        let repo = InMemoryRepository::new();
        repo.upsert(lantern(1, "red", true)).unwrap();
        repo.upsert(lantern(2, "blue", true)).unwrap();

        repo.upsert(lantern(1, "red", false)).unwrap();

        let all = repo.find(&|_| true).unwrap();
        assert_eq!(all, vec![lantern(1, "red", false), lantern(2, "blue", true)]);
    }

    #[test]
    fn test_active_by_kind_filters_on_kind_and_activity() {
        let repo = InMemoryRepository::with_records(vec![
            lantern(1, "red", true),
            lantern(2, "red", false),
            lantern(3, "blue", true),
        ]);

        let active_red = repo.active_by_kind(&"red").unwrap();

        assert_eq!(active_red, vec![lantern(1, "red", true)]);
    }

    #[test]
    fn test_require_reports_missing_record() {
        let repo: InMemoryRepository<Lantern> = InMemoryRepository::new();

        let err = repo.require(Uuid::from_u128(9)).unwrap_err();

        match err {
            DomainError::NotFound { entity, .. } => assert_eq!(entity, "lantern"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_delete_reports_whether_a_record_was_removed() {
        let repo = InMemoryRepository::with_records(vec![lantern(1, "red", true)]);

        assert!(repo.delete(Uuid::from_u128(1)).unwrap());
        assert!(!repo.delete(Uuid::from_u128(1)).unwrap());
        assert!(repo.is_empty().unwrap());
    }
}
