//! Content store interface and backends.
//!
//! The janitor never owns content. Everything it knows about the site comes
//! through [`ContentStore`]: listing library items, case-sensitive substring
//! search over record bodies, and deleting a record.
//!
//! # Backends
//!
//! - [`MemoryStore`]: in-memory corpus, loadable from a JSON snapshot
//! - [`SqliteStore`]: SQLite database (`records`, `record_terms`, `record_meta`)

pub mod memory;
pub mod sqlite;

use thiserror::Error;

use crate::domain::{LibraryItem, Record, RecordId, RecordStatus, RecordSummary};

pub use memory::{MemoryStore, Snapshot};
pub use sqlite::SqliteStore;

/// Errors reported by a content store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Store refused to delete record {id}: {reason}")]
    Refused { id: RecordId, reason: String },

    #[error("Record id {0} does not fit the database key range")]
    IdOutOfRange(RecordId),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: i64, reason: String },

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a record is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Remove the record instead of moving it to the trash
    pub permanent: bool,

    /// Run registered [`DeleteObserver`]s before deleting
    pub notify_observers: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            permanent: true,
            notify_observers: true,
        }
    }
}

impl DeleteOptions {
    /// Same options, with observers skipped
    pub fn quiet(self) -> Self {
        Self {
            notify_observers: false,
            ..self
        }
    }
}

/// Side effect attached to record deletion (cache purges, asset rebuilds, ...)
pub trait DeleteObserver: Send + Sync {
    /// Human-readable observer name
    fn name(&self) -> &str;

    /// Called with the record about to be deleted
    fn before_delete(&self, record: &Record);
}

/// Storage and query interface the janitor works against
pub trait ContentStore {
    /// All published library items, ordered by title
    fn list_library_items(&self) -> Result<Vec<LibraryItem>, StoreError>;

    /// Fetch a single record
    fn get_record(&self, id: RecordId) -> Result<Option<Record>, StoreError>;

    /// Records of `record_type` whose status is in `statuses` and whose body
    /// contains `needle` (case-sensitive), ordered by ID
    fn search(
        &self,
        record_type: &str,
        needle: &str,
        statuses: &[RecordStatus],
    ) -> Result<Vec<RecordSummary>, StoreError>;

    /// Delete a record
    fn delete_record(&self, id: RecordId, options: DeleteOptions) -> Result<(), StoreError>;
}

/// Run observers for a record unless the options suppress them
pub(crate) fn notify(observers: &[Box<dyn DeleteObserver>], record: &Record, options: DeleteOptions) {
    if !options.notify_observers {
        tracing::debug!(record = %record.id, "Delete observers suppressed");
        return;
    }

    for observer in observers {
        tracing::debug!(record = %record.id, observer = observer.name(), "Notifying delete observer");
        observer.before_delete(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delete_options() {
        let options = DeleteOptions::default();
        assert!(options.permanent);
        assert!(options.notify_observers);

        let quiet = options.quiet();
        assert!(quiet.permanent);
        assert!(!quiet.notify_observers);
    }
}
