//! Guarded deletion of a single library item.
//!
//! An item is classified again right before deletion, so the decision is
//! never based on a stale scan.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::janitor::Janitor;
use crate::domain::{InvalidRecordId, LibraryItem, RecordId, UsageExt};

/// Why a deletion did not happen
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeleteError {
    #[error("Invalid item ID: {0}")]
    InvalidInput(#[from] InvalidRecordId),

    #[error("Record {id} is not a library item")]
    NotALibraryItem { id: RecordId },

    #[error(
        "Cannot delete \"{title}\" (ID {id}): it is used as a global item by {references} record(s). Remove those references first"
    )]
    BlockedByGlobalReference {
        id: RecordId,
        title: String,
        references: usize,
    },

    #[error(
        "\"{title}\" (ID {id}) has {copies} instantiated copies in other content. Force the deletion to remove it; the copies are not affected"
    )]
    RequiresConfirmation {
        id: RecordId,
        title: String,
        copies: usize,
    },

    #[error("Failed to delete item {id}: {reason}")]
    DeleteFailed { id: RecordId, reason: String },
}

/// Serializable tag for a [`DeleteError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotALibraryItem,
    BlockedByGlobalReference,
    RequiresConfirmation,
    DeleteFailed,
}

impl DeleteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeleteError::InvalidInput(_) => ErrorKind::InvalidInput,
            DeleteError::NotALibraryItem { .. } => ErrorKind::NotALibraryItem,
            DeleteError::BlockedByGlobalReference { .. } => ErrorKind::BlockedByGlobalReference,
            DeleteError::RequiresConfirmation { .. } => ErrorKind::RequiresConfirmation,
            DeleteError::DeleteFailed { .. } => ErrorKind::DeleteFailed,
        }
    }

    /// The item the error is about, if the input named one
    pub fn item_id(&self) -> Option<RecordId> {
        match self {
            DeleteError::InvalidInput(_) => None,
            DeleteError::NotALibraryItem { id }
            | DeleteError::BlockedByGlobalReference { id, .. }
            | DeleteError::RequiresConfirmation { id, .. }
            | DeleteError::DeleteFailed { id, .. } => Some(*id),
        }
    }
}

/// Parse a user-supplied item ID
pub fn parse_item_id(raw: &str) -> Result<RecordId, DeleteError> {
    Ok(raw.parse::<RecordId>()?)
}

/// A completed deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub id: RecordId,
    pub title: String,

    /// Copies of the item still present in other content
    pub copies_left: usize,
}

impl Janitor<'_> {
    /// Delete a library item if nothing depends on it.
    ///
    /// Global references always block. Copy-only usage needs `force`.
    #[instrument(skip(self), fields(item = %id))]
    pub fn delete_item(&self, id: RecordId, force: bool) -> Result<Deleted, DeleteError> {
        let record = self
            .store
            .get_record(id)
            .map_err(|e| DeleteError::DeleteFailed {
                id,
                reason: e.to_string(),
            })?
            .filter(|record| record.is_library_item())
            .ok_or(DeleteError::NotALibraryItem { id })?;

        let item = LibraryItem::from_record(&record);
        let usage = self
            .classifier
            .classify(&item, self.store)
            .map_err(|e| DeleteError::DeleteFailed {
                id,
                reason: format!("usage scan failed: {}", e),
            })?;

        if usage.has_global_usage() {
            warn!(references = usage.global_count(), "Deletion blocked by global references");
            return Err(DeleteError::BlockedByGlobalReference {
                id,
                title: item.title,
                references: usage.global_count(),
            });
        }

        let copies = usage.copy_count();
        if usage.has_only_copy_usage() && !force {
            return Err(DeleteError::RequiresConfirmation {
                id,
                title: item.title,
                copies,
            });
        }

        self.store
            .delete_record(id, self.options)
            .map_err(|e| DeleteError::DeleteFailed {
                id,
                reason: e.to_string(),
            })?;

        info!(copies_left = copies, permanent = self.options.permanent, "Deleted library item");
        Ok(Deleted {
            id,
            title: item.title,
            copies_left: copies,
        })
    }
}
