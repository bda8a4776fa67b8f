//! Bulk deletion over the classified library.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::janitor::Janitor;
use crate::domain::{LibraryItem, RecordId, UsageExt};
use crate::store::StoreError;

/// Which items a bulk run targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    /// Items nothing uses
    Unused,

    /// Items used only through copies
    Copies,

    /// Unused and copy-only items
    Safe,
}

impl BulkAction {
    /// Whether the action targets `item`
    pub fn selects(self, item: &LibraryItem) -> bool {
        match self {
            BulkAction::Unused => item.usage.is_empty(),
            BulkAction::Copies => item.usage.has_only_copy_usage(),
            BulkAction::Safe => item.usage.is_safe_to_delete(),
        }
    }

    /// Whether deleting a selected item needs `force`
    pub fn force_for(self, item: &LibraryItem) -> bool {
        match self {
            BulkAction::Unused => false,
            BulkAction::Copies => true,
            BulkAction::Safe => !item.usage.is_empty(),
        }
    }
}

impl std::fmt::Display for BulkAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BulkAction::Unused => write!(f, "unused"),
            BulkAction::Copies => write!(f, "copies"),
            BulkAction::Safe => write!(f, "safe"),
        }
    }
}

impl std::str::FromStr for BulkAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "unused" => Ok(BulkAction::Unused),
            "copies" | "copy" => Ok(BulkAction::Copies),
            "safe" => Ok(BulkAction::Safe),
            _ => anyhow::bail!("Unknown bulk action: {} (expected unused, copies or safe)", s),
        }
    }
}

/// Outcome of a bulk run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkStatus {
    NothingToDelete,
    Success,

    /// Some deleted, some failed
    Partial,

    Failed,
}

impl BulkStatus {
    fn from_counts(deleted: usize, failed: usize) -> Self {
        match (deleted, failed) {
            (0, 0) => BulkStatus::NothingToDelete,
            (_, 0) => BulkStatus::Success,
            (0, _) => BulkStatus::Failed,
            _ => BulkStatus::Partial,
        }
    }

    /// Success, possibly with warnings
    pub fn is_success(self) -> bool {
        matches!(self, BulkStatus::Success | BulkStatus::Partial)
    }
}

/// Result of a bulk run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkReport {
    pub action: BulkAction,
    pub status: BulkStatus,
    pub deleted_count: usize,
    pub failed_count: usize,
    pub deleted_ids: Vec<RecordId>,

    /// `"{title}: {message}"` per failed item, or the scan failure
    pub errors: Vec<String>,
}

impl BulkReport {
    fn new(action: BulkAction) -> Self {
        Self {
            action,
            status: BulkStatus::NothingToDelete,
            deleted_count: 0,
            failed_count: 0,
            deleted_ids: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// A run that stopped before any item was tried
    fn scan_failed(action: BulkAction, error: &StoreError) -> Self {
        Self {
            status: BulkStatus::Failed,
            errors: vec![format!("Library scan failed: {}", error)],
            ..Self::new(action)
        }
    }

    /// One-line summary for display
    pub fn message(&self) -> String {
        match self.status {
            BulkStatus::NothingToDelete => format!("No {} items to delete", self.action),
            BulkStatus::Success => format!("Deleted {} item(s)", self.deleted_count),
            BulkStatus::Partial => format!(
                "Deleted {} item(s), {} failed",
                self.deleted_count, self.failed_count
            ),
            BulkStatus::Failed if self.failed_count == 0 => {
                format!("Bulk {} could not scan the library", self.action)
            }
            BulkStatus::Failed => format!("All {} deletion(s) failed", self.failed_count),
        }
    }
}

impl Janitor<'_> {
    /// Items a bulk action would attempt, without deleting anything
    pub fn plan_bulk(&self, action: BulkAction) -> Result<Vec<LibraryItem>, StoreError> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|item| action.selects(item))
            .collect())
    }

    /// Delete every item the action selects.
    ///
    /// Each item is re-checked by [`Janitor::delete_item`]. Failures are
    /// collected and never stop the batch. A failed library scan yields a
    /// `Failed` report with no deletions. Delete observers are not run.
    #[instrument(skip(self, action), fields(action = %action))]
    pub fn run_bulk(&self, action: BulkAction) -> BulkReport {
        let started = Instant::now();
        let selected = match self.plan_bulk(action) {
            Ok(selected) => selected,
            Err(e) => {
                warn!(error = %e, "Bulk run could not scan the library");
                return BulkReport::scan_failed(action, &e);
            }
        };
        let quiet = Janitor {
            store: self.store,
            classifier: self.classifier,
            options: self.options.quiet(),
        };

        let mut report = BulkReport::new(action);
        for item in &selected {
            match quiet.delete_item(item.id, action.force_for(item)) {
                Ok(deleted) => {
                    report.deleted_count += 1;
                    report.deleted_ids.push(deleted.id);
                }
                Err(e) => {
                    warn!(item = %item.id, error = %e, "Bulk delete failed for item");
                    report.failed_count += 1;
                    report.errors.push(format!("{}: {}", item.title, e));
                }
            }
        }

        report.status = BulkStatus::from_counts(report.deleted_count, report.failed_count);
        info!(
            selected = selected.len(),
            deleted = report.deleted_count,
            failed = report.failed_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Bulk run finished"
        );

        report
    }
}
