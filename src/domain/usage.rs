//! Usage records: where a library item shows up in other content.

use serde::{Deserialize, Serialize};

use super::record::{RecordId, RecordStatus, RecordSummary};

/// How a content record uses a library item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageType {
    /// Live link; edits to the item propagate to the record
    Global,

    /// Inert copy with no link back to the item
    Copy,
}

impl std::fmt::Display for UsageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageType::Global => write!(f, "global"),
            UsageType::Copy => write!(f, "copy"),
        }
    }
}

/// One content record that uses a library item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Referencing record
    pub id: RecordId,

    pub title: String,

    pub record_type: String,

    pub status: RecordStatus,

    pub edit_link: String,

    pub view_link: String,

    pub usage_type: UsageType,
}

impl UsageRecord {
    /// Tag a search hit with a usage type
    pub fn from_summary(summary: &RecordSummary, usage_type: UsageType) -> Self {
        Self {
            id: summary.id,
            title: summary.title.clone(),
            record_type: summary.record_type.clone(),
            status: summary.status,
            edit_link: summary.edit_link.clone(),
            view_link: summary.view_link.clone(),
            usage_type,
        }
    }

    pub fn is_global(&self) -> bool {
        self.usage_type == UsageType::Global
    }

    pub fn is_copy(&self) -> bool {
        self.usage_type == UsageType::Copy
    }
}

/// Predicates over an item's usage list
pub trait UsageExt {
    /// Non-empty, no global references, at least one copy
    fn has_only_copy_usage(&self) -> bool;

    /// At least one global reference
    fn has_global_usage(&self) -> bool;

    /// Unused, or used only through copies
    fn is_safe_to_delete(&self) -> bool;

    fn global_count(&self) -> usize;

    fn copy_count(&self) -> usize;
}

impl UsageExt for [UsageRecord] {
    fn has_only_copy_usage(&self) -> bool {
        !self.is_empty() && !self.has_global_usage() && self.iter().any(UsageRecord::is_copy)
    }

    fn has_global_usage(&self) -> bool {
        self.iter().any(UsageRecord::is_global)
    }

    fn is_safe_to_delete(&self) -> bool {
        self.is_empty() || self.has_only_copy_usage()
    }

    fn global_count(&self) -> usize {
        self.iter().filter(|u| u.is_global()).count()
    }

    fn copy_count(&self) -> usize {
        self.iter().filter(|u| u.is_copy()).count()
    }
}
