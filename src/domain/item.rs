//! Library items and their category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{Record, RecordId};
use super::usage::UsageRecord;

/// Taxonomy holding the layout category
pub const LAYOUT_TYPE_TAXONOMY: &str = "layout_type";

/// Metadata key used by older sites for the layout category
pub const LAYOUT_TYPE_META: &str = "_et_pb_layout_type";

/// Taxonomies that may carry the `global` scope term
pub const SCOPE_TAXONOMIES: [&str; 2] = ["et_pb_layout_scope", "scope"];

/// Category of a library item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// Full page layout
    Layout,

    Section,

    Row,

    Module,

    /// Missing or unrecognized category
    Unknown,
}

impl LayoutKind {
    /// Map a category slug; anything unrecognized is `Unknown`
    pub fn from_slug(slug: &str) -> Self {
        match slug.trim().to_lowercase().as_str() {
            "layout" => LayoutKind::Layout,
            "section" => LayoutKind::Section,
            "row" => LayoutKind::Row,
            "module" => LayoutKind::Module,
            _ => LayoutKind::Unknown,
        }
    }

    /// Resolve the category of a library record.
    ///
    /// The `layout_type` taxonomy wins; the legacy meta key is the fallback.
    pub fn of_record(record: &Record) -> Self {
        record
            .terms_of(LAYOUT_TYPE_TAXONOMY)
            .iter()
            .find(|slug| !slug.trim().is_empty())
            .or_else(|| {
                record
                    .meta
                    .get(LAYOUT_TYPE_META)
                    .filter(|slug| !slug.trim().is_empty())
            })
            .map(|slug| Self::from_slug(slug))
            .unwrap_or(LayoutKind::Unknown)
    }
}

impl std::fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutKind::Layout => write!(f, "layout"),
            LayoutKind::Section => write!(f, "section"),
            LayoutKind::Row => write!(f, "row"),
            LayoutKind::Module => write!(f, "module"),
            LayoutKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// A reusable content template stored as its own record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryItem {
    pub id: RecordId,

    pub title: String,

    pub kind: LayoutKind,

    pub modified_at: DateTime<Utc>,

    /// Marked as a global item in the library scope taxonomy
    #[serde(default)]
    pub is_global: bool,

    /// Raw content body, used for copy detection
    #[serde(skip)]
    pub content: String,

    /// Where the item is used; filled in by the classifier
    #[serde(default)]
    pub usage: Vec<UsageRecord>,
}

impl LibraryItem {
    /// Build a library item from its stored record
    pub fn from_record(record: &Record) -> Self {
        let is_global = SCOPE_TAXONOMIES
            .iter()
            .any(|taxonomy| record.terms_of(taxonomy).iter().any(|t| t == "global"));

        Self {
            id: record.id,
            title: record.title.clone(),
            kind: LayoutKind::of_record(record),
            modified_at: record.modified_at,
            is_global,
            content: record.body.clone(),
            usage: Vec::new(),
        }
    }

    /// Attach usage results
    pub fn with_usage(mut self, usage: Vec<UsageRecord>) -> Self {
        self.usage = usage;
        self
    }
}
