//! Content records as the content store sees them.
//!
//! Records are owned by the store; the janitor only reads them, searches
//! their bodies and asks the store to delete library items.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Record type that holds library items
pub const LIBRARY_RECORD_TYPE: &str = "et_pb_layout";

/// Positive integer key of a content record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RecordId(u64);

impl RecordId {
    /// Create a record ID, rejecting zero
    pub fn new(id: u64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    /// Get the raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for RecordId {
    type Error = InvalidRecordId;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        RecordId::new(id).ok_or_else(|| InvalidRecordId::NotPositive(id.to_string()))
    }
}

impl From<RecordId> for u64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rejected record identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRecordId {
    #[error("Missing library item ID")]
    Missing,

    #[error("Library item ID must be a positive integer, got '{0}'")]
    NotPositive(String),
}

impl std::str::FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(InvalidRecordId::Missing);
        }

        trimmed
            .parse::<i64>()
            .ok()
            .and_then(|n| u64::try_from(n).ok())
            .and_then(RecordId::new)
            .ok_or_else(|| InvalidRecordId::NotPositive(trimmed.to_string()))
    }
}

/// Publication status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Publish,
    Draft,
    Pending,
    Private,
    Future,
    /// Discarded; never part of a scan
    Trash,
}

impl RecordStatus {
    /// Every status that still counts as live content
    pub const LIVE: [RecordStatus; 5] = [
        RecordStatus::Publish,
        RecordStatus::Draft,
        RecordStatus::Pending,
        RecordStatus::Private,
        RecordStatus::Future,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Publish => "publish",
            RecordStatus::Draft => "draft",
            RecordStatus::Pending => "pending",
            RecordStatus::Private => "private",
            RecordStatus::Future => "future",
            RecordStatus::Trash => "trash",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "publish" | "published" => Ok(RecordStatus::Publish),
            "draft" => Ok(RecordStatus::Draft),
            "pending" => Ok(RecordStatus::Pending),
            "private" => Ok(RecordStatus::Private),
            "future" | "scheduled" => Ok(RecordStatus::Future),
            "trash" => Ok(RecordStatus::Trash),
            _ => anyhow::bail!("Unknown record status: {}", s),
        }
    }
}

/// A full content record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,

    pub title: String,

    /// Record type tag (`page`, `post`, `et_pb_layout`, ...)
    pub record_type: String,

    pub status: RecordStatus,

    /// Serialized content body
    #[serde(default)]
    pub body: String,

    pub modified_at: DateTime<Utc>,

    /// Taxonomy name -> term slugs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub terms: BTreeMap<String, Vec<String>>,

    /// Free-form metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl Record {
    /// Create a record with no terms or metadata
    pub fn new(
        id: RecordId,
        title: impl Into<String>,
        record_type: impl Into<String>,
        status: RecordStatus,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            record_type: record_type.into(),
            status,
            body: body.into(),
            modified_at: Utc::now(),
            terms: BTreeMap::new(),
            meta: BTreeMap::new(),
        }
    }

    /// Add a term to a taxonomy
    pub fn with_term(mut self, taxonomy: impl Into<String>, slug: impl Into<String>) -> Self {
        self.terms.entry(taxonomy.into()).or_default().push(slug.into());
        self
    }

    /// Set a metadata value
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn is_library_item(&self) -> bool {
        self.record_type == LIBRARY_RECORD_TYPE
    }

    /// Term slugs of a taxonomy (empty if the record has none)
    pub fn terms_of(&self, taxonomy: &str) -> &[String] {
        self.terms.get(taxonomy).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A search hit returned by the content store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub id: RecordId,
    pub title: String,
    pub record_type: String,
    pub status: RecordStatus,
    pub body: String,
    pub edit_link: String,
    pub view_link: String,
}

/// Builds the edit and view links the store hands out with search hits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLinks {
    site_url: String,
}

impl SiteLinks {
    pub fn new(site_url: impl Into<String>) -> Self {
        let site_url = site_url.into();
        Self {
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn edit_link(&self, id: RecordId) -> String {
        format!("{}/wp-admin/post.php?post={}&action=edit", self.site_url, id)
    }

    pub fn view_link(&self, id: RecordId) -> String {
        format!("{}/?p={}", self.site_url, id)
    }

    /// Summarize a record as a search hit
    pub fn summarize(&self, record: &Record) -> RecordSummary {
        RecordSummary {
            id: record.id,
            title: record.title.clone(),
            record_type: record.record_type.clone(),
            status: record.status,
            body: record.body.clone(),
            edit_link: self.edit_link(record.id),
            view_link: self.view_link(record.id),
        }
    }
}

impl Default for SiteLinks {
    fn default() -> Self {
        Self::new("http://localhost")
    }
}
