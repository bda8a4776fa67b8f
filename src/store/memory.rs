//! In-memory content store backed by a JSON snapshot.
//!
//! Search is a full scan over a `BTreeMap`, so hits come back ordered by ID.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::RwLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::{notify, ContentStore, DeleteObserver, DeleteOptions, StoreError};
use crate::domain::{
    LibraryItem, Record, RecordId, RecordStatus, RecordSummary, SiteLinks,
};

/// Serialized corpus (`janitor --snapshot site.json ...`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version
    pub version: u32,

    /// Base URL used for edit/view links
    #[serde(default)]
    pub site_url: Option<String>,

    #[serde(default)]
    pub records: Vec<Record>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshot {
    pub fn new() -> Self {
        Self {
            version: 1,
            site_url: None,
            records: Vec::new(),
        }
    }

    /// Load a snapshot from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))
    }

    /// Save the snapshot to disk
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;

        Ok(())
    }
}

#[derive(Debug, Default)]
struct Corpus {
    records: BTreeMap<RecordId, Record>,

    /// Records whose deletion the store refuses
    locked: BTreeSet<RecordId>,
}

/// Content store holding every record in memory
pub struct MemoryStore {
    corpus: RwLock<Corpus>,
    links: SiteLinks,
    observers: Vec<Box<dyn DeleteObserver>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            corpus: RwLock::new(Corpus::default()),
            links: SiteLinks::default(),
            observers: Vec::new(),
        }
    }

    /// Create a store pre-populated with records
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        {
            let mut corpus = store.corpus.write().unwrap_or_else(|e| e.into_inner());
            for record in records {
                corpus.records.insert(record.id, record);
            }
        }
        store
    }

    /// Build a store from a loaded snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let links = snapshot
            .site_url
            .as_deref()
            .map(SiteLinks::new)
            .unwrap_or_default();

        Self::with_records(snapshot.records).with_links(links)
    }

    /// Export the current contents as a snapshot
    pub fn to_snapshot(&self, site_url: Option<String>) -> Result<Snapshot, StoreError> {
        let corpus = self.corpus.read().map_err(|_| StoreError::Poisoned)?;
        Ok(Snapshot {
            version: 1,
            site_url,
            records: corpus.records.values().cloned().collect(),
        })
    }

    /// Use a different site URL for edit/view links
    pub fn with_links(mut self, links: SiteLinks) -> Self {
        self.links = links;
        self
    }

    /// Register a delete observer
    pub fn with_observer(mut self, observer: Box<dyn DeleteObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Insert or replace a record
    pub fn insert(&self, record: Record) -> Result<(), StoreError> {
        let mut corpus = self.corpus.write().map_err(|_| StoreError::Poisoned)?;
        corpus.records.insert(record.id, record);
        Ok(())
    }

    /// Make the store refuse to delete a record
    pub fn lock_record(&self, id: RecordId) -> Result<(), StoreError> {
        let mut corpus = self.corpus.write().map_err(|_| StoreError::Poisoned)?;
        corpus.locked.insert(id);
        Ok(())
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.corpus
            .read()
            .map(|corpus| corpus.records.contains_key(&id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.corpus
            .read()
            .map(|corpus| corpus.records.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentStore for MemoryStore {
    fn list_library_items(&self) -> Result<Vec<LibraryItem>, StoreError> {
        let corpus = self.corpus.read().map_err(|_| StoreError::Poisoned)?;

        let mut items: Vec<LibraryItem> = corpus
            .records
            .values()
            .filter(|r| r.is_library_item() && r.status == RecordStatus::Publish)
            .map(LibraryItem::from_record)
            .collect();
        items.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));

        Ok(items)
    }

    fn get_record(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
        let corpus = self.corpus.read().map_err(|_| StoreError::Poisoned)?;
        Ok(corpus.records.get(&id).cloned())
    }

    fn search(
        &self,
        record_type: &str,
        needle: &str,
        statuses: &[RecordStatus],
    ) -> Result<Vec<RecordSummary>, StoreError> {
        let corpus = self.corpus.read().map_err(|_| StoreError::Poisoned)?;

        Ok(corpus
            .records
            .values()
            .filter(|r| {
                r.record_type == record_type
                    && statuses.contains(&r.status)
                    && r.body.contains(needle)
            })
            .map(|r| self.links.summarize(r))
            .collect())
    }

    fn delete_record(&self, id: RecordId, options: DeleteOptions) -> Result<(), StoreError> {
        let record = {
            let corpus = self.corpus.read().map_err(|_| StoreError::Poisoned)?;
            if corpus.locked.contains(&id) {
                return Err(StoreError::Refused {
                    id,
                    reason: "record is locked".to_string(),
                });
            }
            corpus.records.get(&id).cloned().ok_or(StoreError::NotFound(id))?
        };

        notify(&self.observers, &record, options);

        let mut corpus = self.corpus.write().map_err(|_| StoreError::Poisoned)?;
        if options.permanent {
            corpus.records.remove(&id);
        } else if let Some(stored) = corpus.records.get_mut(&id) {
            stored.status = RecordStatus::Trash;
        }

        Ok(())
    }
}
