//! Usage classification.
//!
//! For each library item the classifier finds the records that reference it
//! as a live global item, then the records that contain an inert copy of its
//! content. Every referencing record ends up with exactly one usage entry.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::signatures::{SignatureExtractor, SignatureLimits, Signatures};
use crate::domain::{
    LibraryItem, RecordId, RecordStatus, RecordSummary, UsageRecord, UsageType,
    LIBRARY_RECORD_TYPE,
};
use crate::store::{ContentStore, StoreError};

/// Content types scanned for usage when nothing else is configured
pub const BASELINE_CONTENT_TYPES: [&str; 2] = ["page", "post"];

/// Substrings that mark a live reference to library item `id`.
///
/// Shortcode attributes appear both raw and backslash-escaped (content that
/// went through JSON or slashing), plus the block-editor attribute form.
pub fn global_markers(id: RecordId) -> Vec<String> {
    let mut markers = Vec::with_capacity(8);
    for attr in ["global_module", "template_id", "saved_tabs"] {
        markers.push(format!("{attr}=\"{id}\""));
        markers.push(format!("{attr}=\\\"{id}\\\""));
    }
    markers.push(format!("\"globalModule\":\"{id}\""));
    markers.push(format!("\\\"globalModule\\\":\\\"{id}\\\""));
    markers
}

/// Which records are searched for usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchScope {
    content_types: Vec<String>,
    statuses: Vec<RecordStatus>,
}

impl Default for SearchScope {
    fn default() -> Self {
        Self::new(BASELINE_CONTENT_TYPES, RecordStatus::LIVE)
    }
}

impl SearchScope {
    /// Build a scope; duplicates are dropped and the library type is never searched
    pub fn new<T: AsRef<str>>(
        content_types: impl IntoIterator<Item = T>,
        statuses: impl IntoIterator<Item = RecordStatus>,
    ) -> Self {
        let mut types: Vec<String> = Vec::new();
        for t in content_types {
            let t = t.as_ref().trim();
            if !t.is_empty() && t != LIBRARY_RECORD_TYPE && !types.iter().any(|seen| seen == t) {
                types.push(t.to_string());
            }
        }

        let mut kept: Vec<RecordStatus> = Vec::new();
        for status in statuses {
            if status != RecordStatus::Trash && !kept.contains(&status) {
                kept.push(status);
            }
        }

        Self {
            content_types: types,
            statuses: kept,
        }
    }

    /// Add extra content types to the scope
    pub fn with_extra_types<T: AsRef<str>>(self, extra: impl IntoIterator<Item = T>) -> Self {
        let types: Vec<String> = self
            .content_types
            .iter()
            .cloned()
            .chain(extra.into_iter().map(|t| t.as_ref().to_string()))
            .collect();
        Self::new(types, self.statuses)
    }

    pub fn content_types(&self) -> &[String] {
        &self.content_types
    }

    pub fn statuses(&self) -> &[RecordStatus] {
        &self.statuses
    }
}

/// When a record counts as an instantiated copy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CopyThresholds {
    /// Matching signatures that are always enough (default: 2)
    #[serde(default = "default_min_matches")]
    pub min_matches: usize,

    /// Fraction of signatures that must be exceeded otherwise (default: 0.5)
    #[serde(default = "default_min_ratio")]
    pub min_ratio: f64,
}

fn default_min_matches() -> usize {
    2
}
fn default_min_ratio() -> f64 {
    0.5
}

impl Default for CopyThresholds {
    fn default() -> Self {
        Self {
            min_matches: default_min_matches(),
            min_ratio: default_min_ratio(),
        }
    }
}

impl CopyThresholds {
    /// Decide from a match count out of `total` signatures
    pub fn is_copy(&self, matches: usize, total: usize) -> bool {
        if total == 0 || matches == 0 {
            return false;
        }
        matches >= self.min_matches || (matches as f64 / total as f64) > self.min_ratio
    }
}

/// Per-item usage accumulator, keyed by record and ordered by discovery
#[derive(Default)]
struct UsageSet {
    entries: Vec<UsageRecord>,
    index: BTreeMap<RecordId, usize>,
}

impl UsageSet {
    fn contains(&self, id: RecordId) -> bool {
        self.index.contains_key(&id)
    }

    fn add(&mut self, hit: &RecordSummary, usage_type: UsageType) {
        match self.index.get(&hit.id) {
            Some(&pos) => {
                if usage_type == UsageType::Global {
                    self.entries[pos].usage_type = UsageType::Global;
                }
            }
            None => {
                self.index.insert(hit.id, self.entries.len());
                self.entries.push(UsageRecord::from_summary(hit, usage_type));
            }
        }
    }

    fn into_vec(self) -> Vec<UsageRecord> {
        self.entries
    }
}

/// Finds where library items are used
#[derive(Debug, Clone, Default)]
pub struct UsageClassifier {
    extractor: SignatureExtractor,
    scope: SearchScope,
    thresholds: CopyThresholds,
}

impl UsageClassifier {
    pub fn new(limits: SignatureLimits, scope: SearchScope, thresholds: CopyThresholds) -> Self {
        Self {
            extractor: SignatureExtractor::new(limits),
            scope,
            thresholds,
        }
    }

    pub fn extractor(&self) -> &SignatureExtractor {
        &self.extractor
    }

    pub fn scope(&self) -> &SearchScope {
        &self.scope
    }

    pub fn thresholds(&self) -> &CopyThresholds {
        &self.thresholds
    }

    /// Signatures of an item's content
    pub fn signatures(&self, item: &LibraryItem) -> Signatures {
        self.extractor.extract(&item.content)
    }

    /// Whether `body` holds an instantiated copy of item `id`.
    ///
    /// A body that references the item globally is never a copy.
    pub fn is_instantiated_content(&self, body: &str, signatures: &Signatures, id: RecordId) -> bool {
        if global_markers(id).iter().any(|m| body.contains(m.as_str())) {
            return false;
        }
        self.thresholds
            .is_copy(signatures.matches_in(body), signatures.len())
    }

    /// Find every record using `item`
    #[instrument(skip(self, item, store), fields(item = %item.id))]
    pub fn classify(
        &self,
        item: &LibraryItem,
        store: &dyn ContentStore,
    ) -> Result<Vec<UsageRecord>, StoreError> {
        let statuses = self.scope.statuses();
        let mut usage = UsageSet::default();

        let markers = global_markers(item.id);
        for record_type in self.scope.content_types() {
            for marker in &markers {
                for hit in store.search(record_type, marker, statuses)? {
                    usage.add(&hit, UsageType::Global);
                }
            }
        }

        let signatures = self.signatures(item);
        if signatures.is_empty() {
            debug!("No signatures, skipping copy detection");
            return Ok(usage.into_vec());
        }

        let mut rejected: BTreeSet<RecordId> = BTreeSet::new();
        for signature in signatures.iter() {
            for record_type in self.scope.content_types() {
                for hit in store.search(record_type, signature, statuses)? {
                    if usage.contains(hit.id) || rejected.contains(&hit.id) {
                        continue;
                    }
                    if self.is_instantiated_content(&hit.body, &signatures, item.id) {
                        usage.add(&hit, UsageType::Copy);
                    } else {
                        rejected.insert(hit.id);
                    }
                }
            }
        }

        let usage = usage.into_vec();
        debug!(references = usage.len(), "Classified item");
        Ok(usage)
    }

    /// Fill in `usage` for every item, one item at a time
    pub fn classify_all(
        &self,
        items: &mut [LibraryItem],
        store: &dyn ContentStore,
    ) -> Result<(), StoreError> {
        for item in items.iter_mut() {
            item.usage = self.classify(item, store)?;
        }
        Ok(())
    }

    /// List and classify every library item in the store
    pub fn scan(&self, store: &dyn ContentStore) -> Result<Vec<LibraryItem>, StoreError> {
        let mut items = store.list_library_items()?;
        self.classify_all(&mut items, store)?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> RecordId {
        RecordId::new(n).unwrap()
    }

    #[test]
    fn test_global_markers() {
        let markers = global_markers(id(42));
        assert_eq!(markers.len(), 8);
        assert!(markers.contains(&r#"global_module="42""#.to_string()));
        assert!(markers.contains(&r#"template_id=\"42\""#.to_string()));
        assert!(markers.contains(&r#""globalModule":"42""#.to_string()));
        assert!(markers.contains(&r#"\"globalModule\":\"42\""#.to_string()));
    }

    #[test]
    fn test_scope_normalization() {
        let scope = SearchScope::new(
            ["page", "post", "page", LIBRARY_RECORD_TYPE, " "],
            [RecordStatus::Publish, RecordStatus::Trash, RecordStatus::Publish],
        );
        assert_eq!(scope.content_types(), ["page", "post"]);
        assert_eq!(scope.statuses(), [RecordStatus::Publish]);

        let scope = SearchScope::default().with_extra_types(["project", "post"]);
        assert_eq!(scope.content_types(), ["page", "post", "project"]);
        assert_eq!(scope.statuses().len(), 5);
    }

    #[test]
    fn test_copy_thresholds() {
        let t = CopyThresholds::default();
        assert!(t.is_copy(2, 10));
        assert!(!t.is_copy(1, 3));
        assert!(t.is_copy(1, 1));
        assert!(!t.is_copy(1, 2));
        assert!(!t.is_copy(0, 0));
    }

    #[test]
    fn test_global_marker_blocks_copy() {
        let classifier = UsageClassifier::default();
        let sigs = classifier
            .extractor()
            .extract(r#"module_id="a1" module_id="a2""#);

        assert!(classifier.is_instantiated_content("a1 a2", &sigs, id(9)));
        assert!(!classifier.is_instantiated_content(
            r#"a1 a2 [et_pb_section global_module="9"]"#,
            &sigs,
            id(9)
        ));
    }
}
