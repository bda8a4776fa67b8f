//! The janitor: a classifier bound to a content store.

use tracing::instrument;

use super::classifier::UsageClassifier;
use super::statistics::Statistics;
use crate::domain::{LibraryItem, RecordId};
use crate::store::{ContentStore, DeleteOptions, StoreError};

/// Runs scans, deletions and bulk actions against one store
pub struct Janitor<'a> {
    pub(crate) store: &'a dyn ContentStore,
    pub(crate) classifier: &'a UsageClassifier,
    pub(crate) options: DeleteOptions,
}

impl<'a> Janitor<'a> {
    pub fn new(store: &'a dyn ContentStore, classifier: &'a UsageClassifier) -> Self {
        Self {
            store,
            classifier,
            options: DeleteOptions::default(),
        }
    }

    /// Delete with different options (trash instead of permanent, quiet)
    pub fn with_options(mut self, options: DeleteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn classifier(&self) -> &UsageClassifier {
        self.classifier
    }

    /// Every library item with its usage
    #[instrument(skip(self))]
    pub fn scan(&self) -> Result<Vec<LibraryItem>, StoreError> {
        self.classifier.scan(self.store)
    }

    /// One library item with its usage, or `None` if `id` is not a library item
    pub fn item(&self, id: RecordId) -> Result<Option<LibraryItem>, StoreError> {
        let record = match self.store.get_record(id)? {
            Some(record) if record.is_library_item() => record,
            _ => return Ok(None),
        };

        let item = LibraryItem::from_record(&record);
        let usage = self.classifier.classify(&item, self.store)?;
        Ok(Some(item.with_usage(usage)))
    }

    /// Fresh statistics over the whole library
    pub fn statistics(&self) -> Result<Statistics, StoreError> {
        Ok(Statistics::compute(&self.scan()?))
    }
}
