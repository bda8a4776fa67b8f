//! Bulk Deletion Integration Tests
//!
//! Tests for bulk selection, side-effect suppression and partial results.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use janitor::core::{BulkAction, BulkStatus, Janitor, UsageClassifier};
use janitor::domain::{LibraryItem, Record, RecordId, RecordStatus, RecordSummary, LIBRARY_RECORD_TYPE};
use janitor::store::{ContentStore, DeleteObserver, DeleteOptions, MemoryStore, StoreError};

fn id(n: u64) -> RecordId {
    RecordId::new(n).unwrap()
}

fn library(n: u64, title: &str, body: &str) -> Record {
    Record::new(id(n), title, LIBRARY_RECORD_TYPE, RecordStatus::Publish, body)
}

fn page(n: u64, body: &str) -> Record {
    Record::new(id(n), format!("Page {}", n), "page", RecordStatus::Publish, body)
}

const COPIED: &str = r#"[et_pb_row module_id="promo-row-7" module_class="promo-banner-wide"]Sale[/et_pb_row]"#;

/// X (1) is unused, Y (2) is copied into page 20, Z (3) is referenced globally by page 21
fn library_fixture() -> MemoryStore {
    MemoryStore::with_records([
        library(1, "X unused", r#"[et_pb_text module_id="x-only"]"#),
        library(2, "Y copied", COPIED),
        library(3, "Z global", ""),
        page(20, COPIED),
        page(21, r#"[et_pb_section global_module="3"][/et_pb_section]"#),
    ])
}

struct Counter(Arc<AtomicUsize>);

impl DeleteObserver for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn before_delete(&self, _record: &Record) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Store whose library listing always fails
struct Unreadable;

impl ContentStore for Unreadable {
    fn list_library_items(&self) -> Result<Vec<LibraryItem>, StoreError> {
        Err(StoreError::Corrupt {
            id: -1,
            reason: "non-positive id".to_string(),
        })
    }

    fn get_record(&self, _id: RecordId) -> Result<Option<Record>, StoreError> {
        Ok(None)
    }

    fn search(
        &self,
        _record_type: &str,
        _needle: &str,
        _statuses: &[RecordStatus],
    ) -> Result<Vec<RecordSummary>, StoreError> {
        Ok(Vec::new())
    }

    fn delete_record(&self, id: RecordId, _options: DeleteOptions) -> Result<(), StoreError> {
        Err(StoreError::NotFound(id))
    }
}

#[test]
fn test_bulk_safe_skips_global_items() {
    let store = library_fixture();
    let classifier = UsageClassifier::default();

    let report = Janitor::new(&store, &classifier)
        .run_bulk(BulkAction::Safe);

    assert_eq!(report.status, BulkStatus::Success);
    assert_eq!(report.deleted_count, 2);
    assert_eq!(report.failed_count, 0);
    assert_eq!(report.deleted_ids, vec![id(1), id(2)]);
    assert!(report.errors.is_empty());

    assert!(!store.contains(id(1)));
    assert!(!store.contains(id(2)));
    assert!(store.contains(id(3)));
    assert!(store.contains(id(20)));
}

#[test]
fn test_bulk_unused_and_copies() {
    let store = library_fixture();
    let classifier = UsageClassifier::default();
    let janitor = Janitor::new(&store, &classifier);

    let report = janitor.run_bulk(BulkAction::Unused);
    assert_eq!(report.deleted_ids, vec![id(1)]);
    assert!(store.contains(id(2)));

    let report = janitor.run_bulk(BulkAction::Copies);
    assert_eq!(report.deleted_ids, vec![id(2)]);
    assert_eq!(report.status, BulkStatus::Success);
    assert!(store.contains(id(3)));
}

#[test]
fn test_nothing_to_delete() {
    let store = MemoryStore::with_records([
        library(3, "Z global", ""),
        page(21, r#"global_module="3""#),
    ]);
    let classifier = UsageClassifier::default();

    let report = Janitor::new(&store, &classifier)
        .run_bulk(BulkAction::Safe);

    assert_eq!(report.status, BulkStatus::NothingToDelete);
    assert_eq!(report.deleted_count, 0);
    assert_eq!(report.failed_count, 0);
}

#[test]
fn test_bulk_suppresses_observers() {
    let count = Arc::new(AtomicUsize::new(0));
    let store = library_fixture().with_observer(Box::new(Counter(count.clone())));
    let classifier = UsageClassifier::default();
    let janitor = Janitor::new(&store, &classifier);

    let report = janitor.run_bulk(BulkAction::Safe);
    assert_eq!(report.deleted_count, 2);
    assert_eq!(count.load(Ordering::SeqCst), 0);

    // Suppression is scoped to the bulk run
    store.insert(library(4, "W unused", "")).unwrap();
    janitor.delete_item(id(4), false).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_partial_when_store_refuses() {
    let store = library_fixture();
    store.lock_record(id(2)).unwrap();
    let classifier = UsageClassifier::default();

    let report = Janitor::new(&store, &classifier)
        .run_bulk(BulkAction::Safe);

    assert_eq!(report.status, BulkStatus::Partial);
    assert!(report.status.is_success());
    assert_eq!(report.deleted_count, 1);
    assert_eq!(report.failed_count, 1);
    assert_eq!(report.deleted_ids, vec![id(1)]);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("Y copied: "));
    assert!(store.contains(id(2)));
}

#[test]
fn test_failed_when_every_delete_fails() {
    let store = library_fixture();
    store.lock_record(id(1)).unwrap();
    let classifier = UsageClassifier::default();

    let report = Janitor::new(&store, &classifier)
        .run_bulk(BulkAction::Unused);

    assert_eq!(report.status, BulkStatus::Failed);
    assert!(!report.status.is_success());
    assert_eq!(report.deleted_count, 0);
    assert_eq!(report.failed_count, 1);
}

#[test]
fn test_plan_does_not_delete() {
    let store = library_fixture();
    let classifier = UsageClassifier::default();

    let planned = Janitor::new(&store, &classifier)
        .plan_bulk(BulkAction::Safe)
        .unwrap();

    let ids: Vec<RecordId> = planned.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![id(1), id(2)]);
    assert!(store.contains(id(1)));
    assert!(store.contains(id(2)));
}

#[test]
fn test_report_serializes() {
    let store = library_fixture();
    let classifier = UsageClassifier::default();

    let report = Janitor::new(&store, &classifier)
        .run_bulk(BulkAction::Unused);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["action"], "unused");
    assert_eq!(json["status"], "success");
    assert_eq!(json["deleted_ids"][0], 1);
}

#[test]
fn test_scan_failure_is_a_failed_report() {
    let classifier = UsageClassifier::default();
    let janitor = Janitor::new(&Unreadable, &classifier);

    assert!(janitor.plan_bulk(BulkAction::Safe).is_err());

    let report = janitor.run_bulk(BulkAction::Safe);
    assert_eq!(report.status, BulkStatus::Failed);
    assert_eq!(report.deleted_count, 0);
    assert!(report.deleted_ids.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("non-positive id"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "failed");
}
