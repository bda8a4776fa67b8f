//! Deletion Integration Tests
//!
//! Tests for the guarded single-item delete path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use janitor::core::{ActionResponse, DeleteError, ErrorKind, Janitor, UsageClassifier};
use janitor::domain::{Record, RecordId, RecordStatus, LIBRARY_RECORD_TYPE};
use janitor::store::{ContentStore, DeleteObserver, DeleteOptions, MemoryStore};

fn id(n: u64) -> RecordId {
    RecordId::new(n).unwrap()
}

fn library(n: u64, title: &str, body: &str) -> Record {
    Record::new(id(n), title, LIBRARY_RECORD_TYPE, RecordStatus::Publish, body)
}

fn page(n: u64, body: &str) -> Record {
    Record::new(id(n), format!("Page {}", n), "page", RecordStatus::Publish, body)
}

const HERO: &str = r#"[et_pb_section module_id="hero-sec-11"][et_pb_text module_class="hero-headline-text" admin_label="Hero headline block"]Welcome[/et_pb_text][/et_pb_section]"#;

struct Counter(Arc<AtomicUsize>);

impl DeleteObserver for Counter {
    fn name(&self) -> &str {
        "cache-purge"
    }

    fn before_delete(&self, _record: &Record) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_unused_item_deletes_without_force() {
    let store = MemoryStore::with_records([library(12, "Lonely", ""), page(22, "")]);
    let classifier = UsageClassifier::default();

    let deleted = Janitor::new(&store, &classifier)
        .delete_item(id(12), false)
        .unwrap();

    assert_eq!(deleted.id, id(12));
    assert_eq!(deleted.copies_left, 0);
    assert!(!store.contains(id(12)));
    assert!(store.contains(id(22)));
}

#[test]
fn test_global_reference_blocks_regardless_of_force() {
    let store = MemoryStore::with_records([
        library(10, "Footer", ""),
        page(20, r#"[et_pb_section global_module="10"][/et_pb_section]"#),
    ]);
    let classifier = UsageClassifier::default();
    let janitor = Janitor::new(&store, &classifier);

    for force in [false, true] {
        let err = janitor.delete_item(id(10), force).unwrap_err();
        match &err {
            DeleteError::BlockedByGlobalReference {
                id: item,
                title,
                references,
            } => {
                assert_eq!(*item, id(10));
                assert_eq!(title, "Footer");
                assert_eq!(*references, 1);
            }
            other => panic!("Expected BlockedByGlobalReference, got {:?}", other),
        }
        assert!(err.to_string().contains("Footer"));
    }

    assert!(store.contains(id(10)));
}

#[test]
fn test_copy_only_requires_confirmation() {
    let store = MemoryStore::with_records([
        library(11, "Hero", HERO),
        page(
            21,
            r#"[et_pb_section module_id="hero-sec-11"][et_pb_text module_class="hero-headline-text"]Edited[/et_pb_text][/et_pb_section]"#,
        ),
    ]);
    let classifier = UsageClassifier::default();
    let janitor = Janitor::new(&store, &classifier);

    let err = janitor.delete_item(id(11), false).unwrap_err();
    assert!(matches!(
        err,
        DeleteError::RequiresConfirmation { copies: 1, .. }
    ));
    assert!(store.contains(id(11)));

    let deleted = janitor.delete_item(id(11), true).unwrap();
    assert_eq!(deleted.copies_left, 1);
    assert!(!store.contains(id(11)));

    // The copy is independent content and stays
    assert!(store.contains(id(21)));
}

#[test]
fn test_confirmation_counts_copies_across_content_types() {
    let copy = r#"[et_pb_section module_id="hero-sec-11"][et_pb_text module_class="hero-headline-text"]Edited[/et_pb_text][/et_pb_section]"#;
    let post = Record::new(id(31), "Launch post", "post", RecordStatus::Publish, copy);
    let store = MemoryStore::with_records([library(11, "Hero", HERO), page(21, copy), post]);
    let classifier = UsageClassifier::default();
    let janitor = Janitor::new(&store, &classifier);

    let err = janitor.delete_item(id(11), false).unwrap_err();
    assert!(matches!(
        err,
        DeleteError::RequiresConfirmation { copies: 2, .. }
    ));
    assert!(err.to_string().contains("2 instantiated copies"));

    let deleted = janitor.delete_item(id(11), true).unwrap();
    assert_eq!(deleted.copies_left, 2);
    assert!(store.contains(id(21)));
    assert!(store.contains(id(31)));
}

#[test]
fn test_not_a_library_item() {
    let store = MemoryStore::with_records([page(20, "")]);
    let classifier = UsageClassifier::default();
    let janitor = Janitor::new(&store, &classifier);

    let err = janitor.delete_item(id(20), true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotALibraryItem);
    assert!(store.contains(id(20)));

    let err = janitor.delete_item(id(999), true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotALibraryItem);
}

#[test]
fn test_decision_uses_fresh_classification() {
    let store = MemoryStore::with_records([library(10, "Footer", "")]);
    let classifier = UsageClassifier::default();
    let janitor = Janitor::new(&store, &classifier);

    let items = janitor.scan().unwrap();
    assert!(items[0].usage.is_empty());

    // A global reference appears after the scan
    store.insert(page(20, r#"global_module="10""#)).unwrap();

    let err = janitor.delete_item(id(10), false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BlockedByGlobalReference);
}

#[test]
fn test_store_refusal_is_delete_failed() {
    let store = MemoryStore::with_records([library(12, "Locked", "")]);
    store.lock_record(id(12)).unwrap();
    let classifier = UsageClassifier::default();

    let err = Janitor::new(&store, &classifier)
        .delete_item(id(12), false)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DeleteFailed);
    assert!(err.to_string().contains("12"));
    assert!(err.to_string().contains("locked"));
}

#[test]
fn test_trash_instead_of_permanent() {
    let store = MemoryStore::with_records([library(12, "Lonely", "")]);
    let classifier = UsageClassifier::default();
    let options = DeleteOptions {
        permanent: false,
        ..Default::default()
    };

    Janitor::new(&store, &classifier)
        .with_options(options)
        .delete_item(id(12), false)
        .unwrap();

    let record = store.get_record(id(12)).unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::Trash);
    assert!(store.list_library_items().unwrap().is_empty());
}

#[test]
fn test_single_delete_notifies_observers() {
    let count = Arc::new(AtomicUsize::new(0));
    let store = MemoryStore::with_records([library(12, "Lonely", "")])
        .with_observer(Box::new(Counter(count.clone())));
    let classifier = UsageClassifier::default();

    Janitor::new(&store, &classifier)
        .delete_item(id(12), false)
        .unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_action_response_envelope() {
    let store = MemoryStore::with_records([
        library(10, "Footer", ""),
        page(20, r#"global_module="10""#),
    ]);
    let classifier = UsageClassifier::default();

    let result = Janitor::new(&store, &classifier).delete_item(id(10), false);
    let response = ActionResponse::from(&result);

    assert!(!response.success);
    assert_eq!(response.item_id, Some(id(10)));
    assert_eq!(response.error_kind, Some(ErrorKind::BlockedByGlobalReference));
    assert!(response.message.contains("Footer"));
}
