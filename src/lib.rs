//! janitor - Layout library usage analysis and safe deletion
//!
//! Finds out where reusable library items (layouts, sections, rows and
//! modules) are used across a site's content, and deletes the ones nothing
//! depends on.
//!
//! # Architecture
//!
//! Usage comes in two forms:
//! - Global references: a record points at the item by ID and follows its edits
//! - Instantiated copies: a record holds a pasted copy of the item's content,
//!   detected through distinctive attribute values (signatures)
//!
//! Global references block deletion. Copies only need confirmation, since
//! deleting the item leaves them intact.
//!
//! # Modules
//!
//! - `core`: Signature extraction, classification, deletion and bulk actions
//! - `domain`: Data structures (Record, LibraryItem, UsageRecord)
//! - `store`: Content store trait with in-memory and SQLite backends
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # List items nothing uses
//! janitor scan --filter unused
//!
//! # Delete one item, even if copies of it exist
//! janitor delete 42 --force
//!
//! # Remove every unused or copy-only item from a snapshot
//! janitor --snapshot site.json purge safe
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod store;

// Re-export main types at crate root for convenience
pub use core::{BulkAction, BulkReport, DeleteError, Janitor, UsageClassifier};
pub use domain::{LibraryItem, Record, RecordId, UsageRecord, UsageType};
pub use store::{ContentStore, DeleteObserver, DeleteOptions, MemoryStore, SqliteStore};
