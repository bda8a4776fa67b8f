//! Domain types for the layout janitor.
//!
//! This module contains the core data structures:
//! - Record: Content records as stored by the content store
//! - LibraryItem: Reusable templates and their category
//! - UsageRecord: Where an item is used, and how

pub mod item;
pub mod record;
pub mod usage;

// Re-export commonly used types
pub use item::{LayoutKind, LibraryItem};
pub use record::{
    InvalidRecordId, Record, RecordId, RecordStatus, RecordSummary, SiteLinks,
    LIBRARY_RECORD_TYPE,
};
pub use usage::{UsageExt, UsageRecord, UsageType};
