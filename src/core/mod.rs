//! Usage analysis and guarded deletion.
//!
//! This module contains:
//! - SignatureExtractor: Distinctive substrings of an item's content
//! - UsageClassifier: Global references and instantiated copies
//! - Janitor: Scans, statistics, deletion and bulk actions over a store
//! - ActionResponse: Serializable action results

pub mod actions;
pub mod bulk;
pub mod classifier;
pub mod deletion;
pub mod filter;
pub mod janitor;
pub mod signatures;
pub mod statistics;

// Re-export commonly used types
pub use actions::ActionResponse;
pub use bulk::{BulkAction, BulkReport, BulkStatus};
pub use classifier::{global_markers, CopyThresholds, SearchScope, UsageClassifier};
pub use deletion::{parse_item_id, DeleteError, Deleted, ErrorKind};
pub use filter::ItemFilter;
pub use janitor::Janitor;
pub use signatures::{SignatureExtractor, SignatureLimits, Signatures};
pub use statistics::Statistics;
