//! Library statistics, recomputed from a classified item list.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{LayoutKind, LibraryItem, UsageExt};

/// Counts over a classified library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub used: usize,
    pub unused: usize,

    /// Items used only through copies
    pub copies_only: usize,

    /// Unused or copy-only items
    pub safe_to_delete: usize,

    /// Items with at least one global reference
    pub with_global: usize,

    /// Copy occurrences across all items
    pub copies: usize,

    /// Global occurrences across all items
    pub global_refs: usize,

    pub by_kind: BTreeMap<LayoutKind, usize>,
}

impl Statistics {
    pub fn compute(items: &[LibraryItem]) -> Self {
        let mut stats = Self {
            total: items.len(),
            ..Default::default()
        };

        for item in items {
            let usage = item.usage.as_slice();
            if usage.is_empty() {
                stats.unused += 1;
            } else {
                stats.used += 1;
            }
            if usage.has_only_copy_usage() {
                stats.copies_only += 1;
            }
            if usage.is_safe_to_delete() {
                stats.safe_to_delete += 1;
            }
            if usage.has_global_usage() {
                stats.with_global += 1;
            }
            stats.copies += usage.copy_count();
            stats.global_refs += usage.global_count();
            *stats.by_kind.entry(item.kind).or_default() += 1;
        }

        stats
    }
}
