//! Item filters for listing a classified library.

use serde::{Deserialize, Serialize};

use crate::domain::{LibraryItem, UsageExt};

/// Subset of the library to show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFilter {
    #[default]
    All,

    /// Any usage at all
    Used,

    /// At least one global reference
    Global,

    /// Unused or copy-only
    Safe,

    Unused,

    /// Copy-only
    Copies,
}

impl ItemFilter {
    pub fn matches(self, item: &LibraryItem) -> bool {
        let usage = item.usage.as_slice();
        match self {
            ItemFilter::All => true,
            ItemFilter::Used => !usage.is_empty(),
            ItemFilter::Global => usage.has_global_usage(),
            ItemFilter::Safe => usage.is_safe_to_delete(),
            ItemFilter::Unused => usage.is_empty(),
            ItemFilter::Copies => usage.has_only_copy_usage(),
        }
    }

    /// Keep only the items this filter matches
    pub fn apply(self, items: Vec<LibraryItem>) -> Vec<LibraryItem> {
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}

impl std::fmt::Display for ItemFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemFilter::All => write!(f, "all"),
            ItemFilter::Used => write!(f, "used"),
            ItemFilter::Global => write!(f, "global"),
            ItemFilter::Safe => write!(f, "safe"),
            ItemFilter::Unused => write!(f, "unused"),
            ItemFilter::Copies => write!(f, "copies"),
        }
    }
}

impl std::str::FromStr for ItemFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ItemFilter::All),
            "used" => Ok(ItemFilter::Used),
            "global" => Ok(ItemFilter::Global),
            "safe" => Ok(ItemFilter::Safe),
            "unused" => Ok(ItemFilter::Unused),
            "copies" | "copy" => Ok(ItemFilter::Copies),
            _ => anyhow::bail!("Unknown filter: {}", s),
        }
    }
}
