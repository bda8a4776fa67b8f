//! Serializable responses for front-end actions.

use serde::{Deserialize, Serialize};

use super::deletion::{DeleteError, Deleted, ErrorKind};
use crate::domain::RecordId;

/// Envelope returned for a single-item action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ActionResponse {
    pub fn deleted(deleted: &Deleted) -> Self {
        let message = if deleted.copies_left > 0 {
            format!(
                "Deleted \"{}\". {} copies remain in other content",
                deleted.title, deleted.copies_left
            )
        } else {
            format!("Deleted \"{}\"", deleted.title)
        };

        Self {
            success: true,
            message,
            item_id: Some(deleted.id),
            error_kind: None,
        }
    }

    pub fn failed(error: &DeleteError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            item_id: error.item_id(),
            error_kind: Some(error.kind()),
        }
    }
}

impl From<&Result<Deleted, DeleteError>> for ActionResponse {
    fn from(result: &Result<Deleted, DeleteError>) -> Self {
        match result {
            Ok(deleted) => Self::deleted(deleted),
            Err(e) => Self::failed(e),
        }
    }
}
