//! Events and inputs of the upload orchestrator.

use std::sync::Arc;

use chunkup_transfer::UploadItem;
use serde_json::Value;

use crate::error::UploadError;

/// Lifecycle event broadcast to observers.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// An item moved to a new status.
    StatusChanged { item: UploadItem },
    /// The final request of an upload succeeded.
    Success { item: UploadItem, response: Value },
    /// A request failed and the upload stopped.
    Error {
        item: UploadItem,
        error: Arc<UploadError>,
    },
    /// The collaborator's preview of an item was clicked.
    ClickPreview { item: UploadItem },
    /// The file list changed shape (an aborted item was removed).
    ListChanged { items: Vec<UploadItem> },
}

/// One selected file or an ordered batch of them.
#[derive(Debug, Clone)]
pub enum Selection {
    One(UploadItem),
    Many(Vec<UploadItem>),
}

impl Selection {
    pub fn into_items(self) -> Vec<UploadItem> {
        match self {
            Selection::One(item) => vec![item],
            Selection::Many(items) => items,
        }
    }
}

impl From<UploadItem> for Selection {
    fn from(item: UploadItem) -> Self {
        Selection::One(item)
    }
}

impl From<Vec<UploadItem>> for Selection {
    fn from(items: Vec<UploadItem>) -> Self {
        Selection::Many(items)
    }
}
