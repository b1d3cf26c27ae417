//! Upload error types.

use chunkup_transfer::TransportError;

use crate::response::ResponseError;

/// Errors produced while building an uploader.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("action URL is required")]
    MissingAction,

    #[error("invalid action URL {url}: {reason}")]
    InvalidAction { url: String, reason: String },

    #[error("a transform is required")]
    MissingTransform,
}

/// Why an upload request failed.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl UploadError {
    /// Whether the request was cancelled via `abort`.
    pub fn is_aborted(&self) -> bool {
        matches!(self, UploadError::Transport(e) if e.is_aborted())
    }

    /// HTTP status of a rejected response, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Transport(e) => e.status(),
            _ => None,
        }
    }
}
