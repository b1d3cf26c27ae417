//! Upload data model, chunk planning and request transforms.
//!
//! Shared by the HTTP transport and the upload orchestrator.

mod chunked;
mod transform;
mod transport;
mod types;

pub use chunked::{ChunkDescriptor, ChunkPlan, ChunkSize, chunk_total, plan_chunks};
pub use transform::{
    DefaultTransform, FILE_TYPE_PATTERNS, FormPayload, FormValue, StaticData, TransformData,
    TransformError, UploadSelector, classify_file_type,
};
pub use transport::{
    CancelHandle, HttpFailure, PendingRequest, RequestFuture, Transport, TransportError,
};
pub use types::{OCTET_STREAM, SourceFile, UploadId, UploadItem, UploadStatus, detect_mime_type};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}
