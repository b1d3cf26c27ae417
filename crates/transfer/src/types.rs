use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::TransferError;

/// Media type used when the extension is not recognised.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Stable identifier assigned to a file when it is selected.
///
/// Two selections of byte-identical files get distinct ids, so the
/// cancellation registry and the file list never conflate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UploadId(uuid::Uuid);

impl UploadId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An immutable binary blob selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    mime_type: String,
    data: Bytes,
}

impl SourceFile {
    /// Wraps in-memory data.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Reads a file from disk, guessing its media type from the extension.
    pub async fn open(path: &Path) -> Result<Self, TransferError> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransferError::InvalidPath(path.display().to_string()))?;
        let mime_type = detect_mime_type(&name).unwrap_or(OCTET_STREAM);
        Ok(Self::new(name, mime_type, data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared media type, e.g. `image/png`.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// The whole file contents.
    pub fn data(&self) -> Bytes {
        self.data.clone()
    }

    /// Zero-copy slice of `[start, end)`, clamped to the file bounds.
    pub fn slice(&self, start: u64, end: u64) -> Bytes {
        let len = self.data.len();
        let end = (end as usize).min(len);
        let start = (start as usize).min(end);
        self.data.slice(start..end)
    }
}

/// Guesses a media type from a file name's extension.
pub fn detect_mime_type(name: &str) -> Option<&'static str> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("webp") => Some("image/webp"),
        Some("gif") => Some("image/gif"),
        Some("mp4") => Some("video/mp4"),
        Some("webm") => Some("video/webm"),
        Some("mov") => Some("video/quicktime"),
        Some("txt") => Some("text/plain"),
        Some("json") => Some("application/json"),
        Some("pdf") => Some("application/pdf"),
        _ => None,
    }
}

/// Lifecycle state of an upload item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Selected but not started yet.
    #[default]
    Pending,
    Uploading,
    Done,
    Failed,
}

impl UploadStatus {
    /// `Done` and `Failed` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Done | UploadStatus::Failed)
    }

    /// Human-readable status text shown next to the item.
    pub fn message(self) -> &'static str {
        match self {
            UploadStatus::Pending => "",
            UploadStatus::Uploading => "Uploading...",
            UploadStatus::Done => "Upload succeeded",
            UploadStatus::Failed => "Upload failed",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Done => "done",
            UploadStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One file being processed, as seen by observers.
///
/// Records are immutable: every transition returns a new item.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadItem {
    pub id: UploadId,
    pub file: Arc<SourceFile>,
    pub status: UploadStatus,
    pub message: String,
    /// Server payload, present only after success.
    pub response: Option<serde_json::Value>,
}

impl UploadItem {
    /// Creates a pending item with a fresh id.
    pub fn new(file: SourceFile) -> Self {
        Self::from_shared(Arc::new(file))
    }

    /// Creates a pending item that shares an already wrapped file.
    pub fn from_shared(file: Arc<SourceFile>) -> Self {
        Self {
            id: UploadId::new(),
            file,
            status: UploadStatus::Pending,
            message: String::new(),
            response: None,
        }
    }

    /// Transition to `uploading`. Clears any earlier response.
    pub fn uploading(&self) -> Self {
        Self {
            status: UploadStatus::Uploading,
            message: UploadStatus::Uploading.message().to_string(),
            response: None,
            ..self.clone()
        }
    }

    /// Transition to `done`, keeping the final server response.
    pub fn done(&self, response: serde_json::Value) -> Self {
        Self {
            status: UploadStatus::Done,
            message: UploadStatus::Done.message().to_string(),
            response: Some(response),
            ..self.clone()
        }
    }

    /// Transition to `failed`.
    pub fn failed(&self) -> Self {
        Self {
            status: UploadStatus::Failed,
            message: UploadStatus::Failed.message().to_string(),
            ..self.clone()
        }
    }
}
