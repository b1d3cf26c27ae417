//! Client-side upload orchestration.
//!
//! An [`Uploader`] sends each selected file to a configured endpoint,
//! either in a single multipart request or as a strict sequence of byte
//! range chunks. Every in-flight request is registered so it can be
//! aborted per file, and lifecycle changes are reported as
//! [`UploadEvent`]s.

pub mod config;
pub mod error;
pub mod registry;
pub mod response;
pub mod types;
pub mod uploader;

pub use config::{UploaderConfig, UploaderConfigBuilder};
pub use error::{ConfigError, UploadError};
pub use registry::{CancelRegistry, RegistryGuard};
pub use response::{ResponseError, ResponseFuture, ResponseHandler, StatusCodeCheck};
pub use types::{Selection, UploadEvent};
pub use uploader::Uploader;

pub use chunkup_http::{HeaderSource, HttpTransport};
pub use chunkup_transfer::{
    ChunkSize, DefaultTransform, FormPayload, FormValue, SourceFile, StaticData, TransformData,
    TransformError, Transport, TransportError, UploadId, UploadItem, UploadSelector, UploadStatus,
};
