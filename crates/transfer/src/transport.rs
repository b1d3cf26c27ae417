//! The request seam between the orchestrator and the network.
//!
//! The HTTP implementation lives in `chunkup-http`; tests plug in mocks.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::transform::{TransformError, UploadSelector};

/// Boxed future returned by [`Transport`] implementations.
pub type RequestFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value, TransportError>> + Send>>;

/// A non-2xx reply, kept whole so callers can inspect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if !self.body.is_empty() {
            write!(f, ": {}", self.body)?;
        }
        Ok(())
    }
}

/// Errors produced while issuing one upload request.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("{0}")]
    Http(HttpFailure),

    #[error("request aborted")]
    Aborted,

    #[error("request failed: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

impl TransportError {
    /// Whether the request was cancelled through its [`CancelHandle`].
    pub fn is_aborted(&self) -> bool {
        matches!(self, TransportError::Aborted)
    }

    /// HTTP status of a rejected response, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http(failure) => Some(failure.status),
            _ => None,
        }
    }
}

/// Aborts one in-flight request. Cloning shares the same signal.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation. Calling it again is a no-op.
    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token for transports to race their I/O against.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// A request that has been prepared but whose outcome is still pending.
pub struct PendingRequest {
    pub request: RequestFuture,
    pub abort: CancelHandle,
}

impl PendingRequest {
    pub fn new(request: RequestFuture, abort: CancelHandle) -> Self {
        Self { request, abort }
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("aborted", &self.abort.is_aborted())
            .finish_non_exhaustive()
    }
}

/// Issues one cancellable upload request.
///
/// `post` runs the transform synchronously, so a transform failure is
/// returned before any I/O. The returned future resolves with the parsed
/// JSON body on 2xx, [`TransportError::Http`] otherwise, and
/// [`TransportError::Aborted`] once the handle is triggered.
pub trait Transport: Send + Sync {
    fn post(&self, selector: UploadSelector) -> Result<PendingRequest, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_handle_wakes_waiters() {
        let handle = CancelHandle::new();
        let token = handle.token().clone();
        let waiter = tokio::spawn(async move { token.cancelled().await });

        assert!(!handle.is_aborted());
        handle.abort();
        handle.abort();
        assert!(handle.is_aborted());
        waiter.await.unwrap();
    }

    #[test]
    fn clones_share_the_signal() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        clone.abort();
        assert!(handle.is_aborted());
    }

    #[test]
    fn error_kinds() {
        assert!(TransportError::Aborted.is_aborted());
        let http = TransportError::Http(HttpFailure {
            status: 500,
            headers: BTreeMap::new(),
            body: "boom".into(),
        });
        assert!(!http.is_aborted());
        assert_eq!(http.status(), Some(500));
        assert_eq!(http.to_string(), "HTTP 500: boom");
        assert_eq!(TransportError::Aborted.status(), None);
    }

    #[test]
    fn transform_errors_convert() {
        let err: TransportError = TransformError::new("bad input").into();
        assert!(matches!(err, TransportError::Transform(_)));
        assert_eq!(err.to_string(), "transform failed: bad input");
    }
}
