//! Optional post-processing of server replies.
//!
//! Runs after each request resolves and before the orchestrator decides
//! whether the upload is complete. A rejection counts as a failed request.

use std::future::Future;
use std::pin::Pin;

use chunkup_transfer::UploadItem;
use serde_json::Value;

/// Boxed future returned by [`ResponseHandler::process`].
pub type ResponseFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ResponseError>> + Send + 'a>>;

/// Errors raised by a response handler.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("server rejected upload: {response}")]
    Rejected { response: Value },

    #[error("invalid response: {0}")]
    Invalid(String),
}

/// Normalizes or validates a raw server reply.
pub trait ResponseHandler: Send + Sync {
    fn process<'a>(&'a self, response: Value, item: &'a UploadItem) -> ResponseFuture<'a>;
}

impl<F> ResponseHandler for F
where
    F: Fn(Value, &UploadItem) -> Result<Value, ResponseError> + Send + Sync,
{
    fn process<'a>(&'a self, response: Value, item: &'a UploadItem) -> ResponseFuture<'a> {
        let result = self(response, item);
        Box::pin(async move { result })
    }
}

/// Accepts a reply only if an application-level status code says so.
///
/// Endpoints of this family answer HTTP 200 for every request and put
/// the real outcome in a `status` field: `101` means "chunk accepted,
/// send the next one" and `0` means "upload complete".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCodeCheck {
    field: String,
    accepted: Vec<i64>,
}

impl Default for StatusCodeCheck {
    fn default() -> Self {
        Self {
            field: "status".into(),
            accepted: vec![101, 0],
        }
    }
}

impl StatusCodeCheck {
    pub fn new(field: impl Into<String>, accepted: Vec<i64>) -> Self {
        Self {
            field: field.into(),
            accepted,
        }
    }

    /// Checks a reply without consuming it.
    pub fn accepts(&self, response: &Value) -> bool {
        response
            .get(&self.field)
            .and_then(status_code)
            .is_some_and(|code| self.accepted.contains(&code))
    }
}

/// Reads a status code given either as a number or a numeric string.
fn status_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl ResponseHandler for StatusCodeCheck {
    fn process<'a>(&'a self, response: Value, _item: &'a UploadItem) -> ResponseFuture<'a> {
        Box::pin(async move {
            if self.accepts(&response) {
                Ok(response)
            } else {
                Err(ResponseError::Rejected { response })
            }
        })
    }
}
