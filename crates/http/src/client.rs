//! Multipart POST transport.
//!
//! Async HTTP client using `reqwest`; each request races its cancel token.

use std::collections::BTreeMap;
use std::sync::Arc;

use chunkup_transfer::{
    CancelHandle, FormPayload, FormValue, HttpFailure, PendingRequest, StaticData, TransformData,
    Transport, TransportError, UploadSelector,
};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::headers::HeaderSource;

/// Posts upload payloads to a fixed endpoint as `multipart/form-data`.
pub struct HttpTransport {
    http: reqwest::Client,
    action: String,
    data: Arc<StaticData>,
    headers: HeaderSource,
    transform: Arc<dyn TransformData>,
}

impl HttpTransport {
    /// Creates a transport posting to `action`.
    pub fn new(action: impl Into<String>, transform: Arc<dyn TransformData>) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Request(Box::new(e)))?;

        Ok(Self {
            http,
            action: action.into(),
            data: Arc::new(StaticData::new()),
            headers: HeaderSource::None,
            transform,
        })
    }

    /// Static fields merged into every payload.
    pub fn with_data(mut self, data: StaticData) -> Self {
        self.data = Arc::new(data);
        self
    }

    pub fn with_headers(mut self, headers: HeaderSource) -> Self {
        self.headers = headers;
        self
    }

    /// Replaces the underlying `reqwest` client.
    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// The endpoint URL.
    pub fn action(&self) -> &str {
        &self.action
    }
}

impl Transport for HttpTransport {
    fn post(&self, selector: UploadSelector) -> Result<PendingRequest, TransportError> {
        let payload = self.transform.transform(&self.data, &selector)?;
        let form = build_form(payload)?;
        let headers = self.headers.resolve();

        if let Some(chunk) = selector.chunk_descriptor() {
            debug!(
                file = %selector.file().name(),
                start = chunk.chunk_start,
                end = chunk.chunk_end,
                "posting chunk"
            );
        } else {
            debug!(file = %selector.file().name(), size = selector.file().size(), "posting file");
        }

        let builder = self.http.post(&self.action).headers(headers).multipart(form);
        let abort = CancelHandle::new();
        let token = abort.token().clone();

        let request = async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(TransportError::Aborted),
                result = send(builder) => result,
            }
        };

        Ok(PendingRequest::new(Box::pin(request), abort))
    }
}

/// Sends the request and parses a 2xx JSON body.
async fn send(builder: reqwest::RequestBuilder) -> Result<serde_json::Value, TransportError> {
    let resp = builder.send().await.map_err(request_error)?;
    let status = resp.status();

    if !status.is_success() {
        let headers = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect::<BTreeMap<_, _>>();
        let body = resp.text().await.unwrap_or_default();
        return Err(TransportError::Http(HttpFailure {
            status: status.as_u16(),
            headers,
            body,
        }));
    }

    let body = resp.bytes().await.map_err(request_error)?;
    Ok(serde_json::from_slice(&body)?)
}

fn request_error(e: reqwest::Error) -> TransportError {
    TransportError::Request(Box::new(e))
}

/// Every field becomes one form part; blobs are attached as file parts.
fn build_form(payload: FormPayload) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for (key, value) in payload {
        form = match value {
            FormValue::Text(text) => form.text(key, text),
            FormValue::Blob {
                file_name,
                mime_type,
                data,
            } => {
                let len = data.len() as u64;
                let part = Part::stream_with_length(reqwest::Body::from(data), len)
                    .file_name(file_name)
                    .mime_str(&mime_type)
                    .map_err(|_| TransportError::InvalidHeader(format!("content-type {mime_type}")))?;
                form.part(key, part)
            }
        };
    }
    Ok(form)
}
