//! Uploader configuration.

use std::fmt;
use std::sync::Arc;

use chunkup_http::HeaderSource;
use chunkup_transfer::{ChunkSize, StaticData, TransformData};
use reqwest::header::HeaderMap;

use crate::error::ConfigError;
use crate::response::ResponseHandler;

/// Immutable settings of one [`crate::Uploader`].
#[derive(Clone)]
pub struct UploaderConfig {
    /// Endpoint URL every request is posted to.
    pub action: String,
    /// Static fields merged into every request.
    pub data: StaticData,
    pub headers: HeaderSource,
    /// Bytes per chunk; zero or negative uploads the whole file at once.
    pub chunk_size: ChunkSize,
    pub transform: Arc<dyn TransformData>,
    pub response_handler: Option<Arc<dyn ResponseHandler>>,
}

impl UploaderConfig {
    pub fn builder(action: impl Into<String>) -> UploaderConfigBuilder {
        UploaderConfigBuilder {
            action: action.into(),
            data: StaticData::new(),
            headers: HeaderSource::None,
            chunk_size: ChunkSize::DISABLED,
            transform: None,
            response_handler: None,
        }
    }

    pub fn is_chunked(&self) -> bool {
        self.chunk_size.is_chunked()
    }
}

impl fmt::Debug for UploaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploaderConfig")
            .field("action", &self.action)
            .field("data", &self.data)
            .field("headers", &self.headers)
            .field("chunk_size", &self.chunk_size)
            .field("response_handler", &self.response_handler.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`UploaderConfig`]. A transform is mandatory.
pub struct UploaderConfigBuilder {
    action: String,
    data: StaticData,
    headers: HeaderSource,
    chunk_size: ChunkSize,
    transform: Option<Arc<dyn TransformData>>,
    response_handler: Option<Arc<dyn ResponseHandler>>,
}

impl UploaderConfigBuilder {
    pub fn data(mut self, data: StaticData) -> Self {
        self.data = data;
        self
    }

    /// Sends the same headers with every request.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = HeaderSource::Static(headers);
        self
    }

    /// Computes headers afresh for every request.
    pub fn dynamic_headers<F>(mut self, f: F) -> Self
    where
        F: Fn() -> HeaderMap + Send + Sync + 'static,
    {
        self.headers = HeaderSource::dynamic(f);
        self
    }

    pub fn header_source(mut self, headers: HeaderSource) -> Self {
        self.headers = headers;
        self
    }

    pub fn chunk_size(mut self, chunk_size: impl Into<ChunkSize>) -> Self {
        self.chunk_size = chunk_size.into();
        self
    }

    pub fn transform<T: TransformData + 'static>(mut self, transform: T) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn response_handler<H: ResponseHandler + 'static>(mut self, handler: H) -> Self {
        self.response_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<UploaderConfig, ConfigError> {
        if self.action.trim().is_empty() {
            return Err(ConfigError::MissingAction);
        }
        if let Err(e) = reqwest::Url::parse(&self.action) {
            return Err(ConfigError::InvalidAction {
                url: self.action,
                reason: e.to_string(),
            });
        }
        let transform = self.transform.ok_or(ConfigError::MissingTransform)?;

        Ok(UploaderConfig {
            action: self.action,
            data: self.data,
            headers: self.headers,
            chunk_size: self.chunk_size,
            transform,
            response_handler: self.response_handler,
        })
    }
}
