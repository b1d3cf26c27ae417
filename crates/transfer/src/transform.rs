//! Mapping from upload metadata to the multipart payload of one request.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use crate::chunked::ChunkDescriptor;
use crate::types::SourceFile;

/// Static extra fields merged into every request.
pub type StaticData = serde_json::Map<String, Value>;

/// Patterns tested against the media type, in order. The index of the
/// first match is what the server receives as `fileType`.
pub const FILE_TYPE_PATTERNS: [&str; 2] = ["image", "video"];

/// Error raised by a transform before any network I/O happens.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("transform failed: {0}")]
    Message(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransformError {
    pub fn new(msg: impl Into<String>) -> Self {
        TransformError::Message(msg.into())
    }
}

/// What a single request carries: the whole file or one chunk of it.
#[derive(Debug, Clone)]
pub enum UploadSelector {
    Whole {
        file: Arc<SourceFile>,
    },
    Chunk {
        file: Arc<SourceFile>,
        file_chunk: Bytes,
        chunk: ChunkDescriptor,
    },
}

impl UploadSelector {
    pub fn whole(file: Arc<SourceFile>) -> Self {
        UploadSelector::Whole { file }
    }

    /// Slices `chunk` out of `file`.
    pub fn chunk(file: Arc<SourceFile>, chunk: ChunkDescriptor) -> Self {
        let file_chunk = file.slice(chunk.chunk_start, chunk.chunk_end);
        UploadSelector::Chunk {
            file,
            file_chunk,
            chunk,
        }
    }

    /// The source file, in either mode.
    pub fn file(&self) -> &Arc<SourceFile> {
        match self {
            UploadSelector::Whole { file } | UploadSelector::Chunk { file, .. } => file,
        }
    }

    /// The chunk range, `None` in whole-file mode.
    pub fn chunk_descriptor(&self) -> Option<&ChunkDescriptor> {
        match self {
            UploadSelector::Whole { .. } => None,
            UploadSelector::Chunk { chunk, .. } => Some(chunk),
        }
    }

    /// The bytes this request sends.
    pub fn body(&self) -> Bytes {
        match self {
            UploadSelector::Whole { file } => file.data(),
            UploadSelector::Chunk { file_chunk, .. } => file_chunk.clone(),
        }
    }
}

/// A single form field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    Blob {
        file_name: String,
        mime_type: String,
        data: Bytes,
    },
}

impl FormValue {
    pub fn text(value: impl Into<String>) -> Self {
        FormValue::Text(value.into())
    }

    /// Converts a JSON value the way a browser form would stringify it.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => FormValue::Text(s.clone()),
            other => FormValue::Text(other.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            FormValue::Blob { .. } => None,
        }
    }
}

/// Ordered key/value body of one request.
///
/// Inserting an existing key replaces its value in place, so fields set
/// after the static data override it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormPayload {
    fields: Vec<(String, FormValue)>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a payload from the static data fields.
    pub fn from_static(data: &StaticData) -> Self {
        let mut payload = Self::new();
        for (key, value) in data {
            payload.insert(key.clone(), FormValue::from_json(value));
        }
        payload
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FormValue) {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn insert_text(&mut self, key: impl Into<String>, value: impl ToString) {
        self.insert(key, FormValue::Text(value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&FormValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for FormPayload {
    type Item = (String, FormValue);
    type IntoIter = std::vec::IntoIter<(String, FormValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Builds the request payload for one upload request.
///
/// Implementations must be pure: the same inputs give the same payload.
pub trait TransformData: Send + Sync {
    fn transform(
        &self,
        data: &StaticData,
        selector: &UploadSelector,
    ) -> Result<FormPayload, TransformError>;
}

impl<F> TransformData for F
where
    F: Fn(&StaticData, &UploadSelector) -> Result<FormPayload, TransformError> + Send + Sync,
{
    fn transform(
        &self,
        data: &StaticData,
        selector: &UploadSelector,
    ) -> Result<FormPayload, TransformError> {
        self(data, selector)
    }
}

/// Returns the index of the first pattern in [`FILE_TYPE_PATTERNS`]
/// contained in `mime_type`, or `-1`.
pub fn classify_file_type(mime_type: &str) -> i32 {
    FILE_TYPE_PATTERNS
        .iter()
        .position(|pattern| mime_type.contains(pattern))
        .map_or(-1, |i| i as i32)
}

/// The stock payload layout for chunk-aware media endpoints.
///
/// Whole file: static data, `file`, `fileType`.
/// Chunk: static data, `userId`, `noThumb`, `totalSize`, `startPos`,
/// `endPos`, `fname`, `fileType` and the chunk bytes as `file`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransform;

impl TransformData for DefaultTransform {
    fn transform(
        &self,
        data: &StaticData,
        selector: &UploadSelector,
    ) -> Result<FormPayload, TransformError> {
        let file = selector.file();
        let file_type = classify_file_type(file.mime_type());
        let mut payload = FormPayload::from_static(data);

        match selector {
            UploadSelector::Whole { .. } => {
                payload.insert("file", blob(file, file.data()));
                payload.insert_text("fileType", file_type);
            }
            UploadSelector::Chunk {
                file_chunk, chunk, ..
            } => {
                payload.insert_text("userId", 0);
                payload.insert_text("noThumb", "0");
                payload.insert_text("totalSize", file.size());
                payload.insert_text("startPos", chunk.chunk_start);
                payload.insert_text("endPos", chunk.chunk_end);
                payload.insert_text("fname", file.name());
                payload.insert_text("fileType", file_type);
                payload.insert("file", blob(file, file_chunk.clone()));
            }
        }

        Ok(payload)
    }
}

fn blob(file: &SourceFile, data: Bytes) -> FormValue {
    FormValue::Blob {
        file_name: file.name().to_string(),
        mime_type: file.mime_type().to_string(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunked::{ChunkSize, plan_chunks};
    use serde_json::json;

    fn file(mime: &str) -> Arc<SourceFile> {
        Arc::new(SourceFile::new("clip.bin", mime, vec![7u8; 250]))
    }

    fn static_data() -> StaticData {
        json!({"token": "abc", "albumId": 12})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn classify_matches_in_order() {
        assert_eq!(classify_file_type("image/png"), 0);
        assert_eq!(classify_file_type("video/mp4"), 1);
        assert_eq!(classify_file_type("application/pdf"), -1);
        assert_eq!(classify_file_type(""), -1);
    }

    #[test]
    fn whole_file_payload() {
        let selector = UploadSelector::whole(file("image/jpeg"));
        let payload = DefaultTransform.transform(&static_data(), &selector).unwrap();

        assert_eq!(payload.get("token").unwrap().as_text(), Some("abc"));
        assert_eq!(payload.get("albumId").unwrap().as_text(), Some("12"));
        assert_eq!(payload.get("fileType").unwrap().as_text(), Some("0"));
        assert!(payload.get("startPos").is_none());
        match payload.get("file").unwrap() {
            FormValue::Blob { data, file_name, .. } => {
                assert_eq!(data.len(), 250);
                assert_eq!(file_name, "clip.bin");
            }
            other => panic!("expected blob, got {other:?}"),
        }
    }

    #[test]
    fn chunk_payload_carries_range_and_slice() {
        let f = file("video/webm");
        let last = plan_chunks(f.size(), ChunkSize::from_bytes(100)).last().unwrap();
        let selector = UploadSelector::chunk(f, last);
        let payload = DefaultTransform.transform(&static_data(), &selector).unwrap();

        let text = |k: &str| payload.get(k).and_then(FormValue::as_text).map(str::to_string);
        assert_eq!(text("userId").as_deref(), Some("0"));
        assert_eq!(text("noThumb").as_deref(), Some("0"));
        assert_eq!(text("totalSize").as_deref(), Some("250"));
        assert_eq!(text("startPos").as_deref(), Some("200"));
        assert_eq!(text("endPos").as_deref(), Some("250"));
        assert_eq!(text("fname").as_deref(), Some("clip.bin"));
        assert_eq!(text("fileType").as_deref(), Some("1"));
        match payload.get("file").unwrap() {
            FormValue::Blob { data, .. } => assert_eq!(data.len(), 50),
            other => panic!("expected blob, got {other:?}"),
        }
    }

    #[test]
    fn computed_fields_override_static_data() {
        let mut data = static_data();
        data.insert("fileType".into(), json!("overridden"));
        let payload = DefaultTransform
            .transform(&data, &UploadSelector::whole(file("text/plain")))
            .unwrap();
        assert_eq!(payload.get("fileType").unwrap().as_text(), Some("-1"));
        assert_eq!(payload.iter().filter(|(k, _)| *k == "fileType").count(), 1);
    }

    #[test]
    fn closures_are_transforms() {
        let transform = |_: &StaticData, selector: &UploadSelector| {
            let mut payload = FormPayload::new();
            payload.insert_text("size", selector.body().len());
            Ok::<_, TransformError>(payload)
        };
        let payload = transform
            .transform(&StaticData::new(), &UploadSelector::whole(file("image/png")))
            .unwrap();
        assert_eq!(payload.get("size").unwrap().as_text(), Some("250"));
    }

    #[test]
    fn json_values_stringify_like_forms() {
        assert_eq!(FormValue::from_json(&json!("x")), FormValue::text("x"));
        assert_eq!(FormValue::from_json(&json!(3)), FormValue::text("3"));
        assert_eq!(FormValue::from_json(&json!(true)), FormValue::text("true"));
    }
}
