//! CLI settings.
//!
//! Settings are read from a TOML file (`--config`, or
//! `~/.config/chunkup/chunkup.toml` when present). Command-line flags
//! override individual fields.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chunkup_http::HeaderSource;
use chunkup_transfer::{ChunkSize, DefaultTransform, StaticData};
use chunkup_uploader::{StatusCodeCheck, UploaderConfig};
use serde::{Deserialize, Serialize};

/// Uploader settings as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Endpoint every request is posted to.
    #[serde(default)]
    pub action: String,

    /// Bytes per chunk (0 or negative = whole-file upload).
    #[serde(default)]
    pub chunk_size: i64,

    /// Static form fields sent with every request.
    #[serde(default)]
    pub data: StaticData,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Reject replies whose status field is not accepted.
    #[serde(default)]
    pub validate_status: bool,

    #[serde(default = "default_status_field")]
    pub status_field: String,

    #[serde(default = "default_accepted_status")]
    pub accepted_status: Vec<i64>,
}

fn default_status_field() -> String {
    "status".into()
}

fn default_accepted_status() -> Vec<i64> {
    vec![101, 0]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            action: String::new(),
            chunk_size: 0,
            data: StaticData::new(),
            headers: BTreeMap::new(),
            validate_status: false,
            status_field: default_status_field(),
            accepted_status: default_accepted_status(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or from the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = default_path();
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Builds the library configuration.
    pub fn to_uploader_config(&self) -> anyhow::Result<UploaderConfig> {
        let mut builder = UploaderConfig::builder(self.action.clone())
            .data(self.data.clone())
            .chunk_size(ChunkSize::from_bytes(self.chunk_size))
            .transform(DefaultTransform);

        if !self.headers.is_empty() {
            builder = builder.header_source(HeaderSource::from_pairs(&self.headers)?);
        }
        if self.validate_status {
            builder = builder.response_handler(StatusCodeCheck::new(
                self.status_field.clone(),
                self.accepted_status.clone(),
            ));
        }

        Ok(builder.build()?)
    }
}

/// Returns the per-user settings path.
fn default_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("chunkup").join("chunkup.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("chunkup")
            .join("chunkup.toml")
    }
}
