//! chunkup command-line uploader.

mod app;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Upload files to an HTTP endpoint, whole or in chunks.
#[derive(Parser)]
#[clap(name = "chunkup", version)]
struct Cli {
    /// Files to upload.
    #[clap(required = true)]
    files: Vec<PathBuf>,

    /// Settings file (TOML).
    #[clap(long)]
    config: Option<PathBuf>,

    /// Endpoint URL.
    #[clap(long)]
    action: Option<String>,

    /// Chunk size in bytes; 0 uploads each file in one request.
    #[clap(long, conflicts_with = "chunk_kib")]
    chunk_size: Option<i64>,

    /// Chunk size in KiB.
    #[clap(long)]
    chunk_kib: Option<i64>,

    /// Extra form field, as KEY=VALUE.
    #[clap(long = "data", value_parser = parse_key_value)]
    data: Vec<(String, String)>,

    /// Extra request header, as NAME=VALUE.
    #[clap(short = 'H', long = "header", value_parser = parse_key_value)]
    headers: Vec<(String, String)>,

    /// Reject replies whose status field is not accepted.
    #[clap(long)]
    validate_status: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded settings.
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(action) = &self.action {
            settings.action = action.clone();
        }
        if let Some(bytes) = self.chunk_size {
            settings.chunk_size = bytes;
        }
        if let Some(kib) = self.chunk_kib {
            settings.chunk_size = kib.saturating_mul(1024);
        }
        for (key, value) in &self.data {
            settings
                .data
                .insert(key.clone(), serde_json::Value::String(value.clone()));
        }
        for (name, value) in &self.headers {
            settings.headers.insert(name.clone(), value.clone());
        }
        if self.validate_status {
            settings.validate_status = true;
        }
        settings
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = cli.apply(Settings::load(cli.config.as_deref())?);
    let config = settings.to_uploader_config()?;
    tracing::debug!(?config, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, cli.files))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_pairs() {
        assert_eq!(
            parse_key_value("albumId=7").unwrap(),
            ("albumId".to_string(), "7".to_string())
        );
        assert_eq!(
            parse_key_value("token=a=b").unwrap(),
            ("token".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from([
            "chunkup",
            "--action",
            "https://example.com/up",
            "--chunk-kib",
            "100",
            "--data",
            "albumId=7",
            "-H",
            "Authorization=Bearer x",
            "--validate-status",
            "a.png",
        ]);
        let settings = cli.apply(Settings {
            action: "https://old.example.com".into(),
            chunk_size: 5,
            ..Settings::default()
        });

        assert_eq!(settings.action, "https://example.com/up");
        assert_eq!(settings.chunk_size, 102_400);
        assert_eq!(settings.data["albumId"], serde_json::json!("7"));
        assert_eq!(settings.headers["Authorization"], "Bearer x");
        assert!(settings.validate_status);
        assert_eq!(cli.files, vec![PathBuf::from("a.png")]);
    }

    #[test]
    fn settings_survive_without_flags() {
        let cli = Cli::parse_from(["chunkup", "a.png", "b.mp4"]);
        let original = Settings {
            action: "https://example.com/up".into(),
            chunk_size: 64,
            ..Settings::default()
        };
        assert_eq!(cli.apply(original.clone()), original);
        assert_eq!(cli.files.len(), 2);
    }

    #[test]
    fn chunk_flags_conflict() {
        let result = Cli::try_parse_from([
            "chunkup",
            "--chunk-size",
            "10",
            "--chunk-kib",
            "1",
            "a.png",
        ]);
        assert!(result.is_err());
    }
}
