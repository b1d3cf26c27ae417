//! Drives one upload session: opens the files, renders events and
//! forwards Ctrl-C as abort requests.

use std::path::PathBuf;

use anyhow::Context;
use chunkup_transfer::{SourceFile, UploadItem, UploadStatus};
use chunkup_uploader::{UploadEvent, Uploader, UploaderConfig};
use futures_util::future::join_all;
use tokio::sync::mpsc;

/// Uploads `files` and waits until every upload is terminal.
pub async fn run(config: UploaderConfig, files: Vec<PathBuf>) -> anyhow::Result<()> {
    let mut items = Vec::with_capacity(files.len());
    for path in &files {
        let file = SourceFile::open(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        items.push(UploadItem::new(file));
    }

    let uploader = Uploader::new(config)?;
    let events = uploader
        .take_events()
        .context("event receiver already taken")?;
    let renderer = tokio::spawn(render_events(events));

    tracing::info!(
        files = items.len(),
        chunked = uploader.is_chunked(),
        "starting uploads"
    );
    let all = join_all(uploader.on_after_read(items.clone()));
    tokio::pin!(all);

    let results = tokio::select! {
        results = &mut all => results,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, aborting uploads");
            for item in &items {
                uploader.abort(item.id);
            }
            all.await
        }
    };

    // Closes the event channel once the upload tasks are gone.
    drop(uploader);
    renderer.await?;

    let mut failed = 0;
    for result in results {
        if result?.status != UploadStatus::Done {
            failed += 1;
        }
    }

    tracing::info!(total = items.len(), failed, "uploads finished");
    if failed > 0 {
        anyhow::bail!("{failed} of {} uploads failed", items.len());
    }
    Ok(())
}

async fn render_events(mut events: mpsc::UnboundedReceiver<UploadEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            UploadEvent::StatusChanged { item } => {
                tracing::info!(
                    upload_id = %item.id,
                    file = %item.file.name(),
                    status = %item.status,
                    "{}",
                    item.message
                );
            }
            UploadEvent::Success { item, response } => {
                tracing::info!(file = %item.file.name(), %response, "server accepted upload");
            }
            UploadEvent::Error { item, error } => {
                tracing::warn!(file = %item.file.name(), error = %error, "upload error");
            }
            UploadEvent::ListChanged { items } => {
                tracing::debug!(remaining = items.len(), "file list changed");
            }
            UploadEvent::ClickPreview { item } => {
                tracing::debug!(file = %item.file.name(), "preview requested");
            }
        }
    }
}
