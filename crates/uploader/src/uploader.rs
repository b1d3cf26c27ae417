//! Upload orchestrator.
//!
//! Decides between whole-file and chunked transfer, drives the requests,
//! keeps the file list current and broadcasts lifecycle events.

use std::sync::{Arc, Mutex};

use chunkup_http::HttpTransport;
use chunkup_transfer::{
    ChunkDescriptor, ChunkSize, SourceFile, Transport, UploadId, UploadItem, UploadSelector,
    UploadStatus, plan_chunks,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::UploaderConfig;
use crate::error::UploadError;
use crate::registry::CancelRegistry;
use crate::response::ResponseHandler;
use crate::types::{Selection, UploadEvent};

/// Uploads selected files and reports their progress.
///
/// Cloning is cheap; clones share the file list, the cancellation
/// registry and the event channel. Each selected file runs on its own
/// tokio task, while the chunks of one file are strictly sequential.
#[derive(Clone)]
pub struct Uploader {
    inner: Arc<Inner>,
}

struct Inner {
    chunk_size: ChunkSize,
    transport: Arc<dyn Transport>,
    response_handler: Option<Arc<dyn ResponseHandler>>,
    registry: CancelRegistry,
    file_list: Mutex<Vec<UploadItem>>,
    events_tx: mpsc::UnboundedSender<UploadEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<UploadEvent>>>,
}

impl Uploader {
    /// Creates an uploader posting over HTTP to `config.action`.
    pub fn new(config: UploaderConfig) -> Result<Self, UploadError> {
        let transport = HttpTransport::new(config.action.clone(), Arc::clone(&config.transform))?
            .with_data(config.data.clone())
            .with_headers(config.headers.clone());
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates an uploader on top of a custom transport.
    pub fn with_transport(config: UploaderConfig, transport: Arc<dyn Transport>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                chunk_size: config.chunk_size,
                transport,
                response_handler: config.response_handler,
                registry: CancelRegistry::new(),
                file_list: Mutex::new(Vec::new()),
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
            }),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<UploadEvent>> {
        self.inner.events_rx.lock().unwrap().take()
    }

    pub fn registry(&self) -> &CancelRegistry {
        &self.inner.registry
    }

    pub fn is_chunked(&self) -> bool {
        self.inner.chunk_size.is_chunked()
    }

    /// Snapshot of the file list.
    pub fn file_list(&self) -> Vec<UploadItem> {
        self.inner.file_list.lock().unwrap().clone()
    }

    /// Latest record for `id`, if it is still listed.
    pub fn item(&self, id: UploadId) -> Option<UploadItem> {
        let list = self.inner.file_list.lock().unwrap();
        list.iter().find(|i| i.id == id).cloned()
    }

    /// Replaces the file list, e.g. when the collaborator removes items.
    pub fn set_file_list(&self, items: Vec<UploadItem>) {
        *self.inner.file_list.lock().unwrap() = items;
    }

    /// Adds a freshly selected file to the list without starting it.
    pub fn select(&self, file: SourceFile) -> UploadItem {
        let item = UploadItem::new(file);
        self.inner.file_list.lock().unwrap().push(item.clone());
        item
    }

    /// Starts every selected item concurrently.
    ///
    /// Items not yet listed are appended. Must be called inside a tokio
    /// runtime. Each handle resolves to the item's terminal record.
    pub fn on_after_read(&self, selection: impl Into<Selection>) -> Vec<JoinHandle<UploadItem>> {
        selection
            .into()
            .into_items()
            .into_iter()
            .map(|item| {
                let uploader = self.clone();
                tokio::spawn(async move { uploader.start_upload(item).await })
            })
            .collect()
    }

    /// Reports a preview click; a failed item is uploaded again from scratch.
    pub fn on_click_preview(&self, item: &UploadItem) -> Option<JoinHandle<UploadItem>> {
        self.emit(UploadEvent::ClickPreview { item: item.clone() });

        if item.status == UploadStatus::Failed {
            debug!(upload_id = %item.id, "retrying failed upload");
            self.on_after_read(item.clone()).pop()
        } else {
            None
        }
    }

    /// Aborts the in-flight request of an upload. Unknown ids are ignored.
    pub fn abort(&self, id: UploadId) -> bool {
        self.inner.registry.abort(id)
    }

    /// Runs one upload to completion and returns its terminal record.
    pub async fn start_upload(&self, item: UploadItem) -> UploadItem {
        let item = item.uploading();
        self.upsert(item.clone());

        if self.is_chunked() {
            self.upload_chunk_file(item).await
        } else {
            self.upload_file(item).await
        }
    }

    /// Whole-file mode: one request carrying the entire file.
    async fn upload_file(&self, item: UploadItem) -> UploadItem {
        let selector = UploadSelector::whole(Arc::clone(&item.file));

        match self.request(&item, selector).await {
            Ok(response) => self.succeed(item, response),
            Err(e) => {
                let aborted = e.is_aborted();
                let failed = self.fail(item, e);
                if aborted {
                    self.remove(failed.id);
                }
                failed
            }
        }
    }

    /// Chunked mode: one request per chunk, stopping at the first failure.
    async fn upload_chunk_file(&self, item: UploadItem) -> UploadItem {
        let file = Arc::clone(&item.file);
        let file_size = file.size();
        let mut plan: Vec<ChunkDescriptor> = plan_chunks(file_size, self.inner.chunk_size).collect();
        if plan.is_empty() {
            // An empty file still needs one request to reach a terminal state.
            plan.push(ChunkDescriptor {
                index: 0,
                chunk_start: 0,
                chunk_end: 0,
                chunk_size: self.inner.chunk_size.get().unwrap_or(0),
            });
        }
        let total = plan.len();

        for chunk in plan {
            debug!(
                upload_id = %item.id,
                chunk = chunk.index,
                total,
                start = chunk.chunk_start,
                end = chunk.chunk_end,
                "uploading chunk"
            );

            let selector = UploadSelector::chunk(Arc::clone(&file), chunk);
            match self.request(&item, selector).await {
                Ok(response) if chunk.is_last(file_size) => return self.succeed(item, response),
                Ok(_) => {}
                Err(e) => return self.fail(item, e),
            }
        }

        item
    }

    /// Issues one request and post-processes its reply.
    ///
    /// The registry entry lives exactly as long as this call.
    async fn request(&self, item: &UploadItem, selector: UploadSelector) -> Result<Value, UploadError> {
        let pending = self.inner.transport.post(selector)?;
        let _guard = self.inner.registry.set(item.id, pending.abort.clone());

        let response = pending.request.await?;
        match &self.inner.response_handler {
            Some(handler) => Ok(handler.process(response, item).await?),
            None => Ok(response),
        }
    }

    fn succeed(&self, item: UploadItem, response: Value) -> UploadItem {
        let done = item.done(response.clone());
        info!(upload_id = %done.id, file = %done.file.name(), "upload succeeded");
        self.update(done.clone());
        self.emit(UploadEvent::Success {
            item: done.clone(),
            response,
        });
        done
    }

    fn fail(&self, item: UploadItem, err: UploadError) -> UploadItem {
        let failed = item.failed();
        if err.is_aborted() {
            warn!(upload_id = %failed.id, file = %failed.file.name(), "upload aborted");
        } else {
            error!(upload_id = %failed.id, file = %failed.file.name(), error = %err, "upload failed");
        }
        self.update(failed.clone());
        self.emit(UploadEvent::Error {
            item: failed.clone(),
            error: Arc::new(err),
        });
        failed
    }

    /// Replaces the listed record (appending it if missing) and reports it.
    fn upsert(&self, item: UploadItem) {
        {
            let mut list = self.inner.file_list.lock().unwrap();
            match list.iter_mut().find(|i| i.id == item.id) {
                Some(slot) => *slot = item.clone(),
                None => list.push(item.clone()),
            }
        }
        self.emit(UploadEvent::StatusChanged { item });
    }

    /// Replaces the listed record if it is still listed and reports it.
    fn update(&self, item: UploadItem) {
        {
            let mut list = self.inner.file_list.lock().unwrap();
            if let Some(slot) = list.iter_mut().find(|i| i.id == item.id) {
                *slot = item.clone();
            }
        }
        self.emit(UploadEvent::StatusChanged { item });
    }

    fn remove(&self, id: UploadId) {
        let items = {
            let mut list = self.inner.file_list.lock().unwrap();
            let Some(index) = list.iter().position(|i| i.id == id) else {
                return;
            };
            list.remove(index);
            list.clone()
        };
        debug!(upload_id = %id, "removed aborted upload from list");
        self.emit(UploadEvent::ListChanged { items });
    }

    fn emit(&self, event: UploadEvent) {
        let _ = self.inner.events_tx.send(event);
    }
}
