//! Asynchronous media attachment.
//!
//! Every accepted file becomes an upload job on the async runtime. Jobs never
//! touch the document: they send their outcome over a channel, and the
//! editing thread drains that channel with [`MediaPipeline::pump`] or
//! [`MediaPipeline::settle`]. Outcomes are applied in batch order, so an image
//! is inserted only once every earlier file of the same batch has resolved.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use loom_editor_core::{ChainBuilder, CommandError, Editor, ImageAttrs, MediaConfig, NodeSpec};
use n0_future::task::JoinHandle;
use smol_str::SmolStr;
use tokio::sync::mpsc;

use crate::blob::{BlobStore, MemoryBlobStore};
use crate::error::UploadError;
use crate::input::{AttachmentEvent, EventClaim, FileInput, accepted_files};
use crate::upload::Uploader;

type JobKey = (u64, usize);

#[derive(Debug)]
struct UploadOutcome {
    batch: u64,
    ordinal: usize,
    result: Result<SmolStr, UploadError>,
}

/// Sends the job's outcome exactly once, reporting [`UploadError::Abandoned`]
/// if the job stops before it finishes.
struct Reply {
    tx: mpsc::UnboundedSender<UploadOutcome>,
    key: JobKey,
    sent: bool,
}

impl Reply {
    fn send(mut self, result: Result<SmolStr, UploadError>) {
        self.sent = true;
        let (batch, ordinal) = self.key;
        // the receiver is gone once the pipeline is disposed
        let _ = self.tx.send(UploadOutcome {
            batch,
            ordinal,
            result,
        });
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if !self.sent {
            let (batch, ordinal) = self.key;
            let _ = self.tx.send(UploadOutcome {
                batch,
                ordinal,
                result: Err(UploadError::Abandoned),
            });
        }
    }
}

/// A file that uploaded but produced no image.
#[derive(Debug)]
pub struct UploadFailure {
    pub filename: String,
    pub batch: u64,
    pub ordinal: usize,
    pub error: UploadError,
}

#[derive(Debug)]
pub enum MediaEvent {
    Inserted {
        filename: String,
        url: SmolStr,
        batch: u64,
        ordinal: usize,
    },
    Failed(UploadFailure),
    /// The upload worked but the editor refused the image.
    InsertRejected {
        filename: String,
        url: SmolStr,
        error: CommandError,
    },
}

/// Result of handing one event to the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    pub claim: EventClaim,
    pub batch: Option<u64>,
    /// Preview URLs in file order, live until each job resolves.
    pub previews: Vec<SmolStr>,
}

struct Job {
    filename: String,
    preview: SmolStr,
    handle: JoinHandle<()>,
}

struct Batch {
    total: usize,
    next: usize,
    ready: BTreeMap<usize, Result<SmolStr, UploadError>>,
}

pub struct MediaPipeline<U, B: BlobStore = MemoryBlobStore> {
    uploader: Arc<U>,
    blobs: B,
    config: MediaConfig,
    next_batch: u64,
    batches: BTreeMap<u64, Batch>,
    jobs: HashMap<JobKey, Job>,
    tx: mpsc::UnboundedSender<UploadOutcome>,
    rx: mpsc::UnboundedReceiver<UploadOutcome>,
    disposed: bool,
}

impl<U: Uploader> MediaPipeline<U> {
    pub fn new(uploader: U, config: MediaConfig) -> Self {
        Self::with_blob_store(uploader, MemoryBlobStore::default(), config)
    }
}

impl<U: Uploader, B: BlobStore> MediaPipeline<U, B> {
    pub fn with_blob_store(uploader: U, blobs: B, config: MediaConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            uploader: Arc::new(uploader),
            blobs,
            config,
            next_batch: 0,
            batches: BTreeMap::new(),
            jobs: HashMap::new(),
            tx,
            rx,
            disposed: false,
        }
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Jobs that have not been applied yet.
    pub fn pending(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Start uploading the accepted files of `event` as one batch.
    ///
    /// Must be called from within the async runtime.
    pub fn attach(&mut self, event: AttachmentEvent) -> Attachment {
        let (files, claim) = accepted_files(event, &self.config);
        if files.is_empty() || self.disposed {
            return Attachment {
                claim,
                ..Attachment::default()
            };
        }

        let batch = self.next_batch;
        self.next_batch += 1;
        tracing::info!(batch, files = files.len(), "uploading attachments");

        let mut previews = Vec::with_capacity(files.len());
        for (ordinal, file) in files.into_iter().enumerate() {
            let preview = self.blobs.create(batch, ordinal, &file);
            previews.push(preview.clone());
            let key = (batch, ordinal);
            let filename = file.name.clone();
            let handle = self.spawn_job(key, file);
            self.jobs.insert(
                key,
                Job {
                    filename,
                    preview,
                    handle,
                },
            );
        }
        self.batches.insert(
            batch,
            Batch {
                total: previews.len(),
                next: 0,
                ready: BTreeMap::new(),
            },
        );

        Attachment {
            claim,
            batch: Some(batch),
            previews,
        }
    }

    fn spawn_job(&self, key: JobKey, file: FileInput) -> JoinHandle<()> {
        let uploader = self.uploader.clone();
        let reply = Reply {
            tx: self.tx.clone(),
            key,
            sent: false,
        };
        n0_future::task::spawn(async move {
            let result = uploader.upload(file.data, &file.name).await;
            reply.send(result);
        })
    }

    /// Apply every outcome that has arrived and is next in its batch.
    pub fn pump(&mut self, editor: &mut Editor) -> Vec<MediaEvent> {
        if self.disposed {
            return Vec::new();
        }
        while let Ok(outcome) = self.rx.try_recv() {
            self.stash(outcome);
        }
        self.apply_ready(editor)
    }

    /// Wait for every in-flight job and apply all outcomes in order.
    pub async fn settle(&mut self, editor: &mut Editor) -> Vec<MediaEvent> {
        let mut events = self.pump(editor);
        while !self.disposed && !self.batches.is_empty() {
            let Some(outcome) = self.rx.recv().await else {
                break;
            };
            self.stash(outcome);
            events.extend(self.apply_ready(editor));
        }
        events
    }

    fn stash(&mut self, outcome: UploadOutcome) {
        match self.batches.get_mut(&outcome.batch) {
            Some(batch) => {
                batch.ready.insert(outcome.ordinal, outcome.result);
            }
            None => tracing::debug!(batch = outcome.batch, "dropping outcome for unknown batch"),
        }
    }

    fn apply_ready(&mut self, editor: &mut Editor) -> Vec<MediaEvent> {
        let mut events = Vec::new();
        let mut finished = Vec::new();
        let batch_ids: Vec<u64> = self.batches.keys().copied().collect();
        for id in batch_ids {
            loop {
                let Some(batch) = self.batches.get_mut(&id) else {
                    break;
                };
                let ordinal = batch.next;
                let Some(result) = batch.ready.remove(&ordinal) else {
                    break;
                };
                batch.next += 1;
                if batch.next == batch.total {
                    finished.push(id);
                }
                events.push(self.resolve((id, ordinal), result, editor));
            }
        }
        for id in finished {
            self.batches.remove(&id);
        }
        events
    }

    fn resolve(
        &mut self,
        key: JobKey,
        result: Result<SmolStr, UploadError>,
        editor: &mut Editor,
    ) -> MediaEvent {
        let (batch, ordinal) = key;
        let filename = match self.jobs.remove(&key) {
            Some(job) => {
                self.blobs.revoke(&job.preview);
                job.filename
            }
            None => String::new(),
        };

        let url = match result {
            Ok(url) => url,
            Err(error) => {
                tracing::warn!(%filename, batch, ordinal, %error, "upload failed");
                return MediaEvent::Failed(UploadFailure {
                    filename,
                    batch,
                    ordinal,
                    error,
                });
            }
        };

        let image = ImageAttrs::new(url.clone()).with_alt(filename.as_str());
        match editor
            .chain()
            .insert_node(NodeSpec::Image(image), self.config.insert_target)
            .try_run()
        {
            Ok(()) => {
                tracing::info!(%filename, %url, "inserted image");
                MediaEvent::Inserted {
                    filename,
                    url,
                    batch,
                    ordinal,
                }
            }
            Err(error) => {
                tracing::warn!(%filename, %error, "editor rejected uploaded image");
                MediaEvent::InsertRejected {
                    filename,
                    url,
                    error,
                }
            }
        }
    }
}

impl<U, B: BlobStore> MediaPipeline<U, B> {
    /// Abort in-flight jobs, drop pending outcomes and revoke every preview.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for (_, job) in self.jobs.drain() {
            job.handle.abort();
            self.blobs.revoke(&job.preview);
        }
        self.batches.clear();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        tracing::debug!("media pipeline disposed");
    }
}

impl<U, B: BlobStore> Drop for MediaPipeline<U, B> {
    fn drop(&mut self) {
        self.dispose();
    }
}
