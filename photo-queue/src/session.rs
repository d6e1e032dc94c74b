//! Draining the offline queue against the remote backend
//!
//! An [`UploadSession`] owns everything a drain needs: the queue store, the
//! connectivity monitor, the remote collaborators and the in-flight flag.
//! Create one per application session and share it behind an `Arc`.

use crate::connectivity::ConnectivityMonitor;
use crate::error::{UploadError, UploadResult};
use crate::models::{
    ClassificationRequest, DrainLogEntry, DrainOutcome, DrainSummary, Enrichment,
    PhotoMetadataRecord, QueuedUpload, StoredObject,
};
use crate::paths;
use crate::queue::UploadQueue;
use crate::remote::{MetadataStore, ObjectStorage, PhotoClassifier};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

const MAX_LOG_ENTRIES: usize = 500;

/// Backoff between automatic drain attempts while records keep failing
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Upper bound of the wait before retry number `attempt` (0-based)
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Jittered wait in `[ceiling / 2, ceiling]`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt).as_millis() as u64;
        let floor = ceiling / 2;
        let jitter = rand::random::<u64>() % (ceiling - floor + 1);
        Duration::from_millis(floor + jitter)
    }
}

type Notifier = Arc<dyn Fn(DrainSummary) + Send + Sync>;

pub struct UploadSession {
    queue: Arc<UploadQueue>,
    connectivity: ConnectivityMonitor,
    storage: Arc<dyn ObjectStorage>,
    metadata: Arc<dyn MetadataStore>,
    classifier: Option<Arc<dyn PhotoClassifier>>,
    retry: RetryPolicy,
    notifier: Option<Notifier>,
    draining: AtomicBool,
    log: Mutex<Vec<DrainLogEntry>>,
}

/// Clears the in-flight flag when the drain ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl UploadSession {
    pub fn new(
        queue: Arc<UploadQueue>,
        connectivity: ConnectivityMonitor,
        storage: Arc<dyn ObjectStorage>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            queue,
            connectivity,
            storage,
            metadata,
            classifier: None,
            retry: RetryPolicy::default(),
            notifier: None,
            draining: AtomicBool::new(false),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn PhotoClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Called with the summary of every drain that found queued records
    pub fn with_notifier<F>(mut self, notifier: F) -> Self
    where
        F: Fn(DrainSummary) + Send + Sync + 'static,
    {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    pub fn queue(&self) -> &UploadQueue {
        &self.queue
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Summaries of the drains run in this session, oldest first
    pub fn drain_log(&self) -> Vec<DrainLogEntry> {
        self.log.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    fn append_log(&self, summary: DrainSummary) {
        if let Ok(mut guard) = self.log.lock() {
            guard.push(DrainLogEntry {
                ts_ms: Utc::now().timestamp_millis(),
                summary,
            });
            let len = guard.len();
            if len > MAX_LOG_ENTRIES {
                guard.drain(0..len - MAX_LOG_ENTRIES);
            }
        }
    }

    /// Uploads every record queued at the time of the call, one at a time.
    ///
    /// Returns [`DrainOutcome::AlreadyRunning`] without doing anything when
    /// another drain is in flight. Per-record failures are counted in the
    /// summary and leave the record queued; only a failure to read the local
    /// store is returned as an error.
    pub async fn drain(&self) -> UploadResult<DrainOutcome> {
        if self.draining.swap(true, Ordering::SeqCst) {
            log::debug!("Drain already in flight, ignoring trigger");
            return Ok(DrainOutcome::AlreadyRunning);
        }
        let _in_flight = InFlight(&self.draining);

        let snapshot = self.queue.list_queued()?;
        log::info!("Found {} queued photo(s) to upload", snapshot.len());

        let mut summary = DrainSummary {
            succeeded: 0,
            failed: snapshot.unreadable(),
        };
        for item in snapshot.iter() {
            let upload = match item {
                Ok(upload) => upload,
                Err(e) => {
                    log::error!("Failed to load queued upload: {}", e);
                    summary.failed += 1;
                    continue;
                }
            };

            let id = upload.id;
            match self.deliver(upload).await {
                Ok(()) => match self.queue.dequeue(&id) {
                    Ok(()) => summary.succeeded += 1,
                    Err(e) => {
                        // Committed remotely but still queued: the next drain uploads it again
                        log::error!("Upload {} committed but could not be dequeued: {}", id, e);
                        summary.failed += 1;
                    }
                },
                Err(e) => {
                    if e.is_retryable() {
                        log::warn!("Upload {} stays queued: {}", id, e);
                    } else {
                        log::error!("Upload {} stays queued: {}", id, e);
                    }
                    summary.failed += 1;
                }
            }
        }

        log::info!(
            "Drain finished: {} uploaded, {} failed",
            summary.succeeded,
            summary.failed
        );
        self.append_log(summary);
        if summary.total() > 0 {
            if let Some(notify) = &self.notifier {
                notify(summary);
            }
        }

        Ok(DrainOutcome::Completed(summary))
    }

    /// Storage write, optional enrichment, metadata write
    async fn deliver(&self, mut upload: QueuedUpload) -> UploadResult<()> {
        let path =
            paths::photo_object_path(&upload.organization_id, &upload.project_id, &upload.file_name);
        let payload = std::mem::take(&mut upload.payload);

        let stored = self
            .storage
            .put(&path, payload, &upload.mime_type)
            .await?;
        log::debug!("Stored payload of {} at {}", upload.id, stored.path);

        let enrichment = self.enrich(&upload, &stored).await;
        let record = PhotoMetadataRecord::from_upload(&upload, &stored.path, enrichment);

        if let Err(e) = self.metadata.insert(&record).await {
            // Without a definite answer the row may reference this object
            if matches!(e, UploadError::Rejected(_)) {
                self.discard_orphan(&stored.path).await;
            } else {
                log::warn!(
                    "Commit of {} unconfirmed, keeping {} in storage",
                    upload.id,
                    stored.path
                );
            }
            return Err(e);
        }

        log::info!("Uploaded queued photo {} to {}", upload.id, stored.path);
        Ok(())
    }

    async fn enrich(&self, upload: &QueuedUpload, stored: &StoredObject) -> Enrichment {
        let Some(classifier) = &self.classifier else {
            return Enrichment::default();
        };

        let request = ClassificationRequest {
            image_url: stored.url.clone(),
            project_id: upload.project_id,
            room_type_hint: upload.room_type.clone(),
        };

        match classifier.classify(&request).await {
            Ok(enrichment) => enrichment,
            Err(e) => {
                log::warn!("Classification of {} skipped: {}", upload.id, e);
                Enrichment::default()
            }
        }
    }

    /// Best-effort removal of a binary whose metadata row was refused.
    /// The retry uploads to a fresh path, so the old object has no owner.
    async fn discard_orphan(&self, path: &str) {
        match self.storage.delete(path).await {
            Ok(()) => log::debug!("Removed orphaned object {}", path),
            Err(e) => log::warn!("Orphaned object {} left in storage: {}", path, e),
        }
    }

    /// Drains on start (if online) and on every offline-to-online transition
    /// until the connectivity monitor goes away.
    pub async fn run(self: Arc<Self>) {
        let mut rx = self.connectivity.subscribe();

        if *rx.borrow_and_update() {
            self.drain_with_backoff(&mut rx).await;
        }

        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            if online {
                self.drain_with_backoff(&mut rx).await;
            }
        }

        log::info!("Connectivity signal closed, upload session stopped");
    }

    async fn drain_with_backoff(&self, rx: &mut watch::Receiver<bool>) {
        let mut attempt = 0;
        loop {
            match self.drain().await {
                Ok(DrainOutcome::Completed(summary)) if summary.failed == 0 => return,
                Ok(DrainOutcome::AlreadyRunning) => return,
                Ok(DrainOutcome::Completed(summary)) => {
                    log::warn!("{}", summary.message());
                }
                Err(e) => log::error!("Drain failed: {}", e),
            }

            if attempt >= self.retry.max_attempts {
                log::warn!(
                    "Giving up after {} retries until the next connectivity change",
                    attempt
                );
                return;
            }

            let delay = self.retry.delay_for(attempt);
            attempt += 1;
            log::debug!("Retrying drain in {:?} (attempt {})", delay, attempt);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = rx.changed() => {
                    if changed.is_err() || !*rx.borrow_and_update() {
                        return;
                    }
                }
            }
        }
    }
}
