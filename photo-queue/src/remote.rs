//! Seams to the hosted backend used while draining the queue

use crate::error::UploadResult;
use crate::models::{ClassificationRequest, Enrichment, PhotoMetadataRecord, StoredObject};
use async_trait::async_trait;

/// Binary object storage for photo payloads
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Writes `data` at `path`. Failures map to `UploadError::Transfer`.
    async fn put(&self, path: &str, data: Vec<u8>, mime_type: &str) -> UploadResult<StoredObject>;

    /// Removes the object at `path`
    async fn delete(&self, path: &str) -> UploadResult<()>;

    /// URL under which the object can be fetched
    fn public_url(&self, path: &str) -> String;
}

/// Relational store receiving one row per committed photo
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Writes the row keyed by `record.id`. A row with that id already being
    /// present counts as committed and returns `Ok`.
    ///
    /// `UploadError::Rejected` means the backend refused the row;
    /// `UploadError::Persistence` means the outcome is unknown.
    async fn insert(&self, record: &PhotoMetadataRecord) -> UploadResult<()>;
}

/// AI tagging service; callers treat every failure as "no enrichment"
#[async_trait]
pub trait PhotoClassifier: Send + Sync {
    async fn classify(&self, request: &ClassificationRequest) -> UploadResult<Enrichment>;
}
