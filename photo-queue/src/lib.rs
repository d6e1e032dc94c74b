//! # Photo Queue
//!
//! Offline-first delivery of job-site photos.
//!
//! Captures taken without connectivity are written to a local SQLite queue
//! and replayed against the hosted backend once the device is back online:
//! - Durable queue store with lazy, restartable snapshots
//! - Connectivity monitor that publishes online/offline transitions
//! - Sequential drain with a single in-flight guard and per-record isolation
//! - Best-effort AI enrichment that never blocks an upload
//!
//! A record leaves the queue only after both the binary and its metadata row
//! were committed remotely, so delivery is at-least-once.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use photo_queue::{ConnectivityMonitor, UploadQueue, UploadSession};
//!
//! let queue = Arc::new(UploadQueue::open(Path::new("./data/queue.db"))?);
//! let session = Arc::new(UploadSession::new(
//!     queue,
//!     ConnectivityMonitor::new(false),
//!     storage,
//!     metadata,
//! ));
//!
//! tokio::spawn(session.clone().run());
//! session.connectivity().set_online(true);
//! ```

pub mod connectivity;
pub mod error;
pub mod models;
pub mod paths;
pub mod queue;
pub mod remote;
pub mod schema;
pub mod session;

#[cfg(feature = "remote")]
pub mod classify;

#[cfg(feature = "remote")]
pub mod upload;

pub use connectivity::{ConnectivityMonitor, ObserverHandle};
pub use error::{UploadError, UploadResult};
pub use models::{
    ClassificationRequest, DrainLogEntry, DrainOutcome, DrainSummary, Enrichment, GeoPoint,
    NewUpload, PhotoMetadataRecord, QueuedUpload, StoredObject,
};
pub use queue::{QueueSnapshot, UploadQueue};
pub use remote::{MetadataStore, ObjectStorage, PhotoClassifier};
pub use schema::init_queue_schema;
pub use session::{RetryPolicy, UploadSession};

#[cfg(feature = "remote")]
pub use classify::{ClassifierConfig, HttpPhotoClassifier};

#[cfg(feature = "remote")]
pub use upload::{RestMetadataConfig, RestMetadataStore, WebDavConfig, WebDavStorage};
