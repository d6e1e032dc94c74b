//! Hosted backends for draining: WebDAV object storage and the REST
//! metadata table.

use crate::error::{UploadError, UploadResult};
use crate::models::{PhotoMetadataRecord, StoredObject};
use crate::remote::{MetadataStore, ObjectStorage};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// Configuration for the WebDAV photo store
#[derive(Debug, Clone)]
pub struct WebDavConfig {
    pub server_url: String,
    pub username: String,
    pub password: String,
    /// Collection under which all organization folders live
    pub remote_path: String,
    /// Base URL for rendering stored photos; defaults to the WebDAV URL
    pub public_base_url: Option<String>,
}

pub struct WebDavStorage {
    config: WebDavConfig,
    client: reqwest_dav::Client,
    known_dirs: KnownDirs,
}

/// Collections confirmed to exist on the server. Only a successful MKCOL or
/// PUT adds entries; a failed PUT drops its parents again.
#[derive(Default)]
struct KnownDirs(Mutex<HashSet<String>>);

impl KnownDirs {
    fn contains(&self, dir: &str) -> bool {
        self.0.lock().map(|dirs| dirs.contains(dir)).unwrap_or(false)
    }

    fn insert_all(&self, dirs: &[String]) {
        if let Ok(mut known) = self.0.lock() {
            known.extend(dirs.iter().cloned());
        }
    }

    fn forget_all(&self, dirs: &[String]) {
        if let Ok(mut known) = self.0.lock() {
            for dir in dirs {
                known.remove(dir);
            }
        }
    }
}

/// Every collection above `full_path`, outermost first
fn parent_dirs(full_path: &str) -> Vec<String> {
    let segments: Vec<&str> = full_path.split('/').filter(|s| !s.is_empty()).collect();
    (1..segments.len())
        .map(|depth| segments[..depth].join("/"))
        .collect()
}

impl WebDavStorage {
    pub fn new(config: WebDavConfig) -> UploadResult<Self> {
        let client = reqwest_dav::ClientBuilder::new()
            .set_host(config.server_url.trim_end_matches('/').to_string())
            .set_auth(reqwest_dav::Auth::Basic(
                config.username.clone(),
                config.password.clone(),
            ))
            .build()
            .map_err(|e| UploadError::Other(format!("WebDAV client error: {:?}", e)))?;

        Ok(Self {
            config,
            client,
            known_dirs: KnownDirs::default(),
        })
    }

    fn full_path(&self, path: &str) -> String {
        let base = self.config.remote_path.trim_matches('/');
        if base.is_empty() {
            path.trim_start_matches('/').to_string()
        } else {
            format!("{}/{}", base, path.trim_start_matches('/'))
        }
    }

    /// Creates the collections in `dirs` that are not known yet. WebDAV cannot
    /// create nested collections in one call. Existing ones answer 405, so
    /// MKCOL errors are left for the following PUT to surface.
    async fn ensure_dirs(&self, dirs: &[String]) {
        for dir in dirs {
            if self.known_dirs.contains(dir) {
                continue;
            }

            match self.client.mkcol(dir).await {
                Ok(()) => self.known_dirs.insert_all(std::slice::from_ref(dir)),
                Err(e) => log::debug!("MKCOL '{}' note: {:?}", dir, e),
            }
        }
    }
}

#[async_trait]
impl ObjectStorage for WebDavStorage {
    async fn put(&self, path: &str, data: Vec<u8>, _mime_type: &str) -> UploadResult<StoredObject> {
        let full_path = self.full_path(path);
        let dirs = parent_dirs(&full_path);
        self.ensure_dirs(&dirs).await;

        let size = data.len();
        if let Err(e) = self.client.put(&full_path, data).await {
            self.known_dirs.forget_all(&dirs);
            return Err(UploadError::Transfer(format!(
                "PUT {} failed: {:?}",
                full_path, e
            )));
        }
        self.known_dirs.insert_all(&dirs);

        log::info!("Uploaded {} bytes to {}", size, full_path);
        Ok(StoredObject {
            path: path.to_string(),
            url: self.public_url(path),
        })
    }

    async fn delete(&self, path: &str) -> UploadResult<()> {
        let full_path = self.full_path(path);
        self.client
            .delete(&full_path)
            .await
            .map_err(|e| UploadError::Transfer(format!("DELETE {} failed: {:?}", full_path, e)))
    }

    fn public_url(&self, path: &str) -> String {
        let base = self
            .config
            .public_base_url
            .as_deref()
            .unwrap_or(&self.config.server_url)
            .trim_end_matches('/');
        format!("{}/{}", base, self.full_path(path))
    }
}

/// Configuration for the backend's REST table endpoint
#[derive(Debug, Clone)]
pub struct RestMetadataConfig {
    pub base_url: String,
    pub api_key: String,
    pub table: String,
    pub timeout: Duration,
}

/// Inserts metadata rows through the backend's PostgREST-style API
pub struct RestMetadataStore {
    config: RestMetadataConfig,
    http_client: reqwest::Client,
}

impl RestMetadataStore {
    pub fn new(config: RestMetadataConfig) -> UploadResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UploadError::Other(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.table
        )
    }
}

#[async_trait]
impl MetadataStore for RestMetadataStore {
    async fn insert(&self, record: &PhotoMetadataRecord) -> UploadResult<()> {
        // No answer means the row may already be committed
        let response = self
            .http_client
            .post(self.table_url())
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .map_err(|e| UploadError::Persistence(format!("Metadata request failed: {}", e)))?;

        let status = response.status();
        let body = if status.is_success() {
            String::new()
        } else {
            response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string())
        };
        insert_outcome(status, &body, record)?;

        log::debug!("Inserted metadata row {}", record.id);
        Ok(())
    }
}

/// Maps the table endpoint's answer to a commit outcome. A unique violation
/// (PostgREST code 23505) on the id means an earlier attempt already
/// committed this row.
fn insert_outcome(
    status: reqwest::StatusCode,
    body: &str,
    record: &PhotoMetadataRecord,
) -> UploadResult<()> {
    if status.is_success() {
        return Ok(());
    }
    if status == reqwest::StatusCode::CONFLICT && body.contains("23505") {
        log::info!("Metadata row {} was already committed", record.id);
        return Ok(());
    }
    Err(UploadError::Rejected(format!(
        "Metadata insert for {} rejected: {} - {}",
        record.id, status, body
    )))
}
