use crate::error::AppError;
use crate::models::AppSettings;
use photo_queue::{
    ClassifierConfig, ConnectivityMonitor, GeoPoint, HttpPhotoClassifier, NewUpload,
    RestMetadataConfig, RestMetadataStore, RetryPolicy, UploadQueue, UploadSession, WebDavConfig,
    WebDavStorage,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A photo file plus the job context it belongs to
#[derive(Debug, Clone, Default)]
pub struct CaptureRequest {
    pub project_id: Uuid,
    pub organization_id: Uuid,
    pub uploaded_by: Uuid,
    pub caption: Option<String>,
    pub notes: Option<String>,
    pub is_before: bool,
    pub is_after: bool,
    pub room_type: Option<String>,
    pub location: Option<GeoPoint>,
}

/// Opens the queue stored in the local database file
pub fn open_queue(settings: &AppSettings) -> Result<Arc<UploadQueue>, AppError> {
    let path = crate::database::get_database_path(settings);
    Ok(Arc::new(UploadQueue::open(&path)?))
}

/// MIME type from the file extension
pub fn guess_mime_type(file_name: &str) -> &'static str {
    match photo_queue::paths::file_extension(file_name).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Reads a photo from disk and queues it
pub fn enqueue_file(
    queue: &UploadQueue,
    file: &Path,
    request: &CaptureRequest,
) -> Result<Uuid, AppError> {
    if request.is_before && request.is_after {
        return Err(AppError::Validation(
            "A photo cannot be both a before and an after shot".to_string(),
        ));
    }

    let payload = std::fs::read(file)?;
    if payload.is_empty() {
        return Err(AppError::Validation(format!(
            "{} is empty",
            file.display()
        )));
    }

    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| AppError::Validation(format!("{} has no file name", file.display())))?
        .to_string();

    let mut upload = NewUpload::new(
        request.project_id,
        request.organization_id,
        request.uploaded_by,
        file_name.clone(),
        guess_mime_type(&file_name).to_string(),
        payload,
    );
    upload.caption = request.caption.clone();
    upload.notes = request.notes.clone();
    upload.is_before = request.is_before;
    upload.is_after = request.is_after;
    upload.room_type = request.room_type.clone();
    upload.location = request.location;

    let id = queue.enqueue(upload)?;
    log::info!("Queued {} as {}", file_name, id);
    Ok(id)
}

pub fn retry_policy(settings: &AppSettings) -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::from_secs(settings.retry.base_delay_secs),
        max_delay: Duration::from_secs(settings.retry.max_delay_secs),
        max_attempts: settings.retry.max_attempts,
    }
}

/// Wires the queue to the configured WebDAV store, REST table and
/// (optionally) the classifier
pub fn build_session(
    settings: &AppSettings,
    queue: Arc<UploadQueue>,
    connectivity: ConnectivityMonitor,
) -> Result<UploadSession, AppError> {
    settings.validate_remote()?;

    let storage = WebDavStorage::new(WebDavConfig {
        server_url: settings.storage.server_url.clone(),
        username: settings.storage.username.clone(),
        password: settings.storage.password.clone(),
        remote_path: settings.storage.remote_path.clone(),
        public_base_url: settings.storage.public_base_url.clone(),
    })?;

    let metadata = RestMetadataStore::new(RestMetadataConfig {
        base_url: settings.metadata.base_url.clone(),
        api_key: settings.metadata.api_key.clone(),
        table: settings.metadata.table.clone(),
        timeout: Duration::from_secs(settings.metadata.timeout_secs),
    })?;

    let mut session = UploadSession::new(queue, connectivity, Arc::new(storage), Arc::new(metadata))
        .with_retry_policy(retry_policy(settings));

    if let Some(classifier) = &settings.classifier {
        let classifier = HttpPhotoClassifier::new(ClassifierConfig {
            endpoint: classifier.endpoint.clone(),
            api_key: classifier.api_key.clone(),
            timeout: Duration::from_secs(classifier.timeout_secs),
        })?;
        session = session.with_classifier(Arc::new(classifier));
    } else {
        log::info!("No classifier configured, photos are uploaded without AI tags");
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp_file(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("restoration-ops-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("IMG_1.JPG"), "image/jpeg");
        assert_eq!(guess_mime_type("scan.png"), "image/png");
        assert_eq!(guess_mime_type("photo.heic"), "image/heic");
        assert_eq!(guess_mime_type("notes.txt"), "application/octet-stream");
    }

    #[test]
    fn test_enqueue_file_carries_context() {
        let path = write_temp_file("bathroom.jpg", &[0xFF, 0xD8, 0xFF, 0xDB]);
        let queue = UploadQueue::open_in_memory().unwrap();
        let request = CaptureRequest {
            project_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            uploaded_by: Uuid::new_v4(),
            caption: Some("Subfloor".to_string()),
            is_after: true,
            room_type: Some("bathroom".to_string()),
            ..Default::default()
        };

        let id = enqueue_file(&queue, &path, &request).unwrap();
        let stored = queue.get(&id).unwrap().unwrap();

        assert_eq!(stored.file_name, "bathroom.jpg");
        assert_eq!(stored.mime_type, "image/jpeg");
        assert_eq!(stored.file_size, 4);
        assert_eq!(stored.project_id, request.project_id);
        assert!(stored.is_after);
        assert_eq!(stored.room_type.as_deref(), Some("bathroom"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_enqueue_file_rejects_before_and_after() {
        let path = write_temp_file("x.jpg", &[1]);
        let queue = UploadQueue::open_in_memory().unwrap();
        let request = CaptureRequest {
            is_before: true,
            is_after: true,
            ..Default::default()
        };

        assert!(matches!(
            enqueue_file(&queue, &path, &request),
            Err(AppError::Validation(_))
        ));
        assert_eq!(queue.count().unwrap(), 0);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_enqueue_missing_file_is_filesystem_error() {
        let queue = UploadQueue::open_in_memory().unwrap();
        let result = enqueue_file(
            &queue,
            Path::new("/nonexistent/restoration-ops/photo.jpg"),
            &CaptureRequest::default(),
        );
        assert!(matches!(result, Err(AppError::Filesystem(_))));
    }

    #[test]
    fn test_build_session_requires_remote_settings() {
        let queue = Arc::new(UploadQueue::open_in_memory().unwrap());
        let result = build_session(
            &AppSettings::default(),
            queue,
            ConnectivityMonitor::new(false),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let mut settings = AppSettings::default();
        settings.retry.base_delay_secs = 3;
        settings.retry.max_delay_secs = 30;
        settings.retry.max_attempts = 4;

        let policy = retry_policy(&settings);
        assert_eq!(policy.base_delay, Duration::from_secs(3));
        assert_eq!(policy.ceiling(10), Duration::from_secs(30));
        assert_eq!(policy.max_attempts, 4);
    }
}
