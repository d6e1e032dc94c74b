use std::fmt;

/// Result type for queue and drain operations
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors that can occur while queueing or delivering photos
#[derive(Debug)]
pub enum UploadError {
    /// Local queue store failure
    DatabaseError(rusqlite::Error),
    /// Binary upload to object storage failed
    Transfer(String),
    /// Classification call failed (never fatal for a record)
    Enrichment(String),
    /// Metadata write failed without a definite answer (timeout, lost
    /// response); the row may or may not have been committed
    Persistence(String),
    /// Backend answered a write with an error status; nothing was committed
    Rejected(String),
    IoError(std::io::Error),
    Other(String),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::DatabaseError(e) => write!(f, "Database error: {}", e),
            UploadError::Transfer(e) => write!(f, "Transfer error: {}", e),
            UploadError::Enrichment(e) => write!(f, "Enrichment error: {}", e),
            UploadError::Persistence(e) => write!(f, "Persistence error: {}", e),
            UploadError::Rejected(e) => write!(f, "Rejected by backend: {}", e),
            UploadError::IoError(e) => write!(f, "IO error: {}", e),
            UploadError::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UploadError::DatabaseError(e) => Some(e),
            UploadError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for UploadError {
    fn from(err: rusqlite::Error) -> Self {
        UploadError::DatabaseError(err)
    }
}

impl From<std::io::Error> for UploadError {
    fn from(err: std::io::Error) -> Self {
        UploadError::IoError(err)
    }
}

impl UploadError {
    /// True for failures that leave the record queued for the next drain
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UploadError::Transfer(_)
                | UploadError::Persistence(_)
                | UploadError::Rejected(_)
                | UploadError::IoError(_)
        )
    }
}
