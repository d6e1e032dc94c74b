use std::fmt;

/// Central error types for the field agent
#[derive(Debug)]
pub enum AppError {
    /// Database error (rusqlite)
    Database(rusqlite::Error),
    /// Filesystem error
    Filesystem(std::io::Error),
    /// Validation error (e.g. invalid inputs)
    Validation(String),
    /// Resource not found
    NotFound(String),
    /// Malformed `HH:MM` time string
    Parse(String),
    /// Settings file missing values or unreadable
    Config(String),
    /// Upload queue or backend failure
    Upload(photo_queue::UploadError),
    /// General error
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Filesystem(e) => write!(f, "Filesystem error: {}", e),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Parse(msg) => write!(f, "Parse error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Upload(e) => write!(f, "Upload error: {}", e),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// Conversions from other error types
impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Database(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Filesystem(e)
    }
}

impl From<photo_queue::UploadError> for AppError {
    fn from(e: photo_queue::UploadError) -> Self {
        match e {
            photo_queue::UploadError::DatabaseError(e) => AppError::Database(e),
            photo_queue::UploadError::IoError(e) => AppError::Filesystem(e),
            other => AppError::Upload(other),
        }
    }
}

/// Short messages for the terminal
impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Database(_) => "A local database error occurred. Please try again.".to_string(),
            AppError::Filesystem(_) => {
                "Error accessing files. Please check paths and permissions.".to_string()
            }
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => format!("{} was not found.", msg),
            AppError::Parse(msg) => format!("Invalid time: {}", msg),
            AppError::Config(msg) => format!("Check your settings file: {}", msg),
            AppError::Upload(_) => "Photos could not be uploaded right now.".to_string(),
            AppError::Other(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_database_error_is_flattened() {
        let err: AppError =
            photo_queue::UploadError::DatabaseError(rusqlite::Error::QueryReturnedNoRows).into();
        assert!(matches!(err, AppError::Database(_)));

        let err: AppError = photo_queue::UploadError::Transfer("503".to_string()).into();
        assert!(matches!(err, AppError::Upload(_)));
    }

    #[test]
    fn test_user_message_for_parse_error() {
        let err = AppError::Parse("'9h30'".to_string());
        assert_eq!(err.user_message(), "Invalid time: '9h30'");
    }
}
