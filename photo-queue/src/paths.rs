//! Remote storage layout for project photos
//!
//! ```text
//! <remote_path>/
//! └── <organization-id>/
//!     └── <project-id>/
//!         └── <ULID>.<ext>
//! ```
//!
//! The ULID carries a millisecond timestamp plus 80 random bits, so two
//! uploads of the same file never land on the same key.

use uuid::Uuid;

/// Build the project directory for an organization/project pair
pub fn project_dir(organization_id: &Uuid, project_id: &Uuid) -> String {
    format!("{}/{}", organization_id, project_id)
}

/// Build a fresh object path for a file
pub fn photo_object_path(organization_id: &Uuid, project_id: &Uuid, file_name: &str) -> String {
    format!(
        "{}/{}.{}",
        project_dir(organization_id, project_id),
        ulid::Ulid::new(),
        file_extension(file_name)
    )
}

/// Lowercased extension of `file_name`, `jpg` when there is none
pub fn file_extension(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "jpg".to_string())
}
