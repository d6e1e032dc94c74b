use crate::error::UploadError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Photo capture handed to the queue by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct NewUpload {
    pub project_id: Uuid,
    pub organization_id: Uuid,
    pub uploaded_by: Uuid,
    pub payload: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub caption: Option<String>,
    pub notes: Option<String>,
    pub is_before: bool,
    pub is_after: bool,
    pub room_type: Option<String>,
    pub location: Option<GeoPoint>,
}

impl NewUpload {
    pub fn new(
        project_id: Uuid,
        organization_id: Uuid,
        uploaded_by: Uuid,
        file_name: String,
        mime_type: String,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            project_id,
            organization_id,
            uploaded_by,
            payload,
            file_name,
            mime_type,
            caption: None,
            notes: None,
            is_before: false,
            is_after: false,
            room_type: None,
            location: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A pending file transfer persisted in the local queue.
///
/// Records are immutable once stored; the only lifecycle transition is
/// removal after the remote commit is confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedUpload {
    pub id: Uuid,
    pub project_id: Uuid,
    pub organization_id: Uuid,
    pub uploaded_by: Uuid,
    pub payload: Vec<u8>,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    pub caption: Option<String>,
    pub notes: Option<String>,
    pub is_before: bool,
    pub is_after: bool,
    pub room_type: Option<String>,
    pub location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&rusqlite::Row<'_>> for QueuedUpload {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row<'_>) -> Result<Self, Self::Error> {
        let latitude: Option<f64> = row.get("latitude")?;
        let longitude: Option<f64> = row.get("longitude")?;
        let file_size: i64 = row.get("file_size")?;

        Ok(Self {
            id: parse_uuid(row, "id")?,
            project_id: parse_uuid(row, "project_id")?,
            organization_id: parse_uuid(row, "organization_id")?,
            uploaded_by: parse_uuid(row, "uploaded_by")?,
            payload: row.get("payload")?,
            file_name: row.get("file_name")?,
            file_size: file_size.max(0) as u64,
            mime_type: row.get("mime_type")?,
            caption: row.get("caption")?,
            notes: row.get("notes")?,
            is_before: row.get("is_before")?,
            is_after: row.get("is_after")?,
            room_type: row.get("room_type")?,
            location: match (latitude, longitude) {
                (Some(latitude), Some(longitude)) => Some(GeoPoint {
                    latitude,
                    longitude,
                }),
                _ => None,
            },
            created_at: row.get("created_at")?,
        })
    }
}

fn parse_uuid(row: &rusqlite::Row<'_>, column: &str) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(column)?;
    Uuid::parse_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Best-effort AI classification result; every field may be absent
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Enrichment {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub damage_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl Enrichment {
    /// Parses a gateway response. Models sometimes wrap the JSON object in a
    /// markdown code fence, so the fence is stripped first.
    pub fn from_model_output(text: &str) -> Result<Self, UploadError> {
        let json_text = if text.contains("```json") {
            text.split("```json")
                .nth(1)
                .and_then(|s| s.split("```").next())
                .unwrap_or(text)
                .trim()
        } else if text.contains("```") {
            text.split("```").nth(1).unwrap_or(text).trim()
        } else {
            text.trim()
        };

        serde_json::from_str(json_text)
            .map_err(|e| UploadError::Enrichment(format!("Unparseable classifier output: {}", e)))
    }
}

/// Input for the classification service
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClassificationRequest {
    pub image_url: String,
    pub project_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_type_hint: Option<String>,
}

/// Reference returned by object storage after a successful write
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub path: String,
    pub url: String,
}

/// Row written to the remote `project_photos` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoMetadataRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub organization_id: Uuid,
    pub uploaded_by: Uuid,
    pub storage_path: String,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    pub caption: Option<String>,
    pub notes: Option<String>,
    pub is_before: bool,
    pub is_after: bool,
    pub room_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub captured_at: DateTime<Utc>,
    pub ai_category: Option<String>,
    pub ai_room_type: Option<String>,
    pub ai_damage_type: Option<String>,
    pub ai_description: Option<String>,
    pub ai_tags: Option<Vec<String>>,
    pub ai_confidence: Option<f32>,
}

impl PhotoMetadataRecord {
    /// Builds the remote row for an uploaded record. A missing room-type hint
    /// falls back to the classifier's guess.
    pub fn from_upload(upload: &QueuedUpload, storage_path: &str, enrichment: Enrichment) -> Self {
        Self {
            id: upload.id,
            project_id: upload.project_id,
            organization_id: upload.organization_id,
            uploaded_by: upload.uploaded_by,
            storage_path: storage_path.to_string(),
            file_name: upload.file_name.clone(),
            file_size: upload.file_size,
            mime_type: upload.mime_type.clone(),
            caption: upload.caption.clone(),
            notes: upload.notes.clone(),
            is_before: upload.is_before,
            is_after: upload.is_after,
            room_type: upload
                .room_type
                .clone()
                .or_else(|| enrichment.room_type.clone()),
            latitude: upload.location.map(|p| p.latitude),
            longitude: upload.location.map(|p| p.longitude),
            captured_at: upload.created_at,
            ai_category: enrichment.category,
            ai_room_type: enrichment.room_type,
            ai_damage_type: enrichment.damage_type,
            ai_description: enrichment.description,
            ai_tags: enrichment.tags,
            ai_confidence: enrichment.confidence,
        }
    }
}

/// Aggregate result of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl DrainSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Single notification line shown to the user after a drain
    pub fn message(&self) -> String {
        match (self.succeeded, self.failed) {
            (0, 0) => "No queued photos to upload".to_string(),
            (s, 0) => format!("{} queued photo(s) uploaded", s),
            (0, f) => format!("{} photo(s) could not be uploaded and remain queued", f),
            (s, f) => format!(
                "{} queued photo(s) uploaded, {} remain queued after failing",
                s, f
            ),
        }
    }
}

/// What a drain trigger did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain was in flight; nothing was started
    AlreadyRunning,
    Completed(DrainSummary),
}

/// Session log entry (volatile, lost on restart)
#[derive(Debug, Clone, PartialEq)]
pub struct DrainLogEntry {
    pub ts_ms: i64,
    pub summary: DrainSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_upload() -> QueuedUpload {
        QueuedUpload {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            uploaded_by: Uuid::new_v4(),
            payload: vec![1, 2, 3],
            file_name: "kitchen.jpg".to_string(),
            file_size: 3,
            mime_type: "image/jpeg".to_string(),
            caption: Some("Water line".to_string()),
            notes: None,
            is_before: true,
            is_after: false,
            room_type: None,
            location: Some(GeoPoint {
                latitude: 47.6,
                longitude: -122.3,
            }),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_metadata_record_takes_room_type_from_enrichment_when_no_hint() {
        let upload = sample_upload();
        let enrichment = Enrichment {
            room_type: Some("kitchen".to_string()),
            damage_type: Some("water".to_string()),
            ..Default::default()
        };

        let record = PhotoMetadataRecord::from_upload(&upload, "org/proj/a.jpg", enrichment);
        assert_eq!(record.room_type.as_deref(), Some("kitchen"));
        assert_eq!(record.ai_damage_type.as_deref(), Some("water"));
        assert_eq!(record.latitude, Some(47.6));
        assert_eq!(record.storage_path, "org/proj/a.jpg");
    }

    #[test]
    fn test_metadata_record_keeps_hint_and_null_enrichment() {
        let mut upload = sample_upload();
        upload.room_type = Some("basement".to_string());

        let record = PhotoMetadataRecord::from_upload(&upload, "p", Enrichment::default());
        assert_eq!(record.room_type.as_deref(), Some("basement"));
        assert!(record.ai_category.is_none());
        assert!(record.ai_tags.is_none());
        assert!(record.ai_confidence.is_none());
    }

    #[test]
    fn test_enrichment_accepts_partial_json() {
        let parsed: Enrichment =
            serde_json::from_str(r#"{"category":"damage","tags":["mold","drywall"]}"#).unwrap();
        assert_eq!(parsed.category.as_deref(), Some("damage"));
        assert_eq!(parsed.tags.unwrap().len(), 2);
        assert!(parsed.confidence.is_none());
    }

    #[test]
    fn test_enrichment_from_fenced_output() {
        let text = "Here you go:\n```json\n{\"damage_type\": \"fire\", \"confidence\": 0.75}\n```";
        let parsed = Enrichment::from_model_output(text).unwrap();
        assert_eq!(parsed.damage_type.as_deref(), Some("fire"));
        assert_eq!(parsed.confidence, Some(0.75));
    }

    #[test]
    fn test_enrichment_from_garbage_is_enrichment_error() {
        let err = Enrichment::from_model_output("I cannot see the image").unwrap_err();
        assert!(matches!(err, UploadError::Enrichment(_)));
    }

    #[test]
    fn test_summary_message() {
        assert_eq!(
            DrainSummary { succeeded: 3, failed: 0 }.message(),
            "3 queued photo(s) uploaded"
        );
        assert!(DrainSummary { succeeded: 2, failed: 1 }
            .message()
            .contains("1 remain queued"));
        assert_eq!(DrainSummary::default().total(), 0);
    }
}
