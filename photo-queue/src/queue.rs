//! Durable local store for pending uploads
//!
//! One SQLite table keyed by the upload id. A row exists exactly as long as
//! the upload has not been confirmed committed remotely. The connection sits
//! behind a mutex that is only held for the duration of a single statement,
//! so callers may freely interleave store calls with awaits.

use crate::error::{UploadError, UploadResult};
use crate::models::{NewUpload, QueuedUpload};
use crate::schema::init_queue_schema;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const SELECT_COLUMNS: &str = "id, project_id, organization_id, uploaded_by, payload, file_name, \
     file_size, mime_type, caption, notes, is_before, is_after, room_type, latitude, longitude, \
     created_at";

pub struct UploadQueue {
    conn: Mutex<Connection>,
}

impl UploadQueue {
    /// Wraps an existing connection, creating the queue table if needed
    pub fn new(conn: Connection) -> UploadResult<Self> {
        init_queue_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens (or creates) the queue database at `path`
    pub fn open(path: &Path) -> UploadResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> UploadResult<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn lock(&self) -> UploadResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| UploadError::Other("Upload queue lock poisoned".to_string()))
    }

    /// Persists a capture and returns its generated id
    pub fn enqueue(&self, upload: NewUpload) -> UploadResult<Uuid> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let file_size = upload.payload.len() as i64;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO queued_uploads (
                id, project_id, organization_id, uploaded_by, payload, file_name, file_size,
                mime_type, caption, notes, is_before, is_after, room_type, latitude, longitude,
                created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                id.to_string(),
                upload.project_id.to_string(),
                upload.organization_id.to_string(),
                upload.uploaded_by.to_string(),
                upload.payload,
                upload.file_name,
                file_size,
                upload.mime_type,
                upload.caption,
                upload.notes,
                upload.is_before,
                upload.is_after,
                upload.room_type,
                upload.location.map(|p| p.latitude),
                upload.location.map(|p| p.longitude),
                created_at,
            ],
        )?;

        log::debug!("Queued upload {} ({} bytes)", id, file_size);
        Ok(id)
    }

    /// Loads a single queued record
    pub fn get(&self, id: &Uuid) -> UploadResult<Option<QueuedUpload>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM queued_uploads WHERE id = ?1", SELECT_COLUMNS);
        let upload = conn
            .query_row(&sql, params![id.to_string()], |row| {
                QueuedUpload::try_from(row)
            })
            .optional()?;
        Ok(upload)
    }

    /// Takes a snapshot of the queued ids, oldest first.
    ///
    /// Payloads are not loaded until the snapshot is iterated. Rows whose id
    /// cannot be parsed are left out of the ids and counted in
    /// [`QueueSnapshot::unreadable`].
    pub fn list_queued(&self) -> UploadResult<QueueSnapshot<'_>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM queued_uploads ORDER BY seq ASC")?;
        let raw_ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut ids = Vec::with_capacity(raw_ids.len());
        let mut unreadable = 0;
        for raw in raw_ids {
            match Uuid::parse_str(&raw) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    log::warn!("Queued upload with malformed id '{}': {}", raw, e);
                    unreadable += 1;
                }
            }
        }

        Ok(QueueSnapshot {
            queue: self,
            ids,
            unreadable,
        })
    }

    /// Removes a record. Unknown ids are ignored.
    pub fn dequeue(&self, id: &Uuid) -> UploadResult<()> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM queued_uploads WHERE id = ?1",
            params![id.to_string()],
        )?;
        if removed == 0 {
            log::debug!("Dequeue of {} was a no-op", id);
        }
        Ok(())
    }

    pub fn count(&self) -> UploadResult<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM queued_uploads", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Drops every queued record, returning how many were removed
    pub fn clear(&self) -> UploadResult<usize> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM queued_uploads", [])?;
        log::info!("Cleared {} queued upload(s)", removed);
        Ok(removed)
    }
}

/// Point-in-time list of queued ids that loads records on demand.
///
/// Iteration can be restarted any number of times. Records dequeued after the
/// snapshot was taken are skipped; records enqueued later are not included.
pub struct QueueSnapshot<'a> {
    queue: &'a UploadQueue,
    ids: Vec<Uuid>,
    unreadable: usize,
}

impl<'a> QueueSnapshot<'a> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[Uuid] {
        &self.ids
    }

    /// Rows that are queued but cannot be delivered because their id is corrupt
    pub fn unreadable(&self) -> usize {
        self.unreadable
    }

    pub fn iter(&self) -> impl Iterator<Item = UploadResult<QueuedUpload>> + '_ {
        self.ids
            .iter()
            .filter_map(move |id| self.queue.get(id).transpose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    fn capture(name: &str) -> NewUpload {
        NewUpload::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            name.to_string(),
            "image/jpeg".to_string(),
            vec![0xFF, 0xD8, 0xFF, 0xE0],
        )
    }

    #[test]
    fn test_enqueue_and_get_round_trip_metadata() {
        let queue = UploadQueue::open_in_memory().unwrap();
        let mut upload = capture("living-room.jpg");
        upload.caption = Some("Ceiling stain".to_string());
        upload.is_before = true;
        upload.location = Some(GeoPoint {
            latitude: 40.7,
            longitude: -74.0,
        });

        let id = queue.enqueue(upload.clone()).unwrap();
        let stored = queue.get(&id).unwrap().unwrap();

        assert_eq!(stored.id, id);
        assert_eq!(stored.project_id, upload.project_id);
        assert_eq!(stored.file_size, 4);
        assert_eq!(stored.payload, upload.payload);
        assert_eq!(stored.caption.as_deref(), Some("Ceiling stain"));
        assert!(stored.is_before);
        assert!(!stored.is_after);
        assert_eq!(stored.location, upload.location);
    }

    #[test]
    fn test_count_and_dequeue() {
        let queue = UploadQueue::open_in_memory().unwrap();
        let first = queue.enqueue(capture("a.jpg")).unwrap();
        queue.enqueue(capture("b.jpg")).unwrap();
        assert_eq!(queue.count().unwrap(), 2);

        queue.dequeue(&first).unwrap();
        assert_eq!(queue.count().unwrap(), 1);
        assert!(queue.get(&first).unwrap().is_none());
    }

    #[test]
    fn test_dequeue_unknown_id_is_noop() {
        let queue = UploadQueue::open_in_memory().unwrap();
        queue.enqueue(capture("a.jpg")).unwrap();

        queue.dequeue(&Uuid::new_v4()).unwrap();
        let id = queue.list_queued().unwrap().ids()[0];
        queue.dequeue(&id).unwrap();
        queue.dequeue(&id).unwrap();
        assert_eq!(queue.count().unwrap(), 0);
    }

    #[test]
    fn test_snapshot_is_oldest_first_and_restartable() {
        let queue = UploadQueue::open_in_memory().unwrap();
        let ids: Vec<Uuid> = ["1.jpg", "2.jpg", "3.jpg"]
            .iter()
            .map(|name| queue.enqueue(capture(name)).unwrap())
            .collect();

        let snapshot = queue.list_queued().unwrap();
        assert_eq!(snapshot.ids(), ids.as_slice());

        let first_pass: Vec<String> = snapshot.iter().map(|r| r.unwrap().file_name).collect();
        let second_pass: Vec<String> = snapshot.iter().map(|r| r.unwrap().file_name).collect();
        assert_eq!(first_pass, vec!["1.jpg", "2.jpg", "3.jpg"]);
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn test_snapshot_ignores_later_changes() {
        let queue = UploadQueue::open_in_memory().unwrap();
        let first = queue.enqueue(capture("1.jpg")).unwrap();
        queue.enqueue(capture("2.jpg")).unwrap();

        let snapshot = queue.list_queued().unwrap();
        queue.dequeue(&first).unwrap();
        queue.enqueue(capture("3.jpg")).unwrap();

        assert_eq!(snapshot.len(), 2);
        let names: Vec<String> = snapshot.iter().map(|r| r.unwrap().file_name).collect();
        assert_eq!(names, vec!["2.jpg"]);
    }

    #[test]
    fn test_snapshot_counts_rows_with_corrupt_ids() {
        let conn = Connection::open_in_memory().unwrap();
        init_queue_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO queued_uploads (id, project_id, organization_id, uploaded_by, payload,
                file_name, file_size, mime_type, created_at)
             VALUES ('not-a-uuid', 'p', 'o', 'u', x'00', 'broken.jpg', 1, 'image/jpeg',
                '2026-01-01 00:00:00')",
            [],
        )
        .unwrap();
        let queue = UploadQueue::new(conn).unwrap();
        queue.enqueue(capture("good.jpg")).unwrap();

        let snapshot = queue.list_queued().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.unreadable(), 1);
        assert_eq!(queue.count().unwrap(), 2);
    }

    #[test]
    fn test_clear() {
        let queue = UploadQueue::open_in_memory().unwrap();
        queue.enqueue(capture("1.jpg")).unwrap();
        queue.enqueue(capture("2.jpg")).unwrap();
        assert_eq!(queue.clear().unwrap(), 2);
        assert!(queue.list_queued().unwrap().is_empty());
    }
}
