use rusqlite::{Connection, Result};

/// Initialize the upload queue schema
pub fn init_queue_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS upload_queue_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT version FROM upload_queue_schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version < 1 {
        create_queue_schema_v1(conn)?;
        conn.execute(
            "INSERT INTO upload_queue_schema_version (version) VALUES (1)",
            [],
        )?;
    }

    Ok(())
}

/// Create upload queue schema version 1
fn create_queue_schema_v1(conn: &Connection) -> Result<()> {
    // seq gives insertion order; id is the public key
    conn.execute(
        "CREATE TABLE IF NOT EXISTS queued_uploads (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            project_id TEXT NOT NULL,
            organization_id TEXT NOT NULL,
            uploaded_by TEXT NOT NULL,
            payload BLOB NOT NULL,
            file_name TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            mime_type TEXT NOT NULL,
            caption TEXT,
            notes TEXT,
            is_before INTEGER NOT NULL DEFAULT 0 CHECK(is_before IN (0,1)),
            is_after INTEGER NOT NULL DEFAULT 0 CHECK(is_after IN (0,1)),
            room_type TEXT,
            latitude REAL,
            longitude REAL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_queued_uploads_project ON queued_uploads(project_id)",
        [],
    )?;

    Ok(())
}
