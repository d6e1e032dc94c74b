pub mod schema;

use crate::error::AppError;
use crate::models::AppSettings;
use rusqlite::Connection;
use std::path::PathBuf;

/// Path of the local database file
pub fn get_database_path(settings: &AppSettings) -> PathBuf {
    PathBuf::from(&settings.database_path)
}

/// Opens the local database and brings its schema up to date
pub fn init_database(settings: &AppSettings) -> Result<Connection, AppError> {
    let db_path = get_database_path(settings);

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(&db_path)?;
    schema::init_schema(&conn)?;

    Ok(conn)
}
