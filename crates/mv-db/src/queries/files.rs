//! File record operations.

use chrono::Utc;
use mv_core::{Error, FileId, Result};
use rusqlite::Connection;

use crate::models::{FileRecord, FILE_COLUMNS};

/// Insert a new file in the processing state (`ready = 0`).
pub fn create_file(
    conn: &Connection,
    storage_path: &str,
    stored_name: &str,
    original_name: &str,
) -> Result<FileRecord> {
    let id = FileId::new();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO files (id, storage_path, stored_name, original_name, ready,
                            duration_secs, size_mb, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 0, 0, 0, ?5, ?5)",
        rusqlite::params![id.to_string(), storage_path, stored_name, original_name, now],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(FileRecord {
        id,
        storage_path: storage_path.to_string(),
        stored_name: stored_name.to_string(),
        original_name: original_name.to_string(),
        ready: false,
        duration_secs: 0,
        size_mb: 0.0,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Get a file by ID.
pub fn get_file(conn: &Connection, id: FileId) -> Result<Option<FileRecord>> {
    let result = conn.query_row(
        &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"),
        [id.to_string()],
        FileRecord::from_row,
    );
    match result {
        Ok(f) => Ok(Some(f)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

fn query_files(conn: &Connection, sql: &str) -> Result<Vec<FileRecord>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], FileRecord::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// List all files, oldest first.
pub fn list_files(conn: &Connection) -> Result<Vec<FileRecord>> {
    query_files(
        conn,
        &format!("SELECT {FILE_COLUMNS} FROM files ORDER BY created_at, id"),
    )
}

/// Files still waiting for their conversion job to finish.
pub fn list_processing_files(conn: &Connection) -> Result<Vec<FileRecord>> {
    query_files(
        conn,
        &format!("SELECT {FILE_COLUMNS} FROM files WHERE ready = 0 ORDER BY created_at, id"),
    )
}

fn touch(conn: &Connection, id: FileId, set: &str, params: &[&dyn rusqlite::ToSql]) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let sql = format!("UPDATE files SET {set}, updated_at = ?1 WHERE id = ?2");

    let id_str = id.to_string();
    let mut all: Vec<&dyn rusqlite::ToSql> = vec![&now, &id_str];
    all.extend_from_slice(params);

    let n = conn
        .execute(&sql, all.as_slice())
        .map_err(|e| Error::database(e.to_string()))?;
    if n == 0 {
        return Err(Error::not_found("file", id));
    }
    Ok(())
}

/// Flip a file to `ready = 1`.
pub fn mark_ready(conn: &Connection, id: FileId) -> Result<()> {
    touch(conn, id, "ready = 1", &[])
}

/// Store probed duration and size.
pub fn update_metadata(conn: &Connection, id: FileId, duration_secs: u64, size_mb: f64) -> Result<()> {
    let duration = i64::try_from(duration_secs).unwrap_or(i64::MAX);
    touch(
        conn,
        id,
        "duration_secs = ?3, size_mb = ?4",
        &[&duration, &size_mb],
    )
}

/// Replace the stored file name.
pub fn update_stored_name(conn: &Connection, id: FileId, stored_name: &str) -> Result<()> {
    touch(conn, id, "stored_name = ?3", &[&stored_name])
}
