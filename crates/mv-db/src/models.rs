//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`. Column order matches the `*_COLUMNS` constants used by
//! the query modules.

use std::path::PathBuf;

use mv_core::{FileId, MediaEntity, OrderId};
use uuid::Uuid;

use crate::queries::orders::split_attachments;

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(T::from(uuid))
}

// ---------------------------------------------------------------------------
// FileRecord
// ---------------------------------------------------------------------------

pub const FILE_COLUMNS: &str = "id, storage_path, stored_name, original_name, ready, \
     duration_secs, size_mb, created_at, updated_at";

#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: FileId,
    pub storage_path: String,
    pub stored_name: String,
    pub original_name: String,
    pub ready: bool,
    pub duration_secs: u64,
    pub size_mb: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl FileRecord {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let duration: i64 = row.get(5)?;
        Ok(Self {
            id: parse_id(row, 0)?,
            storage_path: row.get(1)?,
            stored_name: row.get(2)?,
            original_name: row.get(3)?,
            ready: row.get(4)?,
            duration_secs: duration.max(0) as u64,
            size_mb: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    /// The lifecycle view used by the conversion pipeline.
    pub fn to_entity(&self) -> MediaEntity {
        MediaEntity {
            id: self.id,
            storage_path: PathBuf::from(&self.storage_path),
            stored_name: self.stored_name.clone(),
            ready: self.ready,
            duration_secs: self.duration_secs,
            size_mb: self.size_mb,
        }
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

pub const ORDER_COLUMNS: &str = "id, title, attachments, created_at";

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub title: String,
    pub attachments: Vec<String>,
    pub created_at: String,
}

impl Order {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let attachments: String = row.get(2)?;
        Ok(Self {
            id: parse_id(row, 0)?,
            title: row.get(1)?,
            attachments: split_attachments(&attachments),
            created_at: row.get(3)?,
        })
    }
}
