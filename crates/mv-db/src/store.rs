//! [`RecordStore`] over the SQLite pool.

use mv_core::{FileId, OrderId, RecordStore, Result};

use crate::pool::{get_conn, DbPool};
use crate::queries::{files, orders};

/// Record store that checks out one pooled connection per call.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: DbPool,
}

impl SqliteRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl RecordStore for SqliteRecordStore {
    fn mark_ready(&self, id: FileId) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        files::mark_ready(&conn, id)
    }

    fn update_metadata(&self, id: FileId, duration_secs: u64, size_mb: f64) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        files::update_metadata(&conn, id, duration_secs, size_mb)
    }

    fn update_stored_name(&self, id: FileId, stored_name: &str) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        files::update_stored_name(&conn, id, stored_name)
    }

    fn get_order_attachments(&self, id: OrderId) -> Result<Vec<String>> {
        let conn = get_conn(&self.pool)?;
        orders::get_attachments(&conn, id)
    }

    fn set_order_attachments(&self, id: OrderId, attachments: &[String]) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        orders::set_attachments(&conn, id, attachments)
    }
}
