//! The [`RecordStore`] trait: persistence operations the conversion pipeline
//! needs from the rest of the system.

use crate::error::Result;
use crate::ids::{FileId, OrderId};

/// Persistence seam for the conversion pipeline.
///
/// Every call is expected to be individually atomic (one row update). The
/// pipeline calls them best-effort and never retries.
pub trait RecordStore: Send + Sync {
    /// Flip the file to `ready = 1`.
    fn mark_ready(&self, id: FileId) -> Result<()>;

    /// Store probed duration (whole seconds) and size (MiB, one decimal).
    fn update_metadata(&self, id: FileId, duration_secs: u64, size_mb: f64) -> Result<()>;

    /// Replace the stored file name, e.g. after the produced container
    /// differs from the one assumed at upload time.
    fn update_stored_name(&self, id: FileId, stored_name: &str) -> Result<()>;

    /// Attachment file names of an order, in order.
    fn get_order_attachments(&self, id: OrderId) -> Result<Vec<String>>;

    /// Replace the attachment list of an order.
    fn set_order_attachments(&self, id: OrderId, attachments: &[String]) -> Result<()>;
}
