//! The conversion job: the body a pool worker runs for one upload.
//!
//! Every terminal failure (missing source, encoder error, encoder timeout)
//! fails open: a file target is still marked ready so it never stays stuck
//! in processing. Nothing here returns an error to the submitter, who has
//! long since moved on; the [`JobOutcome`] exists for logs and tests.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mv_av::{probe_metadata, Prober, Transcoder};
use mv_core::events::TOPIC_CONVERTED;
use mv_core::{EventPublisher, FileId, MediaMetadata, OrderId, OutputKind, RecordStore};

/// The record a conversion reports back to.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionTarget {
    /// A library file; carries ready-flag semantics.
    File { id: FileId },
    /// An attachment of an order, listed under `old_name` until converted.
    OrderAttachment { order_id: OrderId, old_name: String },
}

impl ConversionTarget {
    /// Short tag used in logs and event payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionTarget::File { .. } => "file",
            ConversionTarget::OrderAttachment { .. } => "order-attachment",
        }
    }

    /// Identifier of the owning record.
    pub fn entity_id(&self) -> String {
        match self {
            ConversionTarget::File { id } => id.to_string(),
            ConversionTarget::OrderAttachment { order_id, .. } => order_id.to_string(),
        }
    }

    /// Release the record after a terminal failure.
    ///
    /// Orders have no ready flag, so only files are touched.
    fn fail_open(&self, store: &dyn RecordStore) {
        if let ConversionTarget::File { id } = self {
            if let Err(e) = store.mark_ready(*id) {
                tracing::error!(file_id = %id, "fail-open mark_ready failed: {e}");
            }
        }
    }

    /// Persist a successful conversion. Each store call is attempted
    /// regardless of whether the previous one failed.
    fn commit(&self, store: &dyn RecordStore, meta: MediaMetadata, new_name: &str) {
        match self {
            ConversionTarget::File { id } => {
                if let Err(e) = store.mark_ready(*id) {
                    tracing::error!(file_id = %id, "mark_ready failed: {e}");
                }
                if let Err(e) = store.update_metadata(*id, meta.duration_secs, meta.size_mb) {
                    tracing::warn!(file_id = %id, "update_metadata failed: {e}");
                }
                if let Err(e) = store.update_stored_name(*id, new_name) {
                    tracing::warn!(file_id = %id, "update_stored_name failed: {e}");
                }
            }
            ConversionTarget::OrderAttachment { order_id, old_name } => {
                let mut attachments = match store.get_order_attachments(*order_id) {
                    Ok(list) => list,
                    Err(e) => {
                        tracing::error!(order_id = %order_id, "loading attachments failed: {e}");
                        return;
                    }
                };
                attachments.retain(|name| name != old_name);
                attachments.push(new_name.to_string());
                if let Err(e) = store.set_order_attachments(*order_id, &attachments) {
                    tracing::error!(order_id = %order_id, "saving attachments failed: {e}");
                }
            }
        }
    }
}

/// Collaborators a job needs. Cloned into every submitted job.
#[derive(Clone)]
pub struct JobContext {
    pub transcoder: Arc<dyn Transcoder>,
    pub prober: Arc<dyn Prober>,
    pub store: Arc<dyn RecordStore>,
    pub publisher: Option<Arc<dyn EventPublisher>>,
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Target written, probed, committed; source removed.
    Converted(MediaMetadata),
    /// Source was gone when the job started.
    MissingSource,
    /// Encoder failed (or the source could not be moved aside).
    TranscodeFailed,
    /// Encoder exceeded its wall-clock budget and was killed.
    TimedOut,
}

/// One unit of conversion work.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub target: ConversionTarget,
}

impl ConversionJob {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        target: ConversionTarget,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            target,
        }
    }

    /// Label used for pool bookkeeping.
    pub fn label(&self) -> String {
        format!("convert {} {}", self.target.kind(), self.target.entity_id())
    }

    /// Run the job to completion.
    pub async fn run(self, ctx: &JobContext) -> JobOutcome {
        let Self {
            mut source,
            destination,
            target,
        } = self;
        let kind_tag = target.kind();
        let entity = target.entity_id();

        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            tracing::warn!(
                target_kind = kind_tag,
                id = %entity,
                source = ?source,
                "source missing, releasing record"
            );
            target.fail_open(ctx.store.as_ref());
            return JobOutcome::MissingSource;
        }

        // Never let the encoder read and write the same path.
        let collided = source == destination;
        if collided {
            let moved = with_appended_extension(&source, "mp4");
            if let Err(e) = tokio::fs::rename(&source, &moved).await {
                tracing::error!(
                    target_kind = kind_tag,
                    id = %entity,
                    source = ?source,
                    "moving source aside failed: {e}"
                );
                target.fail_open(ctx.store.as_ref());
                return JobOutcome::TranscodeFailed;
            }
            tracing::debug!(source = ?source, moved = ?moved, "source collided with destination");
            source = moved;
        }

        let kind = OutputKind::from_destination(&destination);
        tracing::info!(
            target_kind = kind_tag,
            id = %entity,
            source = ?source,
            destination = ?destination,
            "converting to {kind}"
        );

        if let Err(e) = ctx.transcoder.transcode(&source, &destination, kind).await {
            let outcome = if e.is_timeout() {
                JobOutcome::TimedOut
            } else {
                JobOutcome::TranscodeFailed
            };
            tracing::error!(target_kind = kind_tag, id = %entity, "conversion failed: {e}");
            // Put the original back where the record expects it.
            if collided {
                if let Err(e) = tokio::fs::rename(&source, &destination).await {
                    tracing::warn!(source = ?source, "restoring collided source failed: {e}");
                }
            }
            target.fail_open(ctx.store.as_ref());
            return outcome;
        }

        let meta = probe_metadata(ctx.prober.as_ref(), &destination).await;
        let new_name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        target.commit(ctx.store.as_ref(), meta, &new_name);

        if let Some(publisher) = &ctx.publisher {
            let payload = serde_json::json!({
                "kind": kind_tag,
                "id": entity,
                "duration_seconds": meta.duration_secs,
                "size_mb": meta.size_mb,
                "stored_name": new_name,
            });
            if let Err(e) = publisher.publish(TOPIC_CONVERTED, payload) {
                tracing::warn!(id = %entity, "publishing {TOPIC_CONVERTED} failed: {e}");
            }
        }

        if let Err(e) = tokio::fs::remove_file(&source).await {
            tracing::warn!(source = ?source, "removing staged source failed: {e}");
        }

        tracing::info!(
            target_kind = kind_tag,
            id = %entity,
            duration_secs = meta.duration_secs,
            size_mb = meta.size_mb,
            "conversion committed"
        );
        JobOutcome::Converted(meta)
    }
}

/// `clip.mp4` + `mp4` -> `clip.mp4.mp4`.
fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}
