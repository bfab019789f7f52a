//! The media service: packages conversion jobs and hands them to the pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mv_av::{FfmpegTranscoder, FfprobeProber, ToolRegistry};
use mv_core::config::Config;
use mv_core::{
    Error, EventPublisher, MediaEntity, MediaMetadata, OrderId, RecordStore, Result, TaskId,
};

use crate::job::{ConversionJob, ConversionTarget, JobContext};
use crate::pool::WorkerPool;
use crate::staging::StagedUpload;

/// Entry point of the conversion pipeline.
#[derive(Clone)]
pub struct MediaService {
    pool: WorkerPool,
    ctx: JobContext,
}

impl MediaService {
    pub fn new(pool: WorkerPool, ctx: JobContext) -> Self {
        Self { pool, ctx }
    }

    /// Wire ffmpeg, ffprobe and a pool sized from `config`.
    pub fn from_config(
        config: &Config,
        tools: &ToolRegistry,
        store: Arc<dyn RecordStore>,
        publisher: Option<Arc<dyn EventPublisher>>,
    ) -> Result<Self> {
        let transcoder = FfmpegTranscoder::from_registry(tools, config.conversion.clone())?;
        let prober =
            FfprobeProber::from_registry(tools)?.with_timeout(config.conversion.probe_timeout());

        let ctx = JobContext {
            transcoder: Arc::new(transcoder),
            prober: Arc::new(prober),
            store,
            publisher,
        };
        Ok(Self::new(WorkerPool::new(config.workers.max_concurrency), ctx))
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Queue a conversion and return without waiting for it.
    ///
    /// Success or failure is only observable through the record store and
    /// the event publisher.
    pub fn convert_async(
        &self,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        target: ConversionTarget,
    ) -> Result<TaskId> {
        let job = ConversionJob::new(source, destination, target);
        let label = job.label();
        let ctx = self.ctx.clone();

        let body_label = label.clone();
        let id = self.pool.submit(label.clone(), async move {
            let outcome = job.run(&ctx).await;
            tracing::debug!("{body_label}: {outcome:?}");
        })?;
        tracing::info!(task = %id, "queued {label}");
        Ok(id)
    }

    /// Queue the conversion of a file from its staging copy to its target.
    pub fn convert_file(&self, entity: &MediaEntity) -> Result<TaskId> {
        self.convert_async(
            entity.staging_path(),
            entity.target_path(),
            ConversionTarget::File { id: entity.id },
        )
    }

    /// Accept a freshly staged file: record what can be probed from the
    /// staging copy now, then queue its conversion.
    pub async fn accept(&self, entity: &MediaEntity) -> Result<TaskId> {
        let meta = self.probe(&entity.staging_path()).await;
        if let Err(e) = self
            .ctx
            .store
            .update_metadata(entity.id, meta.duration_secs, meta.size_mb)
        {
            tracing::warn!(file_id = %entity.id, "storing upload metadata failed: {e}");
        }
        self.convert_file(entity)
    }

    /// List a staged upload on an order and queue its conversion. The
    /// attachment is renamed to the delivery name once converted.
    pub fn accept_attachment(&self, order_id: OrderId, staged: &StagedUpload) -> Result<TaskId> {
        let staging_name = staged.staging_name();
        let mut attachments = self.ctx.store.get_order_attachments(order_id)?;
        if !attachments.contains(&staging_name) {
            attachments.push(staging_name.clone());
            self.ctx.store.set_order_attachments(order_id, &attachments)?;
        }
        self.convert_async(
            &staged.staging_path,
            &staged.destination,
            ConversionTarget::OrderAttachment {
                order_id,
                old_name: staging_name,
            },
        )
    }

    /// Best-effort duration and size of `path`.
    pub async fn probe(&self, path: &Path) -> MediaMetadata {
        mv_av::probe_metadata(self.ctx.prober.as_ref(), path).await
    }

    /// Re-probe whatever a reader would currently open and store the result.
    /// Never queues a conversion.
    pub async fn refresh_metadata(&self, entity: &MediaEntity) -> Result<MediaMetadata> {
        if !entity.exists() {
            return Err(Error::not_found("media file", entity.id));
        }
        let path = entity.resolve_playback_path();
        let meta = self.probe(&path).await;
        self.ctx
            .store
            .update_metadata(entity.id, meta.duration_secs, meta.size_mb)?;
        tracing::info!(
            file_id = %entity.id,
            path = ?path,
            duration_secs = meta.duration_secs,
            size_mb = meta.size_mb,
            "metadata refreshed"
        );
        Ok(meta)
    }

    /// Re-queue every entity still processing, e.g. after a restart.
    /// Returns how many jobs were queued.
    pub fn resume(&self, entities: impl IntoIterator<Item = MediaEntity>) -> Result<usize> {
        let mut queued = 0;
        for entity in entities.into_iter().filter(|e| !e.ready) {
            self.convert_file(&entity)?;
            queued += 1;
        }
        if queued > 0 {
            tracing::info!("resumed {queued} pending conversions");
        }
        Ok(queued)
    }

    /// Stop accepting jobs and wait for every queued and running one.
    pub async fn stop(&self) {
        self.pool.stop().await;
    }
}
