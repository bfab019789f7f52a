//! mv-ingest: asynchronous media ingestion and conversion.
//!
//! - [`WorkerPool`] runs submitted futures on at most `N` concurrent slots
//!   and drains on [`WorkerPool::stop`].
//! - [`ConversionJob`] is one transcode-probe-commit-notify-cleanup run
//!   against a [`ConversionTarget`].
//! - [`MediaService`] is the entry point that packages jobs and submits
//!   them.
//! - [`staging`] places uploads under their content-hash base name.

pub mod job;
pub mod pool;
pub mod service;
pub mod staging;

pub use job::{ConversionJob, ConversionTarget, JobContext, JobOutcome};
pub use pool::WorkerPool;
pub use service::MediaService;
pub use staging::{stage_upload, StagedUpload};
