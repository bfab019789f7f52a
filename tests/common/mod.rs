//! Shared test harness for integration tests.
//!
//! Mock collaborators for the conversion pipeline: a scripted transcoder, a
//! scripted prober, a record store that logs every call, and a publisher
//! that keeps what it was given. All call logs sit behind
//! `parking_lot::Mutex`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use mv_av::{ProbeStrategy, Prober, Transcoder};
use mv_core::{Error, EventPublisher, FileId, OrderId, OutputKind, RecordStore, Result};
use mv_ingest::JobContext;

// ---------------------------------------------------------------------------
// Transcoder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum TranscodeBehavior {
    /// Write these bytes to the output and exit 0.
    Succeed(Vec<u8>),
    /// Exit 1 with this stderr.
    Fail(&'static str),
    /// Exceed the wall-clock budget.
    TimeOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeCall {
    pub input: PathBuf,
    pub output: PathBuf,
    pub kind: OutputKind,
}

pub struct MockTranscoder {
    behavior: TranscodeBehavior,
    calls: Mutex<Vec<TranscodeCall>>,
}

impl MockTranscoder {
    pub fn new(behavior: TranscodeBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::new(TranscodeBehavior::Succeed(vec![0u8; 1024 * 1024]))
    }

    pub fn calls(&self) -> Vec<TranscodeCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, kind: OutputKind) -> Result<()> {
        self.calls.lock().push(TranscodeCall {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            kind,
        });
        match &self.behavior {
            TranscodeBehavior::Succeed(bytes) => {
                tokio::fs::write(output, bytes).await?;
                Ok(())
            }
            TranscodeBehavior::Fail(stderr) => Err(Error::tool(
                "ffmpeg",
                format!("exited with status 1: {stderr}"),
            )),
            TranscodeBehavior::TimeOut => Err(Error::Timeout {
                tool: "ffmpeg".into(),
                timeout: Duration::from_secs(300),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Prober
// ---------------------------------------------------------------------------

/// Answers each strategy from a script; unscripted strategies fail.
#[derive(Default)]
pub struct MockProber {
    responses: HashMap<ProbeStrategy, String>,
    calls: Mutex<Vec<ProbeStrategy>>,
}

impl MockProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, strategy: ProbeStrategy, stdout: &str) -> Self {
        self.responses.insert(strategy, stdout.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ProbeStrategy> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Prober for MockProber {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn probe(&self, strategy: ProbeStrategy, _path: &Path) -> Result<String> {
        self.calls.lock().push(strategy);
        self.responses
            .get(&strategy)
            .cloned()
            .ok_or_else(|| Error::tool("ffprobe", "exited with status 1"))
    }
}

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    MarkReady(FileId),
    UpdateMetadata(FileId, u64, f64),
    UpdateStoredName(FileId, String),
    GetAttachments(OrderId),
    SetAttachments(OrderId, Vec<String>),
}

#[derive(Default)]
pub struct RecordingStore {
    calls: Mutex<Vec<StoreCall>>,
    attachments: Mutex<HashMap<OrderId, Vec<String>>>,
    /// Every call still gets logged, then returns this error.
    failing: bool,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            failing: true,
            ..Self::default()
        })
    }

    pub fn with_order(order_id: OrderId, attachments: &[&str]) -> Arc<Self> {
        let store = Self::default();
        store.attachments.lock().insert(
            order_id,
            attachments.iter().map(|s| s.to_string()).collect(),
        );
        Arc::new(store)
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&StoreCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn mark_ready_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::MarkReady(_)))
    }

    pub fn metadata_write_count(&self) -> usize {
        self.count(|c| {
            matches!(
                c,
                StoreCall::UpdateMetadata(..) | StoreCall::UpdateStoredName(..)
            )
        })
    }

    pub fn attachments(&self, order_id: OrderId) -> Vec<String> {
        self.attachments
            .lock()
            .get(&order_id)
            .cloned()
            .unwrap_or_default()
    }

    fn log(&self, call: StoreCall) -> Result<()> {
        self.calls.lock().push(call);
        if self.failing {
            return Err(Error::database("database is locked"));
        }
        Ok(())
    }
}

impl RecordStore for RecordingStore {
    fn mark_ready(&self, id: FileId) -> Result<()> {
        self.log(StoreCall::MarkReady(id))
    }

    fn update_metadata(&self, id: FileId, duration_secs: u64, size_mb: f64) -> Result<()> {
        self.log(StoreCall::UpdateMetadata(id, duration_secs, size_mb))
    }

    fn update_stored_name(&self, id: FileId, stored_name: &str) -> Result<()> {
        self.log(StoreCall::UpdateStoredName(id, stored_name.to_string()))
    }

    fn get_order_attachments(&self, id: OrderId) -> Result<Vec<String>> {
        self.log(StoreCall::GetAttachments(id))?;
        self.attachments
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found("order", id))
    }

    fn set_order_attachments(&self, id: OrderId, attachments: &[String]) -> Result<()> {
        self.log(StoreCall::SetAttachments(id, attachments.to_vec()))?;
        self.attachments.lock().insert(id, attachments.to_vec());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(String, serde_json::Value)>>,
    failing: bool,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            failing: true,
            ..Self::default()
        })
    }

    pub fn events(&self) -> Vec<(String, serde_json::Value)> {
        self.events.lock().clone()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        self.events.lock().push((topic.to_string(), payload));
        if self.failing {
            return Err(Error::Internal("no subscribers reachable".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub fn job_context(
    transcoder: Arc<MockTranscoder>,
    prober: Arc<MockProber>,
    store: Arc<RecordingStore>,
    publisher: Option<Arc<RecordingPublisher>>,
) -> JobContext {
    JobContext {
        transcoder,
        prober,
        store,
        publisher: publisher.map(|p| p as Arc<dyn EventPublisher>),
    }
}

/// Write a fake staged upload and return its path.
pub fn staged_source(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"webm bytes").expect("write staged source");
    path
}
