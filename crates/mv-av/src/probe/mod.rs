//! Metadata probing.
//!
//! A [`Prober`] answers one low-level question per [`ProbeStrategy`] and
//! returns the tool's raw stdout. [`probe_metadata`] layers the fallback
//! policy on top and never fails.

pub mod ffprobe;
pub mod metadata;

use std::path::Path;

use async_trait::async_trait;

pub use self::ffprobe::FfprobeProber;
pub use self::metadata::probe_metadata;

/// The three ways duration can be recovered, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeStrategy {
    /// Container-level `format=duration`.
    FormatDuration,
    /// Duration field of the first video stream.
    StreamDuration,
    /// Exact frame count plus frame rate of the first video stream.
    FrameCount,
}

impl ProbeStrategy {
    /// All strategies in fallback order.
    pub const ALL: [ProbeStrategy; 3] = [
        ProbeStrategy::FormatDuration,
        ProbeStrategy::StreamDuration,
        ProbeStrategy::FrameCount,
    ];
}

impl std::fmt::Display for ProbeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStrategy::FormatDuration => write!(f, "format-duration"),
            ProbeStrategy::StreamDuration => write!(f, "stream-duration"),
            ProbeStrategy::FrameCount => write!(f, "frame-count"),
        }
    }
}

/// Runs one probe strategy against a file and returns the raw output.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Human-readable name of this prober backend.
    fn name(&self) -> &'static str;

    async fn probe(&self, strategy: ProbeStrategy, path: &Path) -> mv_core::Result<String>;
}
