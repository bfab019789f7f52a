//! FFprobe-based [`Prober`] implementation.
//!
//! Each [`ProbeStrategy`] maps to one ffprobe invocation whose stdout is
//! either a bare value (`default=noprint_wrappers=1:nokey=1`) or JSON.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use super::{ProbeStrategy, Prober};
use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Default per-invocation timeout.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    /// Path to the ffprobe binary.
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    /// Create a new prober using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self {
            ffprobe_path,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Create a prober from a discovered tool registry.
    pub fn from_registry(tools: &ToolRegistry) -> mv_core::Result<Self> {
        Ok(Self::new(tools.require("ffprobe")?.to_path_buf()))
    }

    /// Override the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// ffprobe arguments (without the input path) for a strategy.
#[rustfmt::skip]
pub fn strategy_args(strategy: ProbeStrategy) -> Vec<&'static str> {
    match strategy {
        ProbeStrategy::FormatDuration => vec![
            "-v", "error",
            "-show_entries", "format=duration",
            "-of", "default=noprint_wrappers=1:nokey=1",
        ],
        ProbeStrategy::StreamDuration => vec![
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=duration",
            "-of", "default=noprint_wrappers=1:nokey=1",
        ],
        // Browser recordings rarely carry nb_frames, so count them.
        ProbeStrategy::FrameCount => vec![
            "-v", "error",
            "-count_frames",
            "-select_streams", "v:0",
            "-show_entries", "stream=nb_read_frames,r_frame_rate",
            "-of", "json",
        ],
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, strategy: ProbeStrategy, path: &Path) -> mv_core::Result<String> {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.args(strategy_args(strategy));
        cmd.arg(path.to_string_lossy());
        cmd.timeout(self.timeout);

        let output = cmd.execute().await?;
        if output.stdout.trim().is_empty() {
            return Err(mv_core::Error::Probe(format!(
                "{strategy}: empty output for {}",
                path.display()
            )));
        }
        Ok(output.stdout)
    }
}
