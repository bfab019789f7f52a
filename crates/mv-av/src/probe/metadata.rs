//! Best-effort `(duration, size)` measurement with a three-tier fallback.
//!
//! Container metadata is frequently absent or wrong for MediaRecorder
//! output, so duration degrades through progressively more expensive
//! signals. Nothing here returns an error; unknown values stay zero.

use std::path::Path;

use mv_core::MediaMetadata;
use serde::Deserialize;

use super::{ProbeStrategy, Prober};

/// Probe size and duration of `path`.
///
/// Strategies are attempted in [`ProbeStrategy::ALL`] order and the first
/// one that produces a duration wins; later strategies are not invoked.
pub async fn probe_metadata(prober: &dyn Prober, path: &Path) -> MediaMetadata {
    let size_mb = match tokio::fs::metadata(path).await {
        Ok(meta) => MediaMetadata::size_mb_from_bytes(meta.len()),
        Err(e) => {
            tracing::debug!("stat failed for {:?}: {}", path, e);
            0.0
        }
    };

    let mut duration_secs = 0;
    for strategy in ProbeStrategy::ALL {
        match prober.probe(strategy, path).await {
            Ok(stdout) => {
                if let Some(secs) = interpret(strategy, &stdout) {
                    duration_secs = secs;
                    tracing::debug!("{:?}: {strategy} -> {secs}s", path);
                    break;
                }
                tracing::debug!("{:?}: {strategy} yielded nothing", path);
            }
            Err(e) => {
                tracing::debug!(prober = prober.name(), "{:?}: {strategy} failed: {}", path, e);
            }
        }
    }

    MediaMetadata {
        duration_secs,
        size_mb,
    }
}

/// Turn raw prober output into whole seconds, or `None` to fall through.
fn interpret(strategy: ProbeStrategy, stdout: &str) -> Option<u64> {
    match strategy {
        ProbeStrategy::FormatDuration | ProbeStrategy::StreamDuration => {
            parse_duration(stdout).map(|d| d.floor() as u64)
        }
        ProbeStrategy::FrameCount => {
            let (frames, fps) = parse_frame_count_output(stdout)?;
            if frames > 0 && fps > 0.0 {
                Some((frames as f64 / fps).floor() as u64)
            } else {
                None
            }
        }
    }
}

/// Parse a bare duration value. Only finite positive numbers count;
/// ffprobe prints `N/A` when the field is missing.
fn parse_duration(stdout: &str) -> Option<f64> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let value: f64 = line.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

#[derive(Debug, Deserialize)]
struct FrameCountOutput {
    #[serde(default)]
    streams: Vec<FrameCountStream>,
}

#[derive(Debug, Deserialize)]
struct FrameCountStream {
    nb_read_frames: Option<String>,
    r_frame_rate: Option<String>,
}

/// Extract `(frame_count, frame_rate)` from the frame-count strategy's JSON.
fn parse_frame_count_output(stdout: &str) -> Option<(u64, f64)> {
    let output: FrameCountOutput = serde_json::from_str(stdout).ok()?;
    let stream = output.streams.into_iter().next()?;
    let frames = stream.nb_read_frames?.trim().parse().ok()?;
    let fps = parse_frame_rate(stream.r_frame_rate.as_deref()?)?;
    Some((frames, fps))
}

/// Parse ffprobe's rational frame rate (`30000/1001`) or a plain number.
fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let parts: Vec<&str> = rate_str.trim().split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den != 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate_str.trim().parse().ok()
}
