//! Canonical delivery encoding using ffmpeg.
//!
//! Two fixed argument templates exist, selected by [`OutputKind`]:
//!
//! - video: H.264 (libx264, CRF + capped bitrate) scaled into a bounding box,
//!   AAC audio, MP4 with `+faststart`
//! - audio: video dropped, AAC at a constant bitrate, M4A (`ipod` muxer)

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use mv_core::config::ConversionConfig;
use mv_core::OutputKind;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Converts a source file into a delivery file.
///
/// The job algorithm only depends on this trait so the external binary can be
/// swapped or mocked.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Encode `input` into `output` using the template for `kind`.
    ///
    /// Returns [`mv_core::Error::Timeout`] when the encoder had to be killed
    /// and [`mv_core::Error::Tool`] for any other failure.
    async fn transcode(&self, input: &Path, output: &Path, kind: OutputKind) -> mv_core::Result<()>;
}

/// Build the ffmpeg argument list for one conversion.
pub fn build_transcode_args(
    input: &Path,
    output: &Path,
    kind: OutputKind,
    config: &ConversionConfig,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
    ];

    match kind {
        OutputKind::Video => {
            args.extend([
                "-c:v".into(),
                "libx264".into(),
                "-preset".into(),
                config.video_preset.clone(),
                "-crf".into(),
                config.video_crf.to_string(),
                "-maxrate".into(),
                config.video_max_bitrate.clone(),
                "-bufsize".into(),
                double_bitrate(&config.video_max_bitrate),
                "-vf".into(),
                format!(
                    "scale='min({},iw)':'min({},ih)':force_original_aspect_ratio=decrease:force_divisible_by=2",
                    config.max_width, config.max_height
                ),
                "-pix_fmt".into(),
                "yuv420p".into(),
                "-c:a".into(),
                "aac".into(),
                "-movflags".into(),
                "+faststart".into(),
            ]);
        }
        OutputKind::Audio => {
            args.extend([
                "-vn".into(),
                "-c:a".into(),
                "aac".into(),
                "-b:a".into(),
                config.audio_bitrate.clone(),
                "-f".into(),
                "ipod".into(),
                "-movflags".into(),
                "+faststart".into(),
            ]);
        }
    }

    args.push(output.to_string_lossy().into_owned());
    args
}

/// VBV buffer size for a bitrate string like `250k` (twice the rate).
///
/// Unparseable values are passed through unchanged.
fn double_bitrate(rate: &str) -> String {
    let rate = rate.trim();
    let split = rate
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rate.len());
    let (digits, suffix) = rate.split_at(split);
    match digits.parse::<u64>() {
        Ok(n) => format!("{}{suffix}", n * 2),
        Err(_) => rate.to_string(),
    }
}

/// [`Transcoder`] backed by the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
    config: ConversionConfig,
}

impl FfmpegTranscoder {
    /// Create a transcoder using the given ffmpeg binary.
    pub fn new(ffmpeg_path: PathBuf, config: ConversionConfig) -> Self {
        Self {
            ffmpeg_path,
            config,
        }
    }

    /// Create a transcoder from a discovered tool registry.
    pub fn from_registry(tools: &ToolRegistry, config: ConversionConfig) -> mv_core::Result<Self> {
        let ffmpeg = tools.require("ffmpeg")?;
        Ok(Self::new(ffmpeg.to_path_buf(), config))
    }

    fn timeout(&self) -> Duration {
        self.config.transcode_timeout()
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, kind: OutputKind) -> mv_core::Result<()> {
        let args = build_transcode_args(input, output, kind, &self.config);

        tracing::info!(
            "{kind} encode: {:?} -> {:?} (timeout={:?})",
            input,
            output,
            self.timeout()
        );
        tracing::debug!("ffmpeg args: {:?}", args);

        let mut cmd = ToolCommand::new(self.ffmpeg_path.clone());
        cmd.args(args);
        cmd.timeout(self.timeout());
        cmd.execute().await?;

        Ok(())
    }
}
