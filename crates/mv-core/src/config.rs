//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for storage, workers, tools, and conversion. Every section
//! defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub workers: WorkerConfig,
    pub tools: ToolsConfig,
    pub conversion: ConversionConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.workers.max_concurrency == 0 {
            warnings.push("workers.max_concurrency is 0; one worker will be used".into());
        }

        let conv = &self.conversion;
        if conv.transcode_timeout_secs == 0 {
            warnings.push("conversion.transcode_timeout_secs is 0; every transcode will time out".into());
        }
        if conv.probe_timeout_secs == 0 {
            warnings.push("conversion.probe_timeout_secs is 0; every probe will time out".into());
        }
        if conv.video_crf > 51 {
            warnings.push(format!(
                "conversion.video_crf {} is outside the x264 range 0..=51",
                conv.video_crf
            ));
        }
        if conv.video_max_bitrate.trim().is_empty() {
            warnings.push("conversion.video_max_bitrate is empty".into());
        }
        if conv.audio_bitrate.trim().is_empty() {
            warnings.push("conversion.audio_bitrate is empty".into());
        }
        if conv.max_width == 0 || conv.max_height == 0 {
            warnings.push("conversion.max_width/max_height must be non-zero".into());
        }

        for (name, path) in [
            ("tools.ffmpeg_path", &self.tools.ffmpeg_path),
            ("tools.ffprobe_path", &self.tools.ffprobe_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!("{name} {} does not exist; PATH will be searched", p.display()));
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// On-disk locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
    /// Directory uploads are staged into and converted in.
    pub media_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/mediavault.db"),
            media_dir: PathBuf::from("./data/media"),
        }
    }
}

/// Background worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum number of conversions running at the same time.
    pub max_concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { max_concurrency: 3 }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Transcoding and probing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub video_crf: u32,
    pub video_preset: String,
    /// Cap passed to `-maxrate`; the VBV buffer is twice this value.
    pub video_max_bitrate: String,
    pub max_width: u32,
    pub max_height: u32,
    pub audio_bitrate: String,
    pub transcode_timeout_secs: u64,
    pub probe_timeout_secs: u64,
}

fn default_video_crf() -> u32 {
    28
}
fn default_video_preset() -> String {
    "slow".into()
}
fn default_video_max_bitrate() -> String {
    "250k".into()
}
fn default_audio_bitrate() -> String {
    "192k".into()
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            video_crf: default_video_crf(),
            video_preset: default_video_preset(),
            video_max_bitrate: default_video_max_bitrate(),
            max_width: 800,
            max_height: 600,
            audio_bitrate: default_audio_bitrate(),
            transcode_timeout_secs: 300,
            probe_timeout_secs: 10,
        }
    }
}

impl ConversionConfig {
    /// Wall-clock budget for a single transcode.
    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout_secs)
    }

    /// Wall-clock budget for a single probe strategy.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.workers.max_concurrency, 3);
        assert_eq!(cfg.conversion.video_crf, 28);
        assert_eq!(cfg.conversion.video_preset, "slow");
        assert_eq!(cfg.conversion.video_max_bitrate, "250k");
        assert_eq!(cfg.conversion.audio_bitrate, "192k");
        assert_eq!(cfg.conversion.transcode_timeout(), Duration::from_secs(300));
        assert_eq!(cfg.conversion.probe_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.storage.media_dir, PathBuf::from("./data/media"));
    }

    #[test]
    fn default_config_no_warnings() {
        let cfg = Config::default();
        let warnings = cfg.validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn zero_concurrency_warns() {
        let mut cfg = Config::default();
        cfg.workers.max_concurrency = 0;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("max_concurrency")));
    }

    #[test]
    fn bad_crf_warns() {
        let mut cfg = Config::default();
        cfg.conversion.video_crf = 60;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("video_crf")));
    }

    #[test]
    fn missing_tool_override_warns() {
        let mut cfg = Config::default();
        cfg.tools.ffmpeg_path = Some(PathBuf::from("/nonexistent/ffmpeg"));
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("tools.ffmpeg_path")));
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{"workers": {"max_concurrency": 5}, "conversion": {"video_crf": 23}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.workers.max_concurrency, 5);
        assert_eq!(cfg.conversion.video_crf, 23);
        // Untouched fields keep their defaults.
        assert_eq!(cfg.conversion.max_width, 800);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.workers.max_concurrency, 3);
    }

    #[test]
    fn parse_invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_or_default_with_none() {
        let cfg = Config::load_or_default(None);
        assert_eq!(cfg.workers.max_concurrency, 3);
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Some(Path::new("/nonexistent/config.json")));
        assert_eq!(cfg.workers.max_concurrency, 3);
    }

    #[test]
    fn load_or_default_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"workers": {"max_concurrency": 2}}"#).unwrap();
        let cfg = Config::load_or_default(Some(&path));
        assert_eq!(cfg.workers.max_concurrency, 2);
    }
}
