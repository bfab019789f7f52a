//! Media file lifecycle model.
//!
//! A [`MediaEntity`] owns one hash-derived base name. The original upload is
//! staged as `<base>.webm`; the canonical delivery file is `<base>.<ext>`
//! where the extension of `stored_name` names the target container. While an
//! entity is processing only the staging file is guaranteed to be complete,
//! so readers resolve paths through [`MediaEntity::resolve_playback_path`]
//! instead of joining `stored_name` themselves.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ids::FileId;

/// Extension every original upload is staged under.
pub const STAGING_EXTENSION: &str = "webm";

/// Upload extensions that select the audio-only pipeline.
const AUDIO_UPLOAD_EXTENSIONS: &[&str] = &[
    "aac", "flac", "m4a", "mp3", "oga", "ogg", "opus", "wav", "weba",
];

// ---------------------------------------------------------------------------
// OutputKind
// ---------------------------------------------------------------------------

/// Which delivery format a conversion produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// H.264 video in an MP4 container.
    Video,
    /// AAC audio in an M4A container.
    Audio,
}

impl OutputKind {
    /// Pick the pipeline from a destination path: `.m4a` is audio, anything
    /// else is video.
    pub fn from_destination(path: &Path) -> Self {
        match lowercase_extension(path).as_deref() {
            Some("m4a") => OutputKind::Audio,
            _ => OutputKind::Video,
        }
    }

    /// Sniff the original upload filename to decide audio vs video.
    pub fn from_upload_name(name: &str) -> Self {
        match lowercase_extension(Path::new(name)) {
            Some(ext) if AUDIO_UPLOAD_EXTENSIONS.contains(&ext.as_str()) => OutputKind::Audio,
            _ => OutputKind::Video,
        }
    }

    /// File extension of the delivery container, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Video => "mp4",
            OutputKind::Audio => "m4a",
        }
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputKind::Video => write!(f, "video"),
            OutputKind::Audio => write!(f, "audio"),
        }
    }
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

// ---------------------------------------------------------------------------
// MediaMetadata
// ---------------------------------------------------------------------------

/// Advisory metadata probed from a media file. Zero means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub duration_secs: u64,
    /// Megabytes (MiB) rounded to one decimal.
    pub size_mb: f64,
}

impl MediaMetadata {
    /// Convert a byte count into MiB rounded to one decimal place.
    pub fn size_mb_from_bytes(bytes: u64) -> f64 {
        let mb = bytes as f64 / (1024.0 * 1024.0);
        (mb * 10.0).round() / 10.0
    }
}

// ---------------------------------------------------------------------------
// MediaEntity
// ---------------------------------------------------------------------------

/// The file record as seen by the conversion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntity {
    pub id: FileId,
    /// Directory holding the staging and target files.
    pub storage_path: PathBuf,
    /// Target file name, e.g. `abc123.mp4`.
    pub stored_name: String,
    /// `false` while processing, `true` once the target is authoritative.
    pub ready: bool,
    pub duration_secs: u64,
    pub size_mb: f64,
}

impl MediaEntity {
    /// A freshly uploaded entity in the processing state.
    pub fn new(id: FileId, storage_path: impl Into<PathBuf>, stored_name: impl Into<String>) -> Self {
        Self {
            id,
            storage_path: storage_path.into(),
            stored_name: stored_name.into(),
            ready: false,
            duration_secs: 0,
            size_mb: 0.0,
        }
    }

    /// The hash-derived name shared by the staging and target files.
    pub fn base_name(&self) -> &str {
        Path::new(&self.stored_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.stored_name)
    }

    /// Path of the staged original upload (`<base>.webm`).
    pub fn staging_path(&self) -> PathBuf {
        self.storage_path
            .join(format!("{}.{STAGING_EXTENSION}", self.base_name()))
    }

    /// Path of the converted delivery file implied by `stored_name`.
    pub fn target_path(&self) -> PathBuf {
        self.storage_path.join(&self.stored_name)
    }

    /// Delivery format implied by `stored_name`.
    pub fn output_kind(&self) -> OutputKind {
        OutputKind::from_destination(Path::new(&self.stored_name))
    }

    /// Candidate paths in preference order for the current state.
    fn candidates(&self) -> [PathBuf; 2] {
        if self.ready {
            [self.target_path(), self.staging_path()]
        } else {
            [self.staging_path(), self.target_path()]
        }
    }

    /// The path a reader should open.
    ///
    /// Returns the first candidate that exists. When neither file is present
    /// the staging path is returned and the caller must still check
    /// existence.
    pub fn resolve_playback_path(&self) -> PathBuf {
        self.candidates()
            .into_iter()
            .find(|p| p.exists())
            .unwrap_or_else(|| self.staging_path())
    }

    /// Whether any playable artifact is present on disk.
    pub fn exists(&self) -> bool {
        self.candidates().iter().any(|p| p.exists())
    }
}
