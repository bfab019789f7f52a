//! # mv-av
//!
//! External tool orchestration for the mediavault conversion pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder that captures
//!   output and kills the child when its timeout expires.
//! - **Transcoding** ([`Transcoder`], [`FfmpegTranscoder`]) -- the two ffmpeg
//!   argument templates (H.264/MP4 and AAC/M4A).
//! - **Probing** ([`Prober`], [`FfprobeProber`], [`probe_metadata`]) -- the
//!   three-tier duration fallback and file size measurement.

pub mod command;
pub mod probe;
pub mod tools;
pub mod transcode;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use probe::{probe_metadata, FfprobeProber, ProbeStrategy, Prober};
pub use tools::{ToolInfo, ToolRegistry};
pub use transcode::{build_transcode_args, FfmpegTranscoder, Transcoder};
