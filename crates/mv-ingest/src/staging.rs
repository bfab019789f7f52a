//! Upload staging.
//!
//! An upload is copied into the media directory under the hex SHA-256 of
//! its content with the staging extension. The delivery name shares that
//! base and takes the container picked from the original filename.

use std::path::{Path, PathBuf};

use mv_core::{OutputKind, Result, STAGING_EXTENSION};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

const HASH_CHUNK: usize = 64 * 1024;

/// Where an upload was placed and where its conversion should write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    pub base_name: String,
    pub kind: OutputKind,
    /// `<media_dir>/<base>.webm`
    pub staging_path: PathBuf,
    /// `<media_dir>/<base>.<mp4|m4a>`
    pub destination: PathBuf,
    /// File name of `destination`.
    pub stored_name: String,
}

impl StagedUpload {
    /// File name of the staging copy.
    pub fn staging_name(&self) -> String {
        format!("{}.{STAGING_EXTENSION}", self.base_name)
    }
}

/// Hex SHA-256 of a file's content.
pub async fn content_hash(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Copy `upload` into `media_dir` as its staging file.
///
/// `original_name` is only used to choose audio vs video.
pub async fn stage_upload(upload: &Path, original_name: &str, media_dir: &Path) -> Result<StagedUpload> {
    let kind = OutputKind::from_upload_name(original_name);
    let base_name = content_hash(upload).await?;

    tokio::fs::create_dir_all(media_dir).await?;

    let staging_path = media_dir.join(format!("{base_name}.{STAGING_EXTENSION}"));
    let stored_name = format!("{base_name}.{}", kind.extension());
    let destination = media_dir.join(&stored_name);

    if upload != staging_path {
        tokio::fs::copy(upload, &staging_path).await?;
    }
    tracing::debug!(
        upload = ?upload,
        staging = ?staging_path,
        "staged {kind} upload"
    );

    Ok(StagedUpload {
        base_name,
        kind,
        staging_path,
        destination,
        stored_name,
    })
}
