//! Unified error type for mediavault.
//!
//! All library crates funnel their failures into [`Error`]. The conversion
//! pipeline distinguishes a tool that exited badly ([`Error::Tool`]) from one
//! that was killed for running too long ([`Error::Timeout`]), so both carry
//! the tool name.

use std::fmt;
use std::time::Duration;

/// Unified error type covering all failure modes in mediavault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "file", "order").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Input data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffprobe) could not be spawned or exited
    /// with a non-zero status.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An external tool exceeded its wall-clock budget and was killed.
    #[error("Tool timeout [{tool}]: killed after {timeout:?}")]
    Timeout {
        /// Name of the tool that was killed.
        tool: String,
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// Media probing produced no usable value.
    #[error("Probe error: {0}")]
    Probe(String),

    /// Work was submitted to a worker pool that has been stopped.
    #[error("Worker pool is stopped")]
    PoolClosed,

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a subprocess timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("file", "abc-123");
        assert_eq!(err.to_string(), "file not found: abc-123");
    }

    #[test]
    fn database_display() {
        let err = Error::database("connection refused");
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exit code 1");
        assert!(!err.is_timeout());
    }

    #[test]
    fn timeout_display() {
        let err = Error::Timeout {
            tool: "ffmpeg".into(),
            timeout: Duration::from_secs(300),
        };
        assert_eq!(err.to_string(), "Tool timeout [ffmpeg]: killed after 300s");
        assert!(err.is_timeout());
    }

    #[test]
    fn pool_closed_display() {
        assert_eq!(Error::PoolClosed.to_string(), "Worker pool is stopped");
    }
}
