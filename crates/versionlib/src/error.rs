use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Version table not found at {}: {source}", path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported table format: expected {expected}, got {found}")]
    FormatMismatch { expected: i32, found: i32 },

    #[error("Malformed {field} length: {value}")]
    MalformedLength { field: &'static str, value: i64 },

    #[error("Corrupt record #{index}: invalid {side} mode nibble {nibble:#x}")]
    CorruptRecord {
        index: usize,
        side: &'static str,
        nibble: u8,
    },

    #[error("Truncated stream at {position}: needed {needed} bytes, {remaining} remaining")]
    TruncatedStream {
        position: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("Unsupported pointer size: {0}")]
    UnsupportedPointerSize(i32),

    #[error("Could not determine the running executable's version")]
    VersionUnavailable,

    #[error("Invalid version string: {0}")]
    InvalidVersion(String),

    #[error("Invalid dump line {line}: {content:?}")]
    InvalidDumpLine { line: usize, content: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::FileNotFound { .. } => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Check if this error came from the table contents rather than the filesystem
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Error::FormatMismatch { .. }
                | Error::MalformedLength { .. }
                | Error::CorruptRecord { .. }
                | Error::TruncatedStream { .. }
                | Error::UnsupportedPointerSize(_)
        )
    }
}
