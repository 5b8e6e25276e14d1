use std::path::PathBuf;

use thiserror::Error;

/// Why a single strategy failed to produce a timestamp.
///
/// Every variant except `FilesystemUnavailable` means "try the next strategy";
/// none of them escape a `resolve_*` call.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no usable metadata: {0}")]
    MetadataUnavailable(String),

    #[error("malformed metadata: {0}")]
    MetadataMalformed(String),

    #[error("date {value:?} is the 1970 epoch sentinel")]
    SentinelEpoch { value: String },

    #[error("{tool} not available at {}: {reason}", .path.display())]
    ToolUnavailable {
        tool: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: &'static str, reason: String },

    #[error("cannot read modification time: {0}")]
    FilesystemUnavailable(#[from] std::io::Error),
}

impl ResolveError {
    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        Self::MetadataUnavailable(reason.into())
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MetadataMalformed(detail.into())
    }

    /// Absent metadata is routine and gets logged quietly; everything else is a warning.
    pub fn is_routine(&self) -> bool {
        matches!(self, Self::MetadataUnavailable(_))
    }
}

/// Construction-time failures. Unlike [`ResolveError`] these surface to the caller.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),
}
