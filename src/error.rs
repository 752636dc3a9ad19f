//! Error taxonomy for the lead pipeline.
//!
//! Fallible functions return [`anyhow::Result`]; the variants below are the
//! concrete causes callers can `downcast_ref` to when they need to tell a
//! transport failure from a bad file or a misconfigured join.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network, timeout or HTTP status failure for a single attempt.
    #[error("transport error fetching {url}: {message}")]
    Transport { url: String, message: String },

    #[error("download of {url} failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Malformed CSV, unreadable encoding, bad archive.
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("join column '{column}' missing from {side} table")]
    Join { column: String, side: &'static str },

    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("field layout required for fixed-width file {0}")]
    MissingLayout(String),

    #[error("unsupported format '{0}'")]
    UnsupportedFormat(String),

    #[error("{0} must be set")]
    MissingCredential(&'static str),
}

impl PipelineError {
    pub fn parse(path: impl Into<String>, message: impl ToString) -> Self {
        PipelineError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// `true` for failures worth retrying (network / HTTP).
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::Transport { .. })
    }
}
