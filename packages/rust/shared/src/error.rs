//! Error types for LeadEnrich.
//!
//! Library crates use [`LeadEnrichError`] via `thiserror`.
//! Calls that cross a collaborator seam return [`CollaboratorError`] so the
//! orchestrator can decide per call whether a failure means "skip" or "empty".
//! The CLI wraps both with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all LeadEnrich operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadEnrichError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to a web page or API.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// LLM request or response error.
    #[error("llm error: {0}")]
    Llm(String),

    /// Paid data vendor error (FullEnrich, Kaspr).
    #[error("vendor error: {0}")]
    Vendor(String),

    /// Statistics store error.
    #[error("stats error: {0}")]
    Stats(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad payload, invalid URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadEnrichError>;

impl LeadEnrichError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator failures
// ---------------------------------------------------------------------------

/// Failure of a single call to an external collaborator.
///
/// None of these abort an enrichment run. The orchestrator logs them and
/// continues with an empty result for that source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The collaborator is not configured (missing credentials, disabled).
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within its time budget.
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// HTTP status or transport failure.
    #[error("http error: {0}")]
    Http(String),

    /// The collaborator answered but the payload could not be used.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Anything else that may succeed on a later run.
    #[error("transient failure: {0}")]
    Transient(String),
}

/// Result of a collaborator call.
pub type CollabResult<T> = std::result::Result<T, CollaboratorError>;

impl CollaboratorError {
    /// Whether the failure only means the source is switched off.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<LeadEnrichError> for CollaboratorError {
    fn from(err: LeadEnrichError) -> Self {
        match err {
            LeadEnrichError::Config { message } => Self::Unavailable(message),
            LeadEnrichError::Network(msg) => Self::Http(msg),
            LeadEnrichError::Parse { message } => Self::InvalidResponse(message),
            other => Self::Transient(other.to_string()),
        }
    }
}
