//! Error types for Placebook.
//!
//! Library crates use [`PlacebookError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Fatal variants (`Source`, `Extraction`, `Persistence`) abort a pipeline
//! run. `Enrichment` and `TagSynthesis` are per-place: the orchestrator
//! records them on the affected place and continues.

use std::path::PathBuf;

/// Top-level error type for all Placebook operations.
#[derive(Debug, thiserror::Error)]
pub enum PlacebookError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Source document could not be fetched. Fatal.
    #[error("source error: {0}")]
    Source(String),

    /// Model output was malformed or empty. Fatal.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Places lookup failed for one place. Non-fatal, recorded per place.
    #[error("enrichment error: {0}")]
    Enrichment(String),

    /// Tag synthesis failed for one place. Non-fatal, falls back to taxonomy.
    #[error("tag synthesis error: {0}")]
    TagSynthesis(String),

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Catalog store write failed. Fatal.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Network/HTTP error outside a more specific phase.
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PlacebookError>;

impl PlacebookError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    /// True for errors that abort a pipeline run rather than a single place.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Source(_) | Self::Extraction(_) | Self::Persistence(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PlacebookError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = PlacebookError::Extraction("no places found".into());
        assert!(err.to_string().contains("no places found"));
    }

    #[test]
    fn fatality_classification() {
        assert!(PlacebookError::Source("doc gone".into()).is_fatal());
        assert!(PlacebookError::Persistence("write failed".into()).is_fatal());
        assert!(!PlacebookError::Enrichment("no results".into()).is_fatal());
        assert!(!PlacebookError::TagSynthesis("bad json".into()).is_fatal());
    }
}
