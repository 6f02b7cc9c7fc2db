//! Error types for collegecms.
//!
//! Library crates use [`CollegeCmsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all collegecms operations.
///
/// Normalizers never produce one of these; only configuration, source-feed
/// and store I/O can fail.
#[derive(Debug, thiserror::Error)]
pub enum CollegeCmsError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Source document could not be decoded (bad JSON in a feed file, etc.).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unknown content section, bad field path, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A record looked up by id does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CollegeCmsError>;

impl CollegeCmsError {
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

    /// Create a storage error from any displayable value.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// Create a not-found error for the given identifier.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CollegeCmsError::config("workers must be at least 1");
        assert_eq!(err.to_string(), "config error: workers must be at least 1");

        let err = CollegeCmsError::validation("unknown content section 'hostel'");
        assert!(err.to_string().contains("hostel"));

        let err = CollegeCmsError::storage("database is locked");
        assert_eq!(err.to_string(), "storage error: database is locked");

        let err = CollegeCmsError::not_found("institution 42");
        assert_eq!(err.to_string(), "not found: institution 42");
    }
}
