//! Error types shared across cutsync crates.

use std::path::PathBuf;

/// Top-level error type for cutsync operations.
#[derive(Debug, thiserror::Error)]
pub enum CutsyncError {
    /// Malformed run configuration. Fatal to the whole run.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// More than one tracking entity matched a filter that must be unique.
    #[error("Ambiguous {entity_type}: {count} entities named '{name}' found")]
    AmbiguousEntity {
        entity_type: String,
        name: String,
        count: usize,
    },

    /// Missing or invalid input, reported to the caller and never retried.
    #[error("Precondition violated: {message}")]
    Precondition { message: String },

    #[error("Timeline error: {message}")]
    Timeline { message: String },

    #[error("Tracking service error: {message}")]
    Tracking { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CutsyncError.
pub type CutsyncResult<T> = Result<T, CutsyncError>;

impl CutsyncError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn ambiguous(entity_type: impl Into<String>, name: impl Into<String>, count: usize) -> Self {
        Self::AmbiguousEntity {
            entity_type: entity_type.into(),
            name: name.into(),
            count,
        }
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition {
            message: msg.into(),
        }
    }

    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::Timeline {
            message: msg.into(),
        }
    }

    pub fn tracking(msg: impl Into<String>) -> Self {
        Self::Tracking {
            message: msg.into(),
        }
    }

    /// Whether this error must abort the whole export run rather than a
    /// single item.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Io(_) | Self::Json(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_message_names_entity() {
        let err = CutsyncError::ambiguous("Shot", "sh010", 2);
        assert_eq!(
            err.to_string(),
            "Ambiguous Shot: 2 entities named 'sh010' found"
        );
        assert!(!err.is_fatal_to_run());
    }

    #[test]
    fn test_config_errors_abort_run() {
        let err = CutsyncError::config("unknown token {shto}");
        assert!(err.is_fatal_to_run());
        assert!(err.to_string().contains("{shto}"));
    }
}
