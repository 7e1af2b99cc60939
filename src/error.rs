//! Error types for Mixmeter.
//!
//! Every engine failure is typed and returned to the immediate caller; the
//! tool layer (CLI or embedding agent) decides how to present it. There are
//! no internal retries and no silent fallbacks to default values.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Mixmeter operations.
pub type Result<T> = std::result::Result<T, MixmeterError>;

/// Errors that can occur in the evaluation engine and its stores.
#[derive(Error, Debug)]
pub enum MixmeterError {
    // Lookup Errors
    #[error("Style profile not found: {name}")]
    StyleNotFound { name: String },

    #[error("Snapshot not found: {name}")]
    SnapshotNotFound { name: String },

    // Style Store Errors
    #[error("A user style named '{name}' already exists")]
    StyleConflict { name: String },

    #[error("'{name}' is a built-in style and cannot be deleted")]
    BuiltinProtected { name: String },

    #[error("Invalid style profile '{name}': {reason}")]
    InvalidProfile { name: String, reason: String },

    // Feature Vector Errors
    #[error("Feature vector is missing metric '{metric}' referenced by the profile")]
    MissingMetric { metric: String },

    #[error("Invalid feature vector: {reason}")]
    InvalidFeatures { reason: String },

    // File Errors
    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {path}: {source}")]
    DirectoryCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Serialization Errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MixmeterError {
    /// Stable error code for the tool layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            MixmeterError::StyleNotFound { .. } => "NOT_FOUND",
            MixmeterError::SnapshotNotFound { .. } => "NOT_FOUND",
            MixmeterError::StyleConflict { .. } => "CONFLICT",
            MixmeterError::BuiltinProtected { .. } => "FORBIDDEN",
            MixmeterError::InvalidProfile { .. } => "INVALID_PROFILE",
            MixmeterError::MissingMetric { .. } => "MISSING_METRIC",
            MixmeterError::InvalidFeatures { .. } => "INVALID_FEATURES",
            MixmeterError::FileReadError { .. } => "FILE_READ_ERROR",
            MixmeterError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            MixmeterError::DirectoryCreateError { .. } => "DIRECTORY_CREATE_ERROR",
            MixmeterError::Json(_) => "SERIALIZATION_ERROR",
            MixmeterError::Io(_) => "IO_ERROR",
        }
    }

    /// Returns a user-facing recovery suggestion where one applies.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            MixmeterError::StyleNotFound { .. } => {
                Some("Run 'mixmeter styles list' to see available profiles.")
            }
            MixmeterError::SnapshotNotFound { .. } => {
                Some("Run 'mixmeter snapshot list' to see saved snapshots.")
            }
            MixmeterError::StyleConflict { .. } => {
                Some("Pick another name, or update the existing style instead.")
            }
            MixmeterError::BuiltinProtected { .. } => {
                Some("Create a user style with the same name to override it instead.")
            }
            MixmeterError::MissingMetric { .. } => {
                Some("Re-run the analyzer, or remove the metric from the profile.")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = MixmeterError::StyleNotFound {
            name: "vapor".to_string(),
        };
        assert_eq!(err.error_code(), "NOT_FOUND");

        let err = MixmeterError::BuiltinProtected {
            name: "ambient".to_string(),
        };
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = MixmeterError::StyleConflict {
            name: "my-style".to_string(),
        };
        assert!(err.recovery_suggestion().is_some());
    }
}
