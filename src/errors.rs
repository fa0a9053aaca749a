//! Error types for the mkdown application.
//!
//! This module defines custom error types that categorize the failures that
//! can occur while keeping the note index and the content files in step.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for the mkdown application.
#[derive(Error, Debug)]
pub enum MkError {
    /// The uuid is not present in the index. Callers should refresh their view.
    #[error("Note not found: {uuid}")]
    NotFound { uuid: String },

    /// The index has a record but its content file is gone (an orphaned entry).
    #[error("Content file for note {uuid} is missing: {path}")]
    ContentMissing { uuid: String, path: PathBuf },

    /// The index file is missing, unparsable or fails validation.
    #[error("Corrupt index {path}: {message}")]
    CorruptIndex { path: PathBuf, message: String },

    /// Writing the index or a content file failed.
    #[error("Failed to persist {path}: {source}")]
    PersistError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A settings value was rejected before being persisted.
    #[error("Invalid setting: {message}")]
    InvalidSetting { message: String },

    /// Two records would share the same content file.
    #[error("Content file already in use: {file}")]
    FileConflict { file: String },

    /// An index already exists where a new one was requested.
    #[error("Index already exists: {path}")]
    IndexExists { path: PathBuf },

    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// for mutex lock acquisition issues
    #[error("{message}")]
    LockAcquisitionFailed { message: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("{message}")]
    EditorError { message: String },
}

impl MkError {
    /// Whether the caller can recover by refreshing or repairing its view.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MkError::NotFound { .. } | MkError::ContentMissing { .. } | MkError::InvalidSetting { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_reference_errors_are_recoverable() {
        let not_found = MkError::NotFound {
            uuid: "abc".to_string(),
        };
        let missing = MkError::ContentMissing {
            uuid: "abc".to_string(),
            path: PathBuf::from("/tmp/x/a.txt"),
        };
        assert!(not_found.is_recoverable());
        assert!(missing.is_recoverable());
        assert!(missing.to_string().contains("/tmp/x/a.txt"));
    }

    #[test]
    fn corrupt_index_is_fatal() {
        let err = MkError::CorruptIndex {
            path: PathBuf::from("settings.json"),
            message: "expected value".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(err.to_string().starts_with("Corrupt index"));
    }
}
