//! Service Layer Error Types
//!
//! Errors surfaced to the host by the pipeline and report services. Every
//! variant is fatal to the run that raised it: no partial output is produced
//! and the host is expected to start again from the original export.

use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline and report errors
#[derive(Error, Debug)]
pub enum CourseError {
    /// Required documents missing, ambiguous or undecodable
    #[error("Course documents unusable: {0}")]
    Store(#[from] StoreError),

    /// Options failed validation
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Options JSON failed to decode
    #[error("Failed to decode options: {0}")]
    OptionsDecode(#[source] serde_json::Error),

    /// Course sheet could not be written
    #[error("Failed to write course sheet: {0}")]
    Report(#[from] csv::Error),

    /// A `.json` file in an export directory is not valid JSON
    #[error("Failed to parse {path}: {source}")]
    DocumentParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Filesystem access failed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CourseError {
    /// Create an invalid options error
    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }

    /// Create an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
