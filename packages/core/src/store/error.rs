//! Store Error Types
//!
//! Errors raised while locating, decoding and re-encoding the named documents
//! of a course export. All of them are fatal to a pipeline run.

use thiserror::Error;

/// Document-level failures of the node store
#[derive(Error, Debug)]
pub enum StoreError {
    /// No document name contains the required pattern
    #[error("No document matching '{pattern}' found in course export")]
    MissingDocument { pattern: String },

    /// More than one document name contains the required pattern
    #[error("Expected exactly one document matching '{pattern}', found {count}")]
    AmbiguousDocument { pattern: String, count: usize },

    /// A required document did not decode into the expected node array
    #[error("Document '{name}' is not a valid node array: {source}")]
    InvalidDocument {
        name: String,
        source: serde_json::Error,
    },

    /// Edited nodes could not be encoded back to JSON
    #[error("Failed to encode document '{name}': {source}")]
    EncodingFailed {
        name: String,
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Create a missing document error
    pub fn missing_document(pattern: impl Into<String>) -> Self {
        Self::MissingDocument {
            pattern: pattern.into(),
        }
    }

    /// Create an ambiguous document error
    pub fn ambiguous_document(pattern: impl Into<String>, count: usize) -> Self {
        Self::AmbiguousDocument {
            pattern: pattern.into(),
            count,
        }
    }
}
