//! Node Store Layer
//!
//! This module holds the in-memory representation of a course export:
//!
//! - [`CourseDocuments`] - the named JSON documents exchanged with the host
//! - [`NodeStore`] - containers and content items with id/parent indexes
//!
//! The store is loaded once per pipeline run, mutated in place by every stage,
//! and written back into the same documents at the end.

pub mod documents;
mod error;
mod node_store;

pub use documents::{CourseDocument, CourseDocuments};
pub use error::StoreError;
pub use node_store::NodeStore;
