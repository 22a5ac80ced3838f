//! Coursepack Core Restructuring Engine
//!
//! This crate edits exported e-learning course packages: it reads the flat
//! container and content-item collections of an export, treats them as an
//! implicit ordered tree, reshapes that tree and writes it back.
//!
//! # Architecture
//!
//! - **Flat storage, implicit tree**: nodes link to parents by id; the store indexes them once per run
//! - **Soft-delete then prune**: edits detach nodes, a final compaction pass removes them
//! - **Lossless round-trip**: fields the engine never reads are written back unchanged
//!
//! # Modules
//!
//! - [`models`] - Containers, content items and payload helpers
//! - [`store`] - Named export documents and the indexed node store
//! - [`traversal`] - Reading-order walk over the course tree
//! - [`operations`] - Field editors, regrouping, neighbour merge, pruning
//! - [`services`] - Pipeline orchestration and the course sheet report
//! - [`config`] - Edit options

pub mod config;
pub mod models;
pub mod operations;
pub mod services;
pub mod store;
pub mod traversal;

// Re-export commonly used types
pub use config::EditOptions;
pub use models::*;
pub use services::*;
pub use store::{CourseDocument, CourseDocuments, NodeStore, StoreError};
