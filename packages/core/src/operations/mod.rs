//! Course Tree Operations
//!
//! The structural and field-level edits applied by the pipeline:
//!
//! - [`field_editors`] - Bulk attribute writes (section flags, video scrubbing, question sets)
//! - [`regroup`] - Rebuild each page's section layer to a canonical shape
//! - [`merge`] - Fold intro/credits neighbours into single-video sections
//! - [`prune`] - Compact the store after structural edits
//!
//! Structural operations share an [`EditContext`] per run so new identifiers
//! stay unique across pages and every change carries the same timestamp.

pub mod context;
pub mod field_editors;
pub mod merge;
pub mod prune;
pub mod regroup;

pub use context::{EditContext, IdAllocator, NEW_CONTAINER_ID_START};
pub use field_editors::{apply_field_edits, FieldEditReport};
pub use merge::{merge_neighbours, MergeRules, MergeStats};
pub use prune::{prune, PruneStats};
pub use regroup::{regroup_sections, RegroupStats};
