//! Course Services
//!
//! Host-facing entry points built on the operations layer:
//!
//! - `CoursePipeline` - Runs field edits, regrouping, merging and pruning over an export
//! - `course_sheet` - Read-only CSV inventory of a course in reading order
//! - `ExportDir` - Load and save an unpacked export directory
//!
//! Services own the error type hosts see ([`CourseError`]) and translate
//! option and document problems into it.

pub mod course_sheet;
pub mod error;
pub mod export_dir;
pub mod pipeline;

pub use course_sheet::{course_name, course_sheet_csv, course_sheet_rows, CourseSheetRow};
pub use error::CourseError;
pub use export_dir::ExportDir;
pub use pipeline::{
    clean_course, CoursePipeline, PipelineReport, PipelineStage, ProgressSink, TracingProgress,
};
