//! Course Pipeline
//!
//! Runs the edit stages over one course export, in a fixed order:
//!
//! 1. Field editors (attribute writes only)
//! 2. Section regrouping, when `section_scope` asks for it
//! 3. Neighbour merge, when requested and the course was regrouped per leaf-container
//! 4. Pruner, after any structural change or when `clean` is set
//!
//! Stages are synchronous and run to completion. Progress is reported between
//! stages through a [`ProgressSink`]; the host decides how to show it.
//!
//! # Examples
//!
//! ```rust
//! use coursepack_core::config::EditOptions;
//! use coursepack_core::services::CoursePipeline;
//! use coursepack_core::store::{CourseDocument, CourseDocuments};
//! use serde_json::json;
//!
//! let mut documents = CourseDocuments::new(vec![
//!     CourseDocument::new("activities.json", json!([
//!         {"id": 1, "type": "SECTION"},
//!         {"id": 2, "parent_id": 1, "type": "INVISIBLE_CONTAINER", "detached": true}
//!     ])),
//!     CourseDocument::new("elements.json", json!([])),
//! ]);
//!
//! let options = EditOptions { clean: true, ..Default::default() };
//! let report = CoursePipeline::new(options).unwrap().run(&mut documents).unwrap();
//!
//! assert_eq!(report.prune.unwrap().total(), 2);
//! ```

use crate::config::{EditOptions, SectionScope};
use crate::operations::{
    apply_field_edits, merge_neighbours, prune, regroup_sections, EditContext, FieldEditReport,
    MergeRules, MergeStats, PruneStats, RegroupStats,
};
use crate::services::CourseError;
use crate::store::{CourseDocuments, NodeStore};
use chrono::{DateTime, Utc};

/// Pipeline stages in the order a host reports them.
///
/// Stages before [`PipelineStage::ExtractingData`] and after
/// [`PipelineStage::AssemblingFiles`] belong to the host (reading and writing
/// the export); the pipeline reports the ones in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Starting,
    GettingOptions,
    LoadingFile,
    ExpandingFile,
    ExtractingData,
    ParsingJson,
    ProcessingSections,
    CleaningCourse,
    AssemblingFiles,
    WritingFile,
    Done,
}

impl PipelineStage {
    /// Completion percentage shown when the stage starts
    pub fn percent(&self) -> u8 {
        match self {
            Self::Starting => 0,
            Self::GettingOptions => 5,
            Self::LoadingFile => 10,
            Self::ExpandingFile => 20,
            Self::ExtractingData => 30,
            Self::ParsingJson => 55,
            Self::ProcessingSections => 60,
            Self::CleaningCourse => 65,
            Self::AssemblingFiles => 70,
            Self::WritingFile => 75,
            Self::Done => 100,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Starting => "Starting",
            Self::GettingOptions => "Getting options",
            Self::LoadingFile => "Loading file",
            Self::ExpandingFile => "Expanding file",
            Self::ExtractingData => "Extracting data",
            Self::ParsingJson => "Parsing JSON",
            Self::ProcessingSections => "Processing sections",
            Self::CleaningCourse => "Cleaning course",
            Self::AssemblingFiles => "Assembling files",
            Self::WritingFile => "Writing file",
            Self::Done => "Done",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Receives stage changes between pipeline steps
pub trait ProgressSink {
    fn stage(&mut self, stage: PipelineStage);
}

/// Default sink: one `info` line per stage
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn stage(&mut self, stage: PipelineStage) {
        tracing::info!("[{:>3}%] {}", stage.percent(), stage);
    }
}

/// What each stage of one run did; `None` for stages that did not run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub field_edits: FieldEditReport,
    pub regroup: Option<RegroupStats>,
    pub merge: Option<MergeStats>,
    pub prune: Option<PruneStats>,
}

/// Applies one set of [`EditOptions`] to course exports
#[derive(Debug, Clone)]
pub struct CoursePipeline {
    options: EditOptions,
    now: Option<DateTime<Utc>>,
}

impl CoursePipeline {
    /// Create a pipeline, rejecting invalid options
    pub fn new(options: EditOptions) -> Result<Self, CourseError> {
        options.validate().map_err(CourseError::invalid_options)?;
        Ok(Self { options, now: None })
    }

    /// Stamp every change with `now` instead of the time the run starts
    pub fn with_timestamp(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn options(&self) -> &EditOptions {
        &self.options
    }

    /// Run every requested stage, logging progress through `tracing`
    pub fn run(&self, documents: &mut CourseDocuments) -> Result<PipelineReport, CourseError> {
        self.run_with_progress(documents, &mut TracingProgress)
    }

    /// Run every requested stage, reporting progress to `progress`.
    ///
    /// Documents are only written back once every stage has succeeded.
    pub fn run_with_progress(
        &self,
        documents: &mut CourseDocuments,
        progress: &mut dyn ProgressSink,
    ) -> Result<PipelineReport, CourseError> {
        progress.stage(PipelineStage::ExtractingData);
        let mut store = documents.load_store()?;
        let mut report = PipelineReport::default();

        progress.stage(PipelineStage::ProcessingSections);
        report.field_edits = apply_field_edits(&mut store, &self.options);

        let mut ctx = EditContext::for_store(&store, self.now.unwrap_or_else(Utc::now));
        let structural = self.restructure(&mut store, &mut ctx, &mut report);

        if structural || self.options.clean {
            progress.stage(PipelineStage::CleaningCourse);
            report.prune = Some(prune(&mut store));
        }

        progress.stage(PipelineStage::AssemblingFiles);
        documents.write_store(store)?;

        Ok(report)
    }

    /// Regroup and merge; returns whether the tree changed shape
    fn restructure(
        &self,
        store: &mut NodeStore,
        ctx: &mut EditContext,
        report: &mut PipelineReport,
    ) -> bool {
        let options = &self.options;
        if options.regroups() {
            report.regroup = Some(regroup_sections(store, ctx, options.section_scope));
        }

        if options.merges() {
            if options.section_scope == SectionScope::SectionPerTe {
                let rules = MergeRules {
                    intro: options.video_intro,
                    credits: options.video_credits,
                };
                report.merge = Some(merge_neighbours(store, ctx, rules));
            } else {
                tracing::warn!(
                    "Skipping video intro/credits merge: requires section_scope=section_per_te (got {})",
                    options.section_scope
                );
            }
        }

        report.regroup.is_some() || report.merge.is_some()
    }
}

/// Prune a course without any other edit
pub fn clean_course(documents: &mut CourseDocuments) -> Result<PruneStats, CourseError> {
    let mut store = documents.load_store()?;
    let stats = prune(&mut store);
    documents.write_store(store)?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LockMode, RequirementMode};
    use crate::store::CourseDocument;
    use crate::store::StoreError;
    use serde_json::{json, Value};

    fn documents() -> CourseDocuments {
        CourseDocuments::new(vec![
            CourseDocument::new(
                "course/activities.json",
                json!([
                    {"id": 1, "type": "LONG_HLXP_SCHEMA/PAGE", "repository_id": "r1"},
                    {"id": 2, "parent_id": 1, "type": "SECTION_CONTAINER"},
                    {"id": 3, "parent_id": 2, "type": "SECTION", "data": {"title": "S"}},
                    {"id": 4, "parent_id": 3, "type": "INVISIBLE_CONTAINER", "position": 1},
                    {"id": 5, "parent_id": 3, "type": "INVISIBLE_CONTAINER", "position": 2}
                ]),
            ),
            CourseDocument::new(
                "course/elements.json",
                json!([
                    {"id": 10, "activity_id": 4, "type": "HTML"},
                    {"id": 11, "activity_id": 5, "type": "HTML"}
                ]),
            ),
            CourseDocument::new("course/manifest.json", json!({"version": 3})),
        ])
    }

    #[derive(Default)]
    struct RecordingProgress(Vec<PipelineStage>);

    impl ProgressSink for RecordingProgress {
        fn stage(&mut self, stage: PipelineStage) {
            self.0.push(stage);
        }
    }

    fn activities(documents: &CourseDocuments) -> Vec<Value> {
        documents
            .find("activities")
            .and_then(|doc| doc.data.as_array())
            .cloned()
            .unwrap_or_default()
    }

    #[test]
    fn test_stage_percentages_increase() {
        let stages = [
            PipelineStage::Starting,
            PipelineStage::GettingOptions,
            PipelineStage::LoadingFile,
            PipelineStage::ExpandingFile,
            PipelineStage::ExtractingData,
            PipelineStage::ParsingJson,
            PipelineStage::ProcessingSections,
            PipelineStage::CleaningCourse,
            PipelineStage::AssemblingFiles,
            PipelineStage::WritingFile,
            PipelineStage::Done,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].percent() < pair[1].percent());
        }
        assert_eq!(PipelineStage::Done.to_string(), "Done");
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = EditOptions {
            pass_percent: 150,
            ..Default::default()
        };
        assert!(matches!(
            CoursePipeline::new(options),
            Err(CourseError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_default_options_change_nothing() {
        let mut docs = documents();
        let before = docs.clone();

        let report = CoursePipeline::new(EditOptions::default())
            .unwrap()
            .run(&mut docs)
            .unwrap();

        assert_eq!(report, PipelineReport::default());
        assert_eq!(docs, before);
    }

    #[test]
    fn test_default_options_keep_wire_spelling() {
        let mut docs = CourseDocuments::new(vec![
            CourseDocument::new(
                "activities.json",
                json!([
                    {"id": 1, "type": "LONG_HLXP_SCHEMA/PAGE", "position": 1},
                    {"id": 2, "parent_id": 1, "type": "SECTION_CONTAINER", "position": 1.7},
                    {"id": 9, "parent_id": 1, "type": "SECTION_CONTAINER", "position": 1.2},
                    {"id": 10, "parent_id": null, "type": "LONG_HLXP_SCHEMA/FOLDER",
                     "position": "3", "deleted_at": null, "uid": "f-10"}
                ]),
            ),
            CourseDocument::new(
                "elements.json",
                json!([
                    {"id": 20, "activity_id": 2, "type": "HTML", "meta": null},
                    {"id": 21, "activity_id": 9, "type": "HTML", "position": 0.5,
                     "detached": false, "refs": {}}
                ]),
            ),
        ]);
        let before = docs.clone();

        CoursePipeline::new(EditOptions::default())
            .unwrap()
            .run(&mut docs)
            .unwrap();

        assert_eq!(docs, before);
        assert_eq!(docs.load_store().unwrap().live_child_ids(1), vec![9, 2]);
    }

    #[test]
    fn test_regroup_then_prune() {
        let mut docs = documents();
        let options = EditOptions {
            section_scope: SectionScope::SectionPerTe,
            lock_unlock: LockMode::Lock,
            required_optional: RequirementMode::Require,
            ..Default::default()
        };

        let report = CoursePipeline::new(options)
            .unwrap()
            .run(&mut docs)
            .unwrap();

        assert_eq!(report.field_edits.sections, 1);
        assert_eq!(report.regroup.unwrap().sections_created, 2);
        assert_eq!(report.prune.unwrap().detached_containers, 2);

        let activities = activities(&docs);
        // Page, new section container, two new sections, two leaves
        assert_eq!(activities.len(), 6);
        assert!(activities.iter().all(|a| a["id"] != 2 && a["id"] != 3));
        let sections: Vec<&Value> = activities
            .iter()
            .filter(|a| a["type"] == "SECTION")
            .collect();
        assert!(sections.iter().all(|s| s["data"]["locked"] == true));
        assert!(sections.iter().all(|s| s["repository_id"] == "r1"));
    }

    #[test]
    fn test_merge_skipped_without_per_te_regroup() {
        let mut docs = documents();
        let options = EditOptions {
            section_scope: SectionScope::SectionPerPage,
            video_intro: true,
            ..Default::default()
        };

        let report = CoursePipeline::new(options)
            .unwrap()
            .run(&mut docs)
            .unwrap();

        assert!(report.regroup.is_some());
        assert_eq!(report.merge, None);
    }

    #[test]
    fn test_progress_reported_in_order() {
        let mut docs = documents();
        let mut progress = RecordingProgress::default();
        let options = EditOptions {
            clean: true,
            ..Default::default()
        };

        CoursePipeline::new(options)
            .unwrap()
            .run_with_progress(&mut docs, &mut progress)
            .unwrap();

        assert_eq!(
            progress.0,
            vec![
                PipelineStage::ExtractingData,
                PipelineStage::ProcessingSections,
                PipelineStage::CleaningCourse,
                PipelineStage::AssemblingFiles,
            ]
        );
    }

    #[test]
    fn test_missing_elements_is_fatal_and_leaves_documents_alone() {
        let mut docs = CourseDocuments::new(vec![CourseDocument::new(
            "activities.json",
            json!([{"id": 1, "type": "SECTION", "detached": true}]),
        )]);

        let err = clean_course(&mut docs).unwrap_err();

        assert!(matches!(
            err,
            CourseError::Store(StoreError::MissingDocument { .. })
        ));
        assert_eq!(activities(&docs).len(), 1);
    }

    #[test]
    fn test_clean_course() {
        let mut docs = documents();
        let stats = clean_course(&mut docs).unwrap();
        assert_eq!(stats.total(), 0);
        assert_eq!(activities(&docs).len(), 5);
    }
}
