//! Field Editors
//!
//! Bulk, declarative attribute writes. None of these touch structure: they only
//! overwrite fields inside `data` payloads, replacing any value already there.
//!
//! - Section access: `data.locked`, `data.completionRequired`
//! - Video scrubbing: `data.disableScrubbing`, `data.completionPercentage`
//! - Question sets: `data.displayCorrectAnswers`, `data.displayQuestions`,
//!   `data.numberOfAttempts`, `data.minimumPassingPercentage`

use crate::config::{
    EditOptions, LockMode, QuestionDisplay, RequirementMode, ScrubbingMode, ShowAnswers,
};
use crate::models::{ContainerKind, ContentKind};
use crate::store::NodeStore;
use serde_json::{json, Value};

/// Completion threshold for videos that cannot be skipped (leaves room for a
/// short closing bumper)
pub const LOCKED_VIDEO_COMPLETION_PERCENTAGE: i64 = 95;

/// Counts of nodes touched by each editor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldEditReport {
    pub sections: usize,
    pub videos: usize,
    pub question_sets: usize,
}

/// Run every field editor the options ask for
pub fn apply_field_edits(store: &mut NodeStore, options: &EditOptions) -> FieldEditReport {
    let report = FieldEditReport {
        sections: apply_section_access(store, options.lock_unlock, options.required_optional),
        videos: apply_video_scrubbing(store, options.effective_scrubbing()),
        question_sets: apply_question_set_settings(store, options),
    };

    tracing::info!(
        "Field edits applied: {} sections, {} videos, {} question sets",
        report.sections,
        report.videos,
        report.question_sets
    );
    report
}

/// Set lock and completion-required flags on every non-detached section
pub fn apply_section_access(
    store: &mut NodeStore,
    lock: LockMode,
    requirement: RequirementMode,
) -> usize {
    let locked = match lock {
        LockMode::Lock => Some(true),
        LockMode::Unlock => Some(false),
        LockMode::NoChange => None,
    };
    let required = match requirement {
        RequirementMode::Require => Some(true),
        RequirementMode::Optional => Some(false),
        RequirementMode::NoChange => None,
    };
    if locked.is_none() && required.is_none() {
        return 0;
    }

    let mut touched = 0;
    for section in store
        .containers_mut()
        .filter(|c| !c.detached && c.kind() == ContainerKind::Section)
    {
        let data = section.data_mut();
        if let Some(locked) = locked {
            data.insert("locked".to_string(), Value::Bool(locked));
        }
        if let Some(required) = required {
            data.insert("completionRequired".to_string(), Value::Bool(required));
        }
        touched += 1;
    }
    touched
}

/// Allow or forbid skipping ahead in every non-detached video
pub fn apply_video_scrubbing(store: &mut NodeStore, mode: ScrubbingMode) -> usize {
    let disable = match mode {
        ScrubbingMode::Disable => true,
        ScrubbingMode::Enable => false,
        ScrubbingMode::NoChange => return 0,
    };

    let mut touched = 0;
    for video in store
        .items_mut()
        .filter(|i| !i.detached && i.kind() == ContentKind::Video)
    {
        let data = video.data_mut();
        data.insert("disableScrubbing".to_string(), Value::Bool(disable));
        if disable {
            data.insert(
                "completionPercentage".to_string(),
                json!(LOCKED_VIDEO_COMPLETION_PERCENTAGE),
            );
        }
        touched += 1;
    }
    touched
}

/// Apply assessment display settings to every active question set
pub fn apply_question_set_settings(store: &mut NodeStore, options: &EditOptions) -> usize {
    let display_answers = match options.show_answers {
        ShowAnswers::ShowWhenSubmitted => Some("onSubmit"),
        ShowAnswers::ShowAfterAttempts => Some("onAllowExhaust"),
        ShowAnswers::ShowNever => Some("never"),
        ShowAnswers::NoChange => None,
    };
    let display_questions = match options.qset_display {
        QuestionDisplay::DisplayOne => Some("one"),
        QuestionDisplay::DisplayAll => Some("all"),
        QuestionDisplay::NoChange => None,
    };
    let attempts = (options.num_attempts > 0).then_some(options.num_attempts);
    let pass_percent = (options.pass_percent > 0).then_some(options.pass_percent);

    if display_answers.is_none()
        && display_questions.is_none()
        && attempts.is_none()
        && pass_percent.is_none()
    {
        return 0;
    }

    let mut touched = 0;
    for qset in store.containers_mut().filter(|c| {
        !c.detached && c.deleted_at.is_none() && c.kind() == ContainerKind::QuestionSet
    }) {
        let data = qset.data_mut();
        if let Some(value) = display_answers {
            data.insert("displayCorrectAnswers".to_string(), json!(value));
        }
        if let Some(value) = display_questions {
            data.insert("displayQuestions".to_string(), json!(value));
        }
        if let Some(value) = attempts {
            data.insert("numberOfAttempts".to_string(), json!(value));
        }
        if let Some(value) = pass_percent {
            data.insert("minimumPassingPercentage".to_string(), json!(value));
        }
        touched += 1;
    }
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Container, ContentItem};

    fn store() -> NodeStore {
        let containers: Vec<Container> = serde_json::from_value(json!([
            {"id": 1, "type": "LONG_HLXP_SCHEMA/PAGE", "data": {"title": "P"}},
            {"id": 2, "parent_id": 1, "type": "SECTION_CONTAINER"},
            {"id": 3, "parent_id": 2, "type": "SECTION", "data": {"title": "S", "locked": false}},
            {"id": 4, "parent_id": 2, "type": "SECTION", "detached": true, "data": {}},
            {"id": 5, "parent_id": 3, "type": "CEK_QUESTION_SET", "data": {"numberOfAttempts": 1}},
            {"id": 6, "parent_id": 3, "type": "CEK_QUESTION_SET", "deleted_at": "2020-01-01T00:00:00Z"},
            {"id": 7, "parent_id": 3, "type": "INVISIBLE_CONTAINER"}
        ]))
        .unwrap();
        let items: Vec<ContentItem> = serde_json::from_value(json!([
            {"id": 10, "activity_id": 7, "type": "VIDEO", "data": {"duration": 60}},
            {"id": 11, "activity_id": 7, "type": "HTML", "data": {}},
            {"id": 12, "activity_id": 7, "type": "CDA_VIDEO"}
        ]))
        .unwrap();
        NodeStore::new(containers, items)
    }

    #[test]
    fn test_section_lock_and_require() {
        let mut store = store();
        let touched = apply_section_access(&mut store, LockMode::Lock, RequirementMode::Require);

        assert_eq!(touched, 1);
        let section = store.container(3).unwrap();
        assert_eq!(section.data["locked"], true);
        assert_eq!(section.data["completionRequired"], true);
        assert_eq!(section.data["title"], "S");
        // Detached sections are left alone
        assert!(store.container(4).unwrap().data.get("locked").is_none());
        // Non-sections are left alone
        assert!(store.container(1).unwrap().data.get("locked").is_none());
    }

    #[test]
    fn test_section_partial_change() {
        let mut store = store();
        apply_section_access(&mut store, LockMode::NoChange, RequirementMode::Optional);

        let section = store.container(3).unwrap();
        assert_eq!(section.data["locked"], false);
        assert_eq!(section.data["completionRequired"], false);
    }

    #[test]
    fn test_section_no_change_is_noop() {
        let mut store = store();
        let before = store.containers().to_vec();
        let touched =
            apply_section_access(&mut store, LockMode::NoChange, RequirementMode::NoChange);
        assert_eq!(touched, 0);
        assert_eq!(store.containers(), before.as_slice());
    }

    #[test]
    fn test_disable_scrubbing() {
        let mut store = store();
        let touched = apply_video_scrubbing(&mut store, ScrubbingMode::Disable);

        assert_eq!(touched, 2);
        let video = store.item(10).unwrap();
        assert_eq!(video.data["disableScrubbing"], true);
        assert_eq!(video.data["completionPercentage"], 95);
        assert_eq!(video.data["duration"], 60);
        // Missing payload is created on write
        assert_eq!(store.item(12).unwrap().data["disableScrubbing"], true);
        assert!(store.item(11).unwrap().data.get("disableScrubbing").is_none());
    }

    #[test]
    fn test_enable_scrubbing_keeps_completion() {
        let mut store = store();
        apply_video_scrubbing(&mut store, ScrubbingMode::Enable);

        let video = store.item(10).unwrap();
        assert_eq!(video.data["disableScrubbing"], false);
        assert!(video.data.get("completionPercentage").is_none());
    }

    #[test]
    fn test_question_set_settings() {
        let mut store = store();
        let options = EditOptions {
            show_answers: ShowAnswers::ShowAfterAttempts,
            qset_display: QuestionDisplay::DisplayOne,
            num_attempts: 3,
            pass_percent: 80,
            ..Default::default()
        };

        let touched = apply_question_set_settings(&mut store, &options);

        assert_eq!(touched, 1);
        let qset = store.container(5).unwrap();
        assert_eq!(qset.data["displayCorrectAnswers"], "onAllowExhaust");
        assert_eq!(qset.data["displayQuestions"], "one");
        assert_eq!(qset.data["numberOfAttempts"], 3);
        assert_eq!(qset.data["minimumPassingPercentage"], 80);
        // Soft-deleted question set untouched
        assert!(store.container(6).unwrap().data.is_null());
    }

    #[test]
    fn test_question_set_non_positive_numbers_ignored() {
        let mut store = store();
        let options = EditOptions {
            show_answers: ShowAnswers::ShowNever,
            num_attempts: 0,
            pass_percent: -1,
            ..Default::default()
        };

        apply_question_set_settings(&mut store, &options);

        let qset = store.container(5).unwrap();
        assert_eq!(qset.data["displayCorrectAnswers"], "never");
        assert_eq!(qset.data["numberOfAttempts"], 1);
        assert!(qset.data.get("minimumPassingPercentage").is_none());
    }

    #[test]
    fn test_apply_field_edits_report() {
        let mut store = store();
        let options = EditOptions {
            lock_unlock: LockMode::Lock,
            required_optional: RequirementMode::Require,
            show_answers: ShowAnswers::ShowWhenSubmitted,
            ..Default::default()
        };

        let report = apply_field_edits(&mut store, &options);

        assert_eq!(
            report,
            FieldEditReport {
                sections: 1,
                videos: 2,
                question_sets: 1
            }
        );
    }
}
