//! Edit Options
//!
//! The flat, enumerated options a host supplies to the pipeline. Every option
//! defaults to "no change", so `EditOptions::default()` is a no-op run.
//!
//! Options decode from JSON with `snake_case` values, the same spelling the
//! command-line flags accept:
//!
//! ```rust
//! use coursepack_core::config::{EditOptions, SectionScope};
//!
//! let options = EditOptions::from_json_str(r#"{
//!     "section_scope": "section_per_te",
//!     "video_intro": true,
//!     "pass_percent": 80
//! }"#).unwrap();
//!
//! assert_eq!(options.section_scope, SectionScope::SectionPerTe);
//! assert!(options.validate().is_ok());
//! ```

use crate::services::CourseError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Upper bound for `pass_percent`
const MAX_PASS_PERCENT: i64 = 100;

/// Declares a form option enum with `snake_case` serde names plus matching
/// `FromStr`/`Display` impls, so hosts can parse the same spelling from flags.
macro_rules! option_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(
                        "Invalid {}: '{}' (expected one of: {})",
                        stringify!($name),
                        s,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $text)),+
                }
            }
        }
    };
}

option_enum! {
    /// Section locking
    LockMode {
        Lock => "lock",
        Unlock => "unlock",
        #[default]
        NoChange => "no_change",
    }
}

option_enum! {
    /// Section completion requirement
    RequirementMode {
        Require => "require",
        Optional => "optional",
        #[default]
        NoChange => "no_change",
    }
}

option_enum! {
    /// Target granularity for section regrouping
    SectionScope {
        /// One section per leaf-container
        SectionPerTe => "section_per_te",
        /// One section per page
        SectionPerPage => "section_per_page",
        #[default]
        NoChange => "no_change",
    }
}

option_enum! {
    /// Whether learners may skip ahead in videos
    ScrubbingMode {
        Disable => "disable",
        Enable => "enable",
        #[default]
        NoChange => "no_change",
    }
}

option_enum! {
    /// When question sets reveal correct answers
    ShowAnswers {
        ShowWhenSubmitted => "show_when_submitted",
        ShowAfterAttempts => "show_after_attempts",
        ShowNever => "show_never",
        #[default]
        NoChange => "no_change",
    }
}

option_enum! {
    /// How many questions a question set shows at once
    QuestionDisplay {
        DisplayOne => "display_one",
        DisplayAll => "display_all",
        #[default]
        NoChange => "no_change",
    }
}

/// All options for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditOptions {
    pub lock_unlock: LockMode,
    pub required_optional: RequirementMode,
    pub section_scope: SectionScope,

    /// Fold a preceding HTML-only section into a single-video section
    pub video_intro: bool,

    /// Fold a following expandable HTML section into a single-video section
    pub video_credits: bool,

    pub scrubbing: ScrubbingMode,
    pub show_answers: ShowAnswers,
    pub qset_display: QuestionDisplay,

    /// Applied to question sets when greater than zero
    pub num_attempts: i64,

    /// Applied to question sets when greater than zero
    pub pass_percent: i64,

    /// Run the pruner even when nothing structural changed
    pub clean: bool,
}

impl EditOptions {
    pub fn from_json_str(json: &str) -> Result<Self, CourseError> {
        serde_json::from_str(json).map_err(CourseError::OptionsDecode)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CourseError> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).map_err(|source| CourseError::io(path, source))?;
        Self::from_json_str(&json)
    }

    /// Validate option ranges
    pub fn validate(&self) -> Result<(), String> {
        if self.pass_percent > MAX_PASS_PERCENT {
            return Err(format!(
                "pass_percent cannot exceed {} (got {})",
                MAX_PASS_PERCENT, self.pass_percent
            ));
        }

        Ok(())
    }

    /// Whether the run restructures the tree
    pub fn regroups(&self) -> bool {
        self.section_scope != SectionScope::NoChange
    }

    /// Whether any neighbour-merge heuristic was requested
    pub fn merges(&self) -> bool {
        self.video_intro || self.video_credits
    }

    /// Scrubbing mode after applying the lock/require shortcut.
    ///
    /// An explicit `scrubbing` choice wins. Otherwise locking and requiring a
    /// course disables scrubbing, and unlocking it enables scrubbing.
    pub fn effective_scrubbing(&self) -> ScrubbingMode {
        match self.scrubbing {
            ScrubbingMode::NoChange => match (self.lock_unlock, self.required_optional) {
                (LockMode::Lock, RequirementMode::Require) => ScrubbingMode::Disable,
                (LockMode::Unlock, _) => ScrubbingMode::Enable,
                _ => ScrubbingMode::NoChange,
            },
            explicit => explicit,
        }
    }
}
