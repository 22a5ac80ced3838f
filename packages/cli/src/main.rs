//! Coursepack command-line host
//!
//! Runs the restructuring pipeline over an export that has already been
//! unpacked into a directory, and writes the result to a second directory
//! ready to be repacked.
//!
//! ```bash
//! coursepack process ./course ./course-out --section-scope section_per_te --video-intro
//! coursepack process ./course ./course-out --options options.json --sheet
//! coursepack clean ./course ./course-out
//! coursepack sheet ./course --output sheet.csv
//! ```
//!
//! Logging goes through `tracing`; set `RUST_LOG=debug` to see every
//! regroup, merge and prune decision.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use coursepack_core::config::{
    EditOptions, LockMode, QuestionDisplay, RequirementMode, ScrubbingMode, SectionScope,
    ShowAnswers,
};
use coursepack_core::services::{
    clean_course, course_name, course_sheet_csv, CoursePipeline, ExportDir, PipelineStage,
    ProgressSink, TracingProgress,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "coursepack",
    version,
    about = "Restructure and tidy unpacked e-learning course exports"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply edit options to an export and write the result
    Process {
        /// Unpacked export directory
        input_dir: PathBuf,
        /// Directory to write the edited export to
        output_dir: PathBuf,
        /// Read edit options from a JSON file instead of flags
        #[arg(long, value_name = "FILE", conflicts_with = "EditFlags")]
        options: Option<PathBuf>,
        #[command(flatten)]
        edits: EditFlags,
        /// Also write a course sheet next to the output directory
        #[arg(long)]
        sheet: bool,
    },
    /// Remove detached, orphaned and empty nodes without other edits
    Clean {
        input_dir: PathBuf,
        output_dir: PathBuf,
    },
    /// Write the course sheet CSV for an export
    Sheet {
        input_dir: PathBuf,
        /// Output file (defaults to `<course name>.csv`)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

/// Edit options as command-line flags; values use the same spelling as the
/// JSON options file
#[derive(Args, Debug, Clone)]
struct EditFlags {
    #[arg(long, default_value_t = LockMode::NoChange)]
    lock_unlock: LockMode,

    #[arg(long, default_value_t = RequirementMode::NoChange)]
    required_optional: RequirementMode,

    #[arg(long, default_value_t = SectionScope::NoChange)]
    section_scope: SectionScope,

    /// Fold an HTML intro section into the video section after it
    #[arg(long)]
    video_intro: bool,

    /// Fold an expandable credits section into the video section before it
    #[arg(long)]
    video_credits: bool,

    #[arg(long, default_value_t = ScrubbingMode::NoChange)]
    scrubbing: ScrubbingMode,

    #[arg(long, default_value_t = ShowAnswers::NoChange)]
    show_answers: ShowAnswers,

    #[arg(long, default_value_t = QuestionDisplay::NoChange)]
    qset_display: QuestionDisplay,

    /// Question set attempts (0 leaves them unchanged)
    #[arg(long, default_value_t = 0)]
    num_attempts: i64,

    /// Question set pass mark (0 leaves it unchanged)
    #[arg(long, default_value_t = 0)]
    pass_percent: i64,

    /// Prune even when nothing was restructured
    #[arg(long)]
    clean: bool,
}

impl From<EditFlags> for EditOptions {
    fn from(flags: EditFlags) -> Self {
        EditOptions {
            lock_unlock: flags.lock_unlock,
            required_optional: flags.required_optional,
            section_scope: flags.section_scope,
            video_intro: flags.video_intro,
            video_credits: flags.video_credits,
            scrubbing: flags.scrubbing,
            show_answers: flags.show_answers,
            qset_display: flags.qset_display,
            num_attempts: flags.num_attempts,
            pass_percent: flags.pass_percent,
            clean: flags.clean,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Process {
            input_dir,
            output_dir,
            options,
            edits,
            sheet,
        } => {
            let mut progress = TracingProgress;
            progress.stage(PipelineStage::Starting);
            progress.stage(PipelineStage::GettingOptions);
            let options = match options {
                Some(path) => EditOptions::from_json_file(&path)
                    .with_context(|| format!("Failed to read options from {}", path.display()))?,
                None => edits.into(),
            };
            process(&input_dir, &output_dir, options, sheet, &mut progress)
        }
        Command::Clean {
            input_dir,
            output_dir,
        } => clean(&input_dir, &output_dir),
        Command::Sheet { input_dir, output } => sheet(&input_dir, output),
    }
}

fn process(
    input_dir: &Path,
    output_dir: &Path,
    options: EditOptions,
    write_sheet: bool,
    progress: &mut dyn ProgressSink,
) -> Result<()> {
    let pipeline = CoursePipeline::new(options).context("Invalid edit options")?;

    progress.stage(PipelineStage::LoadingFile);
    let mut export = load(input_dir)?;

    let report = pipeline
        .run_with_progress(&mut export.documents, progress)
        .with_context(|| format!("Failed to process {}", input_dir.display()))?;

    progress.stage(PipelineStage::WritingFile);
    export
        .save(output_dir)
        .with_context(|| format!("Failed to write {}", output_dir.display()))?;

    tracing::info!("Field edits: {:?}", report.field_edits);
    if let Some(regroup) = &report.regroup {
        tracing::info!("Regrouped: {:?}", regroup);
    }
    if let Some(merge) = &report.merge {
        tracing::info!("Merged: {:?}", merge);
    }
    if let Some(prune) = &report.prune {
        tracing::info!("Pruned {} nodes: {:?}", prune.total(), prune);
    }

    if write_sheet {
        let name = course_name(export.documents.repository());
        let dir = output_dir.parent().unwrap_or_else(|| Path::new("."));
        write_course_sheet(&export, &dir.join(format!("{}.csv", name)))?;
    }

    progress.stage(PipelineStage::Done);
    Ok(())
}

fn clean(input_dir: &Path, output_dir: &Path) -> Result<()> {
    let mut export = load(input_dir)?;
    let stats = clean_course(&mut export.documents)
        .with_context(|| format!("Failed to clean {}", input_dir.display()))?;
    export
        .save(output_dir)
        .with_context(|| format!("Failed to write {}", output_dir.display()))?;

    tracing::info!("Pruned {} nodes: {:?}", stats.total(), stats);
    Ok(())
}

fn sheet(input_dir: &Path, output: Option<PathBuf>) -> Result<()> {
    let export = load(input_dir)?;
    let output = output.unwrap_or_else(|| {
        PathBuf::from(format!("{}.csv", course_name(export.documents.repository())))
    });
    write_course_sheet(&export, &output)
}

fn load(input_dir: &Path) -> Result<ExportDir> {
    ExportDir::load(input_dir).with_context(|| format!("Failed to load {}", input_dir.display()))
}

fn write_course_sheet(export: &ExportDir, path: &Path) -> Result<()> {
    let store = export.documents.load_store()?;
    let csv = course_sheet_csv(&store)?;
    fs::write(path, csv).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote course sheet to {}", path.display());
    Ok(())
}
