//! Course Sheet Report
//!
//! A read-only CSV inventory of a course: one row per content item, in reading
//! order, with the location it sits in and a short sample of its content.
//!
//! Rows come from [`OrderedTraversal`], so detached nodes never show up. Each
//! container on the way down updates the current location:
//!
//! | Container                | Column updated                          |
//! |--------------------------|-----------------------------------------|
//! | Root page                | `module = "(top level)"`, `page`        |
//! | Any other root           | `module`                                |
//! | Folder                   | `folder`                                |
//! | Page                     | `page`                                  |
//! | Section                  | `section`                               |
//! | Leaf-container           | `leaf_container`                        |
//!
//! Setting a column clears the columns nested below it. Consecutive items of
//! one leaf-container with the same name are reported once.

use crate::models::payload::{nested_str_field, number_field, str_field};
use crate::models::{Container, ContainerKind, ContentItem, ContentKind};
use crate::services::CourseError;
use crate::store::NodeStore;
use crate::traversal::{CourseNode, OrderedTraversal};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::sync::OnceLock;

/// Longest content sample kept before truncation
const SAMPLE_MAX_CHARS: usize = 100;

/// Filename used when the repository has no usable name
pub const DEFAULT_COURSE_NAME: &str = "processed_course";

const NOT_A_VIDEO: &str = "(not a video)";
const UNKNOWN_DURATION: &str = "(unknown)";
const NO_FILENAME: &str = "n/a";
const BLANK_SAMPLE: &str = "(blank)";
const NO_SAMPLE: &str = "(no sample available)";

/// Characters replaced in course filenames (besides non-printable ASCII)
const FILENAME_UNSAFE_PATTERN: &str = r#"[/\\:"'<>|?*^%!@#$&+=`~\[\]{}();,\s]"#;
const NON_PRINTABLE_PATTERN: &str = r"[^\x20-\x7E]";

/// One line of the course sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CourseSheetRow {
    pub module: String,
    pub folder: String,
    pub page: String,
    pub section: String,
    pub leaf_container: String,
    pub te_type: String,
    pub te_name: String,
    pub duration: String,
    pub filename: String,
    pub te_content_sample: String,
}

#[derive(Debug, Clone, Default)]
struct Location {
    module: String,
    folder: String,
    page: String,
    section: String,
    leaf_container: String,
}

impl Location {
    fn enter(&mut self, container: &Container) {
        let name = container_name(container);
        match container.kind() {
            ContainerKind::Page if container.is_root() => {
                self.module = "(top level)".to_string();
                self.folder.clear();
                self.set_page(name);
            }
            _ if container.is_root() => {
                self.module = name;
                self.folder.clear();
                self.set_page(String::new());
            }
            ContainerKind::Folder => {
                self.folder = name;
                self.set_page(String::new());
            }
            ContainerKind::Page => self.set_page(name),
            ContainerKind::Section => {
                self.section = name;
                self.leaf_container.clear();
            }
            kind if kind.is_leaf() => self.leaf_container = name,
            _ => {}
        }
    }

    fn set_page(&mut self, page: String) {
        self.page = page;
        self.section.clear();
        self.leaf_container.clear();
    }

    fn row(&self, item: &ContentItem, name: String) -> CourseSheetRow {
        let mut row = CourseSheetRow {
            module: self.module.clone(),
            folder: self.folder.clone(),
            page: self.page.clone(),
            section: self.section.clone(),
            leaf_container: self.leaf_container.clone(),
            te_type: item.item_type.clone(),
            te_name: name,
            duration: NOT_A_VIDEO.to_string(),
            filename: NO_FILENAME.to_string(),
            te_content_sample: content_sample(item),
        };

        match item.kind() {
            ContentKind::Video => {
                row.duration = number_field(&item.data, "duration")
                    .map(sec_to_hms)
                    .unwrap_or_else(|| UNKNOWN_DURATION.to_string());
                if let Some(filename) = str_field(&item.data, "assetFilename") {
                    row.filename = filename.to_string();
                }
            }
            ContentKind::Image => {
                if let Some(url) = nested_str_field(&item.data, "assets", "url") {
                    row.filename = image_filename(url).to_string();
                }
            }
            _ => {}
        }

        if row.te_content_sample.is_empty() {
            row.te_content_sample = BLANK_SAMPLE.to_string();
        }
        row
    }
}

/// Build the sheet rows for every live content item, in reading order
pub fn course_sheet_rows(store: &NodeStore) -> Vec<CourseSheetRow> {
    let mut rows = Vec::new();
    let mut location = Location::default();
    let mut last_name = String::new();

    for node in OrderedTraversal::new(store) {
        match node {
            CourseNode::Container(container) => {
                location.enter(container);
                last_name.clear();
            }
            CourseNode::Item(item) => {
                let name = item_name(item);
                if name.is_empty() || name == last_name {
                    continue;
                }
                last_name.clone_from(&name);
                rows.push(location.row(item, name));
            }
        }
    }

    tracing::debug!("Course sheet has {} rows", rows.len());
    rows
}

/// Write rows as CSV (header line first)
pub fn write_course_sheet<W: Write>(rows: &[CourseSheetRow], writer: W) -> Result<(), CourseError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Render the whole course sheet as a CSV string
pub fn course_sheet_csv(store: &NodeStore) -> Result<String, CourseError> {
    let rows = course_sheet_rows(store);
    let mut buffer = Vec::new();
    write_course_sheet(&rows, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Turn the repository's `name` into a safe file stem
pub fn course_name(repository: Option<&Value>) -> String {
    static NON_PRINTABLE: OnceLock<Regex> = OnceLock::new();
    static FILENAME_UNSAFE: OnceLock<Regex> = OnceLock::new();

    let name = match repository.and_then(|repo| repo.get("name")) {
        Some(Value::String(name)) => name.clone(),
        Some(Value::Null) | None => return DEFAULT_COURSE_NAME.to_string(),
        Some(other) => other.to_string(),
    };

    let non_printable = NON_PRINTABLE.get_or_init(|| Regex::new(NON_PRINTABLE_PATTERN).unwrap());
    let unsafe_chars =
        FILENAME_UNSAFE.get_or_init(|| Regex::new(FILENAME_UNSAFE_PATTERN).unwrap());

    let name = non_printable.replace_all(&name, "_");
    let name = unsafe_chars.replace_all(&name, "_");
    let name = name.trim();

    if name.is_empty() {
        DEFAULT_COURSE_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Format seconds as `H:MM:SS`
pub fn sec_to_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn container_name(container: &Container) -> String {
    if let Some(name) = container.display_name().filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    let id = container.id;
    match container.kind() {
        ContainerKind::Invisible => format!("(invisible container) {}", id),
        ContainerKind::Expandable => format!("(expand container) {}", id),
        ContainerKind::QuestionSet => format!("(question set) {}", id),
        ContainerKind::SectionContainer => format!("(section container) {}", id),
        ContainerKind::Section => match container.title() {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("Nameless SECTION {}", id),
        },
        _ => first_name(&container.data, container.extra.get("meta"))
            .unwrap_or_else(|| format!("Nameless {} {}", container.container_type, id)),
    }
}

fn item_name(item: &ContentItem) -> String {
    if let Some(name) = item
        .extra
        .get("display_name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
    {
        return name.to_string();
    }

    first_name(&item.data, Some(&item.meta))
        .unwrap_or_else(|| format!("Nameless {} {}", item.item_type, item.id))
}

/// First non-empty of `data.name`, `data.title`, `meta.title`, trimmed
fn first_name(data: &Value, meta: Option<&Value>) -> Option<String> {
    [
        str_field(data, "name"),
        str_field(data, "title"),
        meta.and_then(|meta| str_field(meta, "title")),
    ]
    .into_iter()
    .flatten()
    .find(|name| !name.is_empty())
    .map(|name| name.trim().to_string())
}

fn content_sample(item: &ContentItem) -> String {
    let data = &item.data;
    let sample = match item.kind() {
        ContentKind::Html => str_field(data, "content").unwrap_or_default().to_string(),
        ContentKind::Reflection | ContentKind::Poll => nested_str_field(data, "prompt", "content")
            .unwrap_or_default()
            .to_string(),
        ContentKind::Question => str_field(data, "question").unwrap_or_default().to_string(),
        ContentKind::Image => {
            let alt = str_field(&item.meta, "alt")
                .filter(|alt| !alt.is_empty())
                .or_else(|| str_field(data, "alt"))
                .unwrap_or_default();
            format!("Alt text: {}", alt)
        }
        ContentKind::Pdf => match nested_str_field(data, "assets", "url") {
            Some(url) if !url.is_empty() => {
                let title = url.split_once("___").map_or(url, |(_, rest)| rest);
                format!("PDF: {}", title)
            }
            _ => "PDF - no title given".to_string(),
        },
        ContentKind::Video => {
            let title = str_field(data, "assetFilename")
                .filter(|name| !name.is_empty())
                .or_else(|| str_field(&item.meta, "title").filter(|title| !title.is_empty()));
            match title {
                Some(title) => format!("Video: {}", title),
                None => "Video - no title given".to_string(),
            }
        }
        ContentKind::RatingScale => nested_str_field(data, "inputData", "prompt")
            .unwrap_or_default()
            .to_string(),
        ContentKind::Other => NO_SAMPLE.to_string(),
    };

    truncate_sample(sample)
}

fn truncate_sample(sample: String) -> String {
    match sample.char_indices().nth(SAMPLE_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &sample[..cut]),
        None => sample,
    }
}

/// File name at the end of an asset URL (`<hash>___<path>/<file>`)
fn image_filename(url: &str) -> &str {
    let tail = url.rsplit("___").next().unwrap_or(url);
    tail.rsplit('/').next().unwrap_or(tail)
}
