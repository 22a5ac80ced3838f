//! Unpacked Export Directories
//!
//! Reads and writes a course export that has already been extracted from its
//! archive. Every `*.json` file becomes a [`CourseDocument`] named by its path
//! relative to the export root (`/`-separated). Other files are carried along
//! untouched so the output directory can be repacked as-is. macOS resource
//! forks (`._*`) are ignored.

use crate::services::CourseError;
use crate::store::{CourseDocument, CourseDocuments, StoreError};
use std::fs;
use std::path::{Path, PathBuf};

const RESOURCE_FORK_PREFIX: &str = "._";

/// An export directory loaded into memory
#[derive(Debug, Clone)]
pub struct ExportDir {
    pub documents: CourseDocuments,

    /// Relative paths of non-JSON files to copy through
    pub passthrough: Vec<PathBuf>,

    root: PathBuf,
}

impl ExportDir {
    /// Load every JSON document under `root`
    pub fn load(root: impl AsRef<Path>) -> Result<Self, CourseError> {
        let root = root.as_ref();
        let mut files = Vec::new();
        collect_files(root, root, &mut files)?;
        files.sort();

        let mut documents = CourseDocuments::default();
        let mut passthrough = Vec::new();

        for relative in files {
            if relative.extension().is_some_and(|ext| ext == "json") {
                let path = root.join(&relative);
                let text = fs::read_to_string(&path).map_err(|e| CourseError::io(&path, e))?;
                let data = serde_json::from_str(&text)
                    .map_err(|source| CourseError::DocumentParse { path, source })?;
                documents.push(CourseDocument::new(document_name(&relative), data));
            } else {
                passthrough.push(relative);
            }
        }

        tracing::info!(
            "Loaded {} documents and {} other files from {}",
            documents.len(),
            passthrough.len(),
            root.display()
        );

        Ok(Self {
            documents,
            passthrough,
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write every document (compact JSON) and copy pass-through files into `out_dir`
    pub fn save(&self, out_dir: impl AsRef<Path>) -> Result<(), CourseError> {
        let out_dir = out_dir.as_ref();

        for document in self.documents.iter() {
            let path = out_dir.join(&document.name);
            ensure_parent(&path)?;
            let text = serde_json::to_string(&document.data).map_err(|source| {
                StoreError::EncodingFailed {
                    name: document.name.clone(),
                    source,
                }
            })?;
            fs::write(&path, text).map_err(|e| CourseError::io(&path, e))?;
        }

        for relative in &self.passthrough {
            let target = out_dir.join(relative);
            ensure_parent(&target)?;
            fs::copy(self.root.join(relative), &target).map_err(|e| CourseError::io(&target, e))?;
        }

        tracing::info!(
            "Wrote {} documents and copied {} files to {}",
            self.documents.len(),
            self.passthrough.len(),
            out_dir.display()
        );
        Ok(())
    }
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), CourseError> {
    let entries = fs::read_dir(dir).map_err(|e| CourseError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| CourseError::io(dir, e))?;
        let path = entry.path();

        if entry
            .file_name()
            .to_string_lossy()
            .starts_with(RESOURCE_FORK_PREFIX)
        {
            tracing::debug!("Skipping resource fork {}", path.display());
            continue;
        }

        let file_type = entry.file_type().map_err(|e| CourseError::io(&path, e))?;
        if file_type.is_dir() {
            collect_files(root, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }

    Ok(())
}

/// `/`-separated document name for a relative path
fn document_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn ensure_parent(path: &Path) -> Result<(), CourseError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| CourseError::io(parent, e)),
        None => Ok(()),
    }
}
