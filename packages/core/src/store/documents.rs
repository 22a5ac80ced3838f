//! Named Course Documents
//!
//! A course export is a set of JSON documents identified by logical name. The
//! engine locates its inputs by substring match on those names:
//!
//! - `activities` - array of containers (required, exactly one)
//! - `elements` - array of content items (required, exactly one)
//! - `manifest`, `repository` - passed through untouched; `repository`
//!   supplies the course name for reports
//!
//! Unpacking and repacking the archive that carries these documents is the
//! host's job.

use crate::models::{Container, ContentItem};
use crate::store::{NodeStore, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ACTIVITIES: &str = "activities";
pub const ELEMENTS: &str = "elements";
pub const MANIFEST: &str = "manifest";
pub const REPOSITORY: &str = "repository";

/// One decoded JSON document of a course export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDocument {
    pub name: String,
    pub data: Value,
}

impl CourseDocument {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// The full named-document set of one course export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseDocuments {
    documents: Vec<CourseDocument>,
}

impl CourseDocuments {
    pub fn new(documents: Vec<CourseDocument>) -> Self {
        Self { documents }
    }

    pub fn push(&mut self, document: CourseDocument) {
        self.documents.push(document);
    }

    pub fn iter(&self) -> impl Iterator<Item = &CourseDocument> {
        self.documents.iter()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn into_inner(self) -> Vec<CourseDocument> {
        self.documents
    }

    /// Index of the single document whose name contains `pattern`
    fn position_of(&self, pattern: &str) -> Result<usize, StoreError> {
        let matches: Vec<usize> = self
            .documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| doc.name.contains(pattern))
            .map(|(idx, _)| idx)
            .collect();

        match matches.as_slice() {
            [] => Err(StoreError::missing_document(pattern)),
            [idx] => Ok(*idx),
            _ => Err(StoreError::ambiguous_document(pattern, matches.len())),
        }
    }

    /// The single document whose name contains `pattern`
    pub fn require(&self, pattern: &str) -> Result<&CourseDocument, StoreError> {
        self.position_of(pattern).map(|idx| &self.documents[idx])
    }

    /// The first document whose name contains `pattern`, if any
    pub fn find(&self, pattern: &str) -> Option<&CourseDocument> {
        self.documents.iter().find(|doc| doc.name.contains(pattern))
    }

    /// The repository document's payload, used for the course name
    pub fn repository(&self) -> Option<&Value> {
        self.find(REPOSITORY).map(|doc| &doc.data)
    }

    /// Decode the activities and elements documents into a [`NodeStore`]
    pub fn load_store(&self) -> Result<NodeStore, StoreError> {
        let activities = self.require(ACTIVITIES)?;
        let elements = self.require(ELEMENTS)?;

        let containers: Vec<Container> = decode(activities)?;
        let items: Vec<ContentItem> = decode(elements)?;

        tracing::debug!(
            "Loaded {} containers from '{}' and {} content items from '{}'",
            containers.len(),
            activities.name,
            items.len(),
            elements.name
        );

        Ok(NodeStore::new(containers, items))
    }

    /// Encode an edited store back into the activities and elements documents
    pub fn write_store(&mut self, store: NodeStore) -> Result<(), StoreError> {
        let activities_idx = self.position_of(ACTIVITIES)?;
        let elements_idx = self.position_of(ELEMENTS)?;
        let (containers, items) = store.into_parts();

        let activities = encode(&self.documents[activities_idx].name, containers)?;
        let elements = encode(&self.documents[elements_idx].name, items)?;
        self.documents[activities_idx].data = activities;
        self.documents[elements_idx].data = elements;

        Ok(())
    }
}

impl FromIterator<CourseDocument> for CourseDocuments {
    fn from_iter<I: IntoIterator<Item = CourseDocument>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn encode<T: Serialize>(name: &str, nodes: Vec<T>) -> Result<Value, StoreError> {
    serde_json::to_value(nodes).map_err(|source| StoreError::EncodingFailed {
        name: name.to_string(),
        source,
    })
}

fn decode<T: DeserializeOwned>(document: &CourseDocument) -> Result<Vec<T>, StoreError> {
    Vec::<T>::deserialize(&document.data).map_err(|source| StoreError::InvalidDocument {
        name: document.name.clone(),
        source,
    })
}
