//! Container ("activity") Data Structures
//!
//! Containers are the structural nodes of a course: folders, pages, section
//! containers, sections and the leaf-containers that own content items. The
//! hierarchy is implicit, expressed only through `parent_id`.
//!
//! # Examples
//!
//! ```rust
//! use coursepack_core::models::{Container, ContainerKind};
//! use serde_json::json;
//!
//! let container: Container = serde_json::from_value(json!({
//!     "id": 12,
//!     "parent_id": 3,
//!     "type": "INVISIBLE_CONTAINER",
//!     "position": 2,
//!     "data": {},
//!     "uid": "kept-verbatim"
//! }))
//! .unwrap();
//!
//! assert_eq!(container.kind(), ContainerKind::Invisible);
//! assert!(container.kind().is_leaf());
//! assert_eq!(container.extra["uid"], "kept-verbatim");
//! ```

use crate::models::payload::{self, lenient_position, OrderKey, WireFields};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Structural role of a container, derived from its wire `type` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Folder,
    Page,
    SectionContainer,
    Section,
    /// Ordinary leaf-container holding one or more content items
    Invisible,
    /// Collapsible leaf-container ("expand container")
    Expandable,
    /// Assessment leaf-container
    QuestionSet,
    /// Any tag this engine does not restructure
    Other,
}

impl ContainerKind {
    pub const FOLDER_TAG: &'static str = "LONG_HLXP_SCHEMA/FOLDER";
    pub const PAGE_TAG: &'static str = "LONG_HLXP_SCHEMA/PAGE";
    pub const SECTION_CONTAINER_TAG: &'static str = "SECTION_CONTAINER";
    pub const SECTION_TAG: &'static str = "SECTION";
    pub const INVISIBLE_TAG: &'static str = "INVISIBLE_CONTAINER";
    pub const EXPANDABLE_TAG: &'static str = "EXPAND_CONTAINER";
    pub const QUESTION_SET_TAG: &'static str = "CEK_QUESTION_SET";

    /// Classify a wire tag.
    ///
    /// Section and leaf tags are matched exactly; folder and page tags carry a
    /// schema prefix that varies between exports, so they are matched loosely.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            Self::SECTION_CONTAINER_TAG => Self::SectionContainer,
            Self::SECTION_TAG => Self::Section,
            Self::INVISIBLE_TAG => Self::Invisible,
            Self::EXPANDABLE_TAG => Self::Expandable,
            Self::QUESTION_SET_TAG => Self::QuestionSet,
            t if t.ends_with("PAGE") => Self::Page,
            t if t.contains("FOLDER") => Self::Folder,
            _ => Self::Other,
        }
    }

    /// Canonical wire tag used when minting new containers
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Folder => Self::FOLDER_TAG,
            Self::Page => Self::PAGE_TAG,
            Self::SectionContainer => Self::SECTION_CONTAINER_TAG,
            Self::Section => Self::SECTION_TAG,
            Self::Invisible => Self::INVISIBLE_TAG,
            Self::Expandable => Self::EXPANDABLE_TAG,
            Self::QuestionSet => Self::QUESTION_SET_TAG,
            Self::Other => "OTHER",
        }
    }

    /// Leaf-containers own content items instead of other containers
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Invisible | Self::Expandable | Self::QuestionSet)
    }
}

/// A structural node of the course tree.
///
/// Fields the engine does not interpret are kept in `extra`. Typed fields are
/// written back with their original spelling unless an edit changed them.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub id: i64,

    /// `None` marks a root
    pub parent_id: Option<i64>,

    /// Wire type tag; see [`ContainerKind::from_tag`]
    pub container_type: String,

    /// Sibling ordering key (not unique, not dense)
    pub position: i64,

    pub data: Value,

    /// Soft-delete flag; detached containers are removed by the pruner
    pub detached: bool,

    pub repository_id: Option<Value>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub modified_at: Option<String>,
    pub deleted_at: Option<String>,

    pub extra: Map<String, Value>,

    wire: WireFields,
}

const TYPED_FIELDS: [&str; 11] = [
    "id",
    "parent_id",
    "type",
    "position",
    "data",
    "detached",
    "repository_id",
    "created_at",
    "updated_at",
    "modified_at",
    "deleted_at",
];

/// Typed view decoded from a raw container record
#[derive(Deserialize)]
struct ContainerRecord {
    id: i64,
    #[serde(default)]
    parent_id: Option<i64>,
    #[serde(rename = "type")]
    container_type: String,
    #[serde(default, deserialize_with = "lenient_position")]
    position: i64,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    detached: bool,
    #[serde(default)]
    repository_id: Option<Value>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    modified_at: Option<String>,
    #[serde(default)]
    deleted_at: Option<String>,
}

impl<'de> Deserialize<'de> for Container {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (record, wire, extra) =
            payload::split_record::<ContainerRecord, _>(deserializer, &TYPED_FIELDS)?;

        Ok(Self {
            id: record.id,
            parent_id: record.parent_id,
            container_type: record.container_type,
            position: record.position,
            data: record.data,
            detached: record.detached,
            repository_id: record.repository_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            modified_at: record.modified_at,
            deleted_at: record.deleted_at,
            extra,
            wire,
        })
    }
}

impl Serialize for Container {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut record = self.extra.clone();
        let wire = &self.wire;

        wire.write(&mut record, "id", Value::from(self.id));
        wire.write(&mut record, "parent_id", Value::from(self.parent_id));
        wire.write(&mut record, "type", Value::from(self.container_type.as_str()));
        wire.write_position(&mut record, self.position);
        wire.write(&mut record, "data", self.data.clone());
        wire.write(&mut record, "detached", Value::from(self.detached));
        wire.write(
            &mut record,
            "repository_id",
            self.repository_id.clone().unwrap_or(Value::Null),
        );
        for (key, stamp) in [
            ("created_at", &self.created_at),
            ("updated_at", &self.updated_at),
            ("modified_at", &self.modified_at),
            ("deleted_at", &self.deleted_at),
        ] {
            wire.write(&mut record, key, Value::from(stamp.clone()));
        }

        record.serialize(serializer)
    }
}

impl Container {
    /// Mint a new container of the given kind.
    ///
    /// New containers get a fresh `uid`, empty `refs`, creation/update stamps,
    /// and the course's `repository_id`.
    pub fn new(
        id: i64,
        kind: ContainerKind,
        parent_id: Option<i64>,
        position: i64,
        data: Value,
        repository_id: Option<Value>,
        now: DateTime<Utc>,
    ) -> Self {
        let stamp = payload::timestamp(now);
        let mut extra = Map::new();
        extra.insert(
            "uid".to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
        extra.insert("refs".to_string(), Value::Object(Map::new()));
        extra.insert("published_at".to_string(), Value::Null);

        Self {
            id,
            parent_id,
            container_type: kind.tag().to_string(),
            position,
            data,
            detached: false,
            repository_id,
            created_at: Some(stamp.clone()),
            updated_at: Some(stamp),
            modified_at: None,
            deleted_at: None,
            extra,
            wire: WireFields::default(),
        }
    }

    pub fn kind(&self) -> ContainerKind {
        ContainerKind::from_tag(&self.container_type)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Sibling order key: position, then identifier for ties
    pub fn sibling_key(&self) -> (OrderKey, i64) {
        (self.order_position(), self.id)
    }

    /// Position as an ordering key, exact for fractional wire positions
    pub fn order_position(&self) -> OrderKey {
        self.wire.position_order(self.position)
    }

    /// Title stored in `data.title`, if any
    pub fn title(&self) -> Option<&str> {
        payload::str_field(&self.data, "title")
    }

    /// Explicit display name some exports attach to containers
    pub fn display_name(&self) -> Option<&str> {
        self.extra.get("display_name").and_then(Value::as_str)
    }

    /// Soft-delete this container, stamping its deletion/modification times
    pub fn detach(&mut self, now: DateTime<Utc>) {
        let stamp = payload::timestamp(now);
        self.detached = true;
        self.deleted_at = Some(stamp.clone());
        self.modified_at = Some(stamp.clone());
        self.updated_at = Some(stamp);
    }

    /// Record a structural move (re-parenting or renumbering)
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let stamp = payload::timestamp(now);
        self.modified_at = Some(stamp.clone());
        self.updated_at = Some(stamp);
        self.deleted_at = None;
    }

    /// Mutable access to `data` as an object (replaced with `{}` if malformed)
    pub fn data_mut(&mut self) -> &mut Map<String, Value> {
        payload::object_mut(&mut self.data)
    }
}
