//! Content Item ("teaching element") Data Structures
//!
//! Content items are the learner-facing leaves of the course tree. Each one is
//! owned by exactly one leaf-container through `activity_id` and never owns
//! anything itself.

use crate::models::payload::{self, lenient_position, OrderKey, WireFields};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Learner-facing payload kind, derived from the wire `type` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Html,
    Video,
    Image,
    Pdf,
    Question,
    Poll,
    Reflection,
    RatingScale,
    Other,
}

impl ContentKind {
    /// Classify a wire tag by substring, the way exports prefix their tags
    /// with vendor namespaces (`CDA_VIDEO`, `LXP_RATING_SCALE`, ...).
    pub fn from_tag(tag: &str) -> Self {
        if tag.contains("HTML") {
            Self::Html
        } else if tag.contains("VIDEO") {
            Self::Video
        } else if tag.contains("IMAGE") {
            Self::Image
        } else if tag.contains("PDF") {
            Self::Pdf
        } else if tag.contains("REFLECTION") {
            Self::Reflection
        } else if tag.contains("POLL") {
            Self::Poll
        } else if tag.contains("RATING_SCALE") {
            Self::RatingScale
        } else if tag.contains("QUESTION") && !tag.contains("SET") {
            Self::Question
        } else {
            Self::Other
        }
    }
}

/// Marker stored in `data.inputOutputType` for display-only items
pub const OUTPUT_ONLY: &str = "OUTPUT_ONLY";

/// A learner-facing leaf node.
///
/// Like [`Container`](crate::models::Container), untouched fields are written
/// back exactly as they were read.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub id: i64,

    /// Owning leaf-container
    pub activity_id: i64,

    pub item_type: String,
    pub position: i64,
    pub data: Value,
    pub meta: Value,
    pub refs: Value,
    pub detached: bool,

    pub extra: Map<String, Value>,

    wire: WireFields,
}

const TYPED_FIELDS: [&str; 8] = [
    "id",
    "activity_id",
    "type",
    "position",
    "data",
    "meta",
    "refs",
    "detached",
];

/// Typed view decoded from a raw content item record
#[derive(Deserialize)]
struct ContentItemRecord {
    id: i64,
    activity_id: i64,
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default, deserialize_with = "lenient_position")]
    position: i64,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    meta: Value,
    #[serde(default)]
    refs: Value,
    #[serde(default)]
    detached: bool,
}

impl<'de> Deserialize<'de> for ContentItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (record, wire, extra) =
            payload::split_record::<ContentItemRecord, _>(deserializer, &TYPED_FIELDS)?;

        Ok(Self {
            id: record.id,
            activity_id: record.activity_id,
            item_type: record.item_type,
            position: record.position,
            data: record.data,
            meta: record.meta,
            refs: record.refs,
            detached: record.detached,
            extra,
            wire,
        })
    }
}

impl Serialize for ContentItem {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut record = self.extra.clone();
        let wire = &self.wire;

        wire.write(&mut record, "id", Value::from(self.id));
        wire.write(&mut record, "activity_id", Value::from(self.activity_id));
        wire.write(&mut record, "type", Value::from(self.item_type.as_str()));
        wire.write_position(&mut record, self.position);
        wire.write(&mut record, "data", self.data.clone());
        wire.write(&mut record, "meta", self.meta.clone());
        wire.write(&mut record, "refs", self.refs.clone());
        wire.write(&mut record, "detached", Value::from(self.detached));

        record.serialize(serializer)
    }
}

impl ContentItem {
    pub fn kind(&self) -> ContentKind {
        ContentKind::from_tag(&self.item_type)
    }

    /// Sibling order key within the owning leaf-container
    pub fn sibling_key(&self) -> (OrderKey, i64) {
        (self.wire.position_order(self.position), self.id)
    }

    /// Whether `refs.linked` lists any cross-reference at all.
    ///
    /// Targets are not resolved: any entry makes the item unsafe to import.
    pub fn has_linked_refs(&self) -> bool {
        match self.refs.get("linked") {
            Some(Value::Array(linked)) => !linked.is_empty(),
            Some(Value::String(linked)) => !linked.is_empty(),
            _ => false,
        }
    }

    /// Display-only items flagged `data.inputOutputType == "OUTPUT_ONLY"`
    pub fn is_output_only(&self) -> bool {
        payload::str_field(&self.data, "inputOutputType") == Some(OUTPUT_ONLY)
    }

    /// Mutable access to `data` as an object (replaced with `{}` if malformed)
    pub fn data_mut(&mut self) -> &mut Map<String, Value> {
        payload::object_mut(&mut self.data)
    }
}
