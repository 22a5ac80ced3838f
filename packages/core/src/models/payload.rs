//! Loosely-Typed Payload Helpers
//!
//! Course exports store type-specific data in free-form `data`/`meta` JSON objects.
//! Every lookup in this module has an explicit fallback: a field that is absent,
//! null, or of the wrong JSON type is treated as missing rather than as an error.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Look up a string field, returning `None` when absent or not a string
pub fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

/// Look up a nested string field (`payload.outer.inner`)
pub fn nested_str_field<'a>(payload: &'a Value, outer: &str, inner: &str) -> Option<&'a str> {
    payload.get(outer).and_then(|v| str_field(v, inner))
}

/// Look up a numeric field as `f64`, accepting integers and floats
pub fn number_field(payload: &Value, key: &str) -> Option<f64> {
    payload.get(key).and_then(Value::as_f64)
}

/// Look up a boolean field
pub fn bool_field(payload: &Value, key: &str) -> Option<bool> {
    payload.get(key).and_then(Value::as_bool)
}

/// Borrow a payload as a mutable JSON object, replacing it with `{}` if it is
/// null or any non-object value.
pub fn object_mut(payload: &mut Value) -> &mut Map<String, Value> {
    if !payload.is_object() {
        *payload = Value::Object(Map::new());
    }
    match payload {
        Value::Object(map) => map,
        _ => unreachable!("payload was just replaced with an object"),
    }
}

/// Render a timestamp the way course exports store them (RFC 3339, milliseconds, `Z`)
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Deserialize a sibling position leniently.
///
/// Accepts integers, floats (truncated toward zero), numeric strings and null
/// (0). Exports from older authoring tools occasionally carry fractional or
/// missing positions; [`WireFields`] keeps the exact value for ordering and
/// write-back.
pub(crate) fn lenient_position<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(0, integer_position))
}

/// Integer view of a wire position
fn integer_position(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Exact numeric value of a wire position, if it has one
fn numeric_position(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Total order over sibling positions.
///
/// Fractional wire positions sort between their integer neighbours.
#[derive(Debug, Clone, Copy)]
pub struct OrderKey(pub f64);

impl PartialEq for OrderKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderKey {}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Wire values of a node's typed fields, exactly as they were read.
///
/// Serializing a node writes each typed field from here while the typed value
/// still matches it, so untouched fields keep their spelling (explicit nulls,
/// fractional positions) and absent fields stay absent. Objects and arrays are
/// not kept: payload fields always write their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireFields(Map<String, Value>);

impl WireFields {
    /// Remove the typed `keys` from a raw record, remembering their scalar values
    pub(crate) fn take(record: &mut Map<String, Value>, keys: &[&str]) -> Self {
        let mut wire = Map::new();
        for key in keys {
            match record.remove(*key) {
                Some(Value::Object(_)) | Some(Value::Array(_)) | None => {}
                Some(value) => {
                    wire.insert(key.to_string(), value);
                }
            }
        }
        Self(wire)
    }

    /// Write `current` under `key`, keeping the wire value while they agree
    pub(crate) fn write(&self, record: &mut Map<String, Value>, key: &str, current: Value) {
        self.write_with(record, key, current, |wire, current| wire == current);
    }

    /// Write an integer position, keeping the wire value while it still reads as `current`
    pub(crate) fn write_position(&self, record: &mut Map<String, Value>, current: i64) {
        self.write_with(record, "position", Value::from(current), |wire, _| {
            integer_position(wire) == current
        });
    }

    fn write_with<F>(&self, record: &mut Map<String, Value>, key: &str, current: Value, same: F)
    where
        F: Fn(&Value, &Value) -> bool,
    {
        match self.0.get(key) {
            Some(wire) if same(wire, &current) => {
                record.insert(key.to_string(), wire.clone());
            }
            None if is_unset(&current) => {}
            _ => {
                record.insert(key.to_string(), current);
            }
        }
    }

    /// Ordering key for `current`, using the exact wire value while it still reads as `current`
    pub(crate) fn position_order(&self, current: i64) -> OrderKey {
        let exact = self
            .0
            .get("position")
            .filter(|wire| integer_position(wire) == current)
            .and_then(numeric_position);
        OrderKey(exact.unwrap_or(current as f64))
    }
}

/// Values a field takes when it is missing from the wire
fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Split a raw JSON record into its typed view `T`, the wire values of the
/// typed `keys`, and the remaining untyped fields.
pub(crate) fn split_record<'de, T, D>(
    deserializer: D,
    keys: &[&str],
) -> Result<(T, WireFields, Map<String, Value>), D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    let mut record = Map::<String, Value>::deserialize(deserializer)?;
    let value = Value::Object(std::mem::take(&mut record));
    let typed = T::deserialize(&value).map_err(de::Error::custom)?;
    if let Value::Object(map) = value {
        record = map;
    }
    let wire = WireFields::take(&mut record, keys);
    Ok((typed, wire, record))
}
