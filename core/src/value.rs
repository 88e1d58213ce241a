//! Dynamic property values.
//!
//! Fragments have no fixed shape, so their properties are modeled as a tagged
//! [`Value`] tree. Besides the usual JSON-like variants, [`Value::Absent`]
//! marks a property that was explicitly cleared, which is different from a
//! property that is simply missing: during a merge an `Absent` value overrides
//! whatever an ancestor contributed for the same key.
//!
//! Values deserialize from any self-describing format (JSON, YAML, ...) and
//! convert to and from [`serde_json::Value`].
//!
//! # Examples
//!
//! ```
//! use schema_inherit_core::Value;
//!
//! let value = Value::from(serde_json::json!({ "name": "base", "tags": ["a"] }));
//! let mapping = value.as_mapping().unwrap();
//! assert_eq!(mapping["name"], Value::from("base"));
//! assert!(Value::Absent.is_absent());
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Insertion-ordered property mapping.
///
/// Equality ignores key order.
pub type Mapping = IndexMap<String, Value>;

/// A dynamically typed property value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// An explicit null.
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar.
    Number(serde_json::Number),
    /// String scalar.
    String(String),
    /// Ordered sequence of values.
    Sequence(Vec<Value>),
    /// Nested property mapping.
    Mapping(Mapping),
    /// Explicitly cleared property. Serializes as null.
    Absent,
}

impl Value {
    /// Returns the nested mapping, if this value is one.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    /// Returns the sequence items, if this value is a sequence.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the string contents, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` for the explicitly-cleared sentinel.
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Returns `true` for an explicit null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `false` for null, absent, `false`, zero and the empty string.
    ///
    /// Used to ignore placeholder entries in `id` and `extends` declarations.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_inherit_core::Value;
    ///
    /// assert!(!Value::from("").is_truthy());
    /// assert!(!Value::from(0).is_truthy());
    /// assert!(Value::from("base").is_truthy());
    /// ```
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null | Value::Absent => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Sequence(_) | Value::Mapping(_) => true,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Mapping(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::Absent => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Value::Number(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Mapping(mapping) => serde_json::Value::Object(
                mapping
                    .into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no numeric representation and become null.
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<Mapping> for Value {
    fn from(mapping: Mapping) -> Self {
        Value::Mapping(mapping)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null | Value::Absent => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Sequence(items) => serializer.collect_seq(items),
            Value::Mapping(mapping) => serializer.collect_map(mapping),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
