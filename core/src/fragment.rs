//! Author-supplied fragments.
//!
//! A [`Fragment`] is a property mapping that may declare parents through the
//! reserved `extends` key and may repeat its own identifier in the reserved
//! `id` key. Both control keys are lifted out of the property mapping when the
//! fragment is built, so they can never leak into merged output.
//!
//! # Examples
//!
//! ```
//! use schema_inherit_core::{Extends, Fragment, Value};
//!
//! let fragment = Fragment::try_from(serde_json::json!({
//!     "extends": ["base", "", "mixin"],
//!     "color": "red",
//! }))
//! .unwrap();
//!
//! assert_eq!(fragment.extends.ids(), vec!["base", "mixin"]);
//! assert_eq!(fragment.properties["color"], Value::from("red"));
//! assert!(!fragment.properties.contains_key("extends"));
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{InheritError, Result};
use crate::value::{Mapping, Value};

/// Reserved key holding the parent declaration.
pub const EXTENDS_KEY: &str = "extends";

/// Reserved key holding the fragment identifier.
pub const ID_KEY: &str = "id";

/// Raw parent declaration of a fragment.
///
/// Kept exactly as authored; [`Extends::ids`] normalizes it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Extends {
    /// No parents declared.
    #[default]
    None,
    /// A single parent identifier.
    One(String),
    /// A list of parent identifiers; `None` marks a placeholder entry.
    Many(Vec<Option<String>>),
}

impl Extends {
    /// Returns declared parent identifiers in order, dropping empty entries.
    ///
    /// Duplicates are kept; the resolver collapses them.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_inherit_core::Extends;
    ///
    /// assert_eq!(Extends::One("a".into()).ids(), vec!["a"]);
    /// let many = Extends::Many(vec![Some("a".into()), None, Some("".into()), Some("a".into())]);
    /// assert_eq!(many.ids(), vec!["a", "a"]);
    /// ```
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Extends::None => Vec::new(),
            Extends::One(id) => std::iter::once(id.as_str())
                .filter(|id| !id.is_empty())
                .collect(),
            Extends::Many(ids) => ids
                .iter()
                .flatten()
                .map(String::as_str)
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }

    /// Returns `true` when no usable parent identifier is declared.
    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(id) => Ok(Extends::One(id)),
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(id) => Ok(Some(id)),
                    other if !other.is_truthy() => Ok(None),
                    other => Err(InheritError::InvalidFragment(format!(
                        "'{EXTENDS_KEY}' entries must be identifiers, found {other:?}"
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Extends::Many),
            other if !other.is_truthy() => Ok(Extends::None),
            other => Err(InheritError::InvalidFragment(format!(
                "'{EXTENDS_KEY}' must be an identifier or a list of identifiers, found {other:?}"
            ))),
        }
    }

    fn to_value(&self) -> Option<Value> {
        match self {
            Extends::None => None,
            Extends::One(id) => Some(Value::from(id.as_str())),
            Extends::Many(ids) => Some(Value::Sequence(
                ids.iter()
                    .map(|id| id.as_deref().map_or(Value::Null, Value::from))
                    .collect(),
            )),
        }
    }
}

impl From<&str> for Extends {
    fn from(id: &str) -> Self {
        Extends::One(id.to_string())
    }
}

impl<S: Into<String>> FromIterator<S> for Extends {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Extends::Many(iter.into_iter().map(|id| Some(id.into())).collect())
    }
}

/// A named input object, possibly declaring parents to inherit from.
///
/// The collection key under which a fragment appears is its identity; the
/// optional [`id`](Fragment::id) only exists to be checked against that key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    /// Identifier repeated inside the fragment, if any.
    pub id: Option<String>,
    /// Raw parent declaration.
    pub extends: Extends,
    /// Own properties, free of control keys.
    pub properties: Mapping,
}

impl Fragment {
    /// Creates an empty fragment with no parents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parent declaration.
    pub fn with_extends(mut self, extends: impl Into<Extends>) -> Self {
        self.extends = extends.into();
        self
    }

    /// Sets an own property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Builds a fragment from a raw mapping, lifting out `extends` and `id`.
    ///
    /// A falsy `id` (null, empty string, `false`, zero) counts as missing.
    /// Non-string scalar ids are kept in their textual form so that a
    /// mismatch against the collection key is still reported.
    ///
    /// # Errors
    ///
    /// Returns [`InheritError::InvalidFragment`] if `extends` is neither an
    /// identifier nor a list of identifiers, or if `id` is a container.
    pub fn from_mapping(mut mapping: Mapping) -> Result<Self> {
        let extends = match mapping.shift_remove(EXTENDS_KEY) {
            Some(value) => Extends::from_value(value)?,
            None => Extends::None,
        };

        let id = match mapping.shift_remove(ID_KEY) {
            Some(value) if !value.is_truthy() => None,
            Some(Value::String(id)) => Some(id),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(other) => {
                return Err(InheritError::InvalidFragment(format!(
                    "'{ID_KEY}' must be a scalar, found {other:?}"
                )));
            }
            None => None,
        };

        Ok(Self {
            id,
            extends,
            properties: mapping,
        })
    }

    /// Returns the fragment as a raw mapping, control keys first.
    pub fn to_mapping(&self) -> Mapping {
        let mut mapping = Mapping::with_capacity(self.properties.len() + 2);
        if let Some(id) = &self.id {
            mapping.insert(ID_KEY.to_string(), Value::from(id.as_str()));
        }
        if let Some(extends) = self.extends.to_value() {
            mapping.insert(EXTENDS_KEY.to_string(), extends);
        }
        mapping.extend(
            self.properties
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        mapping
    }
}

impl From<&Fragment> for Fragment {
    fn from(fragment: &Fragment) -> Self {
        fragment.clone()
    }
}

impl TryFrom<Value> for Fragment {
    type Error = InheritError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Mapping(mapping) => Fragment::from_mapping(mapping),
            Value::Null => Ok(Fragment::new()),
            other => Err(InheritError::InvalidFragment(format!(
                "expected a mapping, found {other:?}"
            ))),
        }
    }
}

impl TryFrom<serde_json::Value> for Fragment {
    type Error = InheritError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        Fragment::try_from(Value::from(value))
    }
}

impl Serialize for Fragment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.to_mapping())
    }
}

impl<'de> Deserialize<'de> for Fragment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Fragment::try_from(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_single_extends_is_normalized() {
        let fragment = Fragment::try_from(json!({ "extends": "base" })).unwrap();
        assert_eq!(fragment.extends, Extends::One("base".to_string()));
        assert_eq!(fragment.extends.ids(), vec!["base"]);
    }

    #[test]
    fn test_falsy_extends_entries_are_dropped() {
        let fragment = Fragment::try_from(json!({ "extends": ["a", null, "", false, "b"] })).unwrap();
        assert_eq!(fragment.extends.ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_null_extends_means_no_parents() {
        let fragment = Fragment::try_from(json!({ "extends": null, "x": 1 })).unwrap();
        assert!(fragment.extends.is_empty());
        assert_eq!(fragment.properties.len(), 1);
    }

    #[test]
    fn test_non_identifier_extends_is_rejected() {
        let err = Fragment::try_from(json!({ "extends": [{ "nested": true }] })).unwrap_err();
        assert!(matches!(err, InheritError::InvalidFragment(_)));
    }

    #[test]
    fn test_id_is_lifted_out_of_properties() {
        let fragment = Fragment::try_from(json!({ "id": "a", "foo": "bar" })).unwrap();
        assert_eq!(fragment.id.as_deref(), Some("a"));
        assert!(!fragment.properties.contains_key("id"));
    }

    #[test]
    fn test_empty_id_counts_as_missing() {
        let fragment = Fragment::try_from(json!({ "id": "" })).unwrap();
        assert_eq!(fragment.id, None);
    }

    #[test]
    fn test_numeric_id_keeps_textual_form() {
        let fragment = Fragment::try_from(json!({ "id": 7 })).unwrap();
        assert_eq!(fragment.id.as_deref(), Some("7"));
    }

    #[test]
    fn test_non_mapping_fragment_is_rejected() {
        let err = Fragment::try_from(json!([1, 2])).unwrap_err();
        assert!(matches!(err, InheritError::InvalidFragment(_)));
    }

    #[test]
    fn test_deserialize_and_serialize_keep_control_keys() {
        let fragment: Fragment =
            serde_json::from_str(r#"{"extends":["a"],"name":"child"}"#).unwrap();
        let raw = serde_json::to_string(&fragment).unwrap();
        assert_eq!(raw, r#"{"extends":["a"],"name":"child"}"#);
    }

    #[test]
    fn test_builder_methods() {
        let fragment = Fragment::new()
            .with_extends(["a", "b"].into_iter().collect::<Extends>())
            .with_property("k", 1);
        assert_eq!(fragment.extends.ids(), vec!["a", "b"]);
        assert_eq!(fragment.properties["k"], Value::from(1));
    }
}
