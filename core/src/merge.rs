//! Deep merging and inheritance resolution.
//!
//! [`deep_merge`] combines two property mappings under a [`MergePolicy`];
//! [`topo_merge`] resolves a whole fragment collection, merging every fragment
//! over its ancestry.
//!
//! # Precedence
//!
//! For a fragment with parents `P1..Pn`, the fully merged parents are folded
//! left to right, so when two parents define the same key at the same depth
//! the later-listed parent wins. The fragment's own properties are merged last
//! and always win over anything inherited.
//!
//! # Example
//!
//! ```
//! use schema_inherit_core::*;
//!
//! let merged = topo_merge(
//!     vec![
//!         ("base", Fragment::new().with_property("foo", 1).with_property("bar", 2)),
//!         ("child", Fragment::new().with_extends("base").with_property("bar", 3)),
//!     ],
//!     &MergeOptions::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(merged["child"]["foo"], Value::from(1));
//! assert_eq!(merged["child"]["bar"], Value::from(3));
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::Result;
use crate::fragment::{Fragment, ID_KEY};
use crate::graph::{Graph, Node, NodeId};
use crate::normalize::normalize;
use crate::value::{Mapping, Value};

/// How two sequences under the same key are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceMode {
    /// The overriding sequence replaces the inherited one (the default).
    #[default]
    Replace,
    /// Set-union: inherited elements first, then overriding elements not
    /// already present.
    ///
    /// Only membership is guaranteed once more than two ancestors contribute.
    Merge,
}

/// How two nested mappings under the same key are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingMode {
    /// Merge key by key, recursively (the default).
    #[default]
    Merge,
    /// The overriding mapping replaces the inherited one.
    Replace,
}

/// Container handling during a deep merge.
///
/// Scalars always replace. Top-level property mappings are always merged key
/// by key; the policy only governs nested values.
///
/// # Examples
///
/// ```
/// use schema_inherit_core::{MergePolicy, SequenceMode};
///
/// let policy: MergePolicy = serde_json::from_str(r#"{"sequences": "merge"}"#).unwrap();
/// assert_eq!(policy.sequences, SequenceMode::Merge);
/// assert_eq!(policy, MergePolicy::default().with_sequences(SequenceMode::Merge));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePolicy {
    /// Sequence handling.
    pub sequences: SequenceMode,
    /// Nested mapping handling.
    pub mappings: MappingMode,
}

impl MergePolicy {
    /// Sets the sequence handling.
    pub fn with_sequences(mut self, sequences: SequenceMode) -> Self {
        self.sequences = sequences;
        self
    }

    /// Sets the nested mapping handling.
    pub fn with_mappings(mut self, mappings: MappingMode) -> Self {
        self.mappings = mappings;
        self
    }
}

/// Options for [`topo_merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Container handling applied at every merge step.
    #[serde(flatten)]
    pub policy: MergePolicy,
    /// Leave the identifier out of merged output (default `true`).
    pub omit_id: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            policy: MergePolicy::default(),
            omit_id: true,
        }
    }
}

impl MergeOptions {
    /// Creates default options: sequences replaced, identifiers omitted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the merge policy.
    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets whether the identifier is left out of merged output.
    pub fn with_omit_id(mut self, omit_id: bool) -> Self {
        self.omit_id = omit_id;
        self
    }
}

/// Merges `overlay` over `base`.
///
/// Keys only in `base` are kept, keys only in `overlay` are added, and for
/// keys in both the overlay value wins unless both values are containers the
/// policy merges. An overlay value of [`Value::Absent`] or [`Value::Null`]
/// clears the base value. Key order is base keys first, then new overlay keys.
///
/// # Examples
///
/// ```
/// use schema_inherit_core::{MergePolicy, Value, deep_merge};
///
/// let base = Value::from(serde_json::json!({ "a": { "x": 1 }, "list": [1, 2] }));
/// let overlay = Value::from(serde_json::json!({ "a": { "y": 2 }, "list": [3] }));
///
/// let merged = deep_merge(
///     base.as_mapping().unwrap(),
///     overlay.as_mapping().unwrap(),
///     MergePolicy::default(),
/// );
/// assert_eq!(
///     Value::Mapping(merged),
///     Value::from(serde_json::json!({ "a": { "x": 1, "y": 2 }, "list": [3] })),
/// );
/// ```
pub fn deep_merge(base: &Mapping, overlay: &Mapping, policy: MergePolicy) -> Mapping {
    let mut merged = base.clone();
    for (key, value) in overlay {
        let combined = match merged.get(key) {
            Some(existing) => merge_values(existing, value, policy),
            None => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    merged
}

fn merge_values(base: &Value, overlay: &Value, policy: MergePolicy) -> Value {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay))
            if policy.mappings == MappingMode::Merge =>
        {
            Value::Mapping(deep_merge(base, overlay, policy))
        }
        (Value::Sequence(base), Value::Sequence(overlay))
            if policy.sequences == SequenceMode::Merge =>
        {
            let mut items = base.clone();
            items.extend(
                overlay
                    .iter()
                    .filter(|item| !base.contains(item))
                    .cloned(),
            );
            Value::Sequence(items)
        }
        _ => overlay.clone(),
    }
}

/// Resolves inheritance across a fragment collection.
///
/// Accepts a keyed map or an ordered list of `(identifier, fragment)` pairs
/// and returns one fully merged property mapping per identifier, in input
/// order. Control keys never appear in the output; the identifier appears as
/// the first key only when [`MergeOptions::omit_id`] is `false`.
///
/// # Errors
///
/// Fails with [`IdentifierMismatch`](crate::InheritError::IdentifierMismatch),
/// [`SelfReference`](crate::InheritError::SelfReference),
/// [`UnknownParent`](crate::InheritError::UnknownParent), or
/// [`CyclicDependency`](crate::InheritError::CyclicDependency). No partial
/// result is returned.
///
/// # Examples
///
/// ```
/// use schema_inherit_core::*;
///
/// let err = topo_merge(
///     vec![("a", Fragment::new().with_extends("missing"))],
///     &MergeOptions::default(),
/// )
/// .unwrap_err();
/// assert!(matches!(err, InheritError::UnknownParent { .. }));
/// ```
pub fn topo_merge<I, K, F>(input: I, options: &MergeOptions) -> Result<IndexMap<String, Mapping>>
where
    I: IntoIterator<Item = (K, F)>,
    K: Into<String>,
    F: Into<Fragment>,
{
    let graph = Graph::resolve(normalize(input)?)?;
    let sorted = graph.sorted()?;

    let mut engine = MergeEngine::new(&graph, options);
    for id in sorted {
        engine.process(id);
    }
    Ok(engine.finish())
}

/// Per-call memo of merged nodes.
struct MergeEngine<'a> {
    graph: &'a Graph,
    options: &'a MergeOptions,
    merged: Vec<Option<Mapping>>,
}

impl<'a> MergeEngine<'a> {
    fn new(graph: &'a Graph, options: &'a MergeOptions) -> Self {
        Self {
            graph,
            options,
            merged: vec![None; graph.len()],
        }
    }

    fn process(&mut self, id: NodeId) {
        if self.merged[id].is_some() {
            return;
        }
        let graph = self.graph;
        let node = &graph.nodes()[id];
        let policy = self.options.policy;

        for &parent in &node.parents {
            self.process(parent);
        }

        let mut inherited = Mapping::new();
        for &parent in &node.parents {
            if let Some(ancestry) = &self.merged[parent] {
                inherited = deep_merge(&inherited, ancestry, policy);
            }
        }

        let merged = deep_merge(&inherited, &self.contribution(node), policy);
        trace!(id = %node.id, parents = node.parents.len(), keys = merged.len(), "merged fragment");
        self.merged[id] = Some(merged);
    }

    /// Own properties of a node as they enter a merge.
    fn contribution(&self, node: &Node) -> Mapping {
        if self.options.omit_id {
            return node.properties.clone();
        }
        let mut own = Mapping::with_capacity(node.properties.len() + 1);
        own.insert(ID_KEY.to_string(), Value::from(node.id.as_str()));
        own.extend(
            node.properties
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        own
    }

    fn finish(self) -> IndexMap<String, Mapping> {
        debug!(fragments = self.merged.len(), "merged fragment collection");
        self.graph
            .nodes()
            .iter()
            .zip(self.merged)
            .map(|(node, merged)| (node.id.clone(), merged.unwrap_or_default()))
            .collect()
    }
}
