//! Parent graph resolution and topological ordering.
//!
//! Nodes live in a single arena owned by [`Graph`]; a node refers to its
//! parents by [`NodeId`], so a parent shared by many children is the very same
//! node for each of them. Resolution walks parents depth-first but never
//! re-enters a node already on the walk, so a cyclic declaration resolves
//! fine and is only rejected by [`topo_sort`].
//!
//! # Example
//!
//! ```
//! use schema_inherit_core::{Fragment, Graph, normalize};
//!
//! let nodes = normalize(vec![
//!     ("child", Fragment::new().with_extends("base")),
//!     ("base", Fragment::new()),
//! ])
//! .unwrap();
//! let graph = Graph::resolve(nodes).unwrap();
//!
//! let order: Vec<_> = graph.sorted().unwrap().into_iter().map(|id| graph.id(id)).collect();
//! assert_eq!(order, vec!["base", "child"]);
//! ```

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::{InheritError, Result};
use crate::normalize::NormalizedNode;
use crate::value::Mapping;

/// Index of a node inside its [`Graph`].
pub type NodeId = usize;

/// A fragment with resolved parent references.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique identifier (the fragment's collection key).
    pub id: String,
    /// Own properties, free of control keys.
    pub properties: Mapping,
    /// Parents in declaration order, deduplicated.
    pub parents: Vec<NodeId>,
}

/// Arena of resolved nodes with an identifier lookup.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    lookup: HashMap<String, NodeId>,
}

impl Graph {
    /// Resolves declared parent identifiers into node references.
    ///
    /// The lookup is built first, so parents may be declared in any order.
    /// Nodes are walked in input order and each declared parent is resolved
    /// depth-first before the next one is checked, so the first malformed
    /// declaration reached by that walk is the one reported. A node already on
    /// the walk is not entered again; cycles resolve and are left to
    /// [`topo_sort`].
    ///
    /// Falsy entries are dropped and repeated parents collapse to their first
    /// occurrence. Duplicate node identifiers keep the first position and the
    /// last declaration.
    ///
    /// # Errors
    ///
    /// Returns [`InheritError::SelfReference`] if a node lists itself as a
    /// parent, or [`InheritError::UnknownParent`] if a parent identifier has
    /// no node.
    pub fn resolve(nodes: Vec<NormalizedNode>) -> Result<Self> {
        let mut lookup: HashMap<String, NodeId> = HashMap::with_capacity(nodes.len());
        let mut pending: Vec<NormalizedNode> = Vec::with_capacity(nodes.len());

        for node in nodes {
            match lookup.get(&node.id) {
                Some(&index) => pending[index] = node,
                None => {
                    lookup.insert(node.id.clone(), pending.len());
                    pending.push(node);
                }
            }
        }

        let mut resolver = Resolver {
            pending: &pending,
            lookup: &lookup,
            marks: vec![Mark::Unvisited; pending.len()],
            parents: vec![Vec::new(); pending.len()],
        };
        for index in 0..pending.len() {
            resolver.visit(index)?;
        }
        let parents = resolver.parents;

        let resolved: Vec<Node> = pending
            .into_iter()
            .zip(parents)
            .map(|(node, parents)| Node {
                id: node.id,
                properties: node.properties,
                parents,
            })
            .collect();

        debug!(fragments = resolved.len(), "resolved fragment graph");
        Ok(Self {
            nodes: resolved,
            lookup,
        })
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns all nodes in input order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns a node by index.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Returns the identifier of a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    pub fn id(&self, id: NodeId) -> &str {
        &self.nodes[id].id
    }

    /// Looks up a node index by identifier.
    pub fn index_of(&self, id: &str) -> Option<NodeId> {
        self.lookup.get(id).copied()
    }

    /// Returns the direct parents of a node, in resolved order.
    pub fn parents(&self, id: NodeId) -> impl Iterator<Item = &Node> {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|node| node.parents.iter().map(|&parent| &self.nodes[parent]))
    }

    /// Topologically sorts every node, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`InheritError::CyclicDependency`] if the graph has a cycle.
    pub fn sorted(&self) -> Result<Vec<NodeId>> {
        let order: Vec<NodeId> = (0..self.nodes.len()).collect();
        topo_sort(self, &order)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Depth-first walk turning declared parent identifiers into indices.
struct Resolver<'a> {
    pending: &'a [NormalizedNode],
    lookup: &'a HashMap<String, NodeId>,
    marks: Vec<Mark>,
    parents: Vec<Vec<NodeId>>,
}

impl Resolver<'_> {
    fn visit(&mut self, index: NodeId) -> Result<()> {
        if self.marks[index] != Mark::Unvisited {
            return Ok(());
        }
        self.marks[index] = Mark::InProgress;

        let pending = self.pending;
        let node = &pending[index];
        let mut parents: Vec<NodeId> = Vec::new();
        for parent in node.extends.ids() {
            if parent == node.id {
                return Err(InheritError::SelfReference(node.id.clone()));
            }
            let Some(&parent_index) = self.lookup.get(parent) else {
                return Err(InheritError::UnknownParent {
                    node: node.id.clone(),
                    parent: parent.to_string(),
                });
            };
            self.visit(parent_index)?;
            if !parents.contains(&parent_index) {
                parents.push(parent_index);
            }
        }

        trace!(id = %node.id, parents = parents.len(), "resolved fragment parents");
        self.parents[index] = parents;
        self.marks[index] = Mark::Done;
        Ok(())
    }
}

/// Orders nodes so that every node comes after all of its transitive parents.
///
/// Depth-first: nodes are visited in the order given, each node's parents are
/// visited first in their declared order. Repeated entries in `order` collapse
/// to one, indices outside the graph are ignored, and a node with no relation
/// to the others lands wherever the traversal reaches it.
///
/// Recursion depth equals the longest ancestry chain.
///
/// # Errors
///
/// Returns [`InheritError::CyclicDependency`] naming the node reached again
/// while it was still on the traversal path.
///
/// # Examples
///
/// ```
/// use schema_inherit_core::{Fragment, Graph, normalize, topo_sort};
///
/// let graph = Graph::resolve(
///     normalize(vec![
///         ("c", Fragment::new().with_extends("b")),
///         ("b", Fragment::new().with_extends("a")),
///         ("a", Fragment::new()),
///     ])
///     .unwrap(),
/// )
/// .unwrap();
///
/// let sorted = topo_sort(&graph, &[0, 0, 1, 2, 0]).unwrap();
/// let ids: Vec<_> = sorted.iter().map(|&id| graph.id(id)).collect();
/// assert_eq!(ids, vec!["a", "b", "c"]);
/// ```
pub fn topo_sort(graph: &Graph, order: &[NodeId]) -> Result<Vec<NodeId>> {
    let mut marks = vec![Mark::Unvisited; graph.len()];
    let mut sorted = Vec::with_capacity(graph.len());

    for &id in order {
        if marks.get(id) == Some(&Mark::Unvisited) {
            visit(graph, id, &mut marks, &mut sorted)?;
        }
    }

    debug!(
        order = ?sorted.iter().map(|&id| graph.id(id)).collect::<Vec<_>>(),
        "sorted fragment graph"
    );
    Ok(sorted)
}

fn visit(graph: &Graph, id: NodeId, marks: &mut [Mark], sorted: &mut Vec<NodeId>) -> Result<()> {
    match marks[id] {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            return Err(InheritError::CyclicDependency(graph.id(id).to_string()));
        }
        Mark::Unvisited => {}
    }

    marks[id] = Mark::InProgress;
    for &parent in &graph.nodes[id].parents {
        visit(graph, parent, marks, sorted)?;
    }
    marks[id] = Mark::Done;
    sorted.push(id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::fragment::Fragment;
    use crate::normalize::normalize;

    fn graph(input: serde_json::Value) -> Result<Graph> {
        let serde_json::Value::Object(map) = input else {
            panic!("test input must be an object");
        };
        let fragments: Vec<(String, Fragment)> = map
            .into_iter()
            .map(|(id, value)| (id, Fragment::try_from(value).unwrap()))
            .collect();
        Graph::resolve(normalize(fragments)?)
    }

    fn ids(graph: &Graph, order: &[NodeId]) -> String {
        order
            .iter()
            .map(|&id| graph.id(id))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn index(graph: &Graph, id: &str) -> NodeId {
        graph.index_of(id).unwrap()
    }

    #[test]
    fn test_resolve_links_parents_by_index() {
        let graph = graph(json!({
            "a": {},
            "b": { "extends": ["a"] },
        }))
        .unwrap();
        let b = index(&graph, "b");
        assert_eq!(graph.get(b).unwrap().parents, vec![index(&graph, "a")]);
        assert_eq!(graph.parents(b).next().unwrap().id, "a");
    }

    #[test]
    fn test_resolve_collapses_repeated_parents() {
        let graph = graph(json!({
            "a": {},
            "b": { "extends": ["a"] },
            "c": { "extends": ["b", "a", "a", "b"] },
        }))
        .unwrap();
        let c = graph.get(index(&graph, "c")).unwrap();
        assert_eq!(c.parents, vec![index(&graph, "b"), index(&graph, "a")]);
    }

    #[test]
    fn test_resolve_shares_parent_between_children() {
        let graph = graph(json!({
            "base": {},
            "left": { "extends": "base" },
            "right": { "extends": "base" },
        }))
        .unwrap();
        let left = graph.get(index(&graph, "left")).unwrap();
        let right = graph.get(index(&graph, "right")).unwrap();
        assert_eq!(left.parents, right.parents);
    }

    #[test]
    fn test_resolve_rejects_self_reference() {
        let err = graph(json!({ "a": { "foo": "bar", "extends": ["a"] } })).unwrap_err();
        assert_eq!(err, InheritError::SelfReference("a".to_string()));
    }

    #[test]
    fn test_resolve_rejects_unknown_parent() {
        let err = graph(json!({
            "a": { "foo": "bar" },
            "b": { "extends": ["c"], "baz": "bat" },
        }))
        .unwrap_err();
        assert_eq!(
            err,
            InheritError::UnknownParent {
                node: "b".to_string(),
                parent: "c".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_reports_first_error_reached_depth_first() {
        let err = graph(json!({
            "a": { "extends": ["b", "missing"] },
            "b": { "extends": ["b"] },
        }))
        .unwrap_err();
        assert_eq!(err, InheritError::SelfReference("b".to_string()));
    }

    #[test]
    fn test_resolve_follows_parents_before_later_siblings() {
        let err = graph(json!({
            "a": { "extends": ["b", "ghost"] },
            "b": { "extends": ["phantom"] },
        }))
        .unwrap_err();
        assert_eq!(
            err,
            InheritError::UnknownParent {
                node: "b".to_string(),
                parent: "phantom".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_terminates_on_cycle() {
        let graph = graph(json!({
            "a": { "extends": "b" },
            "b": { "extends": ["a", "c"] },
            "c": {},
        }))
        .unwrap();
        let b = graph.get(index(&graph, "b")).unwrap();
        assert_eq!(b.parents, vec![index(&graph, "a"), index(&graph, "c")]);
        assert!(matches!(
            graph.sorted(),
            Err(InheritError::CyclicDependency(_))
        ));
    }

    #[test]
    fn test_resolve_keeps_input_order() {
        let graph = graph(json!({
            "d": { "extends": "c" },
            "c": { "extends": "b" },
            "b": {},
        }))
        .unwrap();
        let order: Vec<NodeId> = (0..graph.len()).collect();
        assert_eq!(ids(&graph, &order), "d,c,b");
    }

    #[test]
    fn test_topo_sort_chain_with_duplicates() {
        let graph = graph(json!({
            "a": {},
            "b": { "extends": ["a"] },
            "c": { "extends": ["b"] },
            "d": { "extends": ["c"] },
        }))
        .unwrap();
        let (a, b, c, d) = (
            index(&graph, "a"),
            index(&graph, "b"),
            index(&graph, "c"),
            index(&graph, "d"),
        );

        let sorted = topo_sort(&graph, &[d, d, b, a, c, b, d, b, b, b, a, a]).unwrap();
        assert_eq!(ids(&graph, &sorted), "a,b,c,d");
    }

    #[test]
    fn test_topo_sort_places_disconnected_node_by_traversal() {
        let graph = graph(json!({
            "a": {},
            "b": {},
            "c": { "extends": ["a", "b"] },
            "e": { "extends": ["c"] },
            "d": {},
        }))
        .unwrap();
        let (a, b, c, d, e) = (
            index(&graph, "a"),
            index(&graph, "b"),
            index(&graph, "c"),
            index(&graph, "d"),
            index(&graph, "e"),
        );

        let sorted = topo_sort(&graph, &[e, d, d, b, a, c, b, d, e, e, b, b, b, a, a]).unwrap();
        assert_eq!(ids(&graph, &sorted), "a,b,c,e,d");

        let sorted = topo_sort(&graph, &[d, e, c, b, a]).unwrap();
        assert_eq!(ids(&graph, &sorted), "d,a,b,c,e");
    }

    #[test]
    fn test_topo_sort_handles_diamond() {
        let graph = graph(json!({
            "bottom": { "extends": ["left", "right"] },
            "left": { "extends": "top" },
            "right": { "extends": "top" },
            "top": {},
        }))
        .unwrap();
        let sorted = graph.sorted().unwrap();
        assert_eq!(ids(&graph, &sorted), "top,left,right,bottom");
    }

    #[test]
    fn test_topo_sort_detects_cycle() {
        let graph = graph(json!({
            "a": { "extends": "b" },
            "b": { "extends": "c" },
            "c": { "extends": "a" },
        }))
        .unwrap();
        let err = graph.sorted().unwrap_err();
        assert_eq!(err, InheritError::CyclicDependency("a".to_string()));
    }

    #[test]
    fn test_topo_sort_is_idempotent() {
        let graph = graph(json!({
            "e": { "extends": ["c"] },
            "d": {},
            "c": { "extends": ["a", "b"] },
            "b": {},
            "a": {},
        }))
        .unwrap();
        let first = graph.sorted().unwrap();
        let second = topo_sort(&graph, &first).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_topo_sort_ignores_foreign_indices() {
        let graph = graph(json!({ "a": {} })).unwrap();
        let sorted = topo_sort(&graph, &[7, 0]).unwrap();
        assert_eq!(ids(&graph, &sorted), "a");
    }

    /// Random DAG: node `i` may only extend nodes with a smaller index.
    fn arb_dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
        (1usize..24).prop_flat_map(|size| {
            (0..size)
                .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(3)))
                .collect::<Vec<_>>()
        })
    }

    fn dag_graph(edges: &[Vec<usize>]) -> Graph {
        let fragments: Vec<(String, Fragment)> = edges
            .iter()
            .enumerate()
            .rev()
            .map(|(i, parents)| {
                let extends: crate::Extends = parents.iter().map(|p| format!("n{p}")).collect();
                (format!("n{i}"), Fragment::new().with_extends(extends))
            })
            .collect();
        Graph::resolve(normalize(fragments).unwrap()).unwrap()
    }

    proptest! {
        #[test]
        fn prop_parents_precede_children(edges in arb_dag()) {
            let graph = dag_graph(&edges);
            let sorted = graph.sorted().unwrap();
            prop_assert_eq!(sorted.len(), graph.len());

            let position: HashMap<NodeId, usize> =
                sorted.iter().enumerate().map(|(pos, &id)| (id, pos)).collect();
            for node in 0..graph.len() {
                for &parent in &graph.get(node).unwrap().parents {
                    prop_assert!(position[&parent] < position[&node]);
                }
            }
        }

        #[test]
        fn prop_sorting_sorted_output_is_stable(edges in arb_dag()) {
            let graph = dag_graph(&edges);
            let sorted = graph.sorted().unwrap();
            prop_assert_eq!(topo_sort(&graph, &sorted).unwrap(), sorted);
        }
    }
}
