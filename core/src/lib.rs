//! Multiple inheritance for schema fragments.
//!
//! Fragments are named property mappings that may declare parents through a
//! reserved `extends` key. This crate resolves those declarations and produces,
//! for every fragment, a merged mapping reflecting its entire ancestry:
//!
//! - [`normalize`]: injects each collection key as the fragment identifier
//!   and rejects mismatching explicit ids.
//! - [`Graph::resolve`]: turns parent identifiers into references into a
//!   shared node arena, rejecting self-references and unknown parents.
//! - [`topo_sort`]: orders nodes so ancestors precede descendants, rejecting
//!   cycles.
//! - [`topo_merge`]: runs the whole pipeline and deep-merges each fragment
//!   over its merged parents using a [`MergePolicy`].
//!
//! Everything is a pure, synchronous, in-memory computation over the input
//! snapshot. Recursion depth is bounded by the longest ancestry chain.
//!
//! # Example
//!
//! ```
//! use schema_inherit_core::*;
//!
//! let merged = topo_merge(
//!     vec![
//!         ("a", Fragment::new().with_property("x", 1)),
//!         ("b", Fragment::new().with_property("y", 2)),
//!         (
//!             "c",
//!             Fragment::new()
//!                 .with_extends(["a", "b"].into_iter().collect::<Extends>())
//!                 .with_property("z", 3),
//!         ),
//!     ],
//!     &MergeOptions::default(),
//! )
//! .unwrap();
//!
//! let c = &merged["c"];
//! assert_eq!(c["x"], Value::from(1));
//! assert_eq!(c["y"], Value::from(2));
//! assert_eq!(c["z"], Value::from(3));
//! ```

mod error;
mod fragment;
mod graph;
mod merge;
mod normalize;
mod value;

pub use error::{InheritError, Result};
pub use fragment::{EXTENDS_KEY, Extends, Fragment, ID_KEY};
pub use graph::{Graph, Node, NodeId, topo_sort};
pub use merge::{MappingMode, MergeOptions, MergePolicy, SequenceMode, deep_merge, topo_merge};
pub use normalize::{NormalizedNode, normalize};
pub use value::{Mapping, Value};
