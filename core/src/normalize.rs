//! Keyed fragment collection → identified nodes.

use indexmap::IndexMap;
use tracing::trace;

use crate::error::{InheritError, Result};
use crate::fragment::{Extends, Fragment};
use crate::value::Mapping;

/// A fragment whose collection key has been injected as its identifier.
///
/// Parents are still the raw declaration; [`Graph::resolve`](crate::Graph::resolve)
/// turns them into node references.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedNode {
    /// Collection key of the fragment.
    pub id: String,
    /// Raw parent declaration.
    pub extends: Extends,
    /// Own properties, free of control keys.
    pub properties: Mapping,
}

/// Injects each collection key as the identifier of its fragment.
///
/// Accepts a keyed map or an ordered list of `(identifier, fragment)` pairs.
/// When an identifier appears more than once, the last fragment wins and the
/// position of the first occurrence is kept.
///
/// # Errors
///
/// Returns [`InheritError::IdentifierMismatch`] if a fragment carries an
/// explicit identifier different from its key.
///
/// # Examples
///
/// ```
/// use schema_inherit_core::{Fragment, InheritError, normalize};
///
/// let nodes = normalize(vec![("a", Fragment::new()), ("b", Fragment::new())]).unwrap();
/// assert_eq!(nodes[1].id, "b");
///
/// let mismatched = Fragment { id: Some("x".into()), ..Fragment::new() };
/// let err = normalize(vec![("a", mismatched)]).unwrap_err();
/// assert!(matches!(err, InheritError::IdentifierMismatch { .. }));
/// ```
pub fn normalize<I, K, F>(input: I) -> Result<Vec<NormalizedNode>>
where
    I: IntoIterator<Item = (K, F)>,
    K: Into<String>,
    F: Into<Fragment>,
{
    let fragments: IndexMap<String, Fragment> = input
        .into_iter()
        .map(|(key, fragment)| (key.into(), fragment.into()))
        .collect();

    fragments
        .into_iter()
        .map(|(key, fragment)| {
            if let Some(id) = fragment.id
                && id != key
            {
                return Err(InheritError::IdentifierMismatch { key, id });
            }
            trace!(id = %key, "normalized fragment");
            Ok(NormalizedNode {
                id: key,
                extends: fragment.extends,
                properties: fragment.properties,
            })
        })
        .collect()
}
