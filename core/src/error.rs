//! Error types for fragment resolution and merging.
//!
//! Every variant describes a malformed input graph. Failures are fatal to the
//! call that produced them; no partial merge result is ever returned.

use thiserror::Error;

/// Errors raised while normalizing, resolving, sorting, or merging fragments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InheritError {
    /// A fragment carries an explicit `id` that differs from its collection key.
    #[error("fragment '{key}' declares a different id '{id}'")]
    IdentifierMismatch {
        /// Key under which the fragment appears in the collection.
        key: String,
        /// Identifier found in the fragment itself.
        id: String,
    },

    /// A fragment lists itself as one of its own parents.
    #[error("fragment '{0}' cannot extend itself")]
    SelfReference(String),

    /// A fragment extends an identifier that has no fragment.
    #[error("fragment '{node}' extends unknown fragment '{parent}'")]
    UnknownParent {
        /// Fragment declaring the parent.
        node: String,
        /// Declared parent identifier that could not be found.
        parent: String,
    },

    /// The parent graph contains a directed cycle through this fragment.
    #[error("cyclic dependency detected at fragment '{0}'")]
    CyclicDependency(String),

    /// A value could not be interpreted as a fragment.
    #[error("invalid fragment: {0}")]
    InvalidFragment(String),
}

/// Convenience alias for results with [`InheritError`].
pub type Result<T> = std::result::Result<T, InheritError>;
