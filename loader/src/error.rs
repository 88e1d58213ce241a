//! Error types for fragment loading.
//!
//! Provides a unified error type covering all failure modes: I/O,
//! deserialization, collection shape, configuration, and inheritance
//! resolution.

use std::path::PathBuf;

use schema_inherit_core::InheritError;
use thiserror::Error;

/// Errors that can occur while loading or resolving fragment collections.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// File extension is not one of `json`, `yaml`, `yml`.
    #[error("unsupported fragment file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Two sources define the same fragment identifier.
    #[error("fragment '{id}' is defined more than once{}", repeated_in(.path))]
    DuplicateFragment {
        /// Identifier defined twice.
        id: String,
        /// File or directory that repeated it, if it came from disk.
        path: Option<PathBuf>,
    },

    /// A source does not hold a mapping of identifier → fragment.
    #[error("invalid fragment collection: {0}")]
    InvalidCollection(String),

    /// Run configuration failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// No source was configured.
    #[error("no fragment sources configured")]
    NoSources,

    /// The fragment graph could not be resolved.
    #[error(transparent)]
    Inherit(#[from] InheritError),
}

fn repeated_in(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" (again in {})", path.display()),
        None => String::new(),
    }
}

/// Convenience alias for results with [`LoaderError`].
pub type Result<T> = std::result::Result<T, LoaderError>;
