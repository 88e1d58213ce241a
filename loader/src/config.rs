//! Run configuration for merge pipelines.
//!
//! Defines the YAML-serializable configuration that names fragment sources,
//! identifiers to drop from the output, and the merge policy.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! sources:
//!   - fragments/
//!   - extra.yaml
//! exclude:
//!   - internal-base
//! merge:
//!   sequences: merge
//!   mappings: merge
//!   omit_id: true
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use schema_inherit_core::MergeOptions;
use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, Result};
use crate::loader::{FragmentSet, FragmentSetBuilder};

/// Top-level merge run configuration.
///
/// Loaded from a YAML file (typically `schema-inherit.yml` next to the
/// fragments). Relative source paths are resolved against the directory
/// holding the configuration file.
///
/// # Examples
///
/// ```
/// use schema_inherit_core::SequenceMode;
/// use schema_inherit_loader::MergeConfig;
///
/// let config: MergeConfig = serde_yaml::from_str(
///     "version: \"1.0\"\nexclude: [hidden]\nmerge: { sequences: merge }\n",
/// )
/// .unwrap();
/// assert!(config.is_excluded("hidden"));
/// assert_eq!(config.merge.policy.sequences, SequenceMode::Merge);
/// assert!(config.merge.omit_id);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Fragment files or directories, combined in order.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    /// Identifiers resolved as usual but dropped from the output.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Merge policy and output options.
    #[serde(default)]
    pub merge: MergeOptions,
}

impl MergeConfig {
    /// Creates a configuration with the given version and defaults elsewhere.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            sources: Vec::new(),
            exclude: Vec::new(),
            merge: MergeOptions::default(),
        }
    }

    /// Loads configuration from a YAML file and validates it.
    ///
    /// Relative source paths are rebased onto the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::LoaderError::IoError) if the file cannot
    /// be read, [`YamlError`](crate::LoaderError::YamlError) if parsing
    /// fails, or [`InvalidConfig`](crate::LoaderError::InvalidConfig) if
    /// validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut config: MergeConfig = serde_yaml::from_reader(reader)?;
        config.validate()?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.sources = config.source_paths(base);
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::LoaderError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::LoaderError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks the configuration for values serde cannot reject.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](crate::LoaderError::InvalidConfig) if the
    /// version is empty.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(LoaderError::InvalidConfig(
                "version must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns `true` if `id` is in the exclusion list.
    pub fn is_excluded(&self, id: &str) -> bool {
        self.exclude.iter().any(|e| e == id)
    }

    /// Returns the sources with relative paths joined onto `base`.
    pub fn source_paths(&self, base: &Path) -> Vec<PathBuf> {
        self.sources
            .iter()
            .map(|source| {
                if source.is_absolute() {
                    source.clone()
                } else {
                    base.join(source)
                }
            })
            .collect()
    }

    /// Returns a builder preloaded with every configured source.
    pub fn builder(&self) -> FragmentSetBuilder {
        self.sources
            .iter()
            .fold(FragmentSet::builder(), |builder, source| {
                builder.from_path(source)
            })
    }
}
