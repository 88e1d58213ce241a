//! Fragment collection loading with a builder for combining sources.
//!
//! Provides [`FragmentSet`] for an ordered, keyed fragment collection and
//! [`FragmentSetBuilder`] for assembling one from several files and
//! directories.
//!
//! # Loading patterns
//!
//! ```no_run
//! use schema_inherit_loader::FragmentSet;
//!
//! // A single file holding `identifier: fragment` pairs
//! let set = FragmentSet::from_file("fragments.yaml").unwrap();
//!
//! // A directory with one fragment per file, identified by file stem
//! let set = FragmentSet::from_dir("fragments/").unwrap();
//!
//! // Several sources combined in order
//! let set = FragmentSet::builder()
//!     .from_dir("fragments/")
//!     .from_file("overrides.json")
//!     .build()
//!     .unwrap();
//! ```
//!
//! Directory entries are parsed in parallel and then ordered by file name, so
//! the resulting collection order never depends on scheduling.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rayon::prelude::*;
use schema_inherit_core::{Fragment, Graph, Mapping, MergeOptions, Value, normalize, topo_merge};
use tracing::debug;

use crate::error::{LoaderError, Result};

/// Serialization format of a fragment file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `*.json`
    Json,
    /// `*.yaml` / `*.yml`
    Yaml,
}

impl Format {
    /// Detects the format from a path extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_inherit_loader::Format;
    ///
    /// assert_eq!(Format::from_path("a/base.yml"), Some(Format::Yaml));
    /// assert_eq!(Format::from_path("base.JSON"), Some(Format::Json));
    /// assert_eq!(Format::from_path("notes.txt"), None);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let extension = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }

    fn parse(self, raw: &str) -> Result<Value> {
        let value = match self {
            Format::Json => serde_json::from_str(raw)?,
            Format::Yaml => serde_yaml::from_str(raw)?,
        };
        Ok(value)
    }
}

/// Describes where a [`FragmentSet`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentSource {
    /// A single file holding a mapping of identifier → fragment.
    File(PathBuf),
    /// A directory with one fragment per file.
    Directory(PathBuf),
    /// Several sources combined in order.
    Multiple(Vec<FragmentSource>),
    /// Built in memory.
    Memory,
}

/// Ordered collection of fragments keyed by identifier.
#[derive(Debug, Clone)]
pub struct FragmentSet {
    fragments: IndexMap<String, Fragment>,
    source: FragmentSource,
}

impl Default for FragmentSet {
    fn default() -> Self {
        Self {
            fragments: IndexMap::new(),
            source: FragmentSource::Memory,
        }
    }
}

impl FragmentSet {
    /// Returns a new [`FragmentSetBuilder`].
    pub fn builder() -> FragmentSetBuilder {
        FragmentSetBuilder::new()
    }

    /// Loads a file holding a mapping of identifier → fragment.
    ///
    /// Key order in the file is kept. A null document is an empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::UnsupportedFormat`] for unknown extensions,
    /// [`LoaderError::IoError`] if the file cannot be read,
    /// [`LoaderError::JsonError`] / [`LoaderError::YamlError`] if parsing
    /// fails, or [`LoaderError::InvalidCollection`] if the document is not a
    /// mapping of fragments.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format =
            Format::from_path(path).ok_or_else(|| LoaderError::UnsupportedFormat(path.into()))?;
        let raw = std::fs::read_to_string(path)?;

        let entries = match format.parse(&raw)? {
            Value::Mapping(entries) => entries,
            Value::Null => Mapping::new(),
            _ => {
                return Err(LoaderError::InvalidCollection(format!(
                    "{} must contain a mapping of fragments",
                    path.display()
                )));
            }
        };

        let mut fragments = IndexMap::with_capacity(entries.len());
        for (id, value) in entries {
            let fragment = Fragment::try_from(value).map_err(|err| {
                LoaderError::InvalidCollection(format!(
                    "{}: fragment '{id}': {err}",
                    path.display()
                ))
            })?;
            fragments.insert(id, fragment);
        }

        debug!(path = %path.display(), fragments = fragments.len(), "loaded fragment file");
        Ok(Self {
            fragments,
            source: FragmentSource::File(path.to_path_buf()),
        })
    }

    /// Loads every `*.json`, `*.yaml` and `*.yml` file of a directory as one
    /// fragment identified by its file stem.
    ///
    /// Other files are ignored. Files are parsed in parallel; the collection
    /// is ordered by file name.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::IoError`] if the directory or a file cannot be
    /// read, a parse error for malformed files,
    /// [`LoaderError::InvalidCollection`] if a file is not a fragment, or
    /// [`LoaderError::DuplicateFragment`] if two files share a stem.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.is_file()
                && let Some(format) = Format::from_path(&file_path)
            {
                files.push((file_path, format));
            }
        }
        files.sort_by(|(a, _), (b, _)| a.file_name().cmp(&b.file_name()));

        let loaded = files
            .par_iter()
            .map(|(file_path, format)| load_fragment_file(file_path, *format))
            .collect::<Result<Vec<_>>>()?;

        let mut fragments = IndexMap::with_capacity(loaded.len());
        for ((file_path, _), (id, fragment)) in files.iter().zip(loaded) {
            if fragments.contains_key(&id) {
                return Err(LoaderError::DuplicateFragment {
                    id,
                    path: Some(file_path.clone()),
                });
            }
            fragments.insert(id, fragment);
        }

        debug!(path = %path.display(), fragments = fragments.len(), "loaded fragment directory");
        Ok(Self {
            fragments,
            source: FragmentSource::Directory(path.to_path_buf()),
        })
    }

    /// Loads a directory with [`from_dir`](Self::from_dir), anything else with
    /// [`from_file`](Self::from_file).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::from_dir(path)
        } else {
            Self::from_file(path)
        }
    }

    /// Returns the fragment with the given identifier.
    pub fn get(&self, id: &str) -> Option<&Fragment> {
        self.fragments.get(id)
    }

    /// Inserts a fragment, replacing any existing entry with the same
    /// identifier in place.
    pub fn insert(&mut self, id: impl Into<String>, fragment: Fragment) {
        self.fragments.insert(id.into(), fragment);
    }

    /// Returns `true` if a fragment with the given identifier exists.
    pub fn contains(&self, id: &str) -> bool {
        self.fragments.contains_key(id)
    }

    /// Returns the number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns `true` if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Returns fragment identifiers in collection order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }

    /// Returns the underlying collection.
    pub fn fragments(&self) -> &IndexMap<String, Fragment> {
        &self.fragments
    }

    /// Returns a reference to the source metadata.
    pub fn source(&self) -> &FragmentSource {
        &self.source
    }

    /// Appends every fragment of `other`.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::DuplicateFragment`] if `other` repeats an
    /// identifier already present.
    pub fn extend(&mut self, other: FragmentSet) -> Result<()> {
        let origin = match other.source {
            FragmentSource::File(path) | FragmentSource::Directory(path) => Some(path),
            FragmentSource::Multiple(_) | FragmentSource::Memory => None,
        };
        for (id, fragment) in other.fragments {
            if self.fragments.contains_key(&id) {
                return Err(LoaderError::DuplicateFragment { id, path: origin });
            }
            self.fragments.insert(id, fragment);
        }
        Ok(())
    }

    /// Resolves inheritance and returns every fragment fully merged.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Inherit`] if the fragment graph is malformed.
    pub fn merge(&self, options: &MergeOptions) -> Result<IndexMap<String, Mapping>> {
        Ok(topo_merge(&self.fragments, options)?)
    }

    /// Returns identifiers with every ancestor before its descendants.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Inherit`] if the fragment graph is malformed.
    pub fn order(&self) -> Result<Vec<String>> {
        let graph = Graph::resolve(normalize(&self.fragments)?)?;
        let sorted = graph.sorted()?;
        Ok(sorted
            .into_iter()
            .map(|id| graph.id(id).to_string())
            .collect())
    }
}

fn load_fragment_file(path: &Path, format: Format) -> Result<(String, Fragment)> {
    let id = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| {
            LoaderError::InvalidCollection(format!("{} has no usable file stem", path.display()))
        })?
        .to_string();
    let raw = std::fs::read_to_string(path)?;
    let fragment = Fragment::try_from(format.parse(&raw)?).map_err(|err| {
        LoaderError::InvalidCollection(format!("{}: {err}", path.display()))
    })?;
    Ok((id, fragment))
}

/// Builder for combining several sources into one [`FragmentSet`].
///
/// Sources are loaded in the order they are added and concatenated. Unlike a
/// fallback chain, every source must load and identifiers must be unique
/// across all of them.
///
/// # Example
///
/// ```no_run
/// use schema_inherit_loader::FragmentSet;
///
/// let set = FragmentSet::builder()
///     .from_dir("/etc/app/fragments/")
///     .from_file("/etc/app/local.yaml")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct FragmentSetBuilder {
    sources: Vec<SourceSpec>,
}

/// A source queued on a [`FragmentSetBuilder`].
#[derive(Debug, Clone)]
enum SourceSpec {
    File(PathBuf),
    Directory(PathBuf),
}

impl SourceSpec {
    fn load(&self) -> Result<FragmentSet> {
        match self {
            SourceSpec::File(path) => FragmentSet::from_file(path),
            SourceSpec::Directory(path) => FragmentSet::from_dir(path),
        }
    }
}

impl From<SourceSpec> for FragmentSource {
    fn from(spec: SourceSpec) -> Self {
        match spec {
            SourceSpec::File(path) => FragmentSource::File(path),
            SourceSpec::Directory(path) => FragmentSource::Directory(path),
        }
    }
}

impl FragmentSetBuilder {
    /// Creates a new builder with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory with one fragment per file.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(SourceSpec::Directory(path.into()));
        self
    }

    /// Adds a file holding a mapping of fragments.
    pub fn from_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(SourceSpec::File(path.into()));
        self
    }

    /// Adds a path, treated as a directory if it is one.
    pub fn from_path(self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            self.from_dir(path)
        } else {
            self.from_file(path)
        }
    }

    /// Loads and combines all sources.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::NoSources`] if no source was added, the first
    /// load error otherwise, or [`LoaderError::DuplicateFragment`] when two
    /// sources share an identifier.
    pub fn build(self) -> Result<FragmentSet> {
        if self.sources.is_empty() {
            return Err(LoaderError::NoSources);
        }

        let mut combined = FragmentSet::default();
        for source in &self.sources {
            combined.extend(source.load()?)?;
        }

        combined.source =
            FragmentSource::Multiple(self.sources.into_iter().map(Into::into).collect());
        Ok(combined)
    }
}
