//! Fragment collection loading and run configuration.
//!
//! This crate reads schema fragment collections from JSON and YAML sources
//! (single files, directories with one fragment per file, or both combined)
//! and hands them to [`schema_inherit_core`] for inheritance resolution.
//!
//! # Quick start
//!
//! ```no_run
//! use schema_inherit_core::MergeOptions;
//! use schema_inherit_loader::{FragmentSet, MergeConfig};
//!
//! // Load fragments from a directory and merge them
//! let set = FragmentSet::from_dir("fragments/").unwrap();
//! let merged = set.merge(&MergeOptions::default()).unwrap();
//! println!("{} fragments merged", merged.len());
//!
//! // Combine sources named in a run configuration
//! let config = MergeConfig::load("schema-inherit.yml").unwrap();
//! let set = config.builder().build().unwrap();
//! let order = set.order().unwrap();
//! ```

mod config;
mod error;
mod loader;

pub use config::MergeConfig;
pub use error::{LoaderError, Result};
pub use loader::{Format, FragmentSet, FragmentSetBuilder, FragmentSource};
