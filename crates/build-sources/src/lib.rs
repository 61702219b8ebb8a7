//! Build source discovery.
//!
//! Finds the files that drive a build (module definitions, clean specs,
//! blueprint files) with a cached [`finder::Finder`] and writes them to list
//! files that are only touched when their content changes.

pub mod config;
pub mod error;
pub mod list_file;
pub mod sources;

pub use crate::config::BuildConfig;
pub use crate::error::{SourcesError, SourcesResult};
pub use crate::list_file::write_if_changed;
pub use crate::sources::{find_sources, new_source_finder, source_finder_params, SourceLists};
