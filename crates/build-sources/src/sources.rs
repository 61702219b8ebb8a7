//! Finder configuration and list export for build source discovery.

use std::fs;
use std::path::{Path, PathBuf};

use finder::{CacheParams, DirMatches, DirView, Finder, FinderError};

use crate::config::BuildConfig;
use crate::error::{SourcesError, SourcesResult};
use crate::list_file::write_if_changed;

pub const FILES_DB_NAME: &str = "files.db";
/// Marker placed in the output directory so the finder never descends into it.
pub const OUT_DIR_MARKER: &str = ".out-dir";
pub const ANDROID_MK_LIST: &str = "Android.mk.list";
pub const CLEAN_SPEC_LIST: &str = "CleanSpec.mk.list";
pub const ANDROID_BP_LIST: &str = "Android.bp.list";

const EXCLUDE_DIRS: [&str; 2] = [".git", ".repo"];
const PRUNE_FILES: [&str; 2] = [OUT_DIR_MARKER, ".find-ignore"];
const INCLUDE_FILES: [&str; 4] = ["Android.mk", "Android.bp", "Blueprints", "CleanSpec.mk"];

/// Traversal rules for scanning a source tree rooted at `working_dir`.
pub fn source_finder_params(working_dir: &Path) -> CacheParams {
    CacheParams::new(working_dir)
        .with_root_dirs(["."])
        .with_exclude_dirs(EXCLUDE_DIRS)
        .with_prune_files(PRUNE_FILES)
        .with_include_files(INCLUDE_FILES)
}

/// Creates a finder over the source tree of `config`, reusing the cache in
/// its file list directory.
///
/// Callers should call [`Finder::shutdown`] when done so the refreshed cache
/// is saved.
pub fn new_source_finder(config: &BuildConfig) -> SourcesResult<Finder> {
    let _span = tracing::info_span!("find_modules").entered();

    let working_dir = fs::canonicalize(&config.working_dir).map_err(|error| {
        FinderError::fatal_scan(
            &config.working_dir,
            format!("no working directory for module finder: {error}"),
        )
    })?;
    prepare_out_dir(config)?;
    let cache_path = config.file_list_dir().join(FILES_DB_NAME);
    let finder = Finder::open(source_finder_params(&working_dir), cache_path)?;

    let stats = finder.stats();
    tracing::debug!(
        "module finder ready: {} directories listed, {} reused",
        stats.dirs_listed,
        stats.dirs_reused
    );
    Ok(finder)
}

/// Creates the file list directory and the output directory's prune marker
/// before scanning, so writing lists and the cache later does not touch any
/// directory the finder looks at.
fn prepare_out_dir(config: &BuildConfig) -> SourcesResult<()> {
    let dump_dir = config.file_list_dir();
    fs::create_dir_all(&dump_dir).map_err(|error| SourcesError::Io {
        operation: "create file list directory",
        path: dump_dir.clone(),
        source: error,
    })?;

    let marker = config.resolved_out_dir().join(OUT_DIR_MARKER);
    if !marker.exists() {
        fs::write(&marker, b"").map_err(|error| SourcesError::Io {
            operation: "create output directory marker",
            path: marker.clone(),
            source: error,
        })?;
    }
    Ok(())
}

/// Which list files [`find_sources`] produced and whether each changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLists {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
}

impl SourceLists {
    fn record(&mut self, path: PathBuf, written: bool) {
        if written {
            self.written.push(path);
        } else {
            self.unchanged.push(path);
        }
    }
}

/// Queries `finder` for build files and exports them to the file list
/// directory of `config`.
///
/// The list directory comes from `config` rather than from the finder, so a
/// single finder can serve several build configurations.
pub fn find_sources(config: &BuildConfig, finder: &Finder) -> SourcesResult<SourceLists> {
    let _span = tracing::info_span!("find_sources").entered();

    let dump_dir = config.file_list_dir();
    fs::create_dir_all(&dump_dir).map_err(|error| SourcesError::Io {
        operation: "create file list directory",
        path: dump_dir.clone(),
        source: error,
    })?;

    let mut lists = SourceLists::default();

    let android_mks = finder.find_first_named_at(".", "Android.mk");
    let path = dump_dir.join(ANDROID_MK_LIST);
    lists.record(path.clone(), write_if_changed(&android_mks, &path)?);

    let clean_specs = finder.find_first_named_at(".", "CleanSpec.mk");
    let path = dump_dir.join(CLEAN_SPEC_LIST);
    lists.record(path.clone(), write_if_changed(&clean_specs, &path)?);

    let android_bps = finder.find_matching(".", blueprint_files);
    let path = dump_dir.join(ANDROID_BP_LIST);
    lists.record(path.clone(), write_if_changed(&android_bps, &path)?);

    tracing::debug!(
        "found {} Android.mk, {} CleanSpec.mk, {} blueprint files",
        android_mks.len(),
        clean_specs.len(),
        android_bps.len()
    );
    Ok(lists)
}

/// Matches `Android.bp` and `Blueprints` in every directory.
fn blueprint_files(view: &DirView<'_>) -> DirMatches {
    let files = view
        .file_names
        .iter()
        .filter(|name| matches!(name.as_str(), "Android.bp" | "Blueprints"))
        .cloned()
        .collect();
    DirMatches::descend_all(view, files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_follow_source_tree_rules() {
        let params = source_finder_params(Path::new("/src/tree"));
        assert_eq!(params.root_dirs, vec!["."]);
        assert!(params.is_excluded(".git"));
        assert!(params.is_excluded(".repo"));
        assert!(params.is_prune_marker(".out-dir"));
        assert!(params.is_prune_marker(".find-ignore"));
        for name in ["Android.mk", "Android.bp", "Blueprints", "CleanSpec.mk"] {
            assert!(params.is_included(name), "{name} should be included");
        }
        assert!(!params.is_included("Makefile"));
    }

    #[test]
    fn blueprint_predicate_selects_both_names() {
        let dirs = vec!["sub".to_string()];
        let files = vec![
            "Android.bp".to_string(),
            "Android.mk".to_string(),
            "Blueprints".to_string(),
        ];
        let view = DirView {
            path: ".",
            dir_names: &dirs,
            file_names: &files,
        };
        assert_eq!(
            blueprint_files(&view),
            DirMatches::new(
                vec!["sub".to_string()],
                vec!["Android.bp".to_string(), "Blueprints".to_string()]
            )
        );
    }
}
