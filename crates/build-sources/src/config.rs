use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{SourcesError, SourcesResult};

/// Environment variable naming the build output directory.
pub const OUT_DIR_ENV: &str = "OUT_DIR";
pub const DEFAULT_OUT_DIR: &str = "out";
/// Directory below the output directory that holds the module lists.
pub const FILE_LIST_DIR_NAME: &str = ".module_paths";

/// The slice of build configuration that source discovery needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Root of the source tree.
    pub working_dir: PathBuf,
    /// Build output directory; relative paths are below `working_dir`.
    pub out_dir: PathBuf,
}

/// On-disk form; any missing field falls back to the environment.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuildConfigFile {
    working_dir: Option<PathBuf>,
    out_dir: Option<PathBuf>,
}

impl BuildConfig {
    pub fn new(working_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            out_dir: out_dir.into(),
        }
    }

    /// Uses the process working directory and `$OUT_DIR` (default `out`).
    pub fn from_env() -> SourcesResult<Self> {
        let working_dir = env::current_dir().map_err(|error| SourcesError::Config {
            path: PathBuf::from("."),
            reason: format!("no working directory: {error}"),
        })?;
        let out_dir = env::var_os(OUT_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));
        Ok(Self::new(working_dir, out_dir))
    }

    /// Reads a JSON config file, filling missing fields from the environment.
    pub fn load(path: &Path) -> SourcesResult<Self> {
        let bytes = std::fs::read(path).map_err(|error| SourcesError::Io {
            operation: "read build config",
            path: path.to_path_buf(),
            source: error,
        })?;
        let file: BuildConfigFile =
            serde_json::from_slice(&bytes).map_err(|error| SourcesError::Config {
                path: path.to_path_buf(),
                reason: error.to_string(),
            })?;

        let defaults = Self::from_env()?;
        Ok(Self {
            working_dir: file.working_dir.unwrap_or(defaults.working_dir),
            out_dir: file.out_dir.unwrap_or(defaults.out_dir),
        })
    }

    /// The output directory, resolved against the working directory.
    pub fn resolved_out_dir(&self) -> PathBuf {
        if self.out_dir.is_absolute() {
            self.out_dir.clone()
        } else {
            self.working_dir.join(&self.out_dir)
        }
    }

    /// Directory holding the module lists and the finder cache.
    pub fn file_list_dir(&self) -> PathBuf {
        self.resolved_out_dir().join(FILE_LIST_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn relative_out_dir_is_below_working_dir() {
        let config = BuildConfig::new("/src/tree", "out");
        assert_eq!(
            config.file_list_dir(),
            PathBuf::from("/src/tree/out/.module_paths")
        );
    }

    #[test]
    fn absolute_out_dir_is_kept() {
        let config = BuildConfig::new("/src/tree", "/build/out");
        assert_eq!(
            config.file_list_dir(),
            PathBuf::from("/build/out/.module_paths")
        );
    }

    #[test]
    fn loads_json_config() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("build.json");
        std::fs::write(
            &path,
            r#"{ "working_dir": "/src/tree", "out_dir": "/build/out" }"#,
        )
        .expect("write config");

        let config = BuildConfig::load(&path).expect("load");
        assert_eq!(config, BuildConfig::new("/src/tree", "/build/out"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("build.json");
        std::fs::write(&path, r#"{ "out_dir": "/build/out" }"#).expect("write config");

        let config = BuildConfig::load(&path).expect("load");
        assert_eq!(config.out_dir, PathBuf::from("/build/out"));
        assert_eq!(config.working_dir, env::current_dir().expect("cwd"));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("build.json");
        std::fs::write(&path, r#"{ "outdir": 3 }"#).expect("write config");

        let err = BuildConfig::load(&path).expect_err("invalid config");
        match err {
            SourcesError::Config { .. } => {}
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let dir = tempdir().expect("tempdir");
        let err = BuildConfig::load(&dir.path().join("absent.json")).expect_err("missing");
        assert!(matches!(err, SourcesError::Io { .. }));
    }
}
