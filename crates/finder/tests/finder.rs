use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, UNIX_EPOCH};

use finder::fs::DirChild;
use finder::{
    CacheParams, CancellationToken, DirMatches, DirStamp, DirView, FileSystem, Finder,
    FinderError, OsFs,
};
use tempfile::TempDir;

/// Real filesystem that records every directory it lists.
struct CountingFs {
    inner: OsFs,
    listed: Mutex<Vec<String>>,
}

impl CountingFs {
    fn new(root: &Path) -> Self {
        Self {
            inner: OsFs::new(root),
            listed: Mutex::new(Vec::new()),
        }
    }

    fn listed(&self) -> Vec<String> {
        let mut listed = self.listed.lock().unwrap().clone();
        listed.sort();
        listed
    }
}

impl FileSystem for CountingFs {
    fn stat_dir(&self, path: &str) -> io::Result<DirStamp> {
        self.inner.stat_dir(path)
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirChild>> {
        self.listed.lock().unwrap().push(path.to_string());
        self.inner.read_dir(path)
    }
}

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    File::create(path).unwrap();
}

/// Gives a directory a modification time no scan has seen, independent of
/// the filesystem's timestamp granularity.
fn bump_mtime(dir: &Path, secs: u64) {
    File::open(dir)
        .unwrap()
        .set_modified(UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

fn source_params(root: &Path) -> CacheParams {
    CacheParams::new(root)
        .with_exclude_dirs([".git", ".repo"])
        .with_prune_files(["STOP", ".find-ignore"])
        .with_include_files(["Android.mk", "Android.bp", "Blueprints", "CleanSpec.mk"])
}

fn blueprint_files(view: &DirView<'_>) -> DirMatches {
    let files = view
        .file_names
        .iter()
        .filter(|name| *name == "Android.bp" || *name == "Blueprints")
        .cloned()
        .collect();
    DirMatches::descend_all(view, files)
}

struct Workspace {
    source: TempDir,
    out: TempDir,
}

impl Workspace {
    fn new(files: &[&str]) -> Self {
        let source = TempDir::new().unwrap();
        for file in files {
            touch(source.path(), file);
        }
        Self {
            source,
            out: TempDir::new().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.source.path()
    }

    fn cache_path(&self) -> std::path::PathBuf {
        self.out.path().join("files.db")
    }

    fn open(&self, fs: &dyn FileSystem) -> Finder {
        Finder::new(source_params(self.root()), fs, self.cache_path()).unwrap()
    }
}

#[test]
fn unchanged_tree_is_served_from_cache() {
    let workspace = Workspace::new(&["a/Android.bp", "a/b/Android.mk", "c/Blueprints"]);

    let first_fs = CountingFs::new(workspace.root());
    let first = workspace.open(&first_fs);
    assert_eq!(first_fs.listed(), vec![".", "a", "a/b", "c"]);
    let first_database = first.database().clone();
    let first_results = first.find_matching(".", blueprint_files);
    first.shutdown().unwrap();

    let second_fs = CountingFs::new(workspace.root());
    let second = workspace.open(&second_fs);
    assert!(second_fs.listed().is_empty());
    assert_eq!(second.stats().dirs_listed, 0);
    assert_eq!(second.stats().dirs_reused, 4);
    assert_eq!(second.database(), &first_database);
    assert_eq!(second.find_matching(".", blueprint_files), first_results);
}

#[test]
fn new_file_relists_only_its_directory() {
    let workspace = Workspace::new(&["a/Android.bp", "b/Android.bp"]);
    workspace.open(&OsFs::new(workspace.root())).shutdown().unwrap();

    touch(workspace.root(), "a/Blueprints");
    bump_mtime(&workspace.root().join("a"), 1_000_000);

    let fs = CountingFs::new(workspace.root());
    let finder = workspace.open(&fs);
    assert_eq!(fs.listed(), vec!["a"]);
    assert_eq!(
        finder.find_matching(".", blueprint_files),
        vec!["a/Android.bp", "a/Blueprints", "b/Android.bp"]
    );
}

#[test]
fn removed_directory_drops_out_of_cache() {
    let workspace = Workspace::new(&["a/Android.mk", "b/Android.mk"]);
    workspace.open(&OsFs::new(workspace.root())).shutdown().unwrap();

    fs::remove_dir_all(workspace.root().join("b")).unwrap();
    bump_mtime(workspace.root(), 1_000_000);

    let finder = workspace.open(&OsFs::new(workspace.root()));
    assert!(finder.database().get("b").is_none());
    assert_eq!(finder.find_named_at(".", "Android.mk"), vec!["a/Android.mk"]);
}

#[test]
fn prune_marker_stops_recursion() {
    let workspace = Workspace::new(&["a/STOP", "a/b/Android.bp", "c/Android.bp"]);
    let finder = workspace.open(&OsFs::new(workspace.root()));

    assert_eq!(
        finder.find_first_named_at(".", "Android.bp"),
        vec!["c/Android.bp"]
    );
    assert!(finder.database().get("a").is_some());
    assert!(finder.database().get("a/b").is_none());
}

#[test]
fn first_match_ends_the_branch() {
    let workspace = Workspace::new(&["x/Android.mk", "x/y/Android.mk", "z/w/Android.mk"]);
    let finder = workspace.open(&OsFs::new(workspace.root()));

    assert_eq!(
        finder.find_first_named_at(".", "Android.mk"),
        vec!["x/Android.mk", "z/w/Android.mk"]
    );
    assert_eq!(
        finder.find_named_at(".", "Android.mk"),
        vec!["x/Android.mk", "x/y/Android.mk", "z/w/Android.mk"]
    );
}

#[test]
fn excluded_directories_never_match() {
    let workspace = Workspace::new(&[
        ".git/Android.bp",
        ".git/hooks/Android.mk",
        "src/.git/Android.bp",
        "src/Android.bp",
    ]);
    let finder = workspace.open(&OsFs::new(workspace.root()));

    assert_eq!(finder.find_matching(".", blueprint_files), vec!["src/Android.bp"]);
    assert!(finder.find_named_at(".", "Android.mk").is_empty());
    assert!(finder.find_all().iter().all(|path| !path.contains(".git")));
}

#[test]
fn predicate_reports_every_selected_file() {
    let workspace = Workspace::new(&["Blueprints", "Android.bp", "README"]);
    let finder = workspace.open(&OsFs::new(workspace.root()));

    assert_eq!(
        finder.find_matching(".", blueprint_files),
        vec!["Android.bp", "Blueprints"]
    );
}

#[test]
fn changed_rules_rescan_everything() {
    let workspace = Workspace::new(&["a/Android.mk", "out/Android.mk"]);
    workspace.open(&OsFs::new(workspace.root())).shutdown().unwrap();

    let params = source_params(workspace.root()).with_exclude_dirs([".git", "out"]);
    let fs = CountingFs::new(workspace.root());
    let finder = Finder::new(params, &fs, workspace.cache_path()).unwrap();
    assert_eq!(fs.listed(), vec![".", "a"]);
    assert_eq!(finder.find_named_at(".", "Android.mk"), vec!["a/Android.mk"]);
}

#[test]
fn corrupt_cache_falls_back_to_full_scan() {
    let workspace = Workspace::new(&["a/Android.mk"]);
    fs::write(workspace.cache_path(), b"garbage").unwrap();

    let fs = CountingFs::new(workspace.root());
    let finder = workspace.open(&fs);
    assert_eq!(fs.listed(), vec![".", "a"]);
    finder.shutdown().unwrap();

    let fs = CountingFs::new(workspace.root());
    workspace.open(&fs);
    assert!(fs.listed().is_empty());
}

#[test]
fn cancelled_scan_is_not_persisted() {
    let workspace = Workspace::new(&["a/Android.mk"]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let finder = Finder::with_cancel(
        source_params(workspace.root()),
        &OsFs::new(workspace.root()),
        workspace.cache_path(),
        cancel,
    )
    .unwrap();
    assert!(!finder.is_complete());
    assert!(finder.find_named_at(".", "Android.mk").is_empty());

    assert!(matches!(finder.shutdown(), Err(FinderError::Cancelled)));
    assert!(!workspace.cache_path().exists());
}

#[test]
fn cancelled_rescan_keeps_previous_snapshot() {
    let workspace = Workspace::new(&["a/Android.mk"]);
    workspace.open(&OsFs::new(workspace.root())).shutdown().unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let finder = Finder::with_cancel(
        source_params(workspace.root()),
        &OsFs::new(workspace.root()),
        workspace.cache_path(),
        cancel,
    )
    .unwrap();
    assert_eq!(finder.find_named_at(".", "Android.mk"), vec!["a/Android.mk"]);
}

#[test]
fn missing_root_is_fatal() {
    let workspace = Workspace::new(&[]);
    let params = source_params(workspace.root()).with_root_dirs(["does-not-exist"]);

    let error = Finder::open(params, workspace.cache_path()).unwrap_err();
    assert!(matches!(error, FinderError::FatalScan { .. }));
    assert!(error.to_string().contains("does-not-exist"));
}

#[test]
fn named_queries_are_limited_to_included_files() {
    let workspace = Workspace::new(&["a/Makefile", "a/Android.mk"]);
    let finder = workspace.open(&OsFs::new(workspace.root()));

    assert!(finder.find_named_at(".", "Makefile").is_empty());
    assert_eq!(finder.find_first_named("Android.mk"), vec!["a/Android.mk"]);
    assert_eq!(finder.find_named("Android.mk"), vec!["a/Android.mk"]);
}

#[test]
fn queries_can_start_below_the_root() {
    let workspace = Workspace::new(&["a/b/Android.mk", "c/Android.mk"]);
    let finder = workspace.open(&OsFs::new(workspace.root()));

    assert_eq!(
        finder.find_first_named_at("./a/", "Android.mk"),
        vec!["a/b/Android.mk"]
    );
    assert!(finder.find_first_named_at("missing", "Android.mk").is_empty());
}

#[test]
fn queries_run_concurrently_on_one_snapshot() {
    let workspace = Workspace::new(&["a/Android.mk", "b/Android.bp", "c/CleanSpec.mk"]);
    let finder = workspace.open(&OsFs::new(workspace.root()));

    std::thread::scope(|scope| {
        let mk = scope.spawn(|| finder.find_first_named_at(".", "Android.mk"));
        let bp = scope.spawn(|| finder.find_matching(".", blueprint_files));
        let clean = scope.spawn(|| finder.find_first_named_at(".", "CleanSpec.mk"));
        assert_eq!(mk.join().unwrap(), vec!["a/Android.mk"]);
        assert_eq!(bp.join().unwrap(), vec!["b/Android.bp"]);
        assert_eq!(clean.join().unwrap(), vec!["c/CleanSpec.mk"]);
    });
}

#[test]
fn unwritable_cache_location_fails_shutdown() {
    let workspace = Workspace::new(&["a/Android.mk"]);
    let blocker = workspace.out.path().join("blocker");
    File::create(&blocker).unwrap();

    let finder = Finder::new(
        source_params(workspace.root()),
        &OsFs::new(workspace.root()),
        blocker.join("files.db"),
    )
    .unwrap();
    assert!(finder.is_complete());

    match finder.shutdown() {
        Err(FinderError::Io { path, .. }) => assert_eq!(path, blocker),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_directory_leaves_no_phantom_entry() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let workspace = Workspace::new(&["good/Android.bp"]);
    let bad = workspace.root().join(OsStr::from_bytes(b"bad\xff"));
    fs::create_dir(&bad).unwrap();
    File::create(bad.join("Android.bp")).unwrap();

    let finder = workspace.open(&OsFs::new(workspace.root()));
    assert_eq!(
        finder.find_matching(".", blueprint_files),
        vec!["good/Android.bp"]
    );
    assert_eq!(finder.stats().dirs_skipped, 0);
    assert!(finder
        .database()
        .entries()
        .all(|entry| !entry.path.contains('\u{FFFD}')));
}
