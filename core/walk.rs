use crate::assemble::OutputAssembler;
use crate::error::{AppError, ItemError, Result};
use crate::exclusion::{Decision, ExclusionEngine, ExclusionReason, Excluder};
use crate::ignore_oracle::{IgnoreFileOracle, IgnoreOracle};
use crate::manual::process_manual_files;
use crate::path_info::PathInfo;
use crate::rules::{ExtensionSet, RuleSet};
use crate::scan_result::{ScanAccumulator, ScanResult};
use ignore::{WalkBuilder, WalkState};
use log;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

/// Capacity of the walker → consumer queue.
pub const WALK_QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEvent {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// A finite, unordered, one-shot stream of visited paths produced on a
/// dedicated thread. Dropping it stops the walker at its next send.
pub struct Traversal {
    rx: Receiver<Result<WalkEvent>>,
    handle: Option<JoinHandle<()>>,
}

impl Iterator for Traversal {
    type Item = Result<WalkEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rx.recv() {
            Ok(item) => Some(item),
            Err(_) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        log::error!("Walker thread panicked");
                        return Some(Err(AppError::Walk("walker thread panicked".to_string())));
                    }
                }
                None
            }
        }
    }
}

/// Stops the walker from descending into directories the exclusion rules
/// already reject. The directory itself is still reported.
#[derive(Debug)]
pub struct DirPruner {
    cwd: PathBuf,
    engine: ExclusionEngine,
}

impl DirPruner {
    pub fn new(cwd: &Path, engine: ExclusionEngine) -> Self {
        DirPruner {
            cwd: cwd.to_path_buf(),
            engine,
        }
    }

    pub fn prunes(&self, dir: &Path) -> bool {
        self.engine
            .evaluate(&PathInfo::classify(dir, &self.cwd, true))
            .is_excluded()
    }
}

/// Starts walking `root` with every built-in filter of the walker switched
/// off: all rule decisions belong to the coordinator.
pub fn spawn_traversal(root: &Path) -> Traversal {
    spawn_pruned_traversal(root, None)
}

pub fn spawn_pruned_traversal(root: &Path, pruner: Option<DirPruner>) -> Traversal {
    let (tx, rx) = mpsc::sync_channel::<Result<WalkEvent>>(WALK_QUEUE_DEPTH);
    let root = root.to_path_buf();
    let pruner = pruner.map(Arc::new);

    let handle = thread::spawn(move || {
        let mut builder = WalkBuilder::new(&root);
        builder.standard_filters(false);
        builder.hidden(false);
        builder.parents(false);
        builder.ignore(false);
        builder.git_ignore(false);
        builder.git_global(false);
        builder.git_exclude(false);
        builder.require_git(false);
        builder.follow_links(false);
        let walker = builder.build_parallel();

        log::info!("Walking directory: {}", root.display());
        walker.run(|| {
            let tx_thread = tx.clone();
            let pruner = pruner.clone();

            Box::new(move |entry_result| {
                let (item, skip) = match entry_result {
                    Ok(entry) => {
                        if entry.depth() == 0 {
                            return WalkState::Continue;
                        }
                        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                        let skip = is_dir
                            && pruner.as_ref().is_some_and(|p| p.prunes(entry.path()));
                        if skip {
                            log::debug!("Not descending into {}", entry.path().display());
                        }
                        let event = WalkEvent {
                            path: entry.into_path(),
                            is_dir,
                        };
                        (Ok(event), skip)
                    }
                    Err(e) => (Err(AppError::Ignore(e)), false),
                };
                if tx_thread.send(item).is_err() {
                    log::error!("Receiver dropped for walked paths, stopping walk early.");
                    return WalkState::Quit;
                }
                if skip {
                    WalkState::Skip
                } else {
                    WalkState::Continue
                }
            })
        });
        log::debug!("Walker finished for {}", root.display());
    });

    Traversal {
        rx,
        handle: Some(handle),
    }
}

/// Path an `ignore` walk error is about, when it carries one.
fn walk_error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            walk_error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child),
        ignore::Error::Partial(errs) => errs.iter().find_map(walk_error_path),
        _ => None,
    }
}

/// True for a symlink whose target is a directory. The walker does not
/// follow links, so such entries arrive looking like files.
fn is_directory_link(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
        && fs::metadata(path).is_ok_and(|m| m.is_dir())
}

/// Applies the per-path filtering and recording contract to whatever
/// traversal primitive feeds it.
pub struct WalkCoordinator<E, O> {
    cwd: PathBuf,
    extensions: ExtensionSet,
    excluder: E,
    oracle: Option<O>,
}

impl<E: Excluder, O: IgnoreOracle> WalkCoordinator<E, O> {
    /// `oracle: None` disables ignore-file consultation.
    pub fn new(cwd: &Path, extensions: ExtensionSet, excluder: E, oracle: Option<O>) -> Self {
        WalkCoordinator {
            cwd: cwd.to_path_buf(),
            extensions,
            excluder,
            oracle,
        }
    }

    pub fn excluder(&self) -> &E {
        &self.excluder
    }

    /// Traversal failures are recorded against the path they name, or
    /// against `root` when they name none.
    pub fn consume<I>(&mut self, root: &Path, events: I, acc: &mut ScanAccumulator)
    where
        I: IntoIterator<Item = Result<WalkEvent>>,
    {
        for event in events {
            match event {
                Ok(event) => self.handle_event(event, acc),
                Err(e) => self.record_walk_error(root, e, acc),
            }
        }
    }

    fn record_walk_error(&self, root: &Path, err: AppError, acc: &mut ScanAccumulator) {
        let path = match &err {
            AppError::Ignore(inner) => walk_error_path(inner).unwrap_or(root),
            _ => root,
        };
        let display = PathInfo::classify(path, &self.cwd, true).relative;
        log::warn!("Error walking directory {}: {}", display, err);
        acc.record_error(display, ItemError::Walk(err.to_string()));
    }

    fn handle_event(&mut self, event: WalkEvent, acc: &mut ScanAccumulator) {
        if acc.is_processed(&event.path) {
            log::trace!("Already processed manually: {}", event.path.display());
            return;
        }
        let info = PathInfo::classify(&event.path, &self.cwd, event.is_dir);

        if info.is_dir {
            // Decided only to feed the excluded-directory cache.
            self.excluder.decide(&info);
            return;
        }
        if !self.extensions.allows(&info.absolute) {
            log::trace!("Extension not allowed: {}", info.relative);
            return;
        }
        if is_directory_link(&info.absolute) {
            log::debug!("Not following directory link {}", info.relative);
            return;
        }

        match self.excluder.decide(&info) {
            Decision::Exclude { reason, pattern } => {
                acc.record_excluded(info.relative, reason, pattern);
                return;
            }
            Decision::Include => {}
        }

        if let Some(oracle) = self.oracle.as_mut() {
            if oracle.is_ignored(&info.absolute, false) {
                log::trace!("Ignored by ignore files: {}", info.relative);
                acc.record_excluded(info.relative, ExclusionReason::IgnoreFile, String::new());
                return;
            }
        }

        if !acc.mark_processed(&info.absolute) {
            return;
        }
        match fs::read(&info.absolute) {
            Ok(content) => {
                log::trace!("Read {} ({} bytes)", info.relative, content.len());
                acc.record_scanned(info.relative, content);
            }
            Err(e) => acc.record_error(info.relative, ItemError::from(e)),
        }
    }
}

/// Everything one invocation needs. Paths are absolute; `cwd` anchors
/// CWD-relative patterns and displayed paths.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub root: PathBuf,
    pub cwd: PathBuf,
    pub extensions: ExtensionSet,
    pub manual_paths: Vec<PathBuf>,
    pub basename_patterns: Vec<String>,
    pub cwd_patterns: Vec<String>,
    pub use_ignore_files: bool,
    /// Skip the contents of excluded directories instead of listing each
    /// excluded file below them.
    pub prune_excluded_dirs: bool,
    pub header: String,
    pub marker: String,
}

/// Outcome of one scan. `fatal` carries a scan-level failure next to
/// whatever was collected before it.
#[derive(Debug)]
pub struct ScanReport {
    pub result: ScanResult,
    pub output: Vec<u8>,
    pub excluded_dirs: BTreeMap<String, String>,
    pub fatal: Option<AppError>,
}

pub fn validate_root(root: &Path) -> Result<()> {
    match fs::metadata(root) {
        Ok(m) if m.is_dir() => Ok(()),
        Ok(_) => Err(AppError::ScanRoot {
            path: root.to_path_buf(),
            reason: "is not a directory".to_string(),
        }),
        Err(e) => Err(AppError::ScanRoot {
            path: root.to_path_buf(),
            reason: format!("cannot be accessed: {}", e),
        }),
    }
}

/// Manual files first, then the walk of `request.root`.
pub fn run_scan(request: &ScanRequest) -> Result<ScanReport> {
    let basename = RuleSet::basename(&request.basename_patterns)?;
    let cwd_relative = RuleSet::cwd_relative(&request.cwd_patterns)?;
    let pruner = request.prune_excluded_dirs.then(|| {
        DirPruner::new(
            &request.cwd,
            ExclusionEngine::new(basename.clone(), cwd_relative.clone()),
        )
    });
    let engine = ExclusionEngine::new(basename, cwd_relative);
    let oracle = request
        .use_ignore_files
        .then(|| IgnoreFileOracle::new(&request.root));
    let coordinator = WalkCoordinator::new(&request.cwd, request.extensions.clone(), engine, oracle);

    Ok(run_scan_with(request, coordinator, move |root| {
        spawn_pruned_traversal(root, pruner)
    }))
}

/// Same pipeline as [`run_scan`] with the decision components and the
/// traversal primitive supplied by the caller.
pub fn run_scan_with<E, O, F, I>(
    request: &ScanRequest,
    mut coordinator: WalkCoordinator<E, O>,
    traverse: F,
) -> ScanReport
where
    E: Excluder,
    O: IgnoreOracle,
    F: FnOnce(&Path) -> I,
    I: IntoIterator<Item = Result<WalkEvent>>,
{
    let mut acc = ScanAccumulator::new();
    let mut output = OutputAssembler::new(&request.header, &request.marker);

    process_manual_files(&request.manual_paths, &request.cwd, &mut acc, &mut output);

    let fatal = match validate_root(&request.root) {
        Ok(()) => {
            coordinator.consume(&request.root, traverse(&request.root), &mut acc);
            None
        }
        Err(e) => {
            log::error!("{}", e);
            Some(e)
        }
    };

    let result = acc.finish(&mut output);
    ScanReport {
        result,
        output: output.into_bytes(),
        excluded_dirs: coordinator.excluder().excluded_directories(),
        fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    /// Excludes by exact relative path and remembers what it was asked.
    struct ListExcluder {
        excluded: HashSet<String>,
        asked: Vec<String>,
    }

    impl Excluder for ListExcluder {
        fn decide(&mut self, info: &PathInfo) -> Decision {
            self.asked.push(info.relative.clone());
            if self.excluded.contains(&info.relative) {
                Decision::Exclude {
                    reason: ExclusionReason::CwdMatch,
                    pattern: info.relative.clone(),
                }
            } else {
                Decision::Include
            }
        }
    }

    struct NameOracle(&'static str);

    impl IgnoreOracle for NameOracle {
        fn is_ignored(&mut self, absolute: &Path, _is_dir: bool) -> bool {
            absolute.file_name().is_some_and(|n| n == self.0)
        }
    }

    fn event(path: PathBuf, is_dir: bool) -> Result<WalkEvent> {
        Ok(WalkEvent { path, is_dir })
    }

    #[test]
    fn coordinator_filters_in_order() {
        let tmp = TempDir::new().unwrap();
        let cwd = tmp.path();
        for name in ["keep.rs", "skip.rs", "hidden.rs", "notes.md"] {
            fs::write(cwd.join(name), name).unwrap();
        }
        let excluder = ListExcluder {
            excluded: HashSet::from(["skip.rs".to_string()]),
            asked: Vec::new(),
        };
        let mut coordinator = WalkCoordinator::new(
            cwd,
            ExtensionSet::new(["rs"]),
            excluder,
            Some(NameOracle("hidden.rs")),
        );
        let mut acc = ScanAccumulator::new();
        coordinator.consume(
            cwd,
            vec![
                event(cwd.join("notes.md"), false),
                event(cwd.join("hidden.rs"), false),
                event(cwd.join("skip.rs"), false),
                event(cwd.join("keep.rs"), false),
                Err(AppError::Walk("transient".into())),
                event(cwd.join("missing.rs"), false),
            ],
            &mut acc,
        );

        // Extension filtering happens before the excluder is asked.
        assert!(!coordinator.excluder().asked.contains(&"notes.md".to_string()));
        let mut out = OutputAssembler::new("", "---");
        let result = acc.finish(&mut out);
        let names: Vec<&str> = result.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(names, vec!["keep.rs"]);
        let reasons: Vec<(&str, ExclusionReason)> = result
            .excluded
            .iter()
            .map(|e| (e.path.as_str(), e.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("hidden.rs", ExclusionReason::IgnoreFile),
                ("skip.rs", ExclusionReason::CwdMatch),
            ]
        );
        assert!(matches!(result.errors.get("missing.rs"), Some(ItemError::Read(_))));
        assert!(matches!(result.errors.get("."), Some(ItemError::Walk(_))));
    }

    #[test]
    fn walk_errors_are_recorded_not_dropped() {
        let tmp = TempDir::new().unwrap();
        let cwd = tmp.path();
        fs::write(cwd.join("a.txt"), "a").unwrap();
        let denied = ignore::Error::WithPath {
            path: cwd.join("secret"),
            err: Box::new(ignore::Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            ))),
        };
        let request = ScanRequest {
            root: cwd.to_path_buf(),
            cwd: cwd.to_path_buf(),
            extensions: ExtensionSet::default(),
            manual_paths: Vec::new(),
            basename_patterns: Vec::new(),
            cwd_patterns: Vec::new(),
            use_ignore_files: false,
            prune_excluded_dirs: false,
            header: String::new(),
            marker: "---".to_string(),
        };
        let coordinator = WalkCoordinator::new(
            cwd,
            ExtensionSet::default(),
            ExclusionEngine::from_patterns::<&str, &str>(&[], &[]).unwrap(),
            None::<IgnoreFileOracle>,
        );
        let events = vec![
            event(cwd.join("a.txt"), false),
            Err(AppError::Ignore(denied)),
            Err(AppError::Walk("permission denied: sub/".into())),
        ];
        let report = run_scan_with(&request, coordinator, move |_: &Path| events);

        assert!(report.fatal.is_none());
        assert_eq!(report.result.files.len(), 1);
        assert!(report.result.has_errors());
        assert!(matches!(report.result.errors.get("secret"), Some(ItemError::Walk(_))));
        assert!(matches!(report.result.errors.get("."), Some(ItemError::Walk(_))));
    }

    #[test]
    fn pruned_directories_are_reported_but_not_entered() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("node_modules/pkg")).unwrap();
        fs::write(tmp.path().join("node_modules/pkg/index.js"), "x").unwrap();
        fs::write(tmp.path().join("main.js"), "m").unwrap();

        let engine = ExclusionEngine::from_patterns(&["node_modules"], &[] as &[&str]).unwrap();
        let pruner = DirPruner::new(tmp.path(), engine);
        let mut seen: Vec<PathBuf> = spawn_pruned_traversal(tmp.path(), Some(pruner))
            .map(|e| e.unwrap())
            .map(|e| e.path.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();
        seen.sort();
        assert_eq!(
            seen,
            vec![PathBuf::from("main.js"), PathBuf::from("node_modules")]
        );
    }

    #[test]
    fn processed_paths_are_not_read_twice() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.rs");
        fs::write(&path, "a").unwrap();
        let excluder = ListExcluder {
            excluded: HashSet::new(),
            asked: Vec::new(),
        };
        let mut coordinator =
            WalkCoordinator::new(tmp.path(), ExtensionSet::default(), excluder, None::<NameOracle>);
        let mut acc = ScanAccumulator::new();
        coordinator.consume(
            tmp.path(),
            vec![event(path.clone(), false), event(path, false)],
            &mut acc,
        );
        assert_eq!(acc.file_count(), 1);
    }

    #[test]
    fn traversal_skips_root_and_reports_everything_else() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".git/objects")).unwrap();
        fs::write(tmp.path().join(".gitignore"), "*\n").unwrap();
        fs::write(tmp.path().join(".git/objects/blob"), "x").unwrap();

        let mut seen: Vec<(PathBuf, bool)> = spawn_traversal(tmp.path())
            .map(|e| e.unwrap())
            .map(|e| (e.path.strip_prefix(tmp.path()).unwrap().to_path_buf(), e.is_dir))
            .collect();
        seen.sort();
        assert_eq!(
            seen,
            vec![
                (PathBuf::from(".git"), true),
                (PathBuf::from(".git/objects"), true),
                (PathBuf::from(".git/objects/blob"), false),
                (PathBuf::from(".gitignore"), false),
            ]
        );
    }

    #[test]
    fn validate_root_rejects_files_and_missing_paths() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("f");
        fs::write(&file, "").unwrap();
        assert!(validate_root(tmp.path()).is_ok());
        assert!(validate_root(&file).unwrap_err().is_scan_fatal());
        assert!(validate_root(&tmp.path().join("nope")).unwrap_err().is_scan_fatal());
    }
}
