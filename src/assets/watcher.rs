//! Polling watcher that keeps the asset cache fresh.
//!
//! Every interval the watcher walks `static/css` and `static/js`, compiles
//! each source that is new or whose mtime moved forward, and stores the
//! output in the shared [`AssetCache`]. Requests never compile anything; they
//! only read what the last scan left behind.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use tracing::{debug, error, info, warn};

use crate::error::AssetError;
use crate::project::ProjectLayout;

use super::cache::{AssetCache, AssetKind, CompiledAsset};
use super::compiler::{AssetCompiler, SourceDialect};

/// Default time between scans.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A directory scanned for one kind of source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRoot {
    pub dir: PathBuf,
    pub kind: AssetKind,
}

/// Counts from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Sources compiled and stored
    pub compiled: usize,

    /// Sources already fresh in the cache (or failed at this same mtime)
    pub unchanged: usize,

    /// Sources whose compile failed this scan
    pub failed: usize,

    /// Cache entries dropped because their source vanished
    pub removed: usize,
}

impl ScanReport {
    /// Whether the scan changed anything worth logging.
    pub fn has_activity(&self) -> bool {
        self.compiled > 0 || self.failed > 0 || self.removed > 0
    }
}

/// Watches asset directories and compiles into a shared cache.
pub struct AssetWatcher<C> {
    roots: Vec<WatchRoot>,
    cache: AssetCache,
    compiler: C,
    interval: Duration,
    /// Source mtime of the last failed compile, so a broken file is
    /// reported once rather than every scan.
    failures: HashMap<PathBuf, SystemTime>,
}

impl<C: AssetCompiler> AssetWatcher<C> {
    pub fn new(roots: Vec<WatchRoot>, cache: AssetCache, compiler: C) -> Self {
        Self {
            roots,
            cache,
            compiler,
            interval: DEFAULT_POLL_INTERVAL,
            failures: HashMap::new(),
        }
    }

    /// Watcher over a project's stylesheet and script directories.
    pub fn for_project(layout: &ProjectLayout, cache: AssetCache, compiler: C) -> Self {
        let roots = vec![
            WatchRoot {
                dir: layout.stylesheet_dir(),
                kind: AssetKind::Stylesheet,
            },
            WatchRoot {
                dir: layout.script_dir(),
                kind: AssetKind::Script,
            },
        ];
        Self::new(roots, cache, compiler)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn roots(&self) -> &[WatchRoot] {
        &self.roots
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Run one pass over every root.
    pub fn scan(&mut self) -> ScanReport {
        let mut report = ScanReport::default();
        let mut seen = HashSet::new();
        // roots that could not be listed keep their entries until they can
        let mut unlisted = Vec::new();

        for root in self.roots.clone() {
            let mut sources = Vec::new();
            if let Err(e) = collect_sources(&root.dir, root.kind, &mut sources) {
                warn!(dir = %root.dir.display(), error = %e, "Cannot scan asset directory");
                unlisted.push(root.dir);
                continue;
            }

            for (path, dialect) in sources {
                // vanished between listing and stat
                let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
                    Ok(modified) => modified,
                    Err(_) => continue,
                };
                seen.insert(path.clone());
                self.refresh(path, dialect, modified, &mut report);
            }
        }

        let keep = |path: &Path| {
            seen.contains(path) || unlisted.iter().any(|dir: &PathBuf| path.starts_with(dir))
        };
        report.removed = self.cache.retain(keep);
        self.failures.retain(|path, _| keep(path.as_path()));

        report
    }

    fn refresh(
        &mut self,
        path: PathBuf,
        dialect: SourceDialect,
        modified: SystemTime,
        report: &mut ScanReport,
    ) {
        if !self.cache.is_stale(&path, modified)
            || self.failures.get(&path) == Some(&modified)
        {
            report.unchanged += 1;
            return;
        }

        match self.compiler.compile(&path, dialect) {
            Ok(data) => {
                debug!(source = %path.display(), bytes = data.len(), "Compiled asset");
                self.failures.remove(&path);
                self.cache.store(CompiledAsset {
                    source: path,
                    modified,
                    data,
                    kind: dialect.kind(),
                });
                report.compiled += 1;
            }
            Err(AssetError::Io { ref source, .. })
                if source.kind() == ErrorKind::NotFound =>
            {
                // deleted mid-compile; the next scan drops any stale entry
            }
            Err(e) => {
                error!(source = %path.display(), error = %e, "Asset compile failed");
                self.failures.insert(path, modified);
                report.failed += 1;
            }
        }
    }
}

impl<C: AssetCompiler + 'static> AssetWatcher<C> {
    /// Scan forever on a dedicated `asset-watcher` thread.
    pub fn spawn(mut self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("asset-watcher".to_string())
            .spawn(move || {
                info!(
                    roots = self.roots.len(),
                    interval_ms = self.interval.as_millis() as u64,
                    "Watching asset sources"
                );
                loop {
                    let report = self.scan();
                    if report.has_activity() {
                        info!(
                            compiled = report.compiled,
                            failed = report.failed,
                            removed = report.removed,
                            "Asset scan"
                        );
                    }
                    thread::sleep(self.interval);
                }
            })
    }
}

/// Recursively list sources under `dir` whose dialect compiles to `kind`.
///
/// A missing directory yields nothing. Entries that disappear while being
/// listed are skipped.
fn collect_sources(
    dir: &Path,
    kind: AssetKind,
    out: &mut Vec<(PathBuf, SourceDialect)>,
) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        if file_type.is_dir() {
            match collect_sources(&path, kind, out) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        } else if let Some(dialect) = SourceDialect::from_path(&path) {
            if dialect.kind() == kind {
                out.push((path, dialect));
            }
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
