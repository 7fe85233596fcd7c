//! Compiled asset cache.
//!
//! The watcher thread is the only writer; request threads read. Entries are
//! `Arc<CompiledAsset>` snapshots that are swapped wholesale, so a reader
//! holding an entry keeps a consistent view even while the watcher replaces
//! it.
//!
//! # Cache Key
//!
//! Entries are keyed by the absolute path of the *source* file, e.g.
//! `/srv/site/static/css/site.scss`, even though the bytes are compiled CSS.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use bytes::Bytes;

use super::compiler::SourceDialect;

// =============================================================================
// Entries
// =============================================================================

/// Output class of a compiled asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Stylesheet,
    Script,
}

impl AssetKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            AssetKind::Stylesheet => "text/css; charset=utf-8",
            AssetKind::Script => "application/javascript; charset=utf-8",
        }
    }
}

/// One compiled source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledAsset {
    /// Absolute path of the source file
    pub source: PathBuf,

    /// Source modification time the bytes were compiled from
    pub modified: SystemTime,

    /// Compiled output
    pub data: Bytes,

    pub kind: AssetKind,
}

// =============================================================================
// Asset Cache
// =============================================================================

/// Thread-safe map from source path to compiled output.
///
/// Cloning is cheap and yields a handle to the same cache.
///
/// # Example
///
/// ```
/// use hive_sdk::assets::{AssetCache, AssetKind, CompiledAsset};
/// use bytes::Bytes;
/// use std::time::SystemTime;
///
/// let cache = AssetCache::new();
/// let asset = CompiledAsset {
///     source: "/srv/site/static/css/site.scss".into(),
///     modified: SystemTime::UNIX_EPOCH,
///     data: Bytes::from_static(b"body{margin:0}"),
///     kind: AssetKind::Stylesheet,
/// };
///
/// assert!(cache.store(asset));
/// assert!(cache.get("/srv/site/static/css/site.scss".as_ref()).is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AssetCache {
    entries: Arc<RwLock<HashMap<PathBuf, Arc<CompiledAsset>>>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for an exact source path.
    pub fn get(&self, source: &Path) -> Option<Arc<CompiledAsset>> {
        self.read().get(source).cloned()
    }

    /// Find the compiled output for a requested path.
    ///
    /// Tries the exact path first. A request for `site.css` or `app.js` with
    /// no exact entry falls back to a cached source with the same stem in a
    /// dialect that compiles to that extension (`site.scss`, `app.coffee`).
    pub fn lookup(&self, requested: &Path) -> Option<Arc<CompiledAsset>> {
        let entries = self.read();
        if let Some(asset) = entries.get(requested) {
            return Some(Arc::clone(asset));
        }

        let kind = match SourceDialect::from_path(requested)? {
            SourceDialect::Css => AssetKind::Stylesheet,
            SourceDialect::JavaScript => AssetKind::Script,
            _ => return None,
        };

        SourceDialect::compiled_dialects(kind)
            .iter()
            .map(|dialect| requested.with_extension(dialect.extension()))
            .find_map(|candidate| entries.get(&candidate).cloned())
    }

    /// Whether `source` with modification time `modified` needs compiling.
    ///
    /// True when there is no entry or the stored mtime is strictly older.
    pub fn is_stale(&self, source: &Path, modified: SystemTime) -> bool {
        match self.read().get(source) {
            Some(asset) => modified > asset.modified,
            None => true,
        }
    }

    /// Insert an asset unless a same-age or newer entry already exists.
    ///
    /// Returns `true` if the asset was stored.
    pub fn store(&self, asset: CompiledAsset) -> bool {
        let mut entries = self.write();
        if let Some(existing) = entries.get(&asset.source) {
            if asset.modified <= existing.modified {
                return false;
            }
        }
        entries.insert(asset.source.clone(), Arc::new(asset));
        true
    }

    pub fn remove(&self, source: &Path) -> Option<Arc<CompiledAsset>> {
        self.write().remove(source)
    }

    /// Keep only entries whose source path satisfies `keep`.
    ///
    /// Returns the number of entries removed.
    pub fn retain(&self, mut keep: impl FnMut(&Path) -> bool) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|path, _| keep(path));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Sorted list of cached source paths.
    pub fn sources(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    // A writer panicking mid-insert cannot leave a half-built entry behind,
    // so a poisoned lock still guards a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<PathBuf, Arc<CompiledAsset>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<PathBuf, Arc<CompiledAsset>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

// =============================================================================
// Tests
// =============================================================================
