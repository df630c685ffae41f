//! Ordered registry of watch registrations
//!
//! Entries keep insertion order. Lookups clean paths lexically (no
//! filesystem access, no symlink resolution) before comparing them.

use crate::filter::Pattern;
use crate::op::Op;
use parking_lot::RwLock;
use std::path::{Component, Path, PathBuf};

/// One registered watch
#[derive(Debug, Clone)]
pub struct WatchEntry {
    /// Path exactly as given by the caller
    path: PathBuf,
    /// Cleaned form of `path`, used for lookups
    key: PathBuf,
    pattern: Pattern,
    ops: Op,
    is_dir: bool,
    recursive: bool,
}

impl WatchEntry {
    /// Entry for an individually watched file. Patterns never apply to these.
    pub fn file(path: impl Into<PathBuf>, ops: Op) -> Self {
        let path = path.into();
        Self {
            key: clean_path(&path),
            path,
            pattern: Pattern::Any,
            ops,
            is_dir: false,
            recursive: false,
        }
    }

    /// Entry for a watched directory
    pub fn dir(path: impl Into<PathBuf>, pattern: Pattern, ops: Op, recursive: bool) -> Self {
        let path = path.into();
        Self {
            key: clean_path(&path),
            path,
            pattern,
            ops,
            is_dir: true,
            recursive,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn ops(&self) -> Op {
        self.ops
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// True for directories added recursively (including inherited subdirectories)
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }
}

/// Lock-guarded ordered sequence of [`WatchEntry`]
///
/// Appends and removals take the write lock; lookups share the read lock,
/// so registrations may change while events are being routed.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    entries: RwLock<Vec<WatchEntry>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Duplicates are allowed.
    pub fn add(&self, entry: WatchEntry) {
        self.entries.write().push(entry);
    }

    /// Remove the first entry whose stored path equals `path` exactly.
    ///
    /// Returns the removed entry, or `None` if nothing matched.
    pub fn remove(&self, path: &Path) -> Option<WatchEntry> {
        let mut entries = self.entries.write();
        let index = entries.iter().position(|e| e.path == path)?;
        Some(entries.remove(index))
    }

    /// Resolve the entry responsible for `raw_path`.
    ///
    /// An entry for the path itself wins over an entry for its parent
    /// directory, whatever order they were added in.
    pub fn find_for(&self, raw_path: &Path) -> Option<WatchEntry> {
        self.with_entry(raw_path, WatchEntry::clone)
    }

    /// Run `f` against the entry resolved for `raw_path` without cloning it
    pub fn with_entry<R>(&self, raw_path: &Path, f: impl FnOnce(&WatchEntry) -> R) -> Option<R> {
        let entries = self.entries.read();
        let key = clean_path(raw_path);
        if let Some(entry) = entries.iter().find(|e| e.key == key) {
            return Some(f(entry));
        }
        let parent = parent_key(raw_path);
        entries.iter().find(|e| e.key == parent).map(f)
    }

    /// Entry registered for exactly `raw_path` (after cleaning), ignoring parents
    pub fn find_exact(&self, raw_path: &Path) -> Option<WatchEntry> {
        let key = clean_path(raw_path);
        self.entries.read().iter().find(|e| e.key == key).cloned()
    }

    /// Entry registered for the parent directory of `raw_path`
    pub fn find_parent(&self, raw_path: &Path) -> Option<WatchEntry> {
        let parent = parent_key(raw_path);
        self.entries.read().iter().find(|e| e.key == parent).cloned()
    }

    /// Snapshot of all entries in insertion order
    pub fn entries(&self) -> Vec<WatchEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Lexically clean a path: drop `.` components, fold `name/..` pairs and
/// collapse repeated separators. An empty result becomes `.`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        PathBuf::from(".")
    } else {
        out.iter().collect()
    }
}

/// Directory part of `raw_path`: everything up to its last separator,
/// cleaned. `d/` yields `d` and `a/b/..` yields `a/b`, since a trailing
/// separator or dot component is not stripped before splitting.
fn parent_key(raw_path: &Path) -> PathBuf {
    let Some(text) = raw_path.to_str() else {
        // Non-UTF-8 paths fall back to component-wise parent lookup
        return match raw_path.parent() {
            Some(parent) => clean_path(parent),
            None => clean_path(raw_path),
        };
    };
    match text.rfind(std::path::is_separator) {
        Some(index) => clean_path(Path::new(&text[..=index])),
        None => PathBuf::from("."),
    }
}
