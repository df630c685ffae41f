//! File and directory registration, including recursive expansion
//!
//! Recursive operations walk the subtree and handle each directory in turn.
//! A failure stops the walk and is returned as is: directories already
//! handled stay registered (or unregistered). There is no rollback.

use crate::dispatch::{Inner, Watcher};
use crate::error::{Result, WatchError};
use crate::filter::Pattern;
use crate::op::Op;
use crate::registry::WatchEntry;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

impl Watcher {
    /// Watch a single file. Events on it are filtered by `ops` only.
    pub fn add_file(&self, path: impl AsRef<Path>, ops: Op) -> Result<()> {
        self.inner.add_file(path.as_ref(), ops)
    }

    /// Stop watching a file added with [`add_file`](Watcher::add_file)
    pub fn remove_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.inner.remove_file(path.as_ref())
    }

    /// Watch a directory's direct children.
    ///
    /// `pattern` is a filename glob (empty for none) and `ops` the accepted
    /// operations. With `recursive`, every directory below `path` is watched
    /// with the same pattern and mask, and directories created later inside
    /// the tree are picked up as they appear.
    pub fn add_dir(&self, path: impl AsRef<Path>, pattern: &str, ops: Op, recursive: bool) -> Result<()> {
        self.inner.add_dir(path.as_ref(), pattern, ops, recursive)
    }

    /// Stop watching a directory, and with `recursive` every directory below it
    pub fn remove_dir(&self, path: impl AsRef<Path>, recursive: bool) -> Result<()> {
        self.inner.remove_dir(path.as_ref(), recursive)
    }
}

impl Inner {
    fn add_file(&self, path: &Path, ops: Op) -> Result<()> {
        self.ensure_open()?;
        if is_dir(path)? {
            return Err(WatchError::IsDirectory(path.to_path_buf()));
        }
        self.source.register(path)?;
        self.registry.add(WatchEntry::file(path, ops));
        debug!(path = %path.display(), ops = %ops, "Watching file");
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.ensure_open()?;
        if is_dir(path)? {
            return Err(WatchError::IsDirectory(path.to_path_buf()));
        }
        self.unwatch(path)
    }

    fn add_dir(&self, path: &Path, pattern: &str, ops: Op, recursive: bool) -> Result<()> {
        self.ensure_open()?;
        if !is_dir(path)? {
            return Err(WatchError::NotDirectory(path.to_path_buf()));
        }
        let pattern = Pattern::new(pattern);
        self.watch_dir(path, &pattern, ops, recursive)?;
        if recursive {
            self.watch_subdirs(path, &pattern, ops)?;
        }
        Ok(())
    }

    fn remove_dir(&self, path: &Path, recursive: bool) -> Result<()> {
        self.ensure_open()?;
        if !is_dir(path)? {
            return Err(WatchError::NotDirectory(path.to_path_buf()));
        }
        self.unwatch(path)?;
        if recursive {
            for entry in WalkDir::new(path).min_depth(1) {
                let entry = entry?;
                if entry.file_type().is_dir() {
                    self.unwatch(entry.path())?;
                }
            }
        }
        Ok(())
    }

    /// Register a directory found inside a recursive watch after the fact.
    ///
    /// Called for every CREATE event before filtering. Does nothing unless
    /// the parent entry is a recursive directory watch and `path` is a
    /// directory that is not watched yet. Failures are logged; the event
    /// itself is still routed.
    pub(crate) fn register_created(&self, path: &Path) {
        let Some(parent) = self.registry.find_parent(path) else {
            return;
        };
        if !parent.is_dir() || !parent.is_recursive() || self.ensure_open().is_err() {
            return;
        }
        if self.registry.find_exact(path).is_some() {
            return;
        }
        // Gone again, or not a directory
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => {}
            _ => return,
        }

        debug!(path = %path.display(), parent = %parent.path().display(), "Watching new subdirectory");
        let result = self
            .watch_dir(path, parent.pattern(), parent.ops(), true)
            .and_then(|()| self.watch_subdirs(path, parent.pattern(), parent.ops()));
        if let Err(e) = result {
            warn!(path = %path.display(), "Failed to watch new subdirectory: {}", e);
        }
    }

    fn watch_dir(&self, path: &Path, pattern: &Pattern, ops: Op, recursive: bool) -> Result<()> {
        self.source.register(path)?;
        self.registry
            .add(WatchEntry::dir(path, pattern.clone(), ops, recursive));
        debug!(
            path = %path.display(),
            pattern = pattern.as_str(),
            ops = %ops,
            recursive,
            "Watching directory"
        );
        Ok(())
    }

    /// Watch every directory strictly below `root` with the same settings
    fn watch_subdirs(&self, root: &Path, pattern: &Pattern, ops: Op) -> Result<()> {
        for entry in WalkDir::new(root).min_depth(1) {
            let entry = entry?;
            if entry.file_type().is_dir() {
                self.watch_dir(entry.path(), pattern, ops, true)?;
            }
        }
        Ok(())
    }

    fn unwatch(&self, path: &Path) -> Result<()> {
        self.source.unregister(path)?;
        self.registry.remove(path);
        debug!(path = %path.display(), "Stopped watching");
        Ok(())
    }
}

fn is_dir(path: &Path) -> Result<bool> {
    fs::metadata(path)
        .map(|meta| meta.is_dir())
        .map_err(|source| WatchError::Stat {
            path: path.to_path_buf(),
            source,
        })
}
