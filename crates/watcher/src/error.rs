//! Error types for the watcher

use std::path::PathBuf;
use thiserror::Error;

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;

#[derive(Debug, Error)]
pub enum WatchError {
    /// A directory was passed to a file operation
    #[error("{} is a directory, use add_dir/remove_dir instead", .0.display())]
    IsDirectory(PathBuf),

    /// A file was passed to a directory operation
    #[error("{} is not a directory, use add_file/remove_file instead", .0.display())]
    NotDirectory(PathBuf),

    #[error("failed to stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory walk failed partway through a recursive add or remove
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// Error reported by the underlying event source
    #[error("event source error: {0}")]
    Source(#[from] notify::Error),

    #[error("invalid watch configuration: {0}")]
    Config(String),

    #[error("failed to read watch configuration {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The watcher was closed. This is a shutdown signal, not a failure.
    #[error("watcher closed")]
    Closed,
}

impl WatchError {
    /// True for the clean shutdown signal
    pub fn is_closed(&self) -> bool {
        matches!(self, WatchError::Closed)
    }
}
