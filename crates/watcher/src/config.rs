//! Watch configuration files
//!
//! A TOML file lists files and directories to register:
//!
//! ```toml
//! [[file]]
//! path = "a/test.txt"
//! ops = ["chmod"]
//!
//! [[dir]]
//! path = "d"
//! pattern = "*.txt"
//! ops = ["create", "write"]
//! recursive = true
//! ```

use crate::dispatch::Watcher;
use crate::error::{Result, WatchError};
use crate::op::{Op, ALL_OPS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Set of watches to register on a [`Watcher`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Individually watched files
    #[serde(default, rename = "file")]
    pub files: Vec<FileWatch>,

    /// Watched directories
    #[serde(default, rename = "dir")]
    pub dirs: Vec<DirWatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWatch {
    pub path: PathBuf,

    /// Accepted operations (default: all)
    #[serde(default)]
    pub ops: Vec<OpName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirWatch {
    pub path: PathBuf,

    /// Filename glob (default: no filtering)
    #[serde(default)]
    pub pattern: String,

    /// Accepted operations (default: all)
    #[serde(default)]
    pub ops: Vec<OpName>,

    /// Watch subdirectories too (default: false)
    #[serde(default)]
    pub recursive: bool,
}

/// Operation name as written in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpName {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
    All,
}

impl From<OpName> for Op {
    fn from(name: OpName) -> Self {
        match name {
            OpName::Create => Op::CREATE,
            OpName::Write => Op::WRITE,
            OpName::Remove => Op::REMOVE,
            OpName::Rename => Op::RENAME,
            OpName::Chmod => Op::CHMOD,
            OpName::All => ALL_OPS,
        }
    }
}

/// Combine configured names; an empty list means every operation
fn mask(names: &[OpName]) -> Op {
    if names.is_empty() {
        return ALL_OPS;
    }
    names.iter().fold(Op::empty(), |acc, name| acc | Op::from(*name))
}

impl FileWatch {
    pub fn ops(&self) -> Op {
        mask(&self.ops)
    }
}

impl DirWatch {
    pub fn ops(&self) -> Op {
        mask(&self.ops)
    }
}

impl WatchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| WatchError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| WatchError::Config(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Register every configured watch, files first, stopping at the first error
    pub fn apply(&self, watcher: &Watcher) -> Result<()> {
        for file in &self.files {
            watcher.add_file(&file.path, file.ops())?;
        }
        for dir in &self.dirs {
            watcher.add_dir(&dir.path, &dir.pattern, dir.ops(), dir.recursive)?;
        }
        Ok(())
    }
}
