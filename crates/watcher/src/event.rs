//! Raw and normalized filesystem events

use crate::op::{Op, ALL_OPS};
use std::fmt;
use std::path::PathBuf;

/// Unfiltered notification as produced by an event source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Path reported by the source (relative paths stay relative)
    pub path: PathBuf,
    /// Operation bits reported by the source
    pub op: Op,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, op: Op) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }
}

/// File system event delivered to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Path that changed
    pub path: PathBuf,
    /// Operation(s) that triggered the event
    pub op: Op,
}

impl Event {
    /// Translate a raw source event into the public shape.
    ///
    /// Bits outside the five known operations are dropped.
    pub fn normalize(raw: RawEvent) -> Self {
        Self {
            path: raw.path,
            op: raw.op & ALL_OPS,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.path.display().to_string(), self.op)
    }
}
