//! Event sources feeding the router
//!
//! A source owns the native watching facility. It pushes raw events and
//! transport errors into two channels and accepts per-path registrations.
//! Recursion is handled above the source, so every registration is for a
//! single file or a single directory level.

mod memory;
mod native;

pub use memory::MemorySource;
pub use native::NotifySource;

use crate::event::RawEvent;
use crossbeam_channel::Receiver;
use std::path::Path;

/// Low-level watching facility
pub trait EventSource: Send + Sync + 'static {
    /// Start delivering events for `path`
    fn register(&self, path: &Path) -> notify::Result<()>;

    /// Stop delivering events for `path`
    fn unregister(&self, path: &Path) -> notify::Result<()>;

    /// Release resources. The watcher calls this at most once.
    fn close(&self) -> notify::Result<()>;
}

/// Receiving ends of a source's event and error channels
pub struct SourceStreams {
    pub events: Receiver<RawEvent>,
    pub errors: Receiver<notify::Error>,
}
