//! In-memory event source
//!
//! Events and errors are injected by hand, which makes dispatch behavior
//! deterministic in tests and lets callers drive a watcher from their own
//! event feed.

use super::{EventSource, SourceStreams};
use crate::event::RawEvent;
use crate::op::Op;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct Channels {
    events: Sender<RawEvent>,
    errors: Sender<notify::Error>,
}

#[derive(Default)]
struct Shared {
    /// Registered paths in registration order, duplicates included
    registered: Mutex<Vec<PathBuf>>,
    /// `None` once closed
    channels: Mutex<Option<Channels>>,
    close_calls: Mutex<usize>,
    /// Paths whose `register` call fails
    rejected: Mutex<Vec<PathBuf>>,
}

/// Cloneable in-memory [`EventSource`]
///
/// Clones share state: keep one clone to inject events after handing the
/// other to a watcher.
#[derive(Clone)]
pub struct MemorySource {
    shared: Arc<Shared>,
}

impl MemorySource {
    pub fn new() -> (Self, SourceStreams) {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (error_tx, error_rx) = crossbeam_channel::unbounded();
        let shared = Shared {
            channels: Mutex::new(Some(Channels {
                events: event_tx,
                errors: error_tx,
            })),
            ..Default::default()
        };
        let source = Self {
            shared: Arc::new(shared),
        };
        let streams = SourceStreams {
            events: event_rx,
            errors: error_rx,
        };
        (source, streams)
    }

    /// Push a raw event. Returns false if the source is closed.
    pub fn emit(&self, path: impl Into<PathBuf>, op: Op) -> bool {
        match self.shared.channels.lock().as_ref() {
            Some(channels) => channels.events.send(RawEvent::new(path, op)).is_ok(),
            None => false,
        }
    }

    /// Push a transport error. Returns false if the source is closed.
    pub fn fail(&self, error: notify::Error) -> bool {
        match self.shared.channels.lock().as_ref() {
            Some(channels) => channels.errors.send(error).is_ok(),
            None => false,
        }
    }

    /// Make every later `register` of `path` fail, as a native backend does
    /// for a path it cannot watch
    pub fn fail_register(&self, path: impl Into<PathBuf>) {
        self.shared.rejected.lock().push(path.into());
    }

    /// Currently registered paths
    pub fn registered(&self) -> Vec<PathBuf> {
        self.shared.registered.lock().clone()
    }

    pub fn is_registered(&self, path: &Path) -> bool {
        self.shared.registered.lock().iter().any(|p| p == path)
    }

    /// How many times `close` was called
    pub fn close_calls(&self) -> usize {
        *self.shared.close_calls.lock()
    }

    fn ensure_open(&self) -> notify::Result<()> {
        if self.shared.channels.lock().is_none() {
            return Err(notify::Error::generic("event source closed"));
        }
        Ok(())
    }
}

impl EventSource for MemorySource {
    fn register(&self, path: &Path) -> notify::Result<()> {
        self.ensure_open()?;
        if self.shared.rejected.lock().iter().any(|p| p == path) {
            return Err(notify::Error::generic("watch rejected").add_path(path.to_path_buf()));
        }
        self.shared.registered.lock().push(path.to_path_buf());
        Ok(())
    }

    fn unregister(&self, path: &Path) -> notify::Result<()> {
        self.ensure_open()?;
        let mut registered = self.shared.registered.lock();
        match registered.iter().position(|p| p == path) {
            Some(index) => {
                registered.remove(index);
                Ok(())
            }
            None => Err(notify::Error::watch_not_found().add_path(path.to_path_buf())),
        }
    }

    fn close(&self) -> notify::Result<()> {
        *self.shared.close_calls.lock() += 1;
        self.shared.channels.lock().take();
        self.shared.registered.lock().clear();
        Ok(())
    }
}
