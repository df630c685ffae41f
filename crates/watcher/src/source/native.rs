//! Native event source backed by the `notify` crate

use super::{EventSource, SourceStreams};
use crate::event::RawEvent;
use crate::op::Op;
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, trace};

/// [`EventSource`] over the platform's recommended `notify` backend
/// (inotify, FSEvents, ReadDirectoryChangesW, kqueue)
pub struct NotifySource {
    /// `None` once closed
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl NotifySource {
    pub fn new() -> notify::Result<(Self, SourceStreams)> {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (error_tx, error_rx) = crossbeam_channel::unbounded();

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let Some(op) = op_for_kind(&event.kind) else {
                        trace!(kind = ?event.kind, paths = ?event.paths, "Dropping unmapped event kind");
                        return;
                    };
                    for path in event.paths {
                        if event_tx.send(RawEvent::new(path, op)).is_err() {
                            // Receiver gone, the watcher was dropped
                            return;
                        }
                    }
                }
                Err(e) => {
                    let _ = error_tx.send(e);
                }
            }
        })?;

        let source = Self {
            watcher: Mutex::new(Some(watcher)),
        };
        let streams = SourceStreams {
            events: event_rx,
            errors: error_rx,
        };
        Ok((source, streams))
    }
}

impl EventSource for NotifySource {
    fn register(&self, path: &Path) -> notify::Result<()> {
        match self.watcher.lock().as_mut() {
            Some(watcher) => {
                debug!(path = %path.display(), "Registering native watch");
                watcher.watch(path, RecursiveMode::NonRecursive)
            }
            None => Err(notify::Error::generic("event source closed")),
        }
    }

    fn unregister(&self, path: &Path) -> notify::Result<()> {
        match self.watcher.lock().as_mut() {
            Some(watcher) => {
                debug!(path = %path.display(), "Removing native watch");
                watcher.unwatch(path)
            }
            None => Err(notify::Error::generic("event source closed")),
        }
    }

    fn close(&self) -> notify::Result<()> {
        // Dropping the watcher stops its event loop and the channel senders
        // go with it
        drop(self.watcher.lock().take());
        Ok(())
    }
}

/// Map a `notify` event kind onto the router's operation bits.
///
/// Access events and kinds the backend could not classify carry no
/// operation and are dropped. A completed rename is already reported as a
/// `From` event on the old name and a `To` event on the new name, so the
/// combined `Both` event is dropped too.
pub(crate) fn op_for_kind(kind: &EventKind) -> Option<Op> {
    match kind {
        EventKind::Create(_) => Some(Op::CREATE),
        EventKind::Remove(_) => Some(Op::REMOVE),
        EventKind::Modify(modify) => match modify {
            ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other => Some(Op::WRITE),
            ModifyKind::Metadata(_) => Some(Op::CHMOD),
            ModifyKind::Name(RenameMode::To) => Some(Op::CREATE),
            ModifyKind::Name(RenameMode::Both) => None,
            ModifyKind::Name(_) => Some(Op::RENAME),
        },
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    #[test]
    fn test_op_for_kind() {
        assert_eq!(op_for_kind(&EventKind::Create(CreateKind::File)), Some(Op::CREATE));
        assert_eq!(op_for_kind(&EventKind::Create(CreateKind::Folder)), Some(Op::CREATE));
        assert_eq!(
            op_for_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(Op::WRITE)
        );
        assert_eq!(op_for_kind(&EventKind::Modify(ModifyKind::Any)), Some(Op::WRITE));
        assert_eq!(
            op_for_kind(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions))),
            Some(Op::CHMOD)
        );
        assert_eq!(
            op_for_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            Some(Op::RENAME)
        );
        assert_eq!(
            op_for_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            Some(Op::CREATE)
        );
        assert_eq!(op_for_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))), None);
        assert_eq!(op_for_kind(&EventKind::Remove(RemoveKind::File)), Some(Op::REMOVE));
        assert_eq!(op_for_kind(&EventKind::Access(AccessKind::Any)), None);
        assert_eq!(op_for_kind(&EventKind::Any), None);
    }

    #[test]
    fn test_register_after_close_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let (source, streams) = NotifySource::new().unwrap();

        source.register(temp_dir.path()).unwrap();
        source.close().unwrap();

        assert!(source.register(temp_dir.path()).is_err());
        assert!(source.unregister(temp_dir.path()).is_err());
        // Dropping the native watcher disconnects both channels
        let timeout = std::time::Duration::from_secs(5);
        assert!(streams.events.recv_timeout(timeout).is_err());
        assert!(streams.errors.recv_timeout(timeout).is_err());
    }
}
