//! Event dispatch and watcher lifecycle
//!
//! Every consumer, whether a direct [`Watcher::wait_event`] caller or a
//! task started by [`Watcher::notify_event`], pulls from the same source
//! channels. Each raw event is taken by exactly one consumer. A task whose
//! subscriber has gone away hands the result it took back to the others.

use crate::error::{Result, WatchError};
use crate::event::{Event, RawEvent};
use crate::filter::Verdict;
use crate::op::Op;
use crate::registry::{WatchEntry, WatchRegistry};
use crate::source::{EventSource, NotifySource, SourceStreams};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Lifecycle state of a [`Watcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Open,
    /// Shutdown signalled, source being released
    Closing,
    Closed,
}

struct Lifecycle {
    state: State,
    /// Dropping the sender disconnects `Inner::shutdown`, waking every waiter
    shutdown: Option<Sender<()>>,
}

pub(crate) struct Inner {
    pub(crate) source: Box<dyn EventSource>,
    pub(crate) registry: WatchRegistry,
    events: Receiver<RawEvent>,
    errors: Receiver<notify::Error>,
    shutdown: Receiver<()>,
    /// Results taken by a task whose subscriber is gone
    handback_tx: Sender<Result<Event>>,
    handback: Receiver<Result<Event>>,
    lifecycle: Mutex<Lifecycle>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    next_task: AtomicUsize,
}

/// Filesystem change router
///
/// Holds the watch registry and the event source. Register paths with
/// [`add_file`](Watcher::add_file) and [`add_dir`](Watcher::add_dir), then
/// consume events with [`wait_event`](Watcher::wait_event),
/// [`notify_event`](Watcher::notify_event) or
/// [`subscribe`](Watcher::subscribe). Dropping the watcher closes it.
pub struct Watcher {
    pub(crate) inner: Arc<Inner>,
}

impl Watcher {
    /// Create a watcher backed by the platform's native notification API
    pub fn new() -> Result<Self> {
        let (source, streams) = NotifySource::new()?;
        Ok(Self::with_source(source, streams))
    }

    /// Create a watcher over any event source
    pub fn with_source<S: EventSource>(source: S, streams: SourceStreams) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(0);
        let (handback_tx, handback_rx) = crossbeam_channel::unbounded();
        let inner = Inner {
            source: Box::new(source),
            registry: WatchRegistry::new(),
            events: streams.events,
            errors: streams.errors,
            shutdown: shutdown_rx,
            handback_tx,
            handback: handback_rx,
            lifecycle: Mutex::new(Lifecycle {
                state: State::Open,
                shutdown: Some(shutdown_tx),
            }),
            tasks: Mutex::new(Vec::new()),
            next_task: AtomicUsize::new(0),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Block until an accepted event, a source error or shutdown.
    ///
    /// Events rejected by the filters are discarded without returning.
    /// After [`close`](Watcher::close) this returns [`WatchError::Closed`],
    /// which callers should treat as clean termination.
    pub fn wait_event(&self) -> Result<Event> {
        self.inner.wait_event()
    }

    /// Call `callback` from a background thread for every event or error.
    ///
    /// The thread ends silently when the watcher closes. Subscriptions
    /// share the source with each other and with `wait_event` callers, so
    /// each event reaches only one of them.
    pub fn notify_event<F>(&self, mut callback: F)
    where
        F: FnMut(Result<Event>) + Send + 'static,
    {
        self.inner.spawn_consumer(move |result| {
            callback(result);
            Ok(())
        });
    }

    /// Channel-based subscription for async consumers.
    ///
    /// The receiver yields `None` once the watcher closes. Dropping the
    /// receiver stops the feeding thread at its next event, which is passed
    /// on to the remaining consumers rather than lost.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Result<Event>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .spawn_consumer(move |result| tx.send(result).map_err(|unsent| unsent.0));
        rx
    }

    /// Snapshot of the registered watches in insertion order
    pub fn entries(&self) -> Vec<WatchEntry> {
        self.inner.registry.entries()
    }

    pub fn state(&self) -> State {
        self.inner.lifecycle.lock().state
    }

    pub fn is_closed(&self) -> bool {
        self.state() != State::Open
    }

    /// Shut the watcher down.
    ///
    /// Wakes every blocked `wait_event` and releases the source. Idle
    /// notification threads exit right away; a thread still inside its
    /// callback exits once the callback returns, without `close` waiting
    /// for it. Only the first call has any effect; later calls return
    /// `Ok(())`.
    pub fn close(&self) -> Result<()> {
        self.inner.close()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to release event source: {}", e);
        }
    }
}

impl Inner {
    pub(crate) fn ensure_open(&self) -> Result<()> {
        match self.lifecycle.lock().state {
            State::Open => Ok(()),
            State::Closing | State::Closed => Err(WatchError::Closed),
        }
    }

    fn wait_event(&self) -> Result<Event> {
        loop {
            // Buffered events must not outlive close
            if let Err(TryRecvError::Disconnected) = self.shutdown.try_recv() {
                return Err(WatchError::Closed);
            }

            crossbeam_channel::select! {
                recv(self.handback) -> msg => {
                    if let Ok(result) = msg {
                        return result;
                    }
                }
                recv(self.events) -> msg => match msg {
                    Ok(raw) => {
                        if let Some(event) = self.route(raw) {
                            return Ok(event);
                        }
                    }
                    Err(_) => return Err(WatchError::Closed),
                },
                recv(self.errors) -> msg => {
                    return match msg {
                        Ok(e) => Err(WatchError::Source(e)),
                        Err(_) => Err(WatchError::Closed),
                    };
                }
                recv(self.shutdown) -> _ => return Err(WatchError::Closed),
            }
        }
    }

    /// Normalize and filter one raw event
    fn route(&self, raw: RawEvent) -> Option<Event> {
        let event = Event::normalize(raw);

        if event.op.contains(Op::CREATE) {
            self.register_created(&event.path);
        }

        match self.registry.verdict(&event.path, event.op) {
            Verdict::Accepted => Some(event),
            verdict => {
                trace!(path = %event.path.display(), op = %event.op, ?verdict, "Discarding event");
                None
            }
        }
    }

    /// Start a thread feeding `handle`. Returning `Err` from `handle` gives
    /// the result back to the other consumers and ends the thread.
    fn spawn_consumer<F>(self: &Arc<Self>, mut handle: F)
    where
        F: FnMut(Result<Event>) -> std::result::Result<(), Result<Event>> + Send + 'static,
    {
        let inner = Arc::clone(self);
        let id = self.next_task.fetch_add(1, Ordering::Relaxed);

        let spawned = thread::Builder::new()
            .name(format!("pathwatch-notify-{id}"))
            .spawn(move || loop {
                match inner.wait_event() {
                    Err(WatchError::Closed) => break,
                    result => {
                        if let Err(unsent) = handle(result) {
                            debug!(task = id, "Subscriber gone, handing result back");
                            let _ = inner.handback_tx.send(unsent);
                            break;
                        }
                    }
                }
            });

        match spawned {
            Ok(task) => {
                let mut tasks = self.tasks.lock();
                tasks.retain(|t| !t.is_finished());
                tasks.push(task);
                debug!(task = id, "Started notification task");
            }
            Err(e) => error!("Failed to spawn notification task: {}", e),
        }
    }

    fn close(&self) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state != State::Open {
                return Ok(());
            }
            lifecycle.state = State::Closing;
            lifecycle.shutdown.take();
        }

        let released = self.source.close();
        self.registry.clear();
        self.lifecycle.lock().state = State::Closed;
        info!("Watcher closed");

        self.reap_tasks();
        released.map_err(WatchError::from)
    }

    /// Join notification threads that have already exited and detach the
    /// rest. A thread busy in its callback, possibly waiting on the caller
    /// of `close`, is never waited for.
    fn reap_tasks(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let mut detached = 0;
        for task in tasks {
            if !task.is_finished() {
                detached += 1;
                continue;
            }
            if task.join().is_err() {
                warn!("Notification task panicked");
            }
        }
        if detached > 0 {
            debug!(detached, "Notification tasks still running, they exit after their callback");
        }
    }
}
