//! Filesystem change notification router
//!
//! This crate sits on top of a raw filesystem event source and provides:
//! - File and directory registrations, optionally recursive
//! - Per-watch operation masks and filename glob filters
//! - Blocking pull ([`Watcher::wait_event`]) and push
//!   ([`Watcher::notify_event`], [`Watcher::subscribe`]) consumption
//! - Idempotent shutdown that wakes every waiting consumer
//!
//! ```no_run
//! use pathwatch::{Op, Watcher};
//!
//! # fn main() -> pathwatch::Result<()> {
//! let watcher = Watcher::new()?;
//! watcher.add_dir("src", "*.rs", Op::CREATE | Op::WRITE, true)?;
//!
//! loop {
//!     match watcher.wait_event() {
//!         Ok(event) => println!("{event}"),
//!         Err(e) if e.is_closed() => break,
//!         Err(e) => eprintln!("watch error: {e}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
mod expand;
pub mod filter;
pub mod op;
pub mod registry;
pub mod source;

// Re-exports
pub use config::WatchConfig;
pub use dispatch::{State, Watcher};
pub use error::{Result, WatchError};
pub use event::{Event, RawEvent};
pub use filter::{Pattern, Verdict};
pub use op::{Op, ALL_OPS};
pub use registry::{WatchEntry, WatchRegistry};
pub use source::{EventSource, MemorySource, NotifySource, SourceStreams};
