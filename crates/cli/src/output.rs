//! Terminal rendering of events and errors

use owo_colors::OwoColorize;
use pathwatch::{Event, Op, WatchError};

/// Width of the longest single operation name ("REMOVE", "RENAME")
const OP_WIDTH: usize = 6;

/// Print one event as `OP  path`, colored by operation
pub fn print_event(event: &Event) {
    let label = format!("{:<width$}", event.op.to_string(), width = OP_WIDTH);
    let label = if event.op.contains(Op::REMOVE) {
        label.red().to_string()
    } else if event.op.contains(Op::CREATE) {
        label.green().to_string()
    } else if event.op.contains(Op::RENAME) {
        label.magenta().to_string()
    } else if event.op.contains(Op::WRITE) {
        label.yellow().to_string()
    } else {
        label.cyan().to_string()
    };
    println!("{}  {}", label.bold(), event.path.display());
}

pub fn print_error(error: &WatchError) {
    eprintln!("{} {}", "error:".red().bold(), error);
}
