//! pathwatch CLI - print filtered filesystem events

use anyhow::{Context, Result};
use clap::Parser;
use pathwatch::{Op, WatchConfig, Watcher};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod output;

/// Watch files and directories and print the changes that pass the filters
#[derive(Parser, Debug)]
#[command(name = "pathwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML file listing watches ([[file]] and [[dir]] tables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File to watch (repeatable)
    #[arg(long = "file", value_name = "PATH")]
    files: Vec<PathBuf>,

    /// Directory to watch (repeatable)
    #[arg(long = "dir", value_name = "PATH")]
    dirs: Vec<PathBuf>,

    /// Filename glob for --dir watches, e.g. "*.rs"
    #[arg(short, long, default_value = "")]
    pattern: String,

    /// Operations to report, e.g. "create|write" (default: all)
    #[arg(long, default_value = "all")]
    ops: Op,

    /// Also watch every directory below each --dir
    #[arg(short, long)]
    recursive: bool,
}

impl Cli {
    fn load_config(&self) -> Result<WatchConfig> {
        match &self.config {
            Some(path) => WatchConfig::load(path)
                .with_context(|| format!("Failed to load {}", path.display())),
            None => Ok(WatchConfig::default()),
        }
    }

    fn has_watches(&self) -> bool {
        self.config.is_some() || !self.files.is_empty() || !self.dirs.is_empty()
    }

    /// Register the config file's watches, then the command-line ones
    fn register(&self, watcher: &Watcher) -> Result<()> {
        self.load_config()?
            .apply(watcher)
            .context("Failed to register configured watches")?;
        for path in &self.files {
            watcher
                .add_file(path, self.ops)
                .with_context(|| format!("Failed to watch file {}", path.display()))?;
        }
        for path in &self.dirs {
            watcher
                .add_dir(path, &self.pattern, self.ops, self.recursive)
                .with_context(|| format!("Failed to watch directory {}", path.display()))?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if !cli.has_watches() {
        anyhow::bail!("Nothing to watch (use --file, --dir or --config)");
    }

    let watcher = Watcher::new().context("Failed to start filesystem watcher")?;
    cli.register(&watcher)?;
    let entries = watcher.entries();
    info!(
        "Watching {} file(s) and {} director(ies)",
        entries.iter().filter(|e| !e.is_dir()).count(),
        entries.iter().filter(|e| e.is_dir()).count()
    );

    let mut events = watcher.subscribe();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted, shutting down");
                break;
            }
            next = events.recv() => match next {
                Some(Ok(event)) => output::print_event(&event),
                Some(Err(e)) => output::print_error(&e),
                None => break,
            }
        }
    }

    watcher.close().context("Failed to close watcher")?;
    Ok(())
}
