//! Operation and filename filters
//!
//! Both predicates resolve the responsible entry through
//! [`WatchRegistry::find_for`]; a path with no entry is always rejected.

use crate::op::Op;
use crate::registry::{WatchEntry, WatchRegistry};
use globset::{GlobBuilder, GlobMatcher};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{trace, warn};

/// Shell-style filename filter for directory watches
#[derive(Debug, Clone, Default)]
pub enum Pattern {
    /// No filtering
    #[default]
    Any,
    /// Compiled glob (`*`, `?`, `[...]`)
    Glob { source: String, matcher: GlobMatcher },
    /// Pattern that failed to compile; it matches nothing
    Invalid { source: String },
}

impl Pattern {
    /// Compile `pattern`. An empty string means no filtering.
    ///
    /// Malformed patterns are logged and kept as [`Pattern::Invalid`]
    /// rather than rejected.
    pub fn new(pattern: &str) -> Self {
        if pattern.is_empty() {
            return Pattern::Any;
        }
        match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => Pattern::Glob {
                source: pattern.to_string(),
                matcher: glob.compile_matcher(),
            },
            Err(e) => {
                warn!(pattern, error = %e, "Malformed filename pattern, it will match nothing");
                Pattern::Invalid {
                    source: pattern.to_string(),
                }
            }
        }
    }

    /// The pattern as written by the caller
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Any => "",
            Pattern::Glob { source, .. } | Pattern::Invalid { source } => source,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Pattern::Any)
    }

    /// Match a bare filename
    pub fn matches(&self, file_name: &OsStr) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Glob { matcher, .. } => matcher.is_match(Path::new(file_name)),
            Pattern::Invalid { source } => {
                trace!(pattern = %source, "Skipping match against malformed pattern");
                false
            }
        }
    }
}

impl From<&str> for Pattern {
    fn from(pattern: &str) -> Self {
        Pattern::new(pattern)
    }
}

/// Whether `entry` lets an event on `path` through its filename filter
fn entry_accepts_name(entry: &WatchEntry, path: &Path) -> bool {
    // Individually added files are never filtered by name
    if !entry.is_dir() {
        return true;
    }
    let name = path.file_name().unwrap_or_default();
    entry.pattern().matches(name)
}

/// Outcome of running both filters against one resolved entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// No entry for the path or its parent
    Unwatched,
    /// The entry's mask lacks one of the event's operations
    Operation,
    /// The entry's filename pattern rejected the name
    Pattern,
}

impl WatchRegistry {
    /// True if the entry for `path` includes every bit of `op`
    pub fn accepts_operation(&self, path: &Path, op: Op) -> bool {
        self.with_entry(path, |entry| entry.ops().contains(op))
            .unwrap_or(false)
    }

    /// True if the entry for `path` accepts its filename
    pub fn accepts_pattern(&self, path: &Path) -> bool {
        self.with_entry(path, |entry| entry_accepts_name(entry, path))
            .unwrap_or(false)
    }

    /// Run the operation filter, then the pattern filter, against a single
    /// entry resolved under one read lock
    pub fn verdict(&self, path: &Path, op: Op) -> Verdict {
        self.with_entry(path, |entry| {
            if !entry.ops().contains(op) {
                Verdict::Operation
            } else if !entry_accepts_name(entry, path) {
                Verdict::Pattern
            } else {
                Verdict::Accepted
            }
        })
        .unwrap_or(Verdict::Unwatched)
    }

    /// Both filters
    pub fn accepts(&self, path: &Path, op: Op) -> bool {
        self.verdict(path, op) == Verdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::ALL_OPS;

    fn name_matches(pattern: &str, name: &str) -> bool {
        Pattern::new(pattern).matches(OsStr::new(name))
    }

    #[test]
    fn test_glob_patterns() {
        assert!(name_matches("*.txt", "test.txt"));
        assert!(!name_matches("*.txt", "test.ini"));
        assert!(name_matches("test.txt", "test.txt"));
        assert!(!name_matches("test.txt", "test2.txt"));
        assert!(name_matches("test*.txt", "test2.txt"));
        assert!(!name_matches("test*.txt", "tes.ini"));
        assert!(name_matches("*thing.txt", "something.txt"));
        assert!(!name_matches("*thing.txt", "thingsome.txt"));
        assert!(name_matches("file?.log", "file1.log"));
        assert!(!name_matches("file?.log", "file12.log"));
        assert!(name_matches("[ab]*.rs", "alpha.rs"));
        assert!(!name_matches("[ab]*.rs", "gamma.rs"));
    }

    #[test]
    fn test_malformed_pattern_matches_nothing() {
        let pattern = Pattern::new("[unclosed");
        assert!(matches!(pattern, Pattern::Invalid { .. }));
        assert_eq!(pattern.as_str(), "[unclosed");
        assert!(!pattern.matches(OsStr::new("[unclosed")));
        assert!(!pattern.matches(OsStr::new("anything")));
    }

    #[test]
    fn test_empty_pattern_is_any() {
        let pattern = Pattern::new("");
        assert!(pattern.is_any());
        assert!(pattern.matches(OsStr::new("whatever.bin")));
    }

    #[test]
    fn test_accepts_operation_subset() {
        let registry = WatchRegistry::new();
        for path in ["test.txt", "testdir", "testdir/test.txt"] {
            registry.add(WatchEntry::file(path, Op::WRITE));
        }

        assert!(!registry.accepts_operation(Path::new("none"), Op::WRITE));
        for path in ["test.txt", "testdir", "testdir/test.txt"] {
            assert!(!registry.accepts_operation(Path::new(path), Op::CREATE));
            assert!(registry.accepts_operation(Path::new(path), Op::WRITE));
        }
    }

    #[test]
    fn test_accepts_operation_multi_bit_mask() {
        let registry = WatchRegistry::new();
        registry.add(WatchEntry::dir("d", Pattern::Any, Op::WRITE | Op::CHMOD, false));

        let path = Path::new("d/f");
        assert!(registry.accepts_operation(path, Op::WRITE));
        assert!(registry.accepts_operation(path, Op::CHMOD));
        assert!(registry.accepts_operation(path, Op::WRITE | Op::CHMOD));
        assert!(!registry.accepts_operation(path, Op::WRITE | Op::REMOVE));
        assert!(!registry.accepts_operation(path, Op::RENAME));
    }

    #[test]
    fn test_all_ops_accepts_each_operation() {
        let registry = WatchRegistry::new();
        registry.add(WatchEntry::dir("d", Pattern::Any, ALL_OPS, false));
        for op in ALL_OPS.iter() {
            assert!(registry.accepts_operation(Path::new("d/f"), op));
        }
    }

    #[test]
    fn test_files_ignore_pattern() {
        let registry = WatchRegistry::new();
        registry.add(WatchEntry::file("notes.md", ALL_OPS));
        assert!(registry.accepts_pattern(Path::new("notes.md")));
        assert!(!registry.accepts_pattern(Path::new("none")));
    }

    #[test]
    fn test_directory_pattern_uses_filename_only() {
        let registry = WatchRegistry::new();
        registry.add(WatchEntry::dir("logs.txt.d", Pattern::new("*.txt"), ALL_OPS, false));

        // The directory name matches the pattern, the file does not
        assert!(!registry.accepts_pattern(Path::new("logs.txt.d/x.ini")));
        assert!(registry.accepts_pattern(Path::new("logs.txt.d/x.txt")));
    }

    #[test]
    fn test_directory_with_malformed_pattern_rejects() {
        let registry = WatchRegistry::new();
        registry.add(WatchEntry::dir("d", Pattern::new("[x"), ALL_OPS, false));
        assert!(!registry.accepts_pattern(Path::new("d/[x")));
        assert!(registry.accepts_operation(Path::new("d/[x"), Op::WRITE));
        assert!(!registry.accepts(Path::new("d/[x"), Op::WRITE));
    }

    #[test]
    fn test_verdict_names_the_failing_filter() {
        let registry = WatchRegistry::new();
        registry.add(WatchEntry::dir("d", Pattern::new("*.txt"), Op::WRITE, false));

        assert_eq!(registry.verdict(Path::new("d/a.txt"), Op::WRITE), Verdict::Accepted);
        assert_eq!(registry.verdict(Path::new("d/a.txt"), Op::CREATE), Verdict::Operation);
        assert_eq!(registry.verdict(Path::new("d/a.ini"), Op::WRITE), Verdict::Pattern);
        assert_eq!(registry.verdict(Path::new("e/a.txt"), Op::WRITE), Verdict::Unwatched);
    }

    /// The two filters must never be answered by different entries. Here
    /// the directory passes the operation and the file passes the name, so
    /// mixing them while the file entry comes and goes would accept.
    #[test]
    fn test_accepts_resolves_one_entry_under_concurrent_changes() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(WatchRegistry::new());
        registry.add(WatchEntry::dir("d", Pattern::new("*.ini"), ALL_OPS, false));
        let stop = Arc::new(AtomicBool::new(false));

        let toggler = {
            let registry = Arc::clone(&registry);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    registry.add(WatchEntry::file("d/a.txt", Op::WRITE));
                    registry.remove(Path::new("d/a.txt"));
                }
            })
        };

        let path = Path::new("d/a.txt");
        for _ in 0..20_000 {
            assert!(!registry.accepts(path, Op::CREATE));
        }
        stop.store(true, Ordering::Relaxed);
        toggler.join().unwrap();
    }

    #[test]
    fn test_accepts_requires_both() {
        let registry = WatchRegistry::new();
        registry.add(WatchEntry::dir("d", Pattern::new("*.txt"), Op::WRITE, false));

        assert!(registry.accepts(Path::new("d/a.txt"), Op::WRITE));
        assert!(!registry.accepts(Path::new("d/a.txt"), Op::CREATE));
        assert!(!registry.accepts(Path::new("d/a.ini"), Op::WRITE));
    }
}
