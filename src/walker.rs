//! Directory walking with exclusion, depth and date pruning.
//!
//! Depth is counted in directories below the walk root: files directly inside
//! the root sit at depth 0, so `max_depth = Some(0)` never descends.
use crate::cancel::CancellationToken;
use crate::date_dirs::{parse_dir_date, span_label};
use crate::query::DateRange;
use log::debug;
use prometheus::IntCounter;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::{DirEntry, WalkDir};

/// Decides which child directories are descended into.
pub struct DirPruner {
    exclude: HashSet<String>,
    date_range: Option<DateRange>,
    pruned: IntCounter,
}

impl DirPruner {
    pub fn new(exclude: &[String], date_range: Option<DateRange>, pruned: IntCounter) -> Self {
        Self {
            exclude: exclude.iter().cloned().collect(),
            date_range,
            pruned,
        }
    }

    /// False for excluded names and for date-named directories outside the range.
    pub fn should_descend(&self, name: &str) -> bool {
        if self.exclude.contains(name) {
            debug!("Pruning excluded directory: {name}");
            self.pruned.inc();
            return false;
        }

        if let Some(range) = &self.date_range {
            if let Some(span) = parse_dir_date(name) {
                if !range.overlaps_days(span.first, span.last) {
                    debug!(
                        "Pruning directory {name} ({}) outside date range",
                        span_label(&span)
                    );
                    self.pruned.inc();
                    return false;
                }
            }
        }

        true
    }

    fn keep(&self, entry: &DirEntry) -> bool {
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || self.should_descend(&entry.file_name().to_string_lossy())
    }
}

fn walker(root: &Path, max_depth: Option<usize>) -> WalkDir {
    let walker = WalkDir::new(root).sort_by_file_name();
    match max_depth {
        Some(depth) => walker.max_depth(depth),
        None => walker,
    }
}

fn readable(entry: walkdir::Result<DirEntry>) -> Option<DirEntry> {
    match entry {
        Ok(entry) => Some(entry),
        Err(err) => {
            debug!("Skipping unreadable entry: {err}");
            None
        }
    }
}

/// Every non-directory entry under `root` in file-name order, lazily.
///
/// A `root` that is itself a file yields just that file.
pub fn walk_files(
    root: &Path,
    pruner: Arc<DirPruner>,
    max_depth: Option<usize>,
) -> impl Iterator<Item = DirEntry> + Send {
    walker(root, max_depth.map(|d| d + 1))
        .into_iter()
        .filter_entry(move |entry| pruner.keep(entry))
        .filter_map(readable)
        .filter(|entry| !entry.file_type().is_dir())
}

/// Every directory under `root` (itself included) whose files are in scope, in walk order.
pub fn collect_dirs(
    root: &Path,
    pruner: &DirPruner,
    max_depth: Option<usize>,
    cancel: &CancellationToken,
) -> Vec<PathBuf> {
    walker(root, max_depth)
        .into_iter()
        .filter_entry(|entry| pruner.keep(entry))
        .take_while(|_| !cancel.is_cancelled())
        .filter_map(readable)
        .filter(|entry| entry.file_type().is_dir())
        .map(DirEntry::into_path)
        .collect()
}

/// Direct non-directory children of `dir`, sorted by file name.
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {}: {e}", dir.display());
            return vec![];
        }
    };

    let mut files: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| !t.is_dir()).unwrap_or(false))
        .collect();
    files.sort_by_key(|entry| entry.file_name());
    files.into_iter().map(|entry| entry.path()).collect()
}
