//! Search engine, matching pipeline and result model
pub mod algorithms;
pub mod cache;
pub mod content;
pub mod engine;
pub mod predicate;
pub mod snippet;
mod strategies;
pub mod stream;

use crate::file_types::content_type;
use crate::query::SortBy;
use crate::search::cache::FileStat;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub use engine::{EngineConfig, ProgressObserver, SearchEngine, Strategy, TierProgress};
pub use stream::{RunState, SearchStream};

/// Score assigned to every result until ranking exists.
pub const DEFAULT_SCORE: f64 = 1.0;

/// A file that survived the walk and awaits the predicate.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub extension: String,
    pub size: u64,
    pub modified_at: DateTime<Local>,
    pub created_at: DateTime<Local>,
}

impl Candidate {
    pub fn from_stat(path: PathBuf, stat: &FileStat) -> Self {
        Self {
            extension: extension_of(&path),
            size: stat.size,
            modified_at: DateTime::from(stat.modified),
            created_at: DateTime::from(stat.created),
            path,
        }
    }
}

/// Lowercased extension without the dot; empty when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// One matching file.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub path: PathBuf,
    pub extension: String,
    pub content_type: String,
    pub size: u64,
    pub modified: DateTime<Local>,
    pub created: DateTime<Local>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl SearchResult {
    pub fn from_candidate(candidate: Candidate) -> Self {
        Self {
            content_type: content_type(&candidate.path, &candidate.extension),
            path: candidate.path,
            extension: candidate.extension,
            size: candidate.size,
            modified: candidate.modified_at,
            created: candidate.created_at,
            score: DEFAULT_SCORE,
            snippet: None,
        }
    }

    /// Fills `snippet` from the first matching line of the file, if any.
    pub fn attach_snippet(&mut self, query_text: &str, context_lines: usize, use_regex: bool) {
        self.snippet = snippet::content_snippet(&self.path, query_text, context_lines, use_regex);
    }
}

/// Everything a non-streaming search produced.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    /// True when cancellation stopped the walk early.
    pub interrupted: bool,
}

/// Orders results in place. Name order ignores case, date order is newest first.
pub fn sort_results(results: &mut [SearchResult], sort_by: SortBy) {
    match sort_by {
        SortBy::Name => {
            results.sort_by_cached_key(|r| r.path.to_string_lossy().to_lowercase())
        }
        SortBy::Size => results.sort_by_key(|r| r.size),
        SortBy::Date => results.sort_by(|a, b| b.modified.cmp(&a.modified)),
    }
}
