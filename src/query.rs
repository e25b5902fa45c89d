//! Search query model
use chrono::{DateTime, Duration, Local, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Cap used when the caller does not ask for one.
pub const DEFAULT_MAX_RESULTS: usize = 10_000_000;

/// Directory names that are never descended into unless the caller overrides them.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".venv",
    "venv",
    "env",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".tox",
    "node_modules",
    "dist",
    "build",
    ".eggs",
    ".idea",
    ".vscode",
    "target",
];

const OR_DELIMITER: &str = " or ";

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Filename,
    Content,
    Both,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Filename => write!(f, "filename"),
            SearchMode::Content => write!(f, "content"),
            SearchMode::Both => write!(f, "both"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Name,
    Size,
    Date,
}

/// Inclusive modification-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl DateRange {
    pub fn new(start: DateTime<Local>, end: DateTime<Local>) -> Self {
        Self { start, end }
    }

    /// The window covering the last `days` days up to now.
    pub fn last_days(days: u32) -> Self {
        let end = Local::now();
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    pub fn contains(&self, timestamp: &DateTime<Local>) -> bool {
        *timestamp >= self.start && *timestamp <= self.end
    }

    /// Whether the calendar span `[first, last]` shares at least one day with the window.
    pub fn overlaps_days(&self, first: NaiveDate, last: NaiveDate) -> bool {
        last >= self.start.date_naive() && first <= self.end.date_naive()
    }
}

/// A single search request. Built once and treated as immutable for the run.
#[derive(Debug, Clone)]
pub struct Query {
    pub text: String,
    pub file_types: BTreeSet<String>,
    pub date_range: Option<DateRange>,
    pub max_results: usize,
    pub max_depth: Option<usize>,
    pub exclude_dirs: Vec<String>,
    pub search_mode: SearchMode,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub use_regex: bool,
    pub sort_by: Option<SortBy>,
    pub case_sensitive: bool,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            text: String::new(),
            file_types: BTreeSet::new(),
            date_range: None,
            max_results: DEFAULT_MAX_RESULTS,
            max_depth: None,
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            search_mode: SearchMode::default(),
            min_size: None,
            max_size: None,
            use_regex: false,
            sort_by: None,
            case_sensitive: false,
        }
    }
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Accepted extensions; a leading dot is stripped and case is folded.
    pub fn file_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.file_types = types
            .into_iter()
            .map(|t| t.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Replaces the exclusion list. Duplicates keep their first position.
    pub fn exclude_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = Vec::new();
        for dir in dirs {
            let dir = dir.into();
            if !seen.contains(&dir) {
                seen.push(dir);
            }
        }
        self.exclude_dirs = seen;
        self
    }

    pub fn min_size(mut self, bytes: u64) -> Self {
        self.min_size = Some(bytes);
        self
    }

    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = Some(bytes);
        self
    }

    pub fn regex(mut self, use_regex: bool) -> Self {
        self.use_regex = use_regex;
        self
    }

    pub fn sort_by(mut self, sort: SortBy) -> Self {
        self.sort_by = Some(sort);
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Literal alternatives of a non-regex query.
    pub fn terms(&self) -> Vec<String> {
        split_terms(&self.text)
    }
}

/// Splits `text` on the literal delimiter `" or "` (ASCII case-insensitive).
///
/// Terms are trimmed and empty terms dropped. There is no escaping: a term that
/// itself contains `" or "` cannot be expressed.
pub fn split_terms(text: &str) -> Vec<String> {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let folded = text.to_ascii_lowercase();
    let mut terms = Vec::new();
    let mut start = 0;

    while let Some(pos) = folded[start..].find(OR_DELIMITER) {
        terms.push(&text[start..start + pos]);
        start += pos + OR_DELIMITER.len();
    }
    terms.push(&text[start..]);

    terms
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
