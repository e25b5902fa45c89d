//! Local file discovery: find files by name, content, extension, size and
//! modification date under one or more roots.
//!
//! ```no_run
//! use qry::{search, Query, SearchMode};
//!
//! let query = Query::new("todo or fixme").mode(SearchMode::Content);
//! for result in search(&query, &["."]).unwrap() {
//!     println!("{}", result.path.display());
//! }
//! ```
pub mod cancel;
pub mod cli;
pub mod config;
pub mod date_dirs;
pub mod error;
pub mod file_types;
pub mod metrics;
pub mod output_formats;
pub mod priority;
pub mod progress;
pub mod query;
pub mod search;
pub mod walker;

pub use crate::cancel::CancellationToken;
pub use crate::error::{QryError, Result};
pub use crate::priority::{DirectoryPriority, PriorityTier};
pub use crate::query::{DateRange, Query, SearchMode, SortBy};
pub use crate::search::snippet::content_snippet;
pub use crate::search::{
    EngineConfig, SearchEngine, SearchOutcome, SearchResult, SearchStream, Strategy,
};
use std::path::Path;

/// Runs `query` with a default engine and collects every result.
pub fn search<P: AsRef<Path>>(query: &Query, roots: &[P]) -> Result<Vec<SearchResult>> {
    SearchEngine::new(EngineConfig::default())?.search(query, roots)
}

/// Runs `query` with a default engine, yielding results as they are found.
pub fn search_streaming<P: AsRef<Path>>(query: &Query, roots: &[P]) -> Result<SearchStream> {
    SearchEngine::new(EngineConfig::default())?.search_streaming(query, roots)
}
