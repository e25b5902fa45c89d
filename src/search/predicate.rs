//! The per-candidate match predicate.
//!
//! Checks run cheapest first: extension, size, modification date, then the
//! text test selected by the search mode. Content is only read once every
//! metadata check has passed.
use crate::error::Result;
use crate::query::{DateRange, Query, SearchMode};
use crate::search::cache::PatternCache;
use crate::search::content::{ContentMatcher, LiteralSet};
use crate::search::Candidate;
use regex::bytes::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;

enum TextTest {
    /// Empty query text.
    Always,
    Regex(Arc<Regex>),
    Literals {
        /// Terms for path matching, lowercased unless case-sensitive.
        folded: Vec<String>,
        content: LiteralSet,
    },
}

/// A query compiled for repeated evaluation across worker threads.
pub struct MatchPredicate {
    file_types: BTreeSet<String>,
    min_size: Option<u64>,
    max_size: Option<u64>,
    date_range: Option<DateRange>,
    mode: SearchMode,
    case_sensitive: bool,
    text: TextTest,
    content: ContentMatcher,
}

impl MatchPredicate {
    pub fn compile(query: &Query, patterns: &PatternCache, content: ContentMatcher) -> Result<Self> {
        let text = if query.use_regex {
            if query.text.is_empty() {
                TextTest::Always
            } else {
                TextTest::Regex(patterns.get(&query.text, query.case_sensitive, true)?)
            }
        } else {
            let terms = query.terms();
            if terms.is_empty() {
                TextTest::Always
            } else {
                let folded = terms
                    .iter()
                    .map(|t| fold(t, query.case_sensitive))
                    .collect();
                let content = LiteralSet::compile(&terms, query.case_sensitive, content.algorithm())?;
                TextTest::Literals { folded, content }
            }
        };

        Ok(Self {
            file_types: query.file_types.clone(),
            min_size: query.min_size,
            max_size: query.max_size,
            date_range: query.date_range,
            mode: query.search_mode,
            case_sensitive: query.case_sensitive,
            text,
            content,
        })
    }

    pub fn matches(&self, candidate: &Candidate) -> bool {
        self.type_matches(candidate)
            && self.size_matches(candidate)
            && self.date_matches(candidate)
            && self.text_matches(candidate)
    }

    fn type_matches(&self, candidate: &Candidate) -> bool {
        self.file_types.is_empty() || self.file_types.contains(&candidate.extension)
    }

    fn size_matches(&self, candidate: &Candidate) -> bool {
        self.min_size.map_or(true, |min| candidate.size >= min)
            && self.max_size.map_or(true, |max| candidate.size <= max)
    }

    fn date_matches(&self, candidate: &Candidate) -> bool {
        self.date_range
            .as_ref()
            .map_or(true, |range| range.contains(&candidate.modified_at))
    }

    fn text_matches(&self, candidate: &Candidate) -> bool {
        match self.mode {
            SearchMode::Filename => self.name_matches(candidate),
            SearchMode::Content => self.content_matches(candidate),
            SearchMode::Both => self.name_matches(candidate) || self.content_matches(candidate),
        }
    }

    /// Tested against the whole path as walked, not just the final component.
    fn name_matches(&self, candidate: &Candidate) -> bool {
        let path = candidate.path.to_string_lossy();
        match &self.text {
            TextTest::Always => true,
            TextTest::Regex(re) => re.is_match(path.as_bytes()),
            TextTest::Literals { folded, .. } => {
                let path = fold(&path, self.case_sensitive);
                folded.iter().any(|term| path.contains(term.as_str()))
            }
        }
    }

    fn content_matches(&self, candidate: &Candidate) -> bool {
        match &self.text {
            TextTest::Always => true,
            TextTest::Regex(re) => {
                self.content
                    .file_matches_regex(&candidate.path, candidate.size, re)
            }
            TextTest::Literals { content, .. } => {
                self.content
                    .scan_literals(&candidate.path, candidate.size, content)
            }
        }
    }
}

fn fold(text: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    }
}
