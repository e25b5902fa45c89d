//! Exact-match search primitives over raw bytes.
//!
//! Every single-pattern algorithm here reports the start offset of every
//! occurrence, overlapping ones included, and must agree with [`NaiveSearch`].
//! An empty pattern matches nowhere.
use crate::error::{QryError, Result};
use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use clap::ValueEnum;
use memchr::memmem;
use serde::{Deserialize, Serialize};

/// Trait for single-pattern search algorithms
pub trait SearchAlgorithmTrait: Send + Sync {
    fn find_all(&self, text: &[u8]) -> Vec<usize>;

    fn contains(&self, text: &[u8]) -> bool {
        !self.find_all(text).is_empty()
    }

    fn name(&self) -> &'static str;
}

/// Search algorithm types
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchAlgorithm {
    Naive,
    #[default]
    Simd,
    BoyerMooreHorspool,
    Kmp,
}

/// Search algorithm factory
pub struct SearchAlgorithmFactory;

impl SearchAlgorithmFactory {
    pub fn create(algorithm: SearchAlgorithm, pattern: &[u8]) -> Box<dyn SearchAlgorithmTrait> {
        match algorithm {
            SearchAlgorithm::Naive => Box::new(NaiveSearch::new(pattern)),
            SearchAlgorithm::Simd => Box::new(SimdSearch::new(pattern)),
            SearchAlgorithm::BoyerMooreHorspool => Box::new(BoyerMooreHorspool::new(pattern)),
            SearchAlgorithm::Kmp => Box::new(KnuthMorrisPratt::new(pattern)),
        }
    }
}

/// Window-by-window comparison. The reference the others are checked against.
pub struct NaiveSearch {
    pattern: Vec<u8>,
}

impl NaiveSearch {
    pub fn new(pattern: &[u8]) -> Self {
        Self {
            pattern: pattern.to_vec(),
        }
    }
}

impl SearchAlgorithmTrait for NaiveSearch {
    fn find_all(&self, text: &[u8]) -> Vec<usize> {
        if self.pattern.is_empty() || self.pattern.len() > text.len() {
            return vec![];
        }
        text.windows(self.pattern.len())
            .enumerate()
            .filter(|(_, window)| *window == self.pattern.as_slice())
            .map(|(i, _)| i)
            .collect()
    }

    fn name(&self) -> &'static str {
        "Naive"
    }
}

/// SIMD-accelerated substring search using memchr
pub struct SimdSearch {
    finder: memmem::Finder<'static>,
}

impl SimdSearch {
    pub fn new(pattern: &[u8]) -> Self {
        Self {
            finder: memmem::Finder::new(pattern).into_owned(),
        }
    }
}

impl SearchAlgorithmTrait for SimdSearch {
    fn find_all(&self, text: &[u8]) -> Vec<usize> {
        if self.finder.needle().is_empty() {
            return vec![];
        }

        // memmem's own iterator skips overlapping hits, so restart one byte on.
        let mut matches = Vec::new();
        let mut pos = 0;
        while pos < text.len() {
            match self.finder.find(&text[pos..]) {
                Some(found) => {
                    matches.push(pos + found);
                    pos += found + 1;
                }
                None => break,
            }
        }
        matches
    }

    fn contains(&self, text: &[u8]) -> bool {
        !self.finder.needle().is_empty() && self.finder.find(text).is_some()
    }

    fn name(&self) -> &'static str {
        "SIMD"
    }
}

/// Boyer-Moore-Horspool: bad-character shifts only, O(n/m) on average.
pub struct BoyerMooreHorspool {
    pattern: Vec<u8>,
    shift: [usize; 256],
}

impl BoyerMooreHorspool {
    pub fn new(pattern: &[u8]) -> Self {
        let m = pattern.len();
        let mut shift = [m.max(1); 256];
        if m > 0 {
            for (i, &byte) in pattern[..m - 1].iter().enumerate() {
                shift[byte as usize] = m - 1 - i;
            }
        }
        Self {
            pattern: pattern.to_vec(),
            shift,
        }
    }
}

impl SearchAlgorithmTrait for BoyerMooreHorspool {
    fn find_all(&self, text: &[u8]) -> Vec<usize> {
        let (n, m) = (text.len(), self.pattern.len());
        let mut matches = Vec::new();
        if m == 0 || m > n {
            return matches;
        }

        let mut i = m - 1;
        while i < n {
            let start = i + 1 - m;
            if text[start..=i] == self.pattern[..] {
                matches.push(start);
            }
            i += self.shift[text[i] as usize];
        }
        matches
    }

    fn name(&self) -> &'static str {
        "Boyer-Moore-Horspool"
    }
}

/// Knuth-Morris-Pratt: O(n + m) worst case.
pub struct KnuthMorrisPratt {
    pattern: Vec<u8>,
    failure: Vec<usize>,
}

impl KnuthMorrisPratt {
    pub fn new(pattern: &[u8]) -> Self {
        Self {
            pattern: pattern.to_vec(),
            failure: Self::build_failure_table(pattern),
        }
    }

    /// `failure[i]` is the length of the longest proper prefix of
    /// `pattern[..=i]` that is also its suffix.
    fn build_failure_table(pattern: &[u8]) -> Vec<usize> {
        let mut table = vec![0; pattern.len()];
        let mut j = 0;
        for i in 1..pattern.len() {
            while j > 0 && pattern[i] != pattern[j] {
                j = table[j - 1];
            }
            if pattern[i] == pattern[j] {
                j += 1;
            }
            table[i] = j;
        }
        table
    }
}

impl SearchAlgorithmTrait for KnuthMorrisPratt {
    fn find_all(&self, text: &[u8]) -> Vec<usize> {
        let m = self.pattern.len();
        let mut matches = Vec::new();
        if m == 0 {
            return matches;
        }

        let mut j = 0;
        for (i, &byte) in text.iter().enumerate() {
            while j > 0 && byte != self.pattern[j] {
                j = self.failure[j - 1];
            }
            if byte == self.pattern[j] {
                j += 1;
            }
            if j == m {
                matches.push(i + 1 - m);
                j = self.failure[j - 1];
            }
        }
        matches
    }

    fn name(&self) -> &'static str {
        "Knuth-Morris-Pratt"
    }
}

/// Aho-Corasick automaton for matching many literal needles in one pass.
pub struct MultiPatternSearch {
    patterns: Vec<Vec<u8>>,
    automaton: AhoCorasick,
}

impl MultiPatternSearch {
    pub fn new<P: AsRef<[u8]>>(patterns: &[P], case_sensitive: bool) -> Result<Self> {
        let patterns: Vec<Vec<u8>> = patterns
            .iter()
            .map(|p| p.as_ref().to_vec())
            .filter(|p| !p.is_empty())
            .collect();
        let automaton = AhoCorasickBuilder::new()
            .ascii_case_insensitive(!case_sensitive)
            .build(&patterns)
            .map_err(|e| QryError::Other(format!("Aho-Corasick error: {e}")))?;

        Ok(Self {
            patterns,
            automaton,
        })
    }

    /// Every occurrence of every needle as `(start offset, pattern index)`,
    /// overlapping occurrences included.
    pub fn find_all(&self, text: &[u8]) -> Vec<(usize, usize)> {
        if self.patterns.is_empty() {
            return vec![];
        }
        self.automaton
            .find_overlapping_iter(text)
            .map(|m| (m.start(), m.pattern().as_usize()))
            .collect()
    }

    /// Stops at the first occurrence of any needle.
    pub fn is_match(&self, text: &[u8]) -> bool {
        !self.patterns.is_empty() && self.automaton.is_match(text)
    }

    pub fn patterns(&self) -> &[Vec<u8>] {
        &self.patterns
    }

    pub fn name(&self) -> &'static str {
        "Aho-Corasick"
    }
}
