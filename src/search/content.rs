//! File content matching and the algorithm-selection policy.
//!
//! | patterns | file size        | strategy                                   |
//! |----------|------------------|--------------------------------------------|
//! | 0        | any              | vacuous match                              |
//! | >1       | any              | one Aho-Corasick pass                      |
//! | 1        | <= threshold     | read whole file, single substring scan     |
//! | 1        | > threshold      | memory-map, compiled escaped-literal regex |
//!
//! Unreadable files never surface as errors; they simply do not match.
use crate::error::Result;
use crate::search::algorithms::{
    MultiPatternSearch, SearchAlgorithm, SearchAlgorithmFactory, SearchAlgorithmTrait,
};
use log::debug;
use memmap2::Mmap;
use regex::bytes::{Regex, RegexBuilder};
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Files above this size are memory-mapped instead of read.
pub const DEFAULT_MMAP_THRESHOLD: u64 = 4 * 1024 * 1024;

/// Literal needles prepared once per query.
pub enum LiteralSet {
    Empty,
    Single {
        needle: Vec<u8>,
        case_sensitive: bool,
        searcher: Box<dyn SearchAlgorithmTrait>,
        large: LargeFileScan,
    },
    Multi(MultiPatternSearch),
}

/// How a single needle is found in a memory-mapped file.
pub enum LargeFileScan {
    Regex(Regex),
    /// Used when the escaped literal cannot be compiled as a byte regex.
    Automaton(MultiPatternSearch),
}

impl LiteralSet {
    pub fn compile<S: AsRef<str>>(
        patterns: &[S],
        case_sensitive: bool,
        algorithm: SearchAlgorithm,
    ) -> Result<Self> {
        let needles: Vec<&str> = patterns
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| !p.is_empty())
            .collect();

        match needles.as_slice() {
            [] => Ok(LiteralSet::Empty),
            [single] => {
                let needle = if case_sensitive {
                    single.as_bytes().to_vec()
                } else {
                    single.as_bytes().to_ascii_lowercase()
                };
                let searcher = SearchAlgorithmFactory::create(algorithm, &needle);
                let large = match RegexBuilder::new(&regex::escape(single))
                    .case_insensitive(!case_sensitive)
                    .unicode(false)
                    .build()
                {
                    Ok(re) => LargeFileScan::Regex(re),
                    Err(e) => {
                        debug!("Falling back to automaton for large-file scan of '{single}': {e}");
                        LargeFileScan::Automaton(MultiPatternSearch::new(&[single], case_sensitive)?)
                    }
                };
                Ok(LiteralSet::Single {
                    needle,
                    case_sensitive,
                    searcher,
                    large,
                })
            }
            many => Ok(LiteralSet::Multi(MultiPatternSearch::new(many, case_sensitive)?)),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, LiteralSet::Empty)
    }
}

/// Reads or maps file content and applies a prepared matcher.
#[derive(Debug, Clone, Copy)]
pub struct ContentMatcher {
    mmap_threshold: u64,
    algorithm: SearchAlgorithm,
}

impl Default for ContentMatcher {
    fn default() -> Self {
        Self {
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
            algorithm: SearchAlgorithm::Simd,
        }
    }
}

impl ContentMatcher {
    pub fn new(mmap_threshold: u64, algorithm: SearchAlgorithm) -> Self {
        Self {
            mmap_threshold,
            algorithm,
        }
    }

    pub fn algorithm(&self) -> SearchAlgorithm {
        self.algorithm
    }

    /// True iff the file contains at least one of `patterns` as a literal.
    pub fn file_contains_any<S: AsRef<str>>(
        &self,
        path: &Path,
        patterns: &[S],
        case_sensitive: bool,
    ) -> bool {
        let set = match LiteralSet::compile(patterns, case_sensitive, self.algorithm) {
            Ok(set) => set,
            Err(e) => {
                debug!("Could not prepare content patterns: {e}");
                return false;
            }
        };
        if set.is_empty() {
            return true;
        }
        match fs::metadata(path) {
            Ok(metadata) => self.scan_literals(path, metadata.len(), &set),
            Err(e) => {
                debug!("Skipping unreadable file {}: {e}", path.display());
                false
            }
        }
    }

    /// Like [`file_contains_any`](Self::file_contains_any) with a prepared set and a known size.
    pub fn scan_literals(&self, path: &Path, size: u64, set: &LiteralSet) -> bool {
        let outcome = match set {
            LiteralSet::Empty => return true,
            LiteralSet::Multi(automaton) => self
                .with_content(path, size, |bytes| automaton.is_match(bytes)),
            LiteralSet::Single { large, .. } if size > self.mmap_threshold => {
                map_file(path).map(|mmap| match large {
                    LargeFileScan::Regex(re) => re.is_match(&mmap),
                    LargeFileScan::Automaton(automaton) => automaton.is_match(&mmap),
                })
            }
            LiteralSet::Single {
                needle,
                case_sensitive,
                searcher,
                ..
            } => fs::read(path).map(|mut data| {
                if !case_sensitive {
                    data.make_ascii_lowercase();
                }
                needle.len() <= data.len() && searcher.contains(&data)
            }),
        };

        outcome.unwrap_or_else(|e| {
            debug!("Skipping unreadable file {}: {e}", path.display());
            false
        })
    }

    /// Regex content match with the same read/map split.
    pub fn file_matches_regex(&self, path: &Path, size: u64, regex: &Regex) -> bool {
        self.with_content(path, size, |bytes| regex.is_match(bytes))
            .unwrap_or_else(|e| {
                debug!("Skipping unreadable file {}: {e}", path.display());
                false
            })
    }

    fn with_content<F>(&self, path: &Path, size: u64, check: F) -> io::Result<bool>
    where
        F: FnOnce(&[u8]) -> bool,
    {
        if size > self.mmap_threshold {
            let mmap = map_file(path)?;
            Ok(check(&mmap))
        } else {
            let data = fs::read(path)?;
            Ok(check(&data))
        }
    }
}

fn map_file(path: &Path) -> io::Result<Mmap> {
    let file = File::open(path)?;
    // SAFETY: read-only mapping that lives for a single scan.
    unsafe { Mmap::map(&file) }
}
