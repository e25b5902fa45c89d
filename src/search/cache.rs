//! Engine-owned caches for file metadata and compiled patterns.
//!
//! Both caches are append-only for the lifetime of the engine that owns them:
//! nothing is invalidated mid-run, so a file that changes during a search may be
//! reported with stale size or mtime. Concurrent misses on the same key simply
//! recompute; the first insert wins.
use crate::error::Result;
use log::debug;
use parking_lot::RwLock;
use regex::bytes::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// The subset of `fs::Metadata` the engine needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub modified: SystemTime,
    pub created: SystemTime,
    pub is_dir: bool,
    pub is_file: bool,
}

impl FileStat {
    fn from_metadata(metadata: &fs::Metadata) -> Option<Self> {
        let modified = metadata.modified().ok()?;
        // Not every filesystem records a birth time.
        let created = metadata.created().unwrap_or(modified);
        Some(Self {
            size: metadata.len(),
            modified,
            created,
            is_dir: metadata.is_dir(),
            is_file: metadata.is_file(),
        })
    }
}

/// Memoized `stat` lookups. A failed lookup is cached as `None`.
#[derive(Default)]
pub struct StatCache {
    entries: RwLock<HashMap<PathBuf, Option<FileStat>>>,
}

impl StatCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for `path`, following symlinks.
    pub fn stat(&self, path: &Path) -> Option<FileStat> {
        if let Some(cached) = self.entries.read().get(path) {
            return *cached;
        }

        let stat = match fs::metadata(path) {
            Ok(metadata) => FileStat::from_metadata(&metadata),
            Err(e) => {
                debug!("stat failed for {}: {e}", path.display());
                None
            }
        };

        *self
            .entries
            .write()
            .entry(path.to_path_buf())
            .or_insert(stat)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Cache key for compiled patterns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternKey {
    pub pattern: String,
    pub case_sensitive: bool,
    pub regex: bool,
}

/// Compiled byte regexes keyed by (pattern, case sensitivity, regex flag).
#[derive(Default)]
pub struct PatternCache {
    compiled: RwLock<HashMap<PatternKey, Arc<Regex>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled matcher for `pattern`.
    ///
    /// With `regex` set, a pattern that does not parse is matched as an escaped
    /// literal instead. Without it the pattern is always a literal.
    pub fn get(&self, pattern: &str, case_sensitive: bool, regex: bool) -> Result<Arc<Regex>> {
        let key = PatternKey {
            pattern: pattern.to_string(),
            case_sensitive,
            regex,
        };
        if let Some(hit) = self.compiled.read().get(&key) {
            return Ok(Arc::clone(hit));
        }

        let compiled = Arc::new(compile(pattern, case_sensitive, regex)?);
        Ok(Arc::clone(
            self.compiled.write().entry(key).or_insert(compiled),
        ))
    }

    pub fn len(&self) -> usize {
        self.compiled.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.read().is_empty()
    }
}

fn compile(pattern: &str, case_sensitive: bool, regex: bool) -> Result<Regex> {
    if regex {
        match RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
        {
            Ok(compiled) => return Ok(compiled),
            Err(e) => debug!("Invalid regex '{pattern}', matching it literally: {e}"),
        }
    }

    Ok(RegexBuilder::new(&regex::escape(pattern))
        .case_insensitive(!case_sensitive)
        .build()?)
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub stat_entries: usize,
    pub pattern_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn test_stat_is_memoized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let cache = StatCache::new();
        let first = cache.stat(&path).unwrap();
        assert_eq!(first.size, 5);
        assert!(first.is_file);

        // Never invalidated: the cached size survives a rewrite.
        fs::write(&path, "hello world").unwrap();
        assert_eq!(cache.stat(&path).unwrap().size, 5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_stat_is_cached() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        let cache = StatCache::new();

        assert!(cache.stat(&missing).is_none());
        fs::write(&missing, "now it exists").unwrap();
        assert!(cache.stat(&missing).is_none());
    }

    #[test]
    fn test_pattern_reuse() {
        let cache = PatternCache::new();
        let a = cache.get(r"\.py$", false, true).unwrap();
        let b = cache.get(r"\.py$", false, true).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        cache.get(r"\.py$", true, true).unwrap();
        cache.get(r"\.py$", false, false).unwrap();
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_invalid_regex_falls_back_to_literal() {
        let cache = PatternCache::new();
        let re = cache.get("foo(", false, true).unwrap();
        assert!(re.is_match(b"call foo( here"));
        assert!(!re.is_match(b"call foo here"));
    }

    #[test]
    fn test_literal_mode_escapes() {
        let cache = PatternCache::new();
        let re = cache.get("a.c", false, false).unwrap();
        assert!(re.is_match(b"A.C"));
        assert!(!re.is_match(b"abc"));
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(PatternCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for j in 0..50 {
                        cache.get(&format!("p{}", j % 10), i % 2 == 0, false).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 20);
    }
}
