//! Core search engine implementation
use crate::cancel::CancellationToken;
use crate::error::{QryError, Result};
use crate::metrics::Metrics;
use crate::priority::{DirectoryPriority, PriorityTier};
use crate::query::Query;
use crate::search::algorithms::SearchAlgorithm;
use crate::search::cache::{CacheStats, PatternCache, StatCache};
use crate::search::content::{ContentMatcher, DEFAULT_MMAP_THRESHOLD};
use crate::search::predicate::MatchPredicate;
use crate::search::strategies::{
    IncrementalWalk, ParallelWalk, PlainWalk, PriorityWalk, SearchContext,
};
use crate::search::stream::{ResultIter, SearchStream};
use crate::search::{sort_results, SearchOutcome, SearchResult};
use crate::walker::DirPruner;
use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_INCREMENTAL_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
const MAX_DEFAULT_WORKERS: usize = 8;

/// Traversal order.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Depth-first, file-name order. Date-bounded queries fan out across workers.
    #[default]
    Plain,
    /// Strictly tier by tier.
    Priority,
    /// Tier by tier, skipping ahead when a tier stays silent.
    Incremental,
}

/// Progress report emitted when a priority tier has been searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierProgress {
    pub tier: PriorityTier,
    /// 1-based position among the non-empty tiers.
    pub index: usize,
    pub total: usize,
    pub found: usize,
    /// False when the tier timed out and its remaining directories were deferred.
    pub completed: bool,
}

/// Receives tier progress. Called on the thread that pulls results.
pub trait ProgressObserver: Send + Sync {
    fn tier_finished(&self, progress: &TierProgress);
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub strategy: Strategy,
    pub workers: usize,
    pub incremental_timeout: Duration,
    pub mmap_threshold: u64,
    pub algorithm: SearchAlgorithm,
    pub channel_capacity: usize,
}

/// `min(8, logical CPUs)`.
pub fn default_workers() -> usize {
    num_cpus::get().clamp(1, MAX_DEFAULT_WORKERS)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            workers: default_workers(),
            incremental_timeout: DEFAULT_INCREMENTAL_TIMEOUT,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
            algorithm: SearchAlgorithm::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Runs queries against the filesystem.
///
/// Caches live as long as the engine and are shared by every search it runs,
/// including concurrent ones.
pub struct SearchEngine {
    config: EngineConfig,
    stat_cache: Arc<StatCache>,
    pattern_cache: Arc<PatternCache>,
    priority: Arc<DirectoryPriority>,
    metrics: Arc<Metrics>,
    pool: Arc<rayon::ThreadPool>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl SearchEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(QryError::EngineUnavailable(
                "worker count must be at least 1".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("qry-worker-{i}"))
            .build()
            .map_err(|e| QryError::EngineUnavailable(format!("thread pool: {e}")))?;
        let priority = DirectoryPriority::standard()
            .map_err(|e| QryError::EngineUnavailable(format!("priority rules: {e}")))?;
        let metrics = Metrics::new().map_err(|e| QryError::EngineUnavailable(e.to_string()))?;

        debug!(
            "Search engine ready: {:?} strategy, {} workers",
            config.strategy, config.workers
        );
        Ok(Self {
            config,
            stat_cache: Arc::new(StatCache::new()),
            pattern_cache: Arc::new(PatternCache::new()),
            priority: Arc::new(priority),
            metrics: Arc::new(metrics),
            pool: Arc::new(pool),
            observer: None,
        })
    }

    /// Replaces the standard tier table.
    pub fn with_priority(mut self, priority: DirectoryPriority) -> Self {
        self.priority = Arc::new(priority);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            stat_entries: self.stat_cache.len(),
            pattern_entries: self.pattern_cache.len(),
        }
    }

    /// Collects every result, sorted if the query asks for it.
    pub fn search<P: AsRef<Path>>(&self, query: &Query, roots: &[P]) -> Result<Vec<SearchResult>> {
        Ok(self
            .search_with_cancel(query, roots, CancellationToken::new())?
            .results)
    }

    /// Like [`search`](Self::search), but stops early once `cancel` fires and
    /// reports what was found so far.
    pub fn search_with_cancel<P: AsRef<Path>>(
        &self,
        query: &Query,
        roots: &[P],
        cancel: CancellationToken,
    ) -> Result<SearchOutcome> {
        let start = Instant::now();
        let mut stream = self.search_streaming_with_cancel(query, roots, cancel)?;
        let results: Vec<SearchResult> = stream.by_ref().collect();
        info!(
            "Search for '{}' found {} results in {:.2?}",
            query.text,
            results.len(),
            start.elapsed()
        );
        Ok(SearchOutcome {
            results,
            interrupted: stream.is_interrupted(),
        })
    }

    /// Lazily yields results as they are found.
    ///
    /// With `sort_by` set the walk has to finish before the first result, so
    /// the stream is collected, sorted and replayed.
    pub fn search_streaming<P: AsRef<Path>>(&self, query: &Query, roots: &[P]) -> Result<SearchStream> {
        self.search_streaming_with_cancel(query, roots, CancellationToken::new())
    }

    pub fn search_streaming_with_cancel<P: AsRef<Path>>(
        &self,
        query: &Query,
        roots: &[P],
        cancel: CancellationToken,
    ) -> Result<SearchStream> {
        let roots: Vec<PathBuf> = roots.iter().map(|r| r.as_ref().to_path_buf()).collect();
        let ctx = Arc::new(self.context(query, cancel.clone())?);
        let walk = self.walk(query, ctx, &roots);
        let stream = SearchStream::new(
            walk,
            cancel.clone(),
            query.max_results,
            Arc::clone(&self.metrics),
        );

        match query.sort_by {
            None => Ok(stream),
            Some(sort_by) => {
                let mut stream = stream;
                let mut results: Vec<SearchResult> = stream.by_ref().collect();
                sort_results(&mut results, sort_by);
                Ok(SearchStream::collected(results, stream.is_interrupted(), cancel))
            }
        }
    }

    fn context(&self, query: &Query, cancel: CancellationToken) -> Result<SearchContext> {
        let matcher = ContentMatcher::new(self.config.mmap_threshold, self.config.algorithm);
        let predicate = MatchPredicate::compile(query, &self.pattern_cache, matcher)?;
        let pruner = DirPruner::new(
            &query.exclude_dirs,
            query.date_range,
            self.metrics.dirs_pruned.clone(),
        );
        Ok(SearchContext {
            predicate,
            stat_cache: Arc::clone(&self.stat_cache),
            metrics: Arc::clone(&self.metrics),
            pruner: Arc::new(pruner),
            max_depth: query.max_depth,
            cancel,
            pool: Arc::clone(&self.pool),
            workers: self.config.workers,
        })
    }

    fn walk(&self, query: &Query, ctx: Arc<SearchContext>, roots: &[PathBuf]) -> ResultIter {
        let observer = self.observer.clone();
        match self.config.strategy {
            Strategy::Plain if query.date_range.is_some() && self.config.workers > 1 => Box::new(
                ParallelWalk::spawn(ctx, roots, self.config.channel_capacity),
            ),
            Strategy::Plain => Box::new(PlainWalk::new(ctx, roots)),
            Strategy::Priority => Box::new(PriorityWalk::new(ctx, &self.priority, roots, observer)),
            Strategy::Incremental => Box::new(IncrementalWalk::spawn(
                ctx,
                Arc::clone(&self.priority),
                roots,
                self.config.incremental_timeout,
                self.config.channel_capacity,
                observer,
            )),
        }
    }
}
