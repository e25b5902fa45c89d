//! Traversal strategies behind [`SearchStream`](super::SearchStream).
//!
//! * [`PlainWalk`]: lazy depth-first walk on the caller's thread.
//! * [`ParallelWalk`]: directories fanned out over the worker pool, results
//!   delivered through a bounded channel in no particular order.
//! * [`PriorityWalk`]: directories bucketed by tier and visited tier by tier.
//! * [`IncrementalWalk`]: tiers on a producer thread; a tier that stays silent
//!   past the timeout has its remaining directories deferred to the end.
use crate::cancel::CancellationToken;
use crate::metrics::Metrics;
use crate::priority::{DirectoryPriority, PriorityTier};
use crate::search::cache::StatCache;
use crate::search::engine::{ProgressObserver, TierProgress};
use crate::search::predicate::MatchPredicate;
use crate::search::{Candidate, SearchResult};
use crate::walker::{collect_dirs, list_files, walk_files, DirPruner};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use log::{debug, info};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use walkdir::DirEntry;

/// Directories with fewer files than this are evaluated on one thread.
const PARALLEL_DIR_THRESHOLD: usize = 32;

/// State shared by every strategy for one run.
pub(crate) struct SearchContext {
    pub predicate: MatchPredicate,
    pub stat_cache: Arc<StatCache>,
    pub metrics: Arc<Metrics>,
    pub pruner: Arc<DirPruner>,
    pub max_depth: Option<usize>,
    pub cancel: CancellationToken,
    pub pool: Arc<ThreadPool>,
    pub workers: usize,
}

impl SearchContext {
    /// Stats `path` and runs the predicate. Directories never match.
    pub fn evaluate(&self, path: &Path) -> Option<SearchResult> {
        self.metrics.files_scanned.inc();
        let stat = match self.stat_cache.stat(path) {
            Some(stat) if stat.is_file => stat,
            Some(_) => return None,
            None => {
                self.metrics.files_skipped.inc();
                return None;
            }
        };

        let candidate = Candidate::from_stat(path.to_path_buf(), &stat);
        self.predicate
            .matches(&candidate)
            .then(|| SearchResult::from_candidate(candidate))
    }

    /// Evaluates the direct files of `dir`, in file-name order.
    ///
    /// Large directories are split across the pool unless `inline` is set
    /// (the caller already runs on a pool thread).
    pub fn evaluate_dir(&self, dir: &Path, inline: bool) -> Vec<SearchResult> {
        let files = list_files(dir);
        if !inline && self.workers > 1 && files.len() >= PARALLEL_DIR_THRESHOLD {
            return self.pool.install(|| {
                files
                    .par_iter()
                    .filter(|_| !self.cancel.is_cancelled())
                    .filter_map(|path| self.evaluate(path))
                    .collect()
            });
        }

        let mut results = Vec::new();
        for (i, path) in files.iter().enumerate() {
            if self.cancel.is_cancelled_sparse(i) {
                break;
            }
            results.extend(self.evaluate(path));
        }
        results
    }

    fn stopped(&self, stop: &AtomicBool) -> bool {
        stop.load(Ordering::Relaxed) || self.cancel.is_cancelled()
    }
}

fn existing_roots(roots: &[PathBuf]) -> Vec<PathBuf> {
    roots
        .iter()
        .filter(|root| {
            let exists = root.exists();
            if !exists {
                debug!("Skipping missing root: {}", root.display());
            }
            exists
        })
        .cloned()
        .collect()
}

/// Roots that are plain files, evaluated directly rather than walked.
fn split_roots(roots: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    existing_roots(roots).into_iter().partition(|root| root.is_file())
}

/// Lazy single-threaded walk. Nothing is read until the first pull.
pub(crate) struct PlainWalk {
    ctx: Arc<SearchContext>,
    roots: VecDeque<PathBuf>,
    entries: Option<Box<dyn Iterator<Item = DirEntry> + Send>>,
}

impl PlainWalk {
    pub fn new(ctx: Arc<SearchContext>, roots: &[PathBuf]) -> Self {
        Self {
            ctx,
            roots: roots.iter().cloned().collect(),
            entries: None,
        }
    }
}

impl Iterator for PlainWalk {
    type Item = SearchResult;

    fn next(&mut self) -> Option<SearchResult> {
        loop {
            if self.ctx.cancel.is_cancelled() {
                return None;
            }

            if self.entries.is_none() {
                let root = self.roots.pop_front()?;
                if !root.exists() {
                    debug!("Skipping missing root: {}", root.display());
                    continue;
                }
                let walk = walk_files(&root, Arc::clone(&self.ctx.pruner), self.ctx.max_depth);
                self.entries = Some(Box::new(walk));
            }

            match self.entries.as_mut().and_then(|entries| entries.next()) {
                Some(entry) => {
                    if let Some(result) = self.ctx.evaluate(entry.path()) {
                        return Some(result);
                    }
                }
                None => self.entries = None,
            }
        }
    }
}

/// Results of a background producer, read in batches from a bounded channel.
///
/// Dropping it raises the stop flag and closes the channel, so blocked
/// producers give up on their next send.
pub(crate) struct ChannelWalk<T> {
    rx: Receiver<T>,
    stop: Arc<AtomicBool>,
}

impl<T> Drop for ChannelWalk<T> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Fans directories out across the pool. Used for date-bounded plain searches,
/// where pruning keeps the directory list small enough to collect up front.
pub(crate) struct ParallelWalk {
    channel: ChannelWalk<Vec<SearchResult>>,
    buffer: VecDeque<SearchResult>,
}

impl ParallelWalk {
    pub fn spawn(ctx: Arc<SearchContext>, roots: &[PathBuf], capacity: usize) -> Self {
        let (tx, rx) = bounded::<Vec<SearchResult>>(capacity.max(1));
        let stop = Arc::new(AtomicBool::new(false));
        let roots = roots.to_vec();
        let producer_stop = Arc::clone(&stop);

        thread::spawn(move || {
            let (files, dirs) = split_roots(&roots);
            let loose: Vec<SearchResult> = files.iter().filter_map(|f| ctx.evaluate(f)).collect();
            if !loose.is_empty() && tx.send(loose).is_err() {
                return;
            }

            let dirs: Vec<PathBuf> = dirs
                .iter()
                .flat_map(|root| collect_dirs(root, &ctx.pruner, ctx.max_depth, &ctx.cancel))
                .collect();
            debug!("Parallel walk over {} directories", dirs.len());

            ctx.pool.install(|| {
                dirs.par_iter().for_each(|dir| {
                    if ctx.stopped(&producer_stop) {
                        return;
                    }
                    let batch = ctx.evaluate_dir(dir, true);
                    if !batch.is_empty() && tx.send(batch).is_err() {
                        producer_stop.store(true, Ordering::Relaxed);
                    }
                });
            });
        });

        Self {
            channel: ChannelWalk { rx, stop },
            buffer: VecDeque::new(),
        }
    }
}

impl Iterator for ParallelWalk {
    type Item = SearchResult;

    fn next(&mut self) -> Option<SearchResult> {
        loop {
            if let Some(result) = self.buffer.pop_front() {
                return Some(result);
            }
            let batch = self.channel.rx.recv().ok()?;
            self.buffer.extend(batch);
        }
    }
}

/// Directories grouped by tier, highest tier first, empty tiers dropped.
fn bucket_dirs(
    ctx: &SearchContext,
    priority: &DirectoryPriority,
    roots: &[PathBuf],
) -> Vec<(PriorityTier, Vec<PathBuf>)> {
    let mut tiers: BTreeMap<PriorityTier, Vec<PathBuf>> = BTreeMap::new();
    for root in roots {
        for dir in collect_dirs(root, &ctx.pruner, ctx.max_depth, &ctx.cancel) {
            let relative = dir.strip_prefix(root).unwrap_or(&dir);
            let tier = priority.priority_of(relative);
            tiers.entry(tier).or_default().push(dir);
        }
    }

    for (tier, dirs) in &tiers {
        debug!("Tier {tier}: {} directories", dirs.len());
    }
    tiers.into_iter().collect()
}

fn report(observer: &Option<Arc<dyn ProgressObserver>>, progress: TierProgress) {
    info!(
        "[{}/{}] {} tier: {} found{}",
        progress.index,
        progress.total,
        progress.tier,
        progress.found,
        if progress.completed { "" } else { " (deferred)" }
    );
    if let Some(observer) = observer {
        observer.tier_finished(&progress);
    }
}

/// Tier-ordered walk on the caller's thread. Every result from a higher tier
/// is yielded before any result from a lower one.
pub(crate) struct PriorityWalk {
    ctx: Arc<SearchContext>,
    loose_files: VecDeque<PathBuf>,
    tiers: VecDeque<(PriorityTier, VecDeque<PathBuf>)>,
    total: usize,
    index: usize,
    found: usize,
    pending: VecDeque<SearchResult>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl PriorityWalk {
    pub fn new(
        ctx: Arc<SearchContext>,
        priority: &DirectoryPriority,
        roots: &[PathBuf],
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Self {
        let (files, dirs) = split_roots(roots);
        let tiers: VecDeque<_> = bucket_dirs(&ctx, priority, &dirs)
            .into_iter()
            .map(|(tier, dirs)| (tier, VecDeque::from(dirs)))
            .collect();
        Self {
            total: tiers.len(),
            ctx,
            loose_files: files.into(),
            tiers,
            index: 0,
            found: 0,
            pending: VecDeque::new(),
            observer,
        }
    }
}

impl Iterator for PriorityWalk {
    type Item = SearchResult;

    fn next(&mut self) -> Option<SearchResult> {
        loop {
            if self.ctx.cancel.is_cancelled() {
                return None;
            }
            if let Some(result) = self.pending.pop_front() {
                self.found += 1;
                return Some(result);
            }
            if let Some(file) = self.loose_files.pop_front() {
                if let Some(result) = self.ctx.evaluate(&file) {
                    return Some(result);
                }
                continue;
            }

            let next_dir = match self.tiers.front_mut() {
                Some((_, dirs)) => dirs.pop_front(),
                None => return None,
            };
            match next_dir {
                Some(dir) => self.pending.extend(self.ctx.evaluate_dir(&dir, false)),
                None => {
                    if let Some((tier, _)) = self.tiers.pop_front() {
                        self.index += 1;
                        report(
                            &self.observer,
                            TierProgress {
                                tier,
                                index: self.index,
                                total: self.total,
                                found: self.found,
                                completed: true,
                            },
                        );
                        self.found = 0;
                    }
                }
            }
        }
    }
}

enum TierEvent {
    /// Non-empty tiers in visiting order, sent once bucketing is done.
    Tiers(Vec<PriorityTier>),
    Found(SearchResult),
    TierStarted(usize),
    TierDone {
        index: usize,
        found: usize,
        completed: bool,
    },
}

/// Tier-ordered walk that never lets one slow tier hold back the rest.
///
/// Bucketing happens on the producer thread, so the stream is returned
/// before the tree has been listed.
pub(crate) struct IncrementalWalk {
    channel: ChannelWalk<TierEvent>,
    tiers: Vec<PriorityTier>,
    /// Last tier the producer announced.
    started: Option<usize>,
    skip_to: Arc<AtomicUsize>,
    timeout: Duration,
    cancel: CancellationToken,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl IncrementalWalk {
    pub fn spawn(
        ctx: Arc<SearchContext>,
        priority: Arc<DirectoryPriority>,
        roots: &[PathBuf],
        timeout: Duration,
        capacity: usize,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Self {
        let (tx, rx) = bounded::<TierEvent>(capacity.max(1));
        let stop = Arc::new(AtomicBool::new(false));
        let skip_to = Arc::new(AtomicUsize::new(0));
        let cancel = ctx.cancel.clone();
        let roots = roots.to_vec();
        let (producer_stop, producer_skip) = (Arc::clone(&stop), Arc::clone(&skip_to));

        thread::spawn(move || {
            let send = |event: TierEvent| tx.send(event).is_ok();

            let (files, dirs) = split_roots(&roots);
            for file in &files {
                if let Some(result) = ctx.evaluate(file) {
                    if !send(TierEvent::Found(result)) {
                        return;
                    }
                }
            }

            let buckets = bucket_dirs(&ctx, &priority, &dirs);
            if !send(TierEvent::Tiers(buckets.iter().map(|(tier, _)| *tier).collect())) {
                return;
            }

            let mut deferred = Vec::new();
            for (index, (tier, dirs)) in buckets.into_iter().enumerate() {
                if !send(TierEvent::TierStarted(index)) {
                    return;
                }
                let mut found = 0;
                let mut completed = true;
                let mut searched = false;
                let mut dirs = VecDeque::from(dirs);

                while let Some(dir) = dirs.pop_front() {
                    if ctx.stopped(&producer_stop) {
                        return;
                    }
                    // A tier always gets at least one directory.
                    if searched && producer_skip.load(Ordering::Relaxed) > index {
                        debug!("Deferring {} directories of tier {tier}", dirs.len() + 1);
                        deferred.push(dir);
                        deferred.extend(dirs.drain(..));
                        completed = false;
                        break;
                    }
                    searched = true;
                    for result in ctx.evaluate_dir(&dir, false) {
                        found += 1;
                        if !send(TierEvent::Found(result)) {
                            return;
                        }
                    }
                }

                if !send(TierEvent::TierDone {
                    index,
                    found,
                    completed,
                }) {
                    return;
                }
            }

            if !deferred.is_empty() {
                debug!("Sweeping {} deferred directories", deferred.len());
            }
            for dir in deferred {
                if ctx.stopped(&producer_stop) {
                    return;
                }
                for result in ctx.evaluate_dir(&dir, false) {
                    if !send(TierEvent::Found(result)) {
                        return;
                    }
                }
            }
        });

        Self {
            channel: ChannelWalk { rx, stop },
            tiers: Vec::new(),
            started: None,
            skip_to,
            timeout,
            cancel,
            observer,
        }
    }
}

impl Iterator for IncrementalWalk {
    type Item = SearchResult;

    fn next(&mut self) -> Option<SearchResult> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }

            match self.channel.rx.recv_timeout(self.timeout) {
                Ok(TierEvent::Found(result)) => return Some(result),
                Ok(TierEvent::Tiers(tiers)) => self.tiers = tiers,
                Ok(TierEvent::TierStarted(index)) => self.started = Some(index),
                Ok(TierEvent::TierDone {
                    index,
                    found,
                    completed,
                }) => report(
                    &self.observer,
                    TierProgress {
                        tier: self.tiers[index],
                        index: index + 1,
                        total: self.tiers.len(),
                        found,
                        completed,
                    },
                ),
                // Only the tier in progress can be given up on; later tiers get
                // their own timeout once they start.
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(index) = self.started {
                        if self.skip_to.load(Ordering::Relaxed) <= index {
                            debug!(
                                "No result within {:?}, moving past tier {}",
                                self.timeout, self.tiers[index]
                            );
                            self.skip_to.store(index + 1, Ordering::Relaxed);
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Query, SearchMode};
    use crate::search::cache::PatternCache;
    use crate::search::content::ContentMatcher;
    use std::fs;
    use tempfile::tempdir;

    fn context(query: &Query, cancel: CancellationToken, workers: usize) -> SearchContext {
        let metrics = Metrics::new().unwrap();
        let pruner = DirPruner::new(&query.exclude_dirs, None, metrics.dirs_pruned.clone());
        let predicate =
            MatchPredicate::compile(query, &PatternCache::new(), ContentMatcher::default()).unwrap();
        SearchContext {
            predicate,
            stat_cache: Arc::new(StatCache::new()),
            metrics: Arc::new(metrics),
            pruner: Arc::new(pruner),
            max_depth: None,
            cancel,
            pool: Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .unwrap(),
            ),
            workers,
        }
    }

    fn large_dir(count: usize) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        for i in 0..count {
            fs::write(dir.path().join(format!("file{i:04}.txt")), "needle").unwrap();
        }
        dir
    }

    #[test]
    fn test_evaluate_dir_matches_every_file() {
        let dir = large_dir(2 * PARALLEL_DIR_THRESHOLD);
        let query = Query::new("needle").mode(SearchMode::Content);
        for workers in [1, 4] {
            let ctx = context(&query, CancellationToken::new(), workers);
            let results = ctx.evaluate_dir(dir.path(), false);
            assert_eq!(results.len(), 2 * PARALLEL_DIR_THRESHOLD);
            assert!(results[0].path.ends_with("file0000.txt"));
        }
    }

    #[test]
    fn test_cancelled_large_dir_scans_nothing() {
        let dir = large_dir(600);
        let token = CancellationToken::new();
        token.cancel();

        for (workers, inline) in [(4, false), (4, true), (1, false)] {
            let ctx = context(&Query::new(""), token.clone(), workers);
            assert!(ctx.evaluate_dir(dir.path(), inline).is_empty());
            assert_eq!(ctx.metrics.files_scanned.get(), 0);
        }
    }
}
