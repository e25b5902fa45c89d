//! The pull-based result stream handed to callers.
use crate::cancel::CancellationToken;
use crate::metrics::Metrics;
use crate::search::SearchResult;
use log::debug;
use std::sync::Arc;

pub(crate) type ResultIter = Box<dyn Iterator<Item = SearchResult> + Send>;

/// Lifecycle of a stream. Every state but `Running` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// The walk ran out of candidates.
    Completed,
    /// `max_results` were yielded.
    Capped,
    Cancelled,
}

/// Lazily yields results as the walk discovers them.
///
/// Dropping the stream stops any background workers feeding it.
pub struct SearchStream {
    inner: ResultIter,
    cancel: CancellationToken,
    remaining: usize,
    state: RunState,
    interrupted_early: bool,
    metrics: Option<Arc<Metrics>>,
}

impl SearchStream {
    pub(crate) fn new(
        inner: ResultIter,
        cancel: CancellationToken,
        max_results: usize,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            inner,
            cancel,
            remaining: max_results,
            state: RunState::Running,
            interrupted_early: false,
            metrics: Some(metrics),
        }
    }

    /// A stream over results collected ahead of time, e.g. for sorting.
    /// They were already counted when collected.
    ///
    /// `cancel` is the token the collection ran under. If it already fired,
    /// the collected results are still replayed.
    pub(crate) fn collected(
        results: Vec<SearchResult>,
        interrupted: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Box::new(results.into_iter()),
            cancel,
            remaining: usize::MAX,
            state: RunState::Running,
            interrupted_early: interrupted,
            metrics: None,
        }
    }

    /// A token that stops this stream from any thread.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// True when cancellation cut the walk short.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted_early || self.state == RunState::Cancelled
    }

    fn finish(&mut self, state: RunState) {
        self.state = state;
        // Releasing the walk drops channel receivers, which stops producers.
        self.inner = Box::new(std::iter::empty());
        debug!("Search stream finished: {state:?}");
    }
}

impl Iterator for SearchStream {
    type Item = SearchResult;

    fn next(&mut self) -> Option<SearchResult> {
        if self.state != RunState::Running {
            return None;
        }
        if !self.interrupted_early && self.cancel.is_cancelled() {
            self.finish(RunState::Cancelled);
            return None;
        }
        if self.remaining == 0 {
            self.finish(RunState::Capped);
            return None;
        }

        match self.inner.next() {
            Some(result) => {
                self.remaining -= 1;
                if let Some(metrics) = &self.metrics {
                    metrics.matches_found.inc();
                }
                if self.remaining == 0 {
                    self.finish(RunState::Capped);
                }
                Some(result)
            }
            None if self.cancel.is_cancelled() => {
                self.finish(RunState::Cancelled);
                None
            }
            None => {
                self.finish(RunState::Completed);
                None
            }
        }
    }
}
