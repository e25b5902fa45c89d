use crate::search::{ProgressObserver, TierProgress};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct TierStats {
    pub tiers_done: usize,
    pub tiers_deferred: usize,
    pub found: usize,
    start_time: Instant,
}

/// Spinner that reports each priority tier as it finishes.
pub struct TierProgressReporter {
    bar: ProgressBar,
    stats: Mutex<TierStats>,
}

impl TierProgressReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        Self::with_bar(bar)
    }

    /// A reporter that draws nothing, for non-interactive runs.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            stats: Mutex::new(TierStats {
                tiers_done: 0,
                tiers_deferred: 0,
                found: 0,
                start_time: Instant::now(),
            }),
        }
    }

    pub fn stats(&self) -> TierStats {
        self.stats.lock().clone()
    }

    pub fn finish(&self) -> TierStats {
        let stats = self.stats();
        self.bar.finish_and_clear();
        stats
    }
}

impl Default for TierProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for TierProgressReporter {
    fn tier_finished(&self, progress: &TierProgress) {
        let mut stats = self.stats.lock();
        stats.tiers_done += 1;
        stats.found += progress.found;
        if !progress.completed {
            stats.tiers_deferred += 1;
        }

        self.bar.set_message(format!(
            "[{}/{}] {} tier done: {} found ({} total, {:.1}s)",
            progress.index,
            progress.total,
            progress.tier,
            progress.found,
            stats.found,
            stats.start_time.elapsed().as_secs_f64()
        ));
    }
}
