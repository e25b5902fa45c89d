//! Cooperative cancellation for running searches.
//!
//! The engine checks the token on every pull from a stream, at every directory
//! boundary, and every [`CANCEL_CHECK_INTERVAL`] files inside large directories.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How many files a worker may process between two token checks.
/// Power of two so the check is a mask.
pub const CANCEL_CHECK_INTERVAL: usize = 0x100;

/// Shared stop flag. Clones observe the same state.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Only reads the flag every `CANCEL_CHECK_INTERVAL` iterations.
    #[inline]
    pub fn is_cancelled_sparse(&self, counter: usize) -> bool {
        counter & (CANCEL_CHECK_INTERVAL - 1) == 0 && self.is_cancelled()
    }
}
