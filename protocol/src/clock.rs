//! # Clock Sources
//!
//! The vault ledger never reads the wall clock directly. Every operation asks
//! an injected [`Clock`] for the current [`Timestamp`], which keeps the state
//! machine deterministic under test and lets a host plug in block time.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Seconds since the Unix epoch. Time never goes negative inside the ledger.
pub type Timestamp = u64;

/// A source of the current logical time.
pub trait Clock: Send + Sync {
    /// Returns the current timestamp in seconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the operating system, via `chrono`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-epoch system clocks clamp to zero rather than wrapping.
        Utc::now().timestamp().max(0) as Timestamp
    }
}

/// A clock that only moves when told to.
///
/// Used by tests and by hosts that replay operations at recorded times.
/// Interior mutability lets a shared `Arc<ManualClock>` be advanced while
/// the ledger holds another handle to it.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Jump to an absolute timestamp. Moving backwards is allowed; callers
    /// that need monotonicity should only use [`advance`](Self::advance).
    pub fn set(&self, timestamp: Timestamp) {
        self.now.store(timestamp, Ordering::SeqCst);
    }

    /// Move forward by `secs`, saturating at `u64::MAX`.
    pub fn advance(&self, secs: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_add(secs))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
