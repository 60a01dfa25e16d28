//! # Limiter Statistics
//!
//! Lifetime counters for one limiter plus a point-in-time snapshot type.
//!
//! ```text
//!     Limiter Stats:
//!     ├─ Table:     1 204 / 100 000 identifiers
//!     ├─ Decisions: 58 113 allowed, 2 041 rejected
//!     └─ Removals:  310 evicted, 9 877 swept
//! ```
//!
//! Counters are relaxed atomics bumped after a decision is made; they never
//! take part in the decision itself.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fraction of `max_entries` above which a limiter counts as near capacity.
const NEAR_CAPACITY_RATIO: f64 = 0.8;

#[derive(Debug, Default)]
pub(crate) struct Counters {
    allowed: AtomicU64,
    rejected: AtomicU64,
    evicted: AtomicU64,
    swept: AtomicU64,
}

impl Counters {
    #[inline]
    pub(crate) fn record_decision(&self, allowed: bool) {
        let counter = if allowed { &self.allowed } else { &self.rejected };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_eviction(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_swept(&self, n: usize) {
        if n > 0 {
            self.swept.fetch_add(n as u64, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self, tracked: usize, max_entries: usize) -> LimiterStats {
        LimiterStats {
            tracked,
            max_entries,
            total_allowed: self.allowed.load(Ordering::Relaxed),
            total_rejected: self.rejected.load(Ordering::Relaxed),
            total_evicted: self.evicted.load(Ordering::Relaxed),
            total_swept: self.swept.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of a limiter's state and lifetime counters.
///
/// ## Example
///
/// ```rust
/// use std::time::Duration;
/// use turnstile::Limiter;
///
/// let limiter = Limiter::new(2, Duration::from_secs(1)).unwrap();
/// limiter.allow("10.0.0.1");
/// limiter.allow("10.0.0.1");
/// limiter.allow("10.0.0.1");
///
/// let stats = limiter.stats();
/// assert_eq!(stats.tracked, 1);
/// assert_eq!(stats.total_allowed, 2);
/// assert_eq!(stats.total_rejected, 1);
/// println!("{}", stats);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterStats {
    /// Identifiers currently tracked.
    pub tracked: usize,

    /// Configured cap on tracked identifiers.
    pub max_entries: usize,

    /// `allow` calls that returned `true`.
    pub total_allowed: u64,

    /// `allow` calls that returned `false`.
    pub total_rejected: u64,

    /// Visitors dropped to make room for a new identifier.
    pub total_evicted: u64,

    /// Visitors dropped by sweeping.
    pub total_swept: u64,
}

impl LimiterStats {
    /// Share of `max_entries` in use, from 0.0 to 1.0.
    pub fn capacity_used(&self) -> f64 {
        if self.max_entries == 0 {
            0.0
        } else {
            self.tracked as f64 / self.max_entries as f64
        }
    }

    /// Share of decisions that were rejections, from 0.0 to 1.0.
    pub fn rejection_ratio(&self) -> f64 {
        let total = self.total_allowed + self.total_rejected;
        if total == 0 {
            0.0
        } else {
            self.total_rejected as f64 / total as f64
        }
    }

    /// Whether more than 80% of the table is in use.
    ///
    /// A table that stays near capacity evicts on most new arrivals, which
    /// hands fresh buckets to identifiers that were recently throttled.
    pub fn is_near_capacity(&self) -> bool {
        self.capacity_used() > NEAR_CAPACITY_RATIO
    }

    /// Human-readable multi-line report.
    pub fn summary(&self) -> String {
        format!(
            "Limiter Stats:\n\
             ├─ Table:\n\
             │  ├─ Tracked: {}/{}\n\
             │  └─ Capacity Used: {:.2}%\n\
             ├─ Decisions:\n\
             │  ├─ Allowed: {}\n\
             │  ├─ Rejected: {}\n\
             │  └─ Rejection Ratio: {:.2}%\n\
             └─ Removals:\n\
                ├─ Evicted: {}\n\
                └─ Swept: {}",
            self.tracked,
            self.max_entries,
            self.capacity_used() * 100.0,
            self.total_allowed,
            self.total_rejected,
            self.rejection_ratio() * 100.0,
            self.total_evicted,
            self.total_swept,
        )
    }
}

impl fmt::Display for LimiterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
