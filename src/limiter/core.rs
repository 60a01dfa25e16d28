//! # Limiter Core
//!
//! [`Limiter::allow`] is the only call on the request path. It takes one
//! lock, makes an O(log n) change to the visitor table, and returns a
//! boolean.
//!
//! ```text
//!     allow("alice")
//!          │
//!          ▼
//!     ┌──────────┐    unseen    ┌────────────────────┐
//!     │   lock   │─────────────►│ full? evict oldest │──► insert (rate-1) ──► ✅
//!     └────┬─────┘              └────────────────────┘
//!          │ seen
//!          ▼
//!     refill by elapsed time ──► tokens > 0 ? ──yes──► consume ──► ✅
//!                                     │
//!                                     no ──────────────────────► ❌
//! ```
//!
//! ## Concurrency
//!
//! One mutex guards the whole table. Calls for the same identifier are
//! totally ordered by it, so a burst of concurrent calls never grants more
//! than `rate` permits. Calls for different identifiers are independent but
//! share the lock. The critical section never allocates more than one key
//! and never performs I/O; logging happens after the lock is released.

use super::{
    clock::{Clock, SystemClock},
    config::LimiterConfig,
    error::Result,
    metrics::{Counters, LimiterStats},
    sweeper::Sweeper,
    table::{Quota, VisitorTable},
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// State shared between a [`Limiter`] and its sweeper thread.
pub(crate) struct Shared {
    table: Mutex<VisitorTable>,
    quota: Quota,
    idle: Duration,
    max_entries: usize,
    clock: Box<dyn Clock>,
    counters: Counters,
}

impl Shared {
    pub(crate) fn new(config: &LimiterConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            table: Mutex::new(VisitorTable::new(config.max_entries)),
            quota: Quota::from(config),
            idle: config.idle_cutoff(),
            max_entries: config.max_entries,
            clock,
            counters: Counters::default(),
        }
    }

    pub(crate) fn allow(&self, identifier: &str) -> bool {
        let admission = {
            let mut table = self.table.lock();
            // Read the clock under the lock so timestamps enter the heap in order.
            let now = self.clock.now();
            table.insert_or_refill(identifier, now, self.quota)
        };

        if let Some(evicted) = admission.evicted {
            self.counters.record_eviction();
            debug!(
                "Table full, evicted least recently active visitor {:?} for {:?}",
                evicted.key, identifier
            );
        }
        self.counters.record_decision(admission.allowed);
        admission.allowed
    }

    pub(crate) fn sweep(&self) -> usize {
        let removed = {
            let mut table = self.table.lock();
            let now = self.clock.now();
            table.sweep_expired(now, self.idle)
        };
        self.counters.record_swept(removed);
        removed
    }

    pub(crate) fn stats(&self) -> LimiterStats {
        let tracked = self.table.lock().len();
        self.counters.snapshot(tracked, self.max_entries)
    }
}

/// Per-identifier token bucket limiter with a bounded visitor table.
///
/// Each identifier gets `rate` permits per `duration`, refilled continuously
/// as time passes. At most `max_entries` identifiers are tracked; a new
/// identifier arriving at a full table displaces the least recently active
/// one. A background sweeper forgets identifiers idle for more than
/// `idle_factor × duration` (two windows by default).
///
/// The sweeper starts on construction and stops on [`shutdown`](Self::shutdown)
/// or drop.
///
/// ## Example
///
/// ```rust
/// use std::time::Duration;
/// use turnstile::Limiter;
///
/// let limiter = Limiter::new(3, Duration::from_millis(100)).unwrap();
///
/// assert!(limiter.allow("u1"));
/// assert!(limiter.allow("u1"));
/// assert!(limiter.allow("u1"));
/// assert!(!limiter.allow("u1")); // budget spent
/// assert!(limiter.allow("u2"));  // independent bucket
///
/// limiter.shutdown();
/// ```
pub struct Limiter {
    shared: Arc<Shared>,
    config: LimiterConfig,
    sweeper: Mutex<Option<Sweeper>>,
}

impl Limiter {
    /// `rate` permits per `duration`, tracking up to
    /// [`DEFAULT_MAX_ENTRIES`](crate::DEFAULT_MAX_ENTRIES) identifiers.
    ///
    /// # Errors
    ///
    /// Fails if `rate` or `duration` is zero, or the sweeper cannot start.
    pub fn new(rate: u32, duration: Duration) -> Result<Self> {
        Self::with_config(LimiterConfig::new(rate, duration))
    }

    /// Like [`new`](Self::new) with an explicit identifier cap.
    pub fn with_max_entries(rate: u32, duration: Duration, max_entries: usize) -> Result<Self> {
        Self::with_config(LimiterConfig::new(rate, duration).with_max_entries(max_entries))
    }

    /// Builds a limiter from a full configuration, reading the system clock.
    pub fn with_config(config: LimiterConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Builds a limiter that reads time from `clock`.
    ///
    /// Pass a [`ManualClock`](crate::ManualClock) to drive refills and
    /// sweeps deterministically.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use turnstile::{Limiter, LimiterConfig, ManualClock};
    ///
    /// let clock = ManualClock::new();
    /// let config = LimiterConfig::new(1, Duration::from_secs(1));
    /// let limiter = Limiter::with_clock(config, clock.clone()).unwrap();
    ///
    /// assert!(limiter.allow("k"));
    /// assert!(!limiter.allow("k"));
    /// clock.advance(Duration::from_secs(1));
    /// assert!(limiter.allow("k"));
    /// ```
    pub fn with_clock<C: Clock>(config: LimiterConfig, clock: C) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared::new(&config, Box::new(clock)));
        let sweeper = Sweeper::spawn(Arc::downgrade(&shared), config.sweep_interval)?;

        debug!(
            "Created limiter: {} per {:?}, max {} entries",
            config.rate, config.duration, config.max_entries
        );

        Ok(Self {
            shared,
            config,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    /// Decides whether `identifier` may proceed, consuming one permit if so.
    ///
    /// Never fails and never blocks beyond waiting for the table lock. Any
    /// string is a valid identifier, including the empty string.
    #[inline]
    pub fn allow(&self, identifier: &str) -> bool {
        self.shared.allow(identifier)
    }

    /// Runs one sweep pass now. Returns how many visitors were dropped.
    pub fn sweep(&self) -> usize {
        self.shared.sweep()
    }

    /// Number of identifiers currently tracked.
    pub fn len(&self) -> usize {
        self.shared.table.lock().len()
    }

    /// Whether no identifiers are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `identifier` has a bucket.
    pub fn contains(&self, identifier: &str) -> bool {
        self.shared.table.lock().contains(identifier)
    }

    /// Permits left in `identifier`'s bucket as of its last refill.
    ///
    /// Does not refill or consume. `None` for untracked identifiers, which
    /// would get a full bucket on their next call.
    pub fn remaining(&self, identifier: &str) -> Option<u32> {
        self.shared.table.lock().remaining(identifier)
    }

    /// Forgets `identifier`; its next call starts from a full bucket.
    pub fn reset(&self, identifier: &str) -> bool {
        self.shared.table.lock().remove(identifier)
    }

    /// Forgets every identifier. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let count = self.shared.table.lock().clear();
        debug!("Cleared {} visitors", count);
        count
    }

    /// Snapshot of table size and lifetime counters.
    pub fn stats(&self) -> LimiterStats {
        self.shared.stats()
    }

    /// The configuration this limiter was built with.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Whether the background sweeper is still running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    /// Stops the background sweeper and waits for it to exit.
    ///
    /// Idempotent. `allow` keeps working afterwards; idle visitors are then
    /// only dropped by capacity eviction or explicit [`sweep`](Self::sweep)
    /// calls.
    pub fn shutdown(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop();
        }
    }
}

impl Drop for Limiter {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.stop();
        }
    }
}

impl std::fmt::Debug for Limiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Limiter")
            .field("rate", &self.config.rate)
            .field("duration", &self.config.duration)
            .field("max_entries", &self.config.max_entries)
            .field("tracked", &self.len())
            .field("sweeping", &self.is_sweeping())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::clock::ManualClock;
    use crate::limiter::config::RefillPolicy;
    use crate::limiter::error::LimiterError;
    use std::thread;

    fn manual(rate: u32, duration_ms: u64) -> (Limiter, ManualClock) {
        let clock = ManualClock::new();
        let config = LimiterConfig::new(rate, Duration::from_millis(duration_ms));
        let limiter = Limiter::with_clock(config, clock.clone()).unwrap();
        (limiter, clock)
    }

    #[test]
    fn test_concrete_scenario() {
        let (limiter, _clock) = manual(3, 100);

        assert!(limiter.allow("u1"));
        assert!(limiter.allow("u1"));
        assert!(limiter.allow("u1"));
        assert!(!limiter.allow("u1"));
        assert!(limiter.allow("u2"));
    }

    #[test]
    fn test_refill_after_full_window() {
        let (limiter, clock) = manual(5, 100);

        for _ in 0..5 {
            assert!(limiter.allow("k"));
        }
        assert!(!limiter.allow("k"));

        clock.advance(Duration::from_millis(100));
        for _ in 0..5 {
            assert!(limiter.allow("k"));
        }
        assert!(!limiter.allow("k"));
    }

    #[test]
    fn test_whole_window_policy_ignores_partial_windows() {
        let clock = ManualClock::new();
        let config = LimiterConfig::new(4, Duration::from_millis(100))
            .with_refill_policy(RefillPolicy::WholeWindows);
        let limiter = Limiter::with_clock(config, clock.clone()).unwrap();

        for _ in 0..4 {
            assert!(limiter.allow("k"));
        }
        clock.advance(Duration::from_millis(99));
        assert!(!limiter.allow("k"));

        clock.advance(Duration::from_millis(1));
        assert!(limiter.allow("k"));
        assert_eq!(limiter.remaining("k"), Some(3));
    }

    #[test]
    fn test_construction_rejects_bad_config() {
        assert!(matches!(
            Limiter::new(0, Duration::from_secs(1)),
            Err(LimiterError::InvalidConfig(_))
        ));
        assert!(Limiter::new(1, Duration::ZERO).is_err());
        assert!(Limiter::with_max_entries(1, Duration::from_secs(1), 0).is_err());
    }

    #[test]
    fn test_capacity_eviction_counts() {
        let clock = ManualClock::new();
        let config = LimiterConfig::new(2, Duration::from_secs(1)).with_max_entries(3);
        let limiter = Limiter::with_clock(config, clock.clone()).unwrap();

        for key in ["a", "b", "c", "d", "e"] {
            clock.advance(Duration::from_millis(1));
            assert!(limiter.allow(key));
        }

        assert_eq!(limiter.len(), 3);
        assert!(!limiter.contains("a"));
        assert!(!limiter.contains("b"));
        assert!(limiter.contains("e"));
        assert_eq!(limiter.stats().total_evicted, 2);
        limiter.shared.table.lock().check_invariants();
    }

    #[test]
    fn test_sweep_forgets_idle_visitors() {
        let (limiter, clock) = manual(2, 100);

        assert!(limiter.allow("idle"));
        assert!(limiter.allow("idle"));
        assert!(!limiter.allow("idle"));

        clock.advance(Duration::from_millis(150));
        assert!(limiter.allow("active"));
        clock.advance(Duration::from_millis(60));

        // idle: last refill at 0, cutoff at 210 - 200 = 10ms
        assert_eq!(limiter.sweep(), 1);
        assert!(!limiter.contains("idle"));
        assert!(limiter.contains("active"));
        assert_eq!(limiter.stats().total_swept, 1);

        assert!(limiter.allow("idle"));
        assert_eq!(limiter.remaining("idle"), Some(1));
    }

    #[test]
    fn test_reset_and_clear() {
        let (limiter, _clock) = manual(1, 1000);

        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        assert!(limiter.reset("a"));
        assert!(!limiter.reset("a"));
        assert!(limiter.allow("a"));

        limiter.allow("b");
        assert_eq!(limiter.clear(), 2);
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_concurrent_exactness() {
        let (limiter, _clock) = manual(100, 1000);
        let limiter = Arc::new(limiter);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || (0..20).filter(|_| limiter.allow("concurrent-user")).count())
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 100);

        let stats = limiter.stats();
        assert_eq!(stats.total_allowed, 100);
        assert_eq!(stats.total_rejected, 100);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (limiter, _clock) = manual(1, 100);
        assert!(limiter.is_sweeping());

        limiter.shutdown();
        limiter.shutdown();
        assert!(!limiter.is_sweeping());

        // decisions still work without the sweeper
        assert!(limiter.allow("x"));
        assert!(!limiter.allow("x"));
    }

    #[test]
    fn test_debug_impl() {
        let (limiter, _clock) = manual(7, 100);
        let debug_str = format!("{:?}", limiter);

        assert!(debug_str.contains("Limiter"));
        assert!(debug_str.contains("rate: 7"));
        assert!(debug_str.contains("sweeping: true"));
    }
}
