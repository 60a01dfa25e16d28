//! # Time Sources
//!
//! The limiter never calls `Instant::now()` directly. It reads a [`Clock`],
//! which makes the refill arithmetic deterministic under test.
//!
//! ```text
//!     SystemClock ──► monotonic ns since process start
//!     ManualClock ──► whatever the test last set it to
//! ```
//!
//! Readings are plain `u64` nanoseconds. That covers ~584 years of uptime,
//! and keeps visitor records small.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

// Shared monotonic origin so every SystemClock agrees on "zero".
static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// A monotonic source of nanosecond timestamps.
///
/// Implementations must never go backwards. The limiter saturates elapsed
/// time at zero anyway, so a misbehaving clock causes missed refills rather
/// than panics.
pub trait Clock: Send + Sync + 'static {
    /// Nanoseconds since this clock's origin.
    fn now(&self) -> u64;
}

/// Monotonic clock backed by [`Instant`].
///
/// Wall-clock jumps (NTP, manual changes) do not affect it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline(always)]
    fn now(&self) -> u64 {
        let start = PROCESS_START.get_or_init(Instant::now);
        start.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same reading, so a test can keep one handle and give
/// another to the limiter.
///
/// ```rust
/// use std::time::Duration;
/// use turnstile::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let handle = clock.clone();
///
/// handle.advance(Duration::from_millis(250));
/// assert_eq!(clock.now(), 250_000_000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `by`, saturating at `u64::MAX` ns.
    pub fn advance(&self, by: Duration) {
        let step = by.as_nanos().min(u128::from(u64::MAX)) as u64;
        // fetch_update only fails when the closure returns None
        let _ = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(step))
            });
    }

    /// Sets the reading to an absolute value in nanoseconds.
    pub fn set(&self, nanos: u64) {
        self.nanos.store(nanos, Ordering::Release);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> u64 {
        self.nanos.load(Ordering::Acquire)
    }
}

impl<C: Clock> Clock for Arc<C> {
    #[inline]
    fn now(&self) -> u64 {
        (**self).now()
    }
}
