//! # Turnstile - Bounded Per-Identifier Rate Limiting
//!
//! A token bucket rate limiter keyed by arbitrary strings (user emails, IP
//! addresses, API keys) that protects an API from abusive or runaway
//! clients while keeping its own memory bounded.
//!
//! ## The Token Bucket Algorithm
//!
//! ```text
//!     rate = 5 per second, one bucket per identifier:
//!
//!     t=0.0s  first call:  [●●●●○] ✅ (new bucket, one token spent)
//!     t=0.0s  4 more:      [○○○○○] ✅✅✅✅
//!     t=0.0s  6th call:    [○○○○○] ❌ (empty)
//!     t=0.4s  refill:      [●●○○○]    (0.4s × 5/s = 2 tokens)
//!     t=1.4s  refill:      [●●●●●]    (capped at rate)
//! ```
//!
//! Refills are computed lazily on each call from the time elapsed since the
//! bucket's last refill, rounded down so nobody is over-credited.
//!
//! ## Bounded Memory
//!
//! Two mechanisms keep the table small:
//!
//! 1. **Capacity eviction** - at most `max_entries` identifiers are tracked.
//!    A new identifier arriving at a full table displaces the least recently
//!    active one, found in O(log n) through a min-heap.
//! 2. **Sweeping** - a background thread periodically drops identifiers
//!    idle for more than two windows.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use turnstile::Limiter;
//!
//! // 100 requests per minute per identifier
//! let limiter = Limiter::new(100, Duration::from_secs(60)).unwrap();
//!
//! if limiter.allow("alice@example.com") {
//!     // handle the request
//! } else {
//!     // respond with 429 Too Many Requests
//! }
//! ```
//!
//! ### Builder
//!
//! ```rust
//! use std::time::Duration;
//! use turnstile::{LimiterBuilder, RefillPolicy};
//!
//! let limiter = LimiterBuilder::new()
//!     .rate(10)
//!     .duration(Duration::from_secs(60))
//!     .max_entries(10_000)
//!     .sweep_interval(Duration::from_secs(30))
//!     .refill_policy(RefillPolicy::WholeWindows)
//!     .try_build()
//!     .unwrap();
//!
//! assert!(limiter.allow("203.0.113.7"));
//! ```
//!
//! ## Architecture Overview
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │   HTTP middleware       │  picks the identifier,
//!                    └──────────┬──────────────┘  maps false → 429
//!                               │ allow(id)
//!                    ┌──────────▼──────────────┐
//!                    │        Limiter          │
//!                    └──────────┬──────────────┘
//!                               │ one mutex
//!                ┌──────────────┴───────────────┐
//!     ┌──────────▼──────────┐       ┌───────────▼──────────┐
//!     │   Visitor map       │ ◄───► │   Eviction heap      │
//!     │   id → heap slot    │       │   min last_update    │
//!     └─────────────────────┘       └───────────▲──────────┘
//!                                               │ pops idle visitors
//!                                   ┌───────────┴──────────┐
//!                                   │   Sweeper thread     │
//!                                   └──────────────────────┘
//! ```
//!
//! ## Performance Characteristics
//!
//! | Operation | Time Complexity |
//! |-----------|-----------------|
//! | allow() on a known identifier | O(log n) worst, O(1) without refill |
//! | allow() on a new identifier | O(log n) |
//! | sweep() | O(k log n) for k removed visitors |
//!
//! ## Thread Safety
//!
//! [`Limiter`] is `Send + Sync`; share it through an `Arc` ([`SharedLimiter`]).
//! Calls for one identifier are totally ordered, so concurrent bursts are
//! admitted exactly up to `rate`.
//!
//! ## Lifecycle
//!
//! Each limiter owns one sweeper thread, started by the constructor and
//! stopped by [`Limiter::shutdown`] or when the limiter is dropped.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations
)]
#![forbid(unsafe_code)]

mod limiter;

pub use limiter::{
    Clock, Limiter, LimiterConfig, LimiterError, LimiterRegistry, LimiterStats, ManualClock,
    RefillPolicy, Result, SystemClock, DEFAULT_IDLE_FACTOR, DEFAULT_MAX_ENTRIES,
    DEFAULT_SWEEP_INTERVAL,
};

use std::time::Duration;

/// A limiter wrapped in `Arc` for sharing across request handlers.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use turnstile::{Limiter, SharedLimiter};
/// use std::sync::Arc;
///
/// let shared: SharedLimiter = Arc::new(Limiter::new(10, Duration::from_secs(1)).unwrap());
///
/// let handler = Arc::clone(&shared);
/// std::thread::spawn(move || handler.allow("10.0.0.1")).join().unwrap();
/// ```
pub type SharedLimiter = std::sync::Arc<Limiter>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    //! Common imports for typical use.
    //!
    //! ```rust
    //! use turnstile::prelude::*;
    //!
    //! let config = LimiterConfig::per_minute(100);
    //! let limiter = Limiter::with_config(config).unwrap();
    //! assert!(limiter.allow("user"));
    //! ```

    pub use crate::{
        Limiter, LimiterBuilder, LimiterConfig, LimiterRegistry, LimiterStats, RefillPolicy,
        SharedLimiter,
    };
}

/// Fluent construction of a [`Limiter`].
///
/// Starts from [`LimiterConfig::default`]: 100 permits per minute, 100 000
/// tracked identifiers, a sweep every five minutes.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use turnstile::LimiterBuilder;
///
/// let limiter = LimiterBuilder::new()
///     .rate(3)
///     .duration(Duration::from_millis(100))
///     .try_build()
///     .unwrap();
///
/// // Invalid settings are reported instead of panicking
/// assert!(LimiterBuilder::new().rate(0).try_build().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LimiterBuilder {
    config: LimiterConfig,
}

impl LimiterBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Permits per window for each identifier (must be > 0).
    pub fn rate(mut self, rate: u32) -> Self {
        self.config.rate = rate;
        self
    }

    /// Length of the refill window (must be > 0).
    pub fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = duration;
        self
    }

    /// Cap on tracked identifiers (must be > 0).
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.config.max_entries = max_entries;
        self
    }

    /// Period of the background sweeper (must be > 0).
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Idle windows a visitor survives before being swept (must be > 0).
    pub fn idle_factor(mut self, factor: u32) -> Self {
        self.config.idle_factor = factor;
        self
    }

    /// Refill arithmetic.
    pub fn refill_policy(mut self, refill: RefillPolicy) -> Self {
        self.config.refill = refill;
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Builds the limiter with the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::InvalidConfig`] for invalid settings and
    /// [`LimiterError::SweeperSpawn`] if the sweeper thread cannot start.
    pub fn try_build(self) -> Result<Limiter> {
        Limiter::with_config(self.config)
    }

    /// Builds the limiter with a custom clock.
    pub fn try_build_with_clock<C: Clock>(self, clock: C) -> Result<Limiter> {
        Limiter::with_clock(self.config, clock)
    }
}

impl Limiter {
    /// Shorthand for [`LimiterBuilder::new`].
    pub fn builder() -> LimiterBuilder {
        LimiterBuilder::new()
    }
}
