//! # Limiter Module
//!
//! Internal implementation, split by concern:
//!
//! ```text
//!     limiter/
//!     ├── mod.rs          (You are here - module organization)
//!     ├── config.rs       (Rate, window, capacity, refill policy)
//!     ├── clock.rs        (Monotonic and manual time sources)
//!     ├── table.rs        (Visitor map + eviction heap)
//!     ├── core.rs         (Limiter: allow, inspection, lifecycle)
//!     ├── sweeper.rs      (Background idle-visitor cleanup)
//!     ├── registry.rs     (Named limiters)
//!     ├── metrics.rs      (Counters and stats snapshots)
//!     └── error.rs        (Construction errors)
//! ```
//!
//! ## Layering
//!
//! ```text
//!     Registry ──► Limiter ──┬──► VisitorTable (under one mutex)
//!                            ├──► Clock
//!                            ├──► Counters
//!                            └──► Sweeper thread ──► same mutex
//! ```

mod clock;
mod config;
mod core;
mod error;
mod metrics;
mod registry;
mod sweeper;
mod table;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::config::{
    LimiterConfig, RefillPolicy, DEFAULT_IDLE_FACTOR, DEFAULT_MAX_ENTRIES, DEFAULT_SWEEP_INTERVAL,
};
pub use self::core::Limiter;
pub use self::error::{LimiterError, Result};
pub use self::metrics::LimiterStats;
pub use self::registry::LimiterRegistry;
