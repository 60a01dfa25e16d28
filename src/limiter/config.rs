//! # Limiter Configuration
//!
//! Settings for a [`Limiter`](crate::Limiter): how many permits each
//! identifier gets per window, how many identifiers may be tracked at once,
//! and how aggressively idle identifiers are forgotten.
//!
//! ```text
//!     One visitor's bucket:
//!
//!     ┌──────────────────────────────┐
//!     │   rate = 5                   │ ← permits per window
//!     │   ┌─────────────────────┐    │
//!     │   │ ● ● ● ○ ○           │    │ ← 3 tokens left
//!     │   └─────────────────────┘    │
//!     │   duration = 1s              │ ← refill window
//!     └──────────────────────────────┘
//!
//!     Table:  at most `max_entries` buckets
//!     Sweep:  every `sweep_interval`, drop buckets idle > idle_factor × duration
//! ```

use super::error::{LimiterError, Result};
use std::time::Duration;

/// Default cap on distinct identifiers tracked by one limiter.
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

/// Default period between two background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default idle multiplier: visitors idle for more than two windows are swept.
pub const DEFAULT_IDLE_FACTOR: u32 = 2;

/// How many tokens a returning visitor regains for the time it was away.
///
/// Both policies use integer arithmetic and round down, so a visitor is never
/// credited more than it earned. They differ inside a window:
///
/// ```text
///     rate = 10, duration = 1s, visitor idle for 1.5s
///
///     Proportional  → floor(1.5 × 10)     = 15 → clamped to 10
///     WholeWindows  → floor(1.5) × 10     = 10
///
///     visitor idle for 0.5s
///
///     Proportional  → floor(0.5 × 10)     = 5
///     WholeWindows  → floor(0.5) × 10     = 0
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefillPolicy {
    /// Continuous refill: `floor(elapsed × rate / duration)`.
    #[default]
    Proportional,

    /// Refill only for completed windows: `floor(elapsed / duration) × rate`.
    WholeWindows,
}

impl RefillPolicy {
    /// Tokens earned after `elapsed_ns` of inactivity, capped at `rate`.
    ///
    /// The cap does not change the outcome since the bucket itself is clamped
    /// to `rate`, but it keeps the result in `u32`.
    #[inline]
    pub fn tokens_earned(self, elapsed_ns: u64, rate: u32, duration: Duration) -> u32 {
        let window_ns = duration.as_nanos().max(1);
        let elapsed = u128::from(elapsed_ns);
        let rate_wide = u128::from(rate);

        let earned = match self {
            Self::Proportional => elapsed.saturating_mul(rate_wide) / window_ns,
            Self::WholeWindows => (elapsed / window_ns).saturating_mul(rate_wide),
        };

        earned.min(rate_wide) as u32
    }
}

/// Configuration for a single [`Limiter`](crate::Limiter).
///
/// ## Example
///
/// ```rust
/// use std::time::Duration;
/// use turnstile::{LimiterConfig, RefillPolicy};
///
/// // 10 login attempts per minute, at most 50k tracked users
/// let config = LimiterConfig::per_minute(10)
///     .with_max_entries(50_000)
///     .with_sweep_interval(Duration::from_secs(60))
///     .with_refill_policy(RefillPolicy::WholeWindows);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterConfig {
    /// Maximum permits granted per `duration` to one identifier.
    pub rate: u32,

    /// Length of the refill window.
    pub duration: Duration,

    /// Hard cap on identifiers tracked at the same time.
    pub max_entries: usize,

    /// How often the background sweeper runs.
    pub sweep_interval: Duration,

    /// Visitors idle longer than `idle_factor × duration` are swept.
    pub idle_factor: u32,

    /// Refill arithmetic.
    pub refill: RefillPolicy,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            rate: 100,
            duration: Duration::from_secs(60),
            max_entries: DEFAULT_MAX_ENTRIES,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            idle_factor: DEFAULT_IDLE_FACTOR,
            refill: RefillPolicy::default(),
        }
    }
}

impl LimiterConfig {
    /// `rate` permits per `duration`, everything else at its default.
    pub fn new(rate: u32, duration: Duration) -> Self {
        Self {
            rate,
            duration,
            ..Default::default()
        }
    }

    /// `rate` permits per second.
    pub fn per_second(rate: u32) -> Self {
        Self::new(rate, Duration::from_secs(1))
    }

    /// `rate` permits per minute.
    pub fn per_minute(rate: u32) -> Self {
        Self::new(rate, Duration::from_secs(60))
    }

    /// Sets the cap on tracked identifiers.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Sets the period of the background sweeper.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets how many idle windows a visitor survives before being swept.
    pub fn with_idle_factor(mut self, factor: u32) -> Self {
        self.idle_factor = factor;
        self
    }

    /// Sets the refill arithmetic.
    pub fn with_refill_policy(mut self, refill: RefillPolicy) -> Self {
        self.refill = refill;
        self
    }

    /// Checks the construction-time contract.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::InvalidConfig`] when any of `rate`, `duration`,
    /// `max_entries`, `sweep_interval` or `idle_factor` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.rate == 0 {
            return Err(LimiterError::InvalidConfig("rate must be greater than 0"));
        }
        if self.duration.is_zero() {
            return Err(LimiterError::InvalidConfig(
                "duration must be greater than 0",
            ));
        }
        if self.max_entries == 0 {
            return Err(LimiterError::InvalidConfig(
                "max_entries must be greater than 0",
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(LimiterError::InvalidConfig(
                "sweep_interval must be greater than 0",
            ));
        }
        if self.idle_factor == 0 {
            return Err(LimiterError::InvalidConfig(
                "idle_factor must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Idle time after which a visitor becomes eligible for sweeping.
    pub fn idle_cutoff(&self) -> Duration {
        self.duration.saturating_mul(self.idle_factor)
    }

    /// Sustained permits per second for one identifier.
    pub fn effective_rate_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            f64::from(self.rate) / secs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = LimiterConfig::default();
        assert_eq!(config.rate, 100);
        assert_eq!(config.duration, Duration::from_secs(60));
        assert_eq!(config.max_entries, 100_000);
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
        assert_eq!(config.idle_factor, 2);
        assert_eq!(config.refill, RefillPolicy::Proportional);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let zero_rate = LimiterConfig::new(0, Duration::from_secs(1));
        assert!(matches!(
            zero_rate.validate(),
            Err(LimiterError::InvalidConfig(_))
        ));

        let zero_duration = LimiterConfig::new(5, Duration::ZERO);
        assert!(zero_duration.validate().is_err());

        let zero_entries = LimiterConfig::per_second(5).with_max_entries(0);
        assert!(zero_entries.validate().is_err());

        let zero_sweep = LimiterConfig::per_second(5).with_sweep_interval(Duration::ZERO);
        assert!(zero_sweep.validate().is_err());

        let zero_factor = LimiterConfig::per_second(5).with_idle_factor(0);
        assert!(zero_factor.validate().is_err());
    }

    #[test]
    fn test_config_presets() {
        let config = LimiterConfig::per_second(20);
        assert_eq!(config.rate, 20);
        assert_eq!(config.duration, Duration::from_secs(1));
        assert_eq!(config.effective_rate_per_second(), 20.0);

        let config = LimiterConfig::per_minute(120);
        assert_eq!(config.duration, Duration::from_secs(60));
        assert_eq!(config.effective_rate_per_second(), 2.0);
    }

    #[test]
    fn test_idle_cutoff() {
        let config = LimiterConfig::new(3, Duration::from_millis(100));
        assert_eq!(config.idle_cutoff(), Duration::from_millis(200));

        let config = config.with_idle_factor(5);
        assert_eq!(config.idle_cutoff(), Duration::from_millis(500));

        let huge = LimiterConfig::new(1, Duration::MAX);
        assert_eq!(huge.idle_cutoff(), Duration::MAX);
    }

    #[test]
    fn test_proportional_refill() {
        let window = Duration::from_millis(1000);
        let policy = RefillPolicy::Proportional;

        assert_eq!(policy.tokens_earned(0, 10, window), 0);
        assert_eq!(policy.tokens_earned(99_999_999, 10, window), 0);
        assert_eq!(policy.tokens_earned(100_000_000, 10, window), 1);
        assert_eq!(policy.tokens_earned(550_000_000, 10, window), 5);
        assert_eq!(policy.tokens_earned(1_000_000_000, 10, window), 10);
        assert_eq!(policy.tokens_earned(u64::MAX, 10, window), 10);
    }

    #[test]
    fn test_whole_window_refill() {
        let window = Duration::from_millis(1000);
        let policy = RefillPolicy::WholeWindows;

        assert_eq!(policy.tokens_earned(999_999_999, 10, window), 0);
        assert_eq!(policy.tokens_earned(1_000_000_000, 10, window), 10);
        assert_eq!(policy.tokens_earned(2_500_000_000, 10, window), 10);
        assert_eq!(policy.tokens_earned(u64::MAX, u32::MAX, window), u32::MAX);
    }
}
