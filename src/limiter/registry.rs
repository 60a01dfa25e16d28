//! # Limiter Registry
//!
//! Named, independent limiters behind one concurrent map. A typical server
//! runs a lenient policy for general API traffic and a strict one for login
//! endpoints:
//!
//! ```text
//!     request ──► route class ──► registry ──► Limiter ──► allow(identifier)
//!                                   │
//!                       ┌───────────┴───────────┐
//!                       │  DashMap              │
//!                       │  "api"   → 100/min    │
//!                       │  "login" → 10/min     │
//!                       └───────────────────────┘
//! ```
//!
//! Limiters never share tables. Exhausting "login" for an identifier has no
//! effect on its "api" budget.

use super::{config::LimiterConfig, core::Limiter, error::Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Concurrent map of named limiters.
///
/// ## Example
///
/// ```rust
/// use turnstile::{LimiterConfig, LimiterRegistry};
///
/// let registry = LimiterRegistry::new();
/// registry.register("api", LimiterConfig::per_minute(100)).unwrap();
/// registry.register("login", LimiterConfig::per_minute(10)).unwrap();
///
/// assert_eq!(registry.allow("login", "alice@example.com"), Some(true));
/// assert_eq!(registry.allow("unknown", "alice@example.com"), None);
///
/// registry.shutdown_all();
/// ```
#[derive(Default)]
pub struct LimiterRegistry {
    limiters: DashMap<String, Arc<Limiter>, ahash::RandomState>,
}

impl LimiterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a limiter from `config` and stores it under `name`.
    ///
    /// A limiter already registered under `name` is replaced and its sweeper
    /// is stopped; clones of its `Arc` held elsewhere keep working.
    ///
    /// # Errors
    ///
    /// Fails, leaving the registry untouched, if the limiter cannot be built.
    pub fn register(&self, name: impl Into<String>, config: LimiterConfig) -> Result<Arc<Limiter>> {
        let name = name.into();
        let limiter = Arc::new(Limiter::with_config(config)?);

        info!(
            "Registered limiter {:?}: {} per {:?}",
            name,
            limiter.config().rate,
            limiter.config().duration
        );

        if let Some(previous) = self.limiters.insert(name, Arc::clone(&limiter)) {
            previous.shutdown();
        }
        Ok(limiter)
    }

    /// Looks up the limiter registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<Limiter>> {
        self.limiters.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Runs `identifier` through the limiter named `name`.
    ///
    /// Returns `None` when no such limiter exists, leaving the fallback to
    /// the caller.
    pub fn allow(&self, name: &str, identifier: &str) -> Option<bool> {
        // Clone out of the shard so the map lock is not held across `allow`.
        let limiter = self.get(name)?;
        Some(limiter.allow(identifier))
    }

    /// Unregisters `name` and stops its sweeper.
    pub fn remove(&self, name: &str) -> Option<Arc<Limiter>> {
        let (name, limiter) = self.limiters.remove(name)?;
        limiter.shutdown();
        info!("Removed limiter {:?}", name);
        Some(limiter)
    }

    /// Registered names, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.limiters.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered limiters.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// Whether no limiters are registered.
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Stops every registered limiter's sweeper. The limiters stay
    /// registered and keep answering `allow`.
    pub fn shutdown_all(&self) {
        for entry in self.limiters.iter() {
            entry.value().shutdown();
        }
        info!("Stopped sweepers for {} limiters", self.limiters.len());
    }
}

impl std::fmt::Debug for LimiterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimiterRegistry")
            .field("names", &self.names())
            .finish()
    }
}
