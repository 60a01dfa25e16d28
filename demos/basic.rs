//! Basic usage of the turnstile crate.
//!
//! Run with: `cargo run --example basic`
//! Set `RUST_LOG=turnstile=debug` to see evictions and sweeps.

use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use turnstile::{Limiter, LimiterConfig, LimiterRegistry, ManualClock};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Turnstile Example ===\n");

    burst_example();
    println!("\n{}\n", "=".repeat(50));

    refill_example();
    println!("\n{}\n", "=".repeat(50));

    eviction_example();
    println!("\n{}\n", "=".repeat(50));

    registry_example();
}

fn burst_example() {
    println!("1. Burst admission (3 per 100ms):");

    let limiter = match Limiter::new(3, Duration::from_millis(100)) {
        Ok(limiter) => limiter,
        Err(err) => {
            eprintln!("   failed to build limiter: {}", err);
            return;
        }
    };

    for i in 1..=4 {
        let verdict = if limiter.allow("u1") { "✅ Allowed" } else { "❌ Rate limited" };
        println!("   u1 request {} - {}", i, verdict);
    }
    println!("   u2 request 1 - {}", if limiter.allow("u2") { "✅ Allowed" } else { "❌ Rate limited" });

    println!("\n   Waiting one window...");
    thread::sleep(Duration::from_millis(110));
    println!("   u1 after refill - {}", if limiter.allow("u1") { "✅ Allowed" } else { "❌ Rate limited" });

    limiter.shutdown();
}

fn refill_example() {
    println!("2. Proportional refill with a manual clock (10 per second):");

    let clock = ManualClock::new();
    let Ok(limiter) = Limiter::with_clock(LimiterConfig::per_second(10), clock.clone()) else {
        return;
    };

    let drained = (0..20).filter(|_| limiter.allow("client")).count();
    println!("   Drained bucket: {} of 20 calls allowed", drained);

    for step_ms in [100u64, 250, 1000] {
        clock.advance(Duration::from_millis(step_ms));
        let granted = (0..20).filter(|_| limiter.allow("client")).count();
        println!("   +{}ms idle → {} permits", step_ms, granted);
    }
}

fn eviction_example() {
    println!("3. Bounded table (max 3 identifiers):");

    let clock = ManualClock::new();
    let config = LimiterConfig::per_minute(5).with_max_entries(3);
    let Ok(limiter) = Limiter::with_clock(config, clock.clone()) else {
        return;
    };

    for ip in ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5"] {
        clock.advance(Duration::from_millis(1));
        limiter.allow(ip);
        println!("   {} arrived, tracking {}", ip, limiter.len());
    }
    for ip in ["10.0.0.1", "10.0.0.2", "10.0.0.5"] {
        println!("   {} tracked: {}", ip, limiter.contains(ip));
    }

    println!("\n{}", limiter.stats());
}

fn registry_example() {
    println!("4. Separate policies for API and login:");

    let registry = LimiterRegistry::new();
    if registry.register("api", LimiterConfig::per_minute(100)).is_err()
        || registry.register("login", LimiterConfig::per_minute(10)).is_err()
    {
        return;
    }

    let user = "alice@example.com";
    let logins = (0..12)
        .filter(|_| registry.allow("login", user).unwrap_or(false))
        .count();
    println!("   {}: {} of 12 login attempts allowed", user, logins);
    println!("   {}: api call allowed = {:?}", user, registry.allow("api", user));

    registry.shutdown_all();
}
