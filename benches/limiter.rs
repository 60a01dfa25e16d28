//! # Limiter Benchmarks
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use turnstile::{Limiter, LimiterConfig, ManualClock};

fn frozen_limiter(rate: u32, max_entries: usize) -> Limiter {
    let config = LimiterConfig::new(rate, Duration::from_secs(60)).with_max_entries(max_entries);
    Limiter::with_clock(config, ManualClock::new()).unwrap()
}

/// Hot path: one known identifier, bucket never empties.
fn bench_allow_known(c: &mut Criterion) {
    let limiter = Limiter::new(u32::MAX, Duration::from_secs(1)).unwrap();
    limiter.allow("hot");

    c.bench_function("allow_known_identifier", |b| {
        b.iter(|| std::hint::black_box(limiter.allow("hot")))
    });
}

/// Rejection path: bucket empty, clock frozen.
fn bench_allow_rejected(c: &mut Criterion) {
    let limiter = frozen_limiter(1, 16);
    limiter.allow("drained");

    c.bench_function("allow_rejected", |b| {
        b.iter(|| std::hint::black_box(limiter.allow("drained")))
    });
}

/// New identifiers against a full table: every call evicts.
fn bench_eviction_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("eviction_churn");

    for table_size in [1_000usize, 10_000, 100_000] {
        let keys: Vec<String> = (0..table_size * 2).map(|i| format!("id-{}", i)).collect();

        group.throughput(Throughput::Elements(table_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(table_size),
            &table_size,
            |b, &table_size| {
                b.iter_batched(
                    || {
                        let limiter = frozen_limiter(10, table_size);
                        for key in &keys[..table_size] {
                            limiter.allow(key);
                        }
                        limiter
                    },
                    |limiter| {
                        for key in &keys[table_size..] {
                            std::hint::black_box(limiter.allow(key));
                        }
                        limiter
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

/// Sweeping a table where every visitor has expired.
fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep_all_expired");

    for table_size in [1_000usize, 10_000] {
        group.throughput(Throughput::Elements(table_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(table_size),
            &table_size,
            |b, &table_size| {
                b.iter_batched(
                    || {
                        let clock = ManualClock::new();
                        let config = LimiterConfig::new(10, Duration::from_millis(1))
                            .with_max_entries(table_size);
                        let limiter = Limiter::with_clock(config, clock.clone()).unwrap();
                        for i in 0..table_size {
                            limiter.allow(&format!("id-{}", i));
                        }
                        clock.advance(Duration::from_secs(1));
                        limiter
                    },
                    |limiter| std::hint::black_box(limiter.sweep()),
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

/// Contended lock: many threads, distinct identifiers.
fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_allow");

    for num_threads in [2usize, 4, 8] {
        group.throughput(Throughput::Elements(num_threads as u64 * 1000));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_threads", num_threads)),
            &num_threads,
            |b, &num_threads| {
                let limiter = Arc::new(frozen_limiter(u32::MAX, 10_000));
                b.iter(|| {
                    let handles: Vec<_> = (0..num_threads)
                        .map(|t| {
                            let limiter = Arc::clone(&limiter);
                            thread::spawn(move || {
                                let key = format!("thread-{}", t);
                                for _ in 0..1000 {
                                    std::hint::black_box(limiter.allow(&key));
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_allow_known,
    bench_allow_rejected,
    bench_eviction_churn,
    bench_sweep,
    bench_contended
);
criterion_main!(benches);
