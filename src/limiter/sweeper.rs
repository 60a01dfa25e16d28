//! # Background Sweeper
//!
//! One OS thread per limiter that periodically drops visitors idle for longer
//! than `idle_factor × duration`. It bounds memory even when the table never
//! fills up.
//!
//! ```text
//!     ┌──────────── sweep_interval ────────────┐
//!     │                                        ▼
//!     wait ──► stop signal? ──yes──► exit     sweep ──► wait ...
//!                  │
//!                  └─ channel closed ──► exit
//! ```
//!
//! The thread owns only a `Weak` handle to the limiter state. It never keeps
//! a limiter alive, and a limiter dropped without an explicit shutdown still
//! stops its sweeper on the next tick.

use super::core::Shared;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Weak;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const THREAD_NAME: &str = "turnstile-sweeper";

/// Handle to a running sweeper thread.
#[derive(Debug)]
pub(crate) struct Sweeper {
    handle: thread::JoinHandle<()>,
    stop_tx: mpsc::Sender<()>,
}

impl Sweeper {
    /// Starts sweeping `shared` every `interval`.
    pub(crate) fn spawn(shared: Weak<Shared>, interval: Duration) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                info!("Started sweeper thread (interval: {:?})", interval);

                loop {
                    match stop_rx.recv_timeout(interval) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {
                            let Some(shared) = shared.upgrade() else {
                                break;
                            };
                            tick(&shared);
                        }
                    }
                }

                info!("Sweeper thread stopping");
            })?;

        Ok(Self { handle, stop_tx })
    }

    /// Signals the thread and waits for it to exit.
    pub(crate) fn stop(self) {
        // A send error means the thread already exited on its own.
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            warn!("Sweeper thread panicked before shutdown");
        }
    }
}

fn tick(shared: &Shared) {
    let removed = shared.sweep();
    if removed > 0 {
        debug!("Sweeper removed {} idle visitors", removed);
    }

    let stats = shared.stats();
    if stats.is_near_capacity() {
        warn!(
            "Visitor table near capacity after sweep: {}/{} ({:.0}%)",
            stats.tracked,
            stats.max_entries,
            stats.capacity_used() * 100.0
        );
    }
}
