//! Auto-save for world persistence.
//!
//! This module provides:
//! - AutoSaveTimer: interval check driven by the session loop
//! - AutoSaveWorker: background thread saving a shared world on a tick

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, select, tick, Sender};
use parking_lot::Mutex;
use tessel_world::SharedWorld;
use tracing::{debug, info, warn};

/// Interval-based save trigger polled by the caller.
#[derive(Debug, Clone)]
pub struct AutoSaveTimer {
    interval: Option<Duration>,
    last_save: Instant,
}

impl AutoSaveTimer {
    /// Creates a timer; an interval of zero seconds disables it.
    #[must_use]
    pub fn new(interval_secs: u64) -> Self {
        Self::starting_at(interval_secs, Instant::now())
    }

    /// Creates a timer whose interval starts counting at `start`.
    #[must_use]
    pub fn starting_at(interval_secs: u64, start: Instant) -> Self {
        Self {
            interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
            last_save: start,
        }
    }

    /// Whether the timer ever fires.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    /// Whether a save is due at `now`.
    #[must_use]
    pub fn is_due_at(&self, now: Instant) -> bool {
        self.interval
            .is_some_and(|interval| now.saturating_duration_since(self.last_save) >= interval)
    }

    /// Restarts the interval at `now`.
    pub fn mark_saved_at(&mut self, now: Instant) {
        self.last_save = now;
    }

    /// Returns `true` and restarts the interval when a save is due.
    pub fn check(&mut self) -> bool {
        let now = Instant::now();
        if self.is_due_at(now) {
            self.mark_saved_at(now);
            true
        } else {
            false
        }
    }
}

/// Counters kept by the background worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Completed saves
    pub saves: u64,
    /// Saves that returned an error or left chunks unsaved
    pub failures: u64,
    /// Time of the last completed save
    pub last_save: Option<DateTime<Utc>>,
}

/// Background thread that saves a [`SharedWorld`] on a fixed tick.
///
/// The thread stops on [`stop`](Self::stop) or when the worker is dropped.
#[derive(Debug)]
pub struct AutoSaveWorker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<Mutex<WorkerStats>>,
}

impl AutoSaveWorker {
    /// Starts the worker.
    pub fn spawn(world: SharedWorld, interval: Duration) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let stats = Arc::new(Mutex::new(WorkerStats::default()));
        let thread_stats = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name("tessel-autosave".to_string())
            .spawn(move || {
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(ticker) -> _ => save_once(&world, &thread_stats),
                        recv(stop_rx) -> _ => break,
                    }
                }
                debug!("Auto-save worker stopped");
            })?;

        info!("Auto-save worker started ({}s interval)", interval.as_secs_f64());
        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
            stats,
        })
    }

    /// Snapshot of the worker's counters.
    #[must_use]
    pub fn stats(&self) -> WorkerStats {
        self.stats.lock().clone()
    }

    /// Stops the worker and waits for its thread.
    pub fn stop(mut self) -> WorkerStats {
        self.shutdown();
        self.stats()
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            // A closed channel means the thread already exited.
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Auto-save worker panicked");
            }
        }
    }
}

impl Drop for AutoSaveWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn save_once(world: &SharedWorld, stats: &Mutex<WorkerStats>) {
    let result = world.save_all();
    let mut stats = stats.lock();
    match result {
        Ok(report) => {
            stats.saves += 1;
            stats.last_save = Some(report.meta.last_saved);
            if report.failed.is_empty() {
                debug!("Auto-saved {} chunks", report.saved);
            } else {
                stats.failures += 1;
                warn!(
                    "Auto-save left {} chunks unsaved: {:?}",
                    report.failed.len(),
                    report.failed
                );
            }
        },
        Err(e) => {
            stats.failures += 1;
            warn!("Auto-save failed: {e}");
        },
    }
}
