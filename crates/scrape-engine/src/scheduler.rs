//! Fixed-interval task scheduler.
//!
//! Fires a task every `interval` until the cancellation token fires, then
//! waits for every firing still in flight. Firings are spawned, not awaited,
//! so a slow firing never delays the next tick; several firings of the same
//! task may overlap and finish out of order.
//!
//! Overlap is bounded by `max_in_flight` (`None` = unbounded). A tick that
//! finds the bound reached is skipped, not queued.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Work run on every tick. Receives the scheduler's cancellation token.
pub type Task = Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, ()> + Send + Sync>;

/// Counters returned when a scheduler stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Ticks that spawned a firing.
    pub fired: u64,
    /// Ticks dropped because `max_in_flight` firings were still running.
    pub skipped: u64,
}

pub struct Scheduler {
    label: String,
    interval: Duration,
    task: Task,
    max_in_flight: Option<usize>,
}

impl Scheduler {
    /// `interval` must be non-zero.
    pub fn new(interval: Duration, task: Task) -> Self {
        Self { label: String::from("scheduler"), interval, task, max_in_flight: None }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Bound concurrent firings; `None` or `Some(0)` leaves them unbounded.
    pub fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.max_in_flight = max_in_flight.filter(|n| *n > 0);
        self
    }

    /// Run until `token` is cancelled, then join all in-flight firings.
    ///
    /// The first firing happens one `interval` after the call. Consumes the
    /// scheduler, so the task (and everything it captured) is released when
    /// this returns.
    pub async fn run(self, token: CancellationToken) -> SchedulerStats {
        let Self { label, interval, task, max_in_flight } = self;

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let limiter = max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
        let tracker = TaskTracker::new();
        let mut stats = SchedulerStats::default();

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let permit = match &limiter {
                        Some(sem) => match Arc::clone(sem).try_acquire_owned() {
                            Ok(permit) => Some(permit),
                            Err(_) => {
                                stats.skipped += 1;
                                warn!(scheduler = %label, in_flight = tracker.len(), "tick skipped, in-flight limit reached");
                                continue;
                            }
                        },
                        None => None,
                    };

                    stats.fired += 1;
                    let firing = task(token.clone());
                    tracker.spawn(async move {
                        let _permit = permit;
                        firing.await;
                    });
                }
            }
        }

        tracker.close();
        debug!(scheduler = %label, in_flight = tracker.len(), "stopping, waiting for in-flight firings");
        tracker.wait().await;
        debug!(scheduler = %label, fired = stats.fired, skipped = stats.skipped, "stopped");
        stats
    }
}
