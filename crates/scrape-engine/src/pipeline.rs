//! Output pipeline: bounded queue plus exactly one consumer per sink.
//!
//! ```text
//! firing ─┐
//! firing ─┼─► PipelineProducer::push ──► [bounded queue] ──► consumer thread ──► RecordSink
//! firing ─┘         (drop newest when full)                   (header once, flush per row)
//! ```
//!
//! The consumer owns the sink, so there is a single writer for the sink's
//! whole life. It runs on its own OS thread because sink writes are blocking
//! file I/O. It exits once every producer (including the pipeline's own
//! sender) has been dropped and the queue is drained.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use scrape_core::sink::RecordSink;
use scrape_core::{Record, ScrapeError};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

/// Result of a non-blocking [`PipelineProducer::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queue full; the record was discarded.
    Dropped,
    /// Consumer is gone; the record was discarded.
    Closed,
}

/// Counters reported when a pipeline closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Data rows written and flushed.
    pub written: u64,
    /// Rows (header or data) whose write or flush failed.
    pub write_errors: u64,
    /// Records discarded at the producer side because the queue was full.
    pub dropped: u64,
    pub header_written: bool,
}

/// Cloneable handle used by firings to enqueue records.
#[derive(Clone)]
pub struct PipelineProducer {
    label: Arc<str>,
    tx: Sender<Record>,
    dropped: Arc<AtomicU64>,
}

impl PipelineProducer {
    /// Enqueue without waiting. A full queue drops the new record.
    pub fn push(&self, record: Record) -> PushOutcome {
        match self.tx.try_send(record) {
            Ok(()) => PushOutcome::Queued,
            Err(TrySendError::Full(record)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(pipeline = %self.label, fields = ?record.values, "output queue full, dropping record");
                PushOutcome::Dropped
            }
            Err(TrySendError::Disconnected(record)) => {
                error!(pipeline = %self.label, fields = ?record.values, "output consumer gone, dropping record");
                PushOutcome::Closed
            }
        }
    }
}

pub struct OutputPipeline {
    producer: PipelineProducer,
    done: oneshot::Receiver<PipelineStats>,
}

impl OutputPipeline {
    /// Spawn the consumer thread for `sink` behind a queue of `capacity` records.
    pub fn start(
        label: impl Into<String>,
        sink: Box<dyn RecordSink>,
        capacity: usize,
    ) -> Result<Self, ScrapeError> {
        let label: Arc<str> = Arc::from(label.into());
        let (tx, rx) = crossbeam_channel::bounded::<Record>(capacity.max(1));
        let (done_tx, done) = oneshot::channel();

        let consumer_label = Arc::clone(&label);
        std::thread::Builder::new()
            .name(format!("sink-{label}"))
            .spawn(move || {
                let stats = run_consumer(&consumer_label, rx, sink);
                let _ = done_tx.send(stats);
            })
            .map_err(|e| ScrapeError::Sink(format!("spawn consumer for {label}: {e}")))?;

        let producer = PipelineProducer { label, tx, dropped: Arc::new(AtomicU64::new(0)) };
        Ok(Self { producer, done })
    }

    pub fn producer(&self) -> PipelineProducer {
        self.producer.clone()
    }

    /// Close the queue and wait for the consumer to drain it.
    ///
    /// Every [`PipelineProducer`] handed out must already be dropped,
    /// otherwise this waits for them.
    pub async fn close(self) -> PipelineStats {
        let Self { producer, done } = self;
        let PipelineProducer { label, tx, dropped } = producer;
        drop(tx);

        let mut stats = match done.await {
            Ok(stats) => stats,
            Err(_) => {
                error!(pipeline = %label, "consumer thread exited without reporting");
                PipelineStats::default()
            }
        };
        stats.dropped = dropped.load(Ordering::Relaxed);
        debug!(pipeline = %label, ?stats, "pipeline closed");
        stats
    }
}

/// Pull records in queue order until the channel closes.
fn run_consumer(label: &str, rx: Receiver<Record>, mut sink: Box<dyn RecordSink>) -> PipelineStats {
    let mut stats = PipelineStats::default();
    debug!(pipeline = label, "consumer started");

    while let Ok(record) = rx.recv() {
        if !stats.header_written {
            if let Err(e) = sink.write(&record.header).and_then(|()| sink.flush()) {
                // header stays pending so no data row can precede it
                stats.write_errors += 1;
                error!(pipeline = label, header = ?record.header, error = %e, "write header failed, skipping record");
                continue;
            }
            stats.header_written = true;
        }

        if let Err(e) = sink.write(&record.values).and_then(|()| sink.flush()) {
            stats.write_errors += 1;
            warn!(pipeline = label, fields = ?record.values, error = %e, "write record failed");
            continue;
        }
        stats.written += 1;
    }

    debug!(pipeline = label, written = stats.written, "consumer exited");
    stats
}
