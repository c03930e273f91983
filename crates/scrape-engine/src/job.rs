//! One polling job: a `(exchange, data type, symbol)` leaf of the scrape tree.
//!
//! A job owns one [`Scheduler`], one [`OutputPipeline`] and one resolved
//! [`Capability`]. Each firing calls the capability under a per-call
//! deadline and pushes the result into the pipeline; failures are logged
//! and the tick is dropped (no retry).
//!
//! Shutdown order: the scheduler stops and joins its firings, the task
//! closure (holding the last producer clones) is dropped, then the pipeline
//! is closed and drained.

use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use scrape_core::config::{
    AppConfig, DEFAULT_MAX_IN_FLIGHT, DEFAULT_QUEUE_CAPACITY, DEFAULT_SCRAPE_TIMEOUT_SECS,
};
use scrape_core::sink::{RecordSink, SinkFactory};
use scrape_core::{PollRequest, PollTarget, Record, ScrapeError, time_util};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Capability;
use crate::pipeline::{OutputPipeline, PipelineProducer, PipelineStats};
use crate::scheduler::{Scheduler, SchedulerStats, Task};

/// Per-job tuning shared by every job of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSettings {
    /// Deadline for one capability call.
    pub scrape_timeout: Duration,
    /// Output queue capacity.
    pub queue_capacity: usize,
    /// Concurrent firings allowed; `None` = unbounded.
    pub max_in_flight: Option<usize>,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            scrape_timeout: Duration::from_secs(DEFAULT_SCRAPE_TIMEOUT_SECS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_in_flight: Some(DEFAULT_MAX_IN_FLIGHT),
        }
    }
}

impl JobSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            scrape_timeout: config.scrape_timeout(),
            queue_capacity: config.effective_queue_capacity(),
            max_in_flight: config.effective_max_in_flight(),
        }
    }
}

/// What a job did over its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub target: PollTarget,
    pub scheduler: SchedulerStats,
    pub pipeline: PipelineStats,
}

pub struct Job {
    target: PollTarget,
    capability: Arc<dyn Capability>,
    settings: JobSettings,
}

impl Job {
    pub fn new(target: PollTarget, capability: Arc<dyn Capability>, settings: JobSettings) -> Self {
        Self { target, capability, settings }
    }

    pub fn target(&self) -> &PollTarget {
        &self.target
    }

    pub fn capability_name(&self) -> &str {
        self.capability.name()
    }

    /// Acquire a sink, then poll until `token` is cancelled.
    ///
    /// Fails only if the sink (or its consumer) cannot be set up; nothing is
    /// scheduled in that case. Once running, returns after the scheduler has
    /// stopped and the pipeline has drained.
    pub async fn run(
        self,
        sinks: Arc<dyn SinkFactory>,
        token: CancellationToken,
    ) -> Result<JobReport, ScrapeError> {
        let Self { target, capability, settings } = self;

        let sink = open_sink(sinks, &target).await?;
        let pipeline = OutputPipeline::start(target.to_string(), sink, settings.queue_capacity)?;

        let task = poll_task(PollContext {
            target: target.clone(),
            capability,
            producer: pipeline.producer(),
            timeout: settings.scrape_timeout,
        });
        let scheduler = Scheduler::new(target.interval, task)
            .with_label(target.to_string())
            .with_max_in_flight(settings.max_in_flight);

        info!(
            exchange = %target.exchange,
            data_type = %target.data_type,
            symbol = %target.symbol,
            interval = ?target.interval,
            "start scraping"
        );
        let scheduler_stats = scheduler.run(token).await;
        let pipeline_stats = pipeline.close().await;
        info!(
            exchange = %target.exchange,
            data_type = %target.data_type,
            symbol = %target.symbol,
            fired = scheduler_stats.fired,
            skipped = scheduler_stats.skipped,
            written = pipeline_stats.written,
            dropped = pipeline_stats.dropped,
            "stop scraping"
        );

        Ok(JobReport { target, scheduler: scheduler_stats, pipeline: pipeline_stats })
    }
}

/// Acquire the job's sink on the blocking pool; file-backed sinks create
/// directories and open files. A panicking factory panics the job.
async fn open_sink(
    sinks: Arc<dyn SinkFactory>,
    target: &PollTarget,
) -> Result<Box<dyn RecordSink>, ScrapeError> {
    let target = target.clone();
    match tokio::task::spawn_blocking(move || sinks.open(&target, time_util::now())).await {
        Ok(opened) => opened,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(ScrapeError::Sink(format!("sink open task cancelled: {e}"))),
    }
}

/// Everything one firing needs.
struct PollContext {
    target: PollTarget,
    capability: Arc<dyn Capability>,
    producer: PipelineProducer,
    timeout: Duration,
}

fn poll_task(ctx: PollContext) -> Task {
    let ctx = Arc::new(ctx);
    Arc::new(move |token| {
        let ctx = Arc::clone(&ctx);
        async move { poll_once(&ctx, &token).await }.boxed()
    })
}

/// One firing: scrape under the deadline, enqueue on success.
///
/// Shutdown abandons the call; the result (if any) is discarded.
async fn poll_once(ctx: &PollContext, token: &CancellationToken) {
    let target = &ctx.target;
    let request = PollRequest::new(target.symbol.clone());

    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!(exchange = %target.exchange, symbol = %target.symbol, "scrape abandoned on shutdown");
            return;
        }
        outcome = tokio::time::timeout(ctx.timeout, ctx.capability.scrape(&request)) => outcome,
    };

    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(
                exchange = %target.exchange,
                data_type = %target.data_type,
                symbol = %target.symbol,
                interval = ?target.interval,
                error = %format!("{e:#}"),
                "scrape failed"
            );
            return;
        }
        Err(_) => {
            warn!(
                exchange = %target.exchange,
                data_type = %target.data_type,
                symbol = %target.symbol,
                interval = ?target.interval,
                timeout = ?ctx.timeout,
                "scrape timed out"
            );
            return;
        }
    };

    match Record::from_result(result.as_ref()) {
        Ok(record) => {
            ctx.producer.push(record);
        }
        Err(e) => warn!(
            exchange = %target.exchange,
            data_type = %target.data_type,
            symbol = %target.symbol,
            interval = ?target.interval,
            error = %e,
            "malformed poll result"
        ),
    }
}
