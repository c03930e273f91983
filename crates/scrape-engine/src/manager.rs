//! Fan-out/fan-in over the scrape tree.
//!
//! [`Manager::plan`] turns every leaf with a registered capability into a
//! [`Job`]; [`Manager::run`] starts them all on a `JoinSet` and returns once
//! each has stopped and drained. One job failing (sink acquisition, panic)
//! never stops the others.

use std::sync::Arc;

use ahash::AHashMap;
use scrape_core::sink::SinkFactory;
use scrape_core::{PollTarget, ScrapeError, ScrapeTree, tree_leaves};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::job::{Job, JobReport, JobSettings};
use crate::registry::Registry;

/// Jobs to start plus the leaves nothing can poll.
pub struct Plan {
    pub jobs: Vec<Job>,
    pub skipped: Vec<PollTarget>,
}

/// Outcome of a full run.
#[derive(Debug, Default)]
pub struct ManagerReport {
    pub completed: Vec<JobReport>,
    pub failed: Vec<(PollTarget, String)>,
    pub skipped: Vec<PollTarget>,
}

pub struct Manager {
    registry: Arc<Registry>,
    sinks: Arc<dyn SinkFactory>,
    settings: JobSettings,
}

impl Manager {
    pub fn new(registry: Arc<Registry>, sinks: Arc<dyn SinkFactory>, settings: JobSettings) -> Self {
        Self { registry, sinks, settings }
    }

    /// Expand `tree` into jobs, in tree order.
    pub fn plan(&self, tree: &ScrapeTree) -> Result<Plan, ScrapeError> {
        let mut plan = Plan { jobs: Vec::new(), skipped: Vec::new() };

        for target in tree_leaves(tree)? {
            match self.registry.resolve(target.exchange, target.data_type) {
                Some(capability) => plan.jobs.push(Job::new(target, capability, self.settings)),
                None => {
                    warn!(
                        exchange = %target.exchange,
                        data_type = %target.data_type,
                        symbol = %target.symbol,
                        "capability not registered, skipping"
                    );
                    plan.skipped.push(target);
                }
            }
        }
        Ok(plan)
    }

    /// Run every planned job until `token` is cancelled and all have drained.
    ///
    /// Only an invalid tree is an error; per-job failures land in
    /// [`ManagerReport::failed`].
    pub async fn run(
        &self,
        token: CancellationToken,
        tree: &ScrapeTree,
    ) -> Result<ManagerReport, ScrapeError> {
        let Plan { jobs, skipped } = self.plan(tree)?;
        let mut report = ManagerReport { skipped, ..ManagerReport::default() };

        if jobs.is_empty() {
            warn!(skipped = report.skipped.len(), "nothing to scrape");
            return Ok(report);
        }

        let mut set = JoinSet::new();
        let mut targets = AHashMap::with_capacity(jobs.len());
        for job in jobs {
            info!(target_leaf = %job.target(), capability = job.capability_name(), "starting job");
            let target = job.target().clone();
            let handle = set.spawn(job.run(Arc::clone(&self.sinks), token.clone()));
            targets.insert(handle.id(), target);
        }
        info!(jobs = set.len(), skipped = report.skipped.len(), "all jobs started");

        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((_, Ok(job_report))) => report.completed.push(job_report),
                Ok((id, Err(e))) => {
                    let Some(target) = targets.remove(&id) else { continue };
                    error!(target_leaf = %target, error = %e, "job failed");
                    report.failed.push((target, e.to_string()));
                }
                Err(join_err) => {
                    let Some(target) = targets.remove(&join_err.id()) else { continue };
                    let reason = if join_err.is_panic() {
                        "job panicked".to_string()
                    } else {
                        format!("job aborted: {join_err}")
                    };
                    error!(target_leaf = %target, reason = %reason, "job did not finish");
                    report.failed.push((target, reason));
                }
            }
        }

        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "all jobs stopped"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use scrape_core::sink::{MemorySinkFactory, RecordSink};
    use scrape_core::{DataType, Exchange, ORDER_BOOK_HEADER};

    use super::*;
    use crate::Capability;
    use crate::testing::{ScriptedCapability, Step};

    fn tree(leaves: &[(Exchange, &str, u64)]) -> ScrapeTree {
        let mut tree = ScrapeTree::new();
        for (exchange, symbol, secs) in leaves {
            tree.entry(*exchange)
                .or_insert_with(BTreeMap::new)
                .entry(DataType::OrderBook)
                .or_insert_with(BTreeMap::new)
                .insert(symbol.to_string(), Duration::from_secs(*secs));
        }
        tree
    }

    fn registry(exchanges: &[Exchange]) -> Arc<Registry> {
        let mut builder = Registry::builder();
        for exchange in exchanges {
            let cap: Arc<dyn Capability> = ScriptedCapability::always(Step::Ok);
            builder = builder.register(*exchange, DataType::OrderBook, cap).unwrap();
        }
        Arc::new(builder.build())
    }

    fn manager(registry: Arc<Registry>, sinks: &MemorySinkFactory) -> Manager {
        Manager::new(registry, Arc::new(sinks.clone()), JobSettings::default())
    }

    async fn run_for(
        manager: &Manager,
        tree: &ScrapeTree,
        duration: Duration,
    ) -> ManagerReport {
        let token = CancellationToken::new();
        let canceller = async {
            tokio::time::sleep(duration).await;
            token.cancel();
        };
        let (report, ()) = tokio::join!(manager.run(token.clone(), tree), canceller);
        report.unwrap()
    }

    fn target(exchange: Exchange, symbol: &str, secs: u64) -> PollTarget {
        PollTarget::new(exchange, DataType::OrderBook, symbol, Duration::from_secs(secs)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn unregistered_exchange_is_skipped_while_others_run() {
        let sinks = MemorySinkFactory::new();
        let manager = manager(registry(&[Exchange::Binance]), &sinks);
        let tree = tree(&[(Exchange::Binance, "BTCUSDT", 5), (Exchange::Kraken, "XBTUSD", 5)]);

        let report = run_for(&manager, &tree, Duration::from_secs(11)).await;

        assert_eq!(report.skipped, vec![target(Exchange::Kraken, "XBTUSD", 5)]);
        assert!(report.failed.is_empty());
        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.completed[0].pipeline.written, 2);
        assert_eq!(sinks.opened(), 1);
        assert!(sinks.rows(&target(Exchange::Kraken, "XBTUSD", 5)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_resolvable_returns_immediately() {
        let sinks = MemorySinkFactory::new();
        let manager = manager(registry(&[Exchange::Binance]), &sinks);
        let tree = tree(&[(Exchange::Kraken, "XBTUSD", 5)]);

        // never cancelled
        let report = manager.run(CancellationToken::new(), &tree).await.unwrap();

        assert!(report.completed.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(sinks.opened(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sink_failure_fails_only_that_job() {
        let sinks = MemorySinkFactory::new().failing_for("BAD");
        let manager = manager(registry(&[Exchange::Binance]), &sinks);
        let tree = tree(&[(Exchange::Binance, "BAD", 5), (Exchange::Binance, "BTCUSDT", 5)]);

        let report = run_for(&manager, &tree, Duration::from_secs(6)).await;

        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.completed[0].target.symbol, "BTCUSDT");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, target(Exchange::Binance, "BAD", 5));
        assert!(report.failed[0].1.contains("sink"));
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_job_is_reported() {
        struct ExplodingSinks;
        impl SinkFactory for ExplodingSinks {
            fn open(
                &self,
                _target: &PollTarget,
                _started_at: DateTime<Utc>,
            ) -> Result<Box<dyn RecordSink>, ScrapeError> {
                panic!("sink factory exploded");
            }
        }

        let manager =
            Manager::new(registry(&[Exchange::Binance]), Arc::new(ExplodingSinks), JobSettings::default());
        let tree = tree(&[(Exchange::Binance, "BTCUSDT", 5)]);

        let report = manager.run(CancellationToken::new(), &tree).await.unwrap();

        assert!(report.completed.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].1, "job panicked");
    }

    #[tokio::test(start_paused = true)]
    async fn run_returns_after_every_row_is_drained() {
        let sinks = MemorySinkFactory::new();
        let manager = manager(registry(&[Exchange::Binance, Exchange::Luno]), &sinks);
        let tree = tree(&[
            (Exchange::Binance, "BTCUSDT", 2),
            (Exchange::Binance, "ETHUSDT", 3),
            (Exchange::Luno, "XBTZAR", 4),
        ]);

        let report = run_for(&manager, &tree, Duration::from_millis(12_500)).await;

        assert_eq!(report.completed.len(), 3);
        for job in &report.completed {
            let rows = sinks.rows(&job.target).unwrap();
            assert_eq!(rows.len() as u64, job.pipeline.written + 1);
            assert_eq!(rows[0], ORDER_BOOK_HEADER);
        }
        let written: Vec<u64> = report
            .completed
            .iter()
            .map(|j| j.pipeline.written)
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        assert_eq!(written, vec![3, 4, 6]);
    }

    #[test]
    fn planning_is_deterministic() {
        let sinks = MemorySinkFactory::new();
        let leaves = [
            (Exchange::Luno, "XBTZAR", 5),
            (Exchange::Kraken, "XBTUSD", 5),
            (Exchange::Binance, "ETHUSDT", 5),
            (Exchange::Binance, "BTCUSDT", 5),
        ];
        let mut reversed = leaves;
        reversed.reverse();

        let a = manager(registry(&[Exchange::Binance, Exchange::Luno]), &sinks)
            .plan(&tree(&leaves))
            .unwrap();
        let b = manager(registry(&[Exchange::Luno, Exchange::Binance]), &sinks)
            .plan(&tree(&reversed))
            .unwrap();

        let targets = |plan: &Plan| plan.jobs.iter().map(|j| j.target().clone()).collect::<Vec<_>>();
        assert_eq!(targets(&a), targets(&b));
        assert_eq!(
            targets(&a),
            vec![
                target(Exchange::Binance, "BTCUSDT", 5),
                target(Exchange::Binance, "ETHUSDT", 5),
                target(Exchange::Luno, "XBTZAR", 5),
            ]
        );
        assert_eq!(a.skipped, b.skipped);
        assert_eq!(a.skipped, vec![target(Exchange::Kraken, "XBTUSD", 5)]);
    }
}
