//! Load orchestrator with bounded concurrency and metrics aggregation.
//!
//! [`LoadOrchestrator`] is the top-level driver that:
//! - Assigns tenants to requests round-robin by request index
//! - Admits at most `concurrency` requests at once through a [`Semaphore`]
//! - Runs each request on its own transport via [`TaskTracker`]
//! - Collects results through an unbounded mpsc channel, drained after join
//! - Publishes [`RunProgress`] through a watch channel for live display

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch, Semaphore};
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::flight::client::ProtocolClient;
use crate::flight::connector::TransportProvider;
use crate::flight::result::QueryResult;
use crate::loadtest::config::validate_target;
use crate::loadtest::error::LoadTestError;
use crate::loadtest::inflight::InFlightGauge;
use crate::loadtest::metrics::LoadTestMetrics;

/// Compile-time Send bounds verification for channel-transported types.
fn _assert_send<T: Send>() {}
#[allow(dead_code)]
fn _check_send_bounds() {
    _assert_send::<QueryResult>();
    _assert_send::<RunProgress>();
}

/// Run progress published through the watch channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunProgress {
    /// Requests the run will issue.
    pub total: usize,
    /// Requests finished, successful or not.
    pub completed: usize,
    /// Finished requests that failed.
    pub failed: usize,
    /// Requests currently executing.
    pub in_flight: usize,
}

/// Metrics plus the per-request outcomes they were computed from.
#[derive(Debug, Clone)]
pub struct LoadTestRun {
    pub metrics: LoadTestMetrics,
    /// Results in completion order.
    pub results: Vec<QueryResult>,
    /// Highest number of requests executing at the same time.
    pub peak_in_flight: usize,
}

/// Issues many Flight queries under a concurrency cap.
///
/// Every request obtains its own transport from the provider, so with the
/// per-request connection policy no connection state is shared between
/// requests.
pub struct LoadOrchestrator<P> {
    provider: Arc<P>,
    concurrency: usize,
    query_timeout: Option<Duration>,
    progress: Arc<watch::Sender<RunProgress>>,
}

impl<P: TransportProvider> LoadOrchestrator<P> {
    /// Creates an orchestrator admitting at most `concurrency` requests at once.
    ///
    /// The cap is checked when a run starts, not here.
    pub fn new(provider: P, concurrency: usize) -> Self {
        let (progress, _) = watch::channel(RunProgress::default());
        Self {
            provider: Arc::new(provider),
            concurrency,
            query_timeout: None,
            progress: Arc::new(progress),
        }
    }

    /// Bounds every query by `timeout`. `None` leaves queries unbounded.
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    /// Receiver of progress updates for the current or next run.
    pub fn subscribe_progress(&self) -> watch::Receiver<RunProgress> {
        self.progress.subscribe()
    }

    /// Run `total_requests` queries and compute aggregate metrics.
    ///
    /// Request `i` targets `tenants[i % tenants.len()]`. Failed queries are
    /// counted, never returned as errors. Returns
    /// [`LoadTestError::ConfigValidation`] before issuing anything when the
    /// concurrency cap is zero, the tenant list is empty or holds an empty id,
    /// or the dataset name is empty.
    pub async fn run_load_test(
        &self,
        total_requests: usize,
        tenants: &[String],
        dataset: &str,
        row_limit: Option<u64>,
    ) -> Result<LoadTestMetrics, LoadTestError> {
        self.run_load_test_detailed(total_requests, tenants, dataset, row_limit)
            .await
            .map(|run| run.metrics)
    }

    /// Like [`run_load_test`](Self::run_load_test), also returning every
    /// per-request result and the peak in-flight count.
    pub async fn run_load_test_detailed(
        &self,
        total_requests: usize,
        tenants: &[String],
        dataset: &str,
        row_limit: Option<u64>,
    ) -> Result<LoadTestRun, LoadTestError> {
        if self.concurrency == 0 {
            return Err(LoadTestError::validation("concurrency must be at least 1"));
        }
        validate_target(tenants, dataset)?;

        info!(
            total_requests,
            concurrency = self.concurrency,
            tenants = tenants.len(),
            dataset,
            "starting load test"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let tracker = TaskTracker::new();
        let gauge = InFlightGauge::new();
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<QueryResult>();
        let dataset: Arc<str> = Arc::from(dataset);

        self.progress.send_replace(RunProgress {
            total: total_requests,
            ..RunProgress::default()
        });

        let start = Instant::now();
        for i in 0..total_requests {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| LoadTestError::Execution {
                    message: format!("admission closed: {e}"),
                })?;

            let tenant = tenants[i % tenants.len()].clone();
            let dataset = Arc::clone(&dataset);
            let provider = Arc::clone(&self.provider);
            let progress = Arc::clone(&self.progress);
            let gauge = gauge.clone();
            let result_tx = result_tx.clone();
            let deadline = self.query_timeout;

            tracker.spawn(async move {
                let _permit = permit;
                let in_flight = gauge.enter();
                progress.send_modify(|p| p.in_flight = gauge.get());

                let mut client = ProtocolClient::new(provider.acquire());
                let result = client
                    .query_with_deadline(&tenant, &dataset, row_limit, deadline)
                    .await;
                drop(client);
                drop(in_flight);

                let failed = !result.is_success();
                debug!(request = i, tenant = %tenant, status = %result.status(), "request finished");
                let _ = result_tx.send(result);
                progress.send_modify(|p| {
                    p.completed += 1;
                    if failed {
                        p.failed += 1;
                    }
                    p.in_flight = gauge.get();
                });
            });
        }

        // Tasks hold their own clones
        drop(result_tx);
        tracker.close();
        tracker.wait().await;
        let duration = start.elapsed();

        let mut results = Vec::with_capacity(total_requests);
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }
        if results.len() != total_requests {
            return Err(LoadTestError::Execution {
                message: format!(
                    "expected {total_requests} results, collected {}",
                    results.len()
                ),
            });
        }

        let metrics = LoadTestMetrics::from_results(&results, duration);
        info!(
            successful = metrics.successful_requests,
            failed = metrics.failed_requests,
            duration_ms = duration.as_millis() as u64,
            peak_in_flight = gauge.peak(),
            "load test complete"
        );

        Ok(LoadTestRun {
            metrics,
            results,
            peak_in_flight: gauge.peak(),
        })
    }
}
