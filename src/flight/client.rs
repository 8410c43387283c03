//! Two-phase Flight query client.
//!
//! A query first resolves a path descriptor (`[tenant, dataset, row_limit?]`)
//! into a [`FlightInfo`] and then streams the data behind the first endpoint's
//! ticket. [`ProtocolClient::query`] runs both phases, timing each one with a
//! monotonic clock, and folds every failure into an error [`QueryResult`].
//!
//! Nothing here retries. A failed phase ends the query.

use std::time::{Duration, Instant};

use arrow_flight::{FlightDescriptor, FlightInfo, Ticket};
use futures::StreamExt;
use tracing::{debug, warn};

use crate::flight::decode::decode_chunk;
use crate::flight::error::FlightError;
use crate::flight::result::{FetchStats, QueryResult, QueryStats};
use crate::flight::transport::FlightTransport;

/// Build the path descriptor for a dataset.
///
/// The row limit is appended as a decimal string only when present and
/// positive. Tenant id and dataset name must be non-empty.
pub fn build_descriptor(
    tenant_id: &str,
    dataset: &str,
    row_limit: Option<u64>,
) -> Result<FlightDescriptor, FlightError> {
    if tenant_id.is_empty() {
        return Err(FlightError::InvalidDescriptor {
            message: "tenant id must not be empty".to_string(),
        });
    }
    if dataset.is_empty() {
        return Err(FlightError::InvalidDescriptor {
            message: "dataset name must not be empty".to_string(),
        });
    }

    let mut path = vec![tenant_id.to_owned(), dataset.to_owned()];
    if let Some(limit) = row_limit.filter(|&n| n > 0) {
        path.push(limit.to_string());
    }
    Ok(FlightDescriptor::new_path(path))
}

/// Ticket of the first endpoint in a resolved [`FlightInfo`].
pub fn first_ticket(info: &FlightInfo) -> Result<Ticket, FlightError> {
    let endpoint = info.endpoint.first().ok_or_else(FlightError::no_endpoints)?;
    endpoint
        .ticket
        .clone()
        .ok_or_else(|| FlightError::Resolution {
            message: "first endpoint carries no ticket".to_string(),
        })
}

/// Flight client bound to one transport.
///
/// The load orchestrator creates one per request; a single-query caller
/// creates one and drops it afterwards.
pub struct ProtocolClient<T> {
    transport: T,
}

impl<T: FlightTransport> ProtocolClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Resolve a dataset into a [`FlightInfo`] with at least one endpoint.
    ///
    /// Returns [`FlightError::InvalidDescriptor`] for empty names,
    /// [`FlightError::Resolution`] when the server returns no endpoints, and
    /// [`FlightError::Transport`] when the call itself fails.
    pub async fn resolve(
        &mut self,
        tenant_id: &str,
        dataset: &str,
        row_limit: Option<u64>,
    ) -> Result<FlightInfo, FlightError> {
        let descriptor = build_descriptor(tenant_id, dataset, row_limit)?;
        let info = self.transport.get_flight_info(descriptor).await?;
        if info.endpoint.is_empty() {
            return Err(FlightError::no_endpoints());
        }
        Ok(info)
    }

    /// Stream the data behind `ticket` and count rows and bytes.
    ///
    /// Zero chunks is a valid, empty result. Either every chunk decodes and
    /// the totals are returned, or the first failure is returned and the
    /// partial totals are dropped.
    pub async fn fetch(&mut self, ticket: Ticket) -> Result<FetchStats, FlightError> {
        let mut stream = self.transport.do_get(ticket).await?;
        let mut totals = FetchStats::default();
        let mut chunks = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk_stats = decode_chunk(&chunk?)?;
            totals.rows += chunk_stats.rows;
            totals.bytes += chunk_stats.bytes;
            chunks += 1;
        }

        debug!(chunks, rows = totals.rows, bytes = totals.bytes, "fetch complete");
        Ok(totals)
    }

    /// Run resolve then fetch and report the outcome with phase latencies.
    pub async fn query(
        &mut self,
        tenant_id: &str,
        dataset: &str,
        row_limit: Option<u64>,
    ) -> QueryResult {
        self.query_with_deadline(tenant_id, dataset, row_limit, None)
            .await
    }

    /// Like [`query`](Self::query), bounded by an optional deadline.
    ///
    /// When the deadline elapses the in-flight call is dropped and the result
    /// is an error carrying the time spent so far.
    pub async fn query_with_deadline(
        &mut self,
        tenant_id: &str,
        dataset: &str,
        row_limit: Option<u64>,
        deadline: Option<Duration>,
    ) -> QueryResult {
        let start = Instant::now();
        let phases = self.run_phases(tenant_id, dataset, row_limit, start);

        let outcome = match deadline {
            Some(limit) => tokio::time::timeout(limit, phases)
                .await
                .unwrap_or_else(|_| Err(FlightError::deadline(limit))),
            None => phases.await,
        };

        match outcome {
            Ok(stats) => QueryResult::success(tenant_id, dataset, stats),
            Err(err) => {
                let elapsed = start.elapsed();
                warn!(
                    tenant = tenant_id,
                    dataset,
                    category = err.error_category(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "query failed: {err}"
                );
                QueryResult::error(tenant_id, dataset, err.to_string(), elapsed)
            },
        }
    }

    async fn run_phases(
        &mut self,
        tenant_id: &str,
        dataset: &str,
        row_limit: Option<u64>,
        start: Instant,
    ) -> Result<QueryStats, FlightError> {
        let info = self.resolve(tenant_id, dataset, row_limit).await?;
        let metadata_latency = start.elapsed();
        debug!(
            tenant = tenant_id,
            dataset,
            endpoints = info.endpoint.len(),
            metadata_ms = metadata_latency.as_millis() as u64,
            "descriptor resolved"
        );

        let ticket = first_ticket(&info)?;
        let fetch_start = Instant::now();
        let fetched = self.fetch(ticket).await?;
        let transfer_latency = fetch_start.elapsed();

        Ok(QueryStats {
            rows: fetched.rows,
            bytes: fetched.bytes,
            metadata_latency,
            transfer_latency,
            total_latency: start.elapsed(),
        })
    }

    /// Best-effort liveness check via `ListFlights`.
    ///
    /// Returns `true` as soon as one listing arrives. Returns `false` on a
    /// call or stream error, on an empty listing, or when `timeout` elapses
    /// first, in which case the call is cancelled. Never returns an error.
    pub async fn probe_health(&mut self, timeout: Duration) -> bool {
        let probe = async {
            let mut stream = match self.transport.list_flights().await {
                Ok(stream) => stream,
                Err(err) => {
                    debug!("health probe call failed: {err}");
                    return false;
                },
            };
            match stream.next().await {
                Some(Ok(_)) => true,
                Some(Err(err)) => {
                    debug!("health probe stream failed: {err}");
                    false
                },
                None => false,
            }
        };

        match tokio::time::timeout(timeout, probe).await {
            Ok(alive) => alive,
            Err(_) => {
                debug!(timeout_ms = timeout.as_millis() as u64, "health probe timed out");
                false
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::scripted::{ipc_chunk, FetchScript, ScriptedTransport};

    #[test]
    fn test_descriptor_without_row_limit() {
        let descriptor = build_descriptor("acme", "orders", None).unwrap();
        assert_eq!(descriptor.path, vec!["acme", "orders"]);
    }

    #[test]
    fn test_descriptor_appends_positive_row_limit() {
        let descriptor = build_descriptor("acme", "orders", Some(500)).unwrap();
        assert_eq!(descriptor.path, vec!["acme", "orders", "500"]);
    }

    #[test]
    fn test_descriptor_ignores_zero_row_limit() {
        let descriptor = build_descriptor("acme", "orders", Some(0)).unwrap();
        assert_eq!(descriptor.path.len(), 2);
    }

    #[test]
    fn test_descriptor_rejects_empty_names() {
        assert_eq!(
            build_descriptor("", "orders", None)
                .unwrap_err()
                .error_category(),
            "descriptor"
        );
        assert_eq!(
            build_descriptor("acme", "", None)
                .unwrap_err()
                .error_category(),
            "descriptor"
        );
    }

    #[tokio::test]
    async fn test_resolve_with_no_endpoints_is_resolution_error() {
        let transport = ScriptedTransport::new().with_endpoints(0);
        let mut client = ProtocolClient::new(transport);
        let err = client.resolve("acme", "orders", None).await.unwrap_err();
        assert_eq!(err, FlightError::no_endpoints());
    }

    #[tokio::test]
    async fn test_resolve_transport_failure() {
        let transport = ScriptedTransport::new().fail_resolution("connection refused");
        let mut client = ProtocolClient::new(transport);
        let err = client.resolve("acme", "orders", None).await.unwrap_err();
        assert_eq!(err.error_category(), "transport");
    }

    #[tokio::test]
    async fn test_resolve_sends_descriptor_path() {
        let transport = ScriptedTransport::new();
        let seen = transport.descriptors();
        let mut client = ProtocolClient::new(transport);
        client.resolve("acme", "orders", Some(10)).await.unwrap();
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[vec!["acme".to_string(), "orders".to_string(), "10".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_fetch_zero_chunks() {
        let transport = ScriptedTransport::new().with_fetch(FetchScript::Chunks(vec![]));
        let mut client = ProtocolClient::new(transport);
        let stats = client.fetch(Ticket::new("t")).await.unwrap();
        assert_eq!(stats, FetchStats { rows: 0, bytes: 0 });
    }

    #[tokio::test]
    async fn test_fetch_accumulates_across_chunks() {
        let first = ipc_chunk(&[4]);
        let second = ipc_chunk(&[6, 2]);
        let expected_bytes = (first.data_body.len() + second.data_body.len()) as u64;
        let transport =
            ScriptedTransport::new().with_fetch(FetchScript::Chunks(vec![first, second]));
        let mut client = ProtocolClient::new(transport);

        let stats = client.fetch(Ticket::new("t")).await.unwrap();
        assert_eq!(stats.rows, 12);
        assert_eq!(stats.bytes, expected_bytes);
    }

    #[tokio::test]
    async fn test_fetch_stream_error_discards_partial_counts() {
        let transport = ScriptedTransport::new().with_fetch(FetchScript::FailAfter {
            chunks: vec![ipc_chunk(&[5])],
            message: "reset by peer".to_string(),
        });
        let mut client = ProtocolClient::new(transport);
        let err = client.fetch(Ticket::new("t")).await.unwrap_err();
        assert_eq!(err.error_category(), "stream");
    }

    #[tokio::test]
    async fn test_query_success_reports_phase_latencies() {
        let transport = ScriptedTransport::new()
            .with_resolve_delay(Duration::from_millis(20))
            .with_fetch_delay(Duration::from_millis(30))
            .with_fetch(FetchScript::Chunks(vec![ipc_chunk(&[7])]));
        let mut client = ProtocolClient::new(transport);

        let result = client.query("acme", "orders", None).await;
        let stats = *result.stats().expect("query should succeed");
        assert_eq!(stats.rows, 7);
        assert!(stats.metadata_latency >= Duration::from_millis(20));
        assert!(stats.transfer_latency >= Duration::from_millis(30));
        assert!(stats.total_latency >= stats.metadata_latency.max(stats.transfer_latency));
        assert!(stats.total_latency >= stats.metadata_latency + stats.transfer_latency);
    }

    #[tokio::test]
    async fn test_query_no_endpoints_skips_transfer() {
        let transport = ScriptedTransport::new().with_endpoints(0);
        let fetches = transport.fetch_calls();
        let mut client = ProtocolClient::new(transport);

        let result = client.query("acme", "orders", None).await;
        assert_eq!(result.error_message(), Some("no endpoints"));
        assert!(result.stats().is_none());
        assert_eq!(fetches.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_query_endpoint_without_ticket() {
        let transport = ScriptedTransport::new().without_ticket();
        let mut client = ProtocolClient::new(transport);
        let result = client.query("acme", "orders", None).await;
        assert_eq!(
            result.error_message(),
            Some("first endpoint carries no ticket")
        );
    }

    #[tokio::test]
    async fn test_query_deadline_exceeded() {
        let transport = ScriptedTransport::new().with_resolve_delay(Duration::from_secs(5));
        let mut client = ProtocolClient::new(transport);

        let started = Instant::now();
        let result = client
            .query_with_deadline("acme", "orders", None, Some(Duration::from_millis(50)))
            .await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(
            result.error_message(),
            Some("query deadline of 50ms exceeded")
        );
        assert!(result.total_latency() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_probe_health_true_when_listing_arrives() {
        let mut client = ProtocolClient::new(ScriptedTransport::new().with_listings(1));
        assert!(client.probe_health(Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn test_probe_health_false_on_empty_listing() {
        let mut client = ProtocolClient::new(ScriptedTransport::new().with_listings(0));
        assert!(!client.probe_health(Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn test_probe_health_false_on_error() {
        let mut client = ProtocolClient::new(ScriptedTransport::new().fail_listing());
        assert!(!client.probe_health(Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn test_probe_health_times_out() {
        let transport = ScriptedTransport::new().with_listing_delay(Duration::from_secs(10));
        let mut client = ProtocolClient::new(transport);

        let started = Instant::now();
        assert!(!client.probe_health(Duration::from_millis(50)).await);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
