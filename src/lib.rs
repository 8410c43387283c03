//! flight-loadgen: load generator and probe client for Arrow Flight servers.
//!
//! The [`flight`] module holds the two-phase protocol client: resolve a
//! `[tenant, dataset, row_limit?]` descriptor into a ticket, then stream and
//! decode the data behind it. The [`loadtest`] module drives many such
//! queries under a concurrency cap and aggregates the outcomes.
//!
//! # Example
//!
//! ```no_run
//! use flight_loadgen::flight::{ConnectionPolicy, GrpcConnector};
//! use flight_loadgen::loadtest::LoadOrchestrator;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let connector = GrpcConnector::new("localhost:50051", ConnectionPolicy::PerRequest)?;
//! let orchestrator = LoadOrchestrator::new(connector, 8);
//! let tenants = vec!["tenant-a".to_string(), "tenant-b".to_string()];
//! let metrics = orchestrator
//!     .run_load_test(100, &tenants, "orders", Some(1000))
//!     .await?;
//! println!("{:.1} req/s, p95 {:.1}ms", metrics.throughput_rps, metrics.p95_latency_ms);
//! # Ok(())
//! # }
//! ```

pub mod flight;
pub mod loadtest;
