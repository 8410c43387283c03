//! Load testing for Arrow Flight servers.
//!
//! Provides typed TOML configuration, a bounded-concurrency orchestrator,
//! aggregate metrics, a live terminal display, a k6-style summary, and JSON
//! export of the final metrics.

pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod inflight;
pub mod metrics;
pub mod report;
pub mod summary;

pub use config::LoadTestConfig;
pub use engine::{LoadOrchestrator, LoadTestRun, RunProgress};
pub use error::LoadTestError;
pub use metrics::LoadTestMetrics;
