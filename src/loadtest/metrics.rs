//! Aggregate metrics over a collection of query results.
//!
//! [`LoadTestMetrics::from_results`] is a pure function of the per-request
//! outcomes and the measured wall-clock duration of the run.
//!
//! Latency statistics cover successful requests only, using each request's
//! total latency in milliseconds. The p95 is the element at index
//! `floor(0.95 * n)` of the ascending sort, clamped to the last element.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::flight::result::QueryResult;

/// Aggregate outcome of a load test run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadTestMetrics {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    /// Rows summed over successful requests.
    pub total_rows: u64,
    /// Bytes summed over successful requests.
    pub total_bytes: u64,
    /// Wall-clock duration of the run in seconds.
    pub duration_secs: f64,
    /// Total requests divided by duration, 0.0 for a zero duration.
    pub throughput_rps: f64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
}

impl LoadTestMetrics {
    /// Compute metrics for `results` collected over `duration`.
    pub fn from_results(results: &[QueryResult], duration: Duration) -> Self {
        let total_requests = results.len();
        let mut total_rows = 0u64;
        let mut total_bytes = 0u64;
        let mut latencies: Vec<f64> = Vec::with_capacity(results.len());

        for stats in results.iter().filter_map(QueryResult::stats) {
            total_rows += stats.rows;
            total_bytes += stats.bytes;
            latencies.push(stats.total_latency.as_secs_f64() * 1000.0);
        }

        let successful_requests = latencies.len();
        latencies.sort_by(f64::total_cmp);

        let duration_secs = duration.as_secs_f64();
        let throughput_rps = if duration_secs > 0.0 {
            total_requests as f64 / duration_secs
        } else {
            0.0
        };

        Self {
            total_requests,
            successful_requests,
            failed_requests: total_requests - successful_requests,
            total_rows,
            total_bytes,
            duration_secs,
            throughput_rps,
            avg_latency_ms: mean(&latencies),
            p95_latency_ms: p95(&latencies),
        }
    }

    /// Fraction of requests that failed, 0.0 when no request was issued.
    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.failed_requests as f64 / self.total_requests as f64
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// 95th percentile of an ascending slice; 0.0 when empty.
pub fn p95(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() as f64 * 0.95).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}

/// Failed requests grouped by error message, most frequent first.
///
/// Ties are ordered by message so the output is stable.
pub fn error_breakdown(results: &[QueryResult]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for message in results.iter().filter_map(QueryResult::error_message) {
        *counts.entry(message).or_insert(0) += 1;
    }
    let mut breakdown: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(message, count)| (message.to_owned(), count))
        .collect();
    breakdown.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    breakdown
}
