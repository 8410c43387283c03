//! Outcome of one end-to-end query.

use std::fmt;
use std::time::Duration;

/// Whether a query succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    /// Both phases completed.
    Success,
    /// One of the phases failed.
    Error,
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Row and byte totals of a completed fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Rows decoded across all chunks.
    pub rows: u64,
    /// Raw chunk body bytes received.
    pub bytes: u64,
}

/// Counts and phase latencies of a successful query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryStats {
    pub rows: u64,
    pub bytes: u64,
    /// Start of the query to completion of descriptor resolution.
    pub metadata_latency: Duration,
    /// Start of the fetch to end of the data stream.
    pub transfer_latency: Duration,
    /// Start of the query to completion.
    pub total_latency: Duration,
}

/// Success or failure payload of a [`QueryResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Success(QueryStats),
    Error {
        /// Human-readable failure message.
        message: String,
        /// Time from query start until the failure.
        elapsed: Duration,
    },
}

/// Outcome of one query for one tenant and dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub tenant_id: String,
    pub dataset: String,
    pub outcome: QueryOutcome,
}

impl QueryResult {
    /// Build a success result.
    pub fn success(tenant_id: &str, dataset: &str, stats: QueryStats) -> Self {
        Self {
            tenant_id: tenant_id.to_owned(),
            dataset: dataset.to_owned(),
            outcome: QueryOutcome::Success(stats),
        }
    }

    /// Build an error result.
    pub fn error(tenant_id: &str, dataset: &str, message: String, elapsed: Duration) -> Self {
        Self {
            tenant_id: tenant_id.to_owned(),
            dataset: dataset.to_owned(),
            outcome: QueryOutcome::Error { message, elapsed },
        }
    }

    pub fn status(&self) -> QueryStatus {
        match self.outcome {
            QueryOutcome::Success(_) => QueryStatus::Success,
            QueryOutcome::Error { .. } => QueryStatus::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == QueryStatus::Success
    }

    /// Success payload, if any.
    pub fn stats(&self) -> Option<&QueryStats> {
        match &self.outcome {
            QueryOutcome::Success(stats) => Some(stats),
            QueryOutcome::Error { .. } => None,
        }
    }

    /// Failure message, if any.
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            QueryOutcome::Success(_) => None,
            QueryOutcome::Error { message, .. } => Some(message),
        }
    }

    /// Total elapsed time on either path.
    pub fn total_latency(&self) -> Duration {
        match &self.outcome {
            QueryOutcome::Success(stats) => stats.total_latency,
            QueryOutcome::Error { elapsed, .. } => *elapsed,
        }
    }
}
