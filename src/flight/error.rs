//! Error types for the Flight protocol client.
//!
//! [`FlightError`] classifies every way a two-phase query can fail. Inside the
//! client the variants stay distinct so they can be logged and counted; once a
//! failure crosses [`ProtocolClient::query`](crate::flight::client::ProtocolClient::query)
//! only its message survives, carried by an error [`QueryResult`](crate::flight::result::QueryResult).

use std::time::Duration;

/// Protocol and transport failures encountered while running a query.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum FlightError {
    /// The descriptor could not be built (empty tenant id or dataset name).
    #[error("invalid descriptor: {message}")]
    InvalidDescriptor { message: String },

    /// The server answered the resolution call but offered nothing usable.
    #[error("{message}")]
    Resolution { message: String },

    /// The call itself failed: connection refused, protocol error, bad status.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The data stream failed mid-transfer or carried an undecodable chunk.
    #[error("stream error: {message}")]
    Stream { message: String },

    /// A deadline elapsed, either the caller's or one reported by the server.
    #[error("{message}")]
    DeadlineExceeded { message: String },
}

impl FlightError {
    /// Resolution failure for a [`FlightInfo`](arrow_flight::FlightInfo) with no endpoints.
    pub fn no_endpoints() -> Self {
        Self::Resolution {
            message: "no endpoints".to_string(),
        }
    }

    /// Deadline failure for a caller-supplied per-query deadline.
    pub fn deadline(deadline: Duration) -> Self {
        Self::DeadlineExceeded {
            message: format!("query deadline of {}ms exceeded", deadline.as_millis()),
        }
    }

    /// Returns the error category as a static string for metrics classification.
    ///
    /// Categories: `"descriptor"`, `"resolution"`, `"transport"`, `"stream"`, `"deadline"`.
    pub fn error_category(&self) -> &'static str {
        match self {
            Self::InvalidDescriptor { .. } => "descriptor",
            Self::Resolution { .. } => "resolution",
            Self::Transport { .. } => "transport",
            Self::Stream { .. } => "stream",
            Self::DeadlineExceeded { .. } => "deadline",
        }
    }

    /// Classify a [`tonic::Status`] returned by a unary call or by opening a stream.
    pub fn classify_status(status: &tonic::Status) -> Self {
        match status.code() {
            tonic::Code::DeadlineExceeded => Self::DeadlineExceeded {
                message: format!("server deadline exceeded: {}", status.message()),
            },
            code => Self::Transport {
                message: format!("{code:?}: {}", status.message()),
            },
        }
    }

    /// Classify a [`tonic::Status`] yielded by an already-open data stream.
    pub fn from_stream_status(status: &tonic::Status) -> Self {
        Self::Stream {
            message: format!("{:?}: {}", status.code(), status.message()),
        }
    }
}
