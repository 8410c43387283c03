//! Connection policy: how each request obtains its transport.
//!
//! The load orchestrator never builds transports itself. It asks a
//! [`TransportProvider`] for one per request, so connection reuse is a choice
//! made here rather than in the protocol logic:
//!
//! - [`ConnectionPolicy::PerRequest`]: every request gets a fresh channel and
//!   therefore its own HTTP/2 connection. No state is shared between requests.
//! - [`ConnectionPolicy::Shared`]: one channel is created up front and cloned
//!   into every request. Requests multiplex over the same connection.
//!
//! Channels connect lazily, so building one never fails on an unreachable
//! server; the failure surfaces on the first call as a transport error.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tonic::transport::{Channel, Endpoint};

use crate::flight::error::FlightError;
use crate::flight::transport::{FlightTransport, GrpcTransport};

/// Default decode/encode limit for Flight messages: 512 MiB.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 512 * 1024 * 1024;

/// Default TCP connect timeout for new channels.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Hands out one transport per request.
pub trait TransportProvider: Send + Sync + 'static {
    /// Transport type produced for each request.
    type Transport: FlightTransport + 'static;

    /// Obtain a transport for a single request.
    fn acquire(&self) -> Self::Transport;
}

/// Whether requests share a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionPolicy {
    /// A fresh connection for every request.
    #[default]
    PerRequest,
    /// One multiplexed connection cloned into every request.
    Shared,
}

impl FromStr for ConnectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-request" => Ok(Self::PerRequest),
            "shared" => Ok(Self::Shared),
            other => Err(format!(
                "unknown connection policy '{other}' (expected 'per-request' or 'shared')"
            )),
        }
    }
}

/// Prefix a bare `host:port` address with `http://`.
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// [`TransportProvider`] producing [`GrpcTransport`]s for one server address.
#[derive(Debug, Clone)]
pub struct GrpcConnector {
    endpoint: Endpoint,
    policy: ConnectionPolicy,
    shared: Option<Channel>,
    max_message_bytes: usize,
}

impl GrpcConnector {
    /// Build a connector for `address` (`host:port` or a full URI).
    ///
    /// Returns [`FlightError::Transport`] if the address is not a valid URI.
    /// With [`ConnectionPolicy::Shared`] this must run inside a Tokio runtime,
    /// since the shared channel is created here.
    pub fn new(address: &str, policy: ConnectionPolicy) -> Result<Self, FlightError> {
        let uri = normalize_address(address);
        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| FlightError::Transport {
                message: format!("invalid server address '{uri}': {e}"),
            })?
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT);
        let shared = match policy {
            ConnectionPolicy::Shared => Some(endpoint.connect_lazy()),
            ConnectionPolicy::PerRequest => None,
        };
        Ok(Self {
            endpoint,
            policy,
            shared,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        })
    }

    /// Override the message size limit.
    pub fn with_max_message_bytes(mut self, bytes: usize) -> Self {
        self.max_message_bytes = bytes;
        self
    }

    /// Override the connect timeout for new channels.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.endpoint = self.endpoint.connect_timeout(timeout);
        if self.shared.is_some() {
            self.shared = Some(self.endpoint.connect_lazy());
        }
        self
    }

    /// Returns the configured connection policy.
    pub fn policy(&self) -> ConnectionPolicy {
        self.policy
    }

    /// Returns the normalized target URI.
    pub fn uri(&self) -> String {
        self.endpoint.uri().to_string()
    }

    /// Returns the configured message size limit.
    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }
}

impl TransportProvider for GrpcConnector {
    type Transport = GrpcTransport;

    fn acquire(&self) -> GrpcTransport {
        let channel = match &self.shared {
            Some(channel) => channel.clone(),
            None => self.endpoint.connect_lazy(),
        };
        GrpcTransport::new(channel, self.max_message_bytes)
    }
}
