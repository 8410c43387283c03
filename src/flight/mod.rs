//! Arrow Flight protocol client.
//!
//! Resolves a `[tenant, dataset, row_limit?]` descriptor into a ticket, then
//! streams and decodes the data behind it, timing both phases.

pub mod client;
pub mod connector;
pub mod decode;
pub mod error;
pub mod result;
#[doc(hidden)]
pub mod scripted;
pub mod transport;

pub use client::ProtocolClient;
pub use connector::{ConnectionPolicy, GrpcConnector, TransportProvider};
pub use error::FlightError;
pub use result::{QueryOutcome, QueryResult, QueryStats, QueryStatus};
pub use transport::{FlightTransport, GrpcTransport};
