//! The three Flight calls the client depends on, behind a trait.
//!
//! [`FlightTransport`] is the seam between the protocol logic in
//! [`ProtocolClient`](crate::flight::client::ProtocolClient) and the wire.
//! [`GrpcTransport`] is the production implementation over tonic; tests plug
//! in scripted in-memory transports.

use arrow_flight::flight_service_client::FlightServiceClient;
use arrow_flight::{Criteria, FlightData, FlightDescriptor, FlightInfo, Ticket};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use tonic::transport::Channel;

use crate::flight::error::FlightError;

/// Stream of data chunks returned by `DoGet`.
pub type ChunkStream = BoxStream<'static, Result<FlightData, FlightError>>;

/// Stream of dataset listings returned by `ListFlights`.
pub type ListingStream = BoxStream<'static, Result<FlightInfo, FlightError>>;

/// Flight calls used by the protocol client.
#[async_trait]
pub trait FlightTransport: Send {
    /// Resolve a descriptor into endpoints (`GetFlightInfo`).
    async fn get_flight_info(
        &mut self,
        descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, FlightError>;

    /// Open a ticketed data stream (`DoGet`).
    async fn do_get(&mut self, ticket: Ticket) -> Result<ChunkStream, FlightError>;

    /// Open a dataset listing stream (`ListFlights`) with empty criteria.
    async fn list_flights(&mut self) -> Result<ListingStream, FlightError>;
}

/// [`FlightTransport`] over a tonic gRPC channel.
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    inner: FlightServiceClient<Channel>,
}

impl GrpcTransport {
    /// Wrap a channel, raising both message size limits to `max_message_bytes`.
    pub fn new(channel: Channel, max_message_bytes: usize) -> Self {
        let inner = FlightServiceClient::new(channel)
            .max_decoding_message_size(max_message_bytes)
            .max_encoding_message_size(max_message_bytes);
        Self { inner }
    }
}

#[async_trait]
impl FlightTransport for GrpcTransport {
    async fn get_flight_info(
        &mut self,
        descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, FlightError> {
        self.inner
            .get_flight_info(descriptor)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| FlightError::classify_status(&status))
    }

    async fn do_get(&mut self, ticket: Ticket) -> Result<ChunkStream, FlightError> {
        let stream = self
            .inner
            .do_get(ticket)
            .await
            .map_err(|status| FlightError::classify_status(&status))?
            .into_inner();
        Ok(stream
            .map_err(|status| FlightError::from_stream_status(&status))
            .boxed())
    }

    async fn list_flights(&mut self) -> Result<ListingStream, FlightError> {
        let stream = self
            .inner
            .list_flights(Criteria::default())
            .await
            .map_err(|status| FlightError::classify_status(&status))?
            .into_inner();
        Ok(stream
            .map_err(|status| FlightError::from_stream_status(&status))
            .boxed())
    }
}
