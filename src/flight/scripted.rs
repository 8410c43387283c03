//! In-memory [`FlightTransport`] with scripted responses.
//!
//! [`ScriptedTransport`] answers the three Flight calls from a fixed script:
//! how many endpoints to return, which chunks to stream, how long each call
//! takes, which tenants fail. [`ScriptedProvider`] hands out clones of one
//! script and tracks how many transports are alive at once, which is the
//! number of requests in flight when each request owns its transport.
//!
//! Used by the crate's tests and for exercising the load orchestrator
//! without a server. **Never use in production**: the helpers panic on
//! malformed scripts instead of returning errors.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arrow_array::{Int64Array, RecordBatch};
use arrow_flight::{FlightData, FlightDescriptor, FlightEndpoint, FlightInfo, Ticket};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::StreamExt;

use crate::flight::connector::TransportProvider;
use crate::flight::decode::encode_ipc_stream;
use crate::flight::error::FlightError;
use crate::flight::transport::{ChunkStream, FlightTransport, ListingStream};

/// What `DoGet` streams back.
#[derive(Debug, Clone)]
pub enum FetchScript {
    /// Stream these chunks, then complete.
    Chunks(Vec<FlightData>),
    /// Stream these chunks, then fail with a stream error.
    FailAfter {
        chunks: Vec<FlightData>,
        message: String,
    },
}

/// Build a chunk whose body is one IPC stream holding a batch per entry of
/// `batch_rows`.
pub fn ipc_chunk(batch_rows: &[usize]) -> FlightData {
    let schema = Arc::new(Schema::new(vec![Field::new("value", DataType::Int64, false)]));
    let batches: Vec<RecordBatch> = batch_rows
        .iter()
        .map(|&rows| {
            let values = Int64Array::from_iter_values(0..rows as i64);
            RecordBatch::try_new(schema.clone(), vec![Arc::new(values)])
                .expect("single non-null Int64 column matches schema")
        })
        .collect();
    let body = encode_ipc_stream(&batches).expect("in-memory IPC encoding cannot fail");
    FlightData::new().with_data_body(body)
}

/// Live/peak counter of transports handed out by a [`ScriptedProvider`].
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

impl ConcurrencyProbe {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    /// Transports currently alive.
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Highest number of transports alive at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Transports handed out so far.
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct LiveGuard(Arc<ConcurrencyProbe>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.exit();
    }
}

/// Scripted in-memory transport.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    endpoints: usize,
    with_ticket: bool,
    resolve_error: Option<String>,
    failing_tenants: HashSet<String>,
    resolve_delay: Duration,
    fetch: FetchScript,
    fetch_delay: Duration,
    listings: usize,
    listing_error: bool,
    listing_delay: Duration,
    descriptors: Arc<Mutex<Vec<Vec<String>>>>,
    fetch_calls: Arc<AtomicUsize>,
    guard: Option<Arc<LiveGuard>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// One endpoint with a ticket, one 1-row chunk, one listing, no delays.
    pub fn new() -> Self {
        Self {
            endpoints: 1,
            with_ticket: true,
            resolve_error: None,
            failing_tenants: HashSet::new(),
            resolve_delay: Duration::ZERO,
            fetch: FetchScript::Chunks(vec![ipc_chunk(&[1])]),
            fetch_delay: Duration::ZERO,
            listings: 1,
            listing_error: false,
            listing_delay: Duration::ZERO,
            descriptors: Arc::new(Mutex::new(Vec::new())),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
            guard: None,
        }
    }

    /// Number of endpoints returned by `GetFlightInfo`.
    pub fn with_endpoints(mut self, endpoints: usize) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Return endpoints that carry no ticket.
    pub fn without_ticket(mut self) -> Self {
        self.with_ticket = false;
        self
    }

    /// Fail every `GetFlightInfo` call with a transport error.
    pub fn fail_resolution(mut self, message: &str) -> Self {
        self.resolve_error = Some(message.to_owned());
        self
    }

    /// Fail `GetFlightInfo` with a transport error for one tenant only.
    pub fn with_failing_tenant(mut self, tenant: &str) -> Self {
        self.failing_tenants.insert(tenant.to_owned());
        self
    }

    pub fn with_resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = delay;
        self
    }

    pub fn with_fetch(mut self, fetch: FetchScript) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Number of listings streamed by `ListFlights`.
    pub fn with_listings(mut self, listings: usize) -> Self {
        self.listings = listings;
        self
    }

    /// Fail `ListFlights` with a transport error.
    pub fn fail_listing(mut self) -> Self {
        self.listing_error = true;
        self
    }

    pub fn with_listing_delay(mut self, delay: Duration) -> Self {
        self.listing_delay = delay;
        self
    }

    /// Descriptor paths seen by `GetFlightInfo`, shared across clones.
    pub fn descriptors(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        Arc::clone(&self.descriptors)
    }

    /// Number of `DoGet` calls, shared across clones.
    pub fn fetch_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetch_calls)
    }

    fn flight_info(&self) -> FlightInfo {
        (0..self.endpoints).fold(FlightInfo::new(), |info, i| {
            let endpoint = if self.with_ticket {
                FlightEndpoint::new().with_ticket(Ticket::new(format!("ticket-{i}")))
            } else {
                FlightEndpoint::new()
            };
            info.with_endpoint(endpoint)
        })
    }
}

#[async_trait]
impl FlightTransport for ScriptedTransport {
    async fn get_flight_info(
        &mut self,
        descriptor: FlightDescriptor,
    ) -> Result<FlightInfo, FlightError> {
        self.descriptors
            .lock()
            .expect("descriptor log poisoned")
            .push(descriptor.path.clone());
        tokio::time::sleep(self.resolve_delay).await;

        if let Some(message) = &self.resolve_error {
            return Err(FlightError::Transport {
                message: message.clone(),
            });
        }
        let tenant = descriptor.path.first().cloned().unwrap_or_default();
        if self.failing_tenants.contains(&tenant) {
            return Err(FlightError::Transport {
                message: format!("tenant '{tenant}' unavailable"),
            });
        }
        Ok(self.flight_info())
    }

    async fn do_get(&mut self, _ticket: Ticket) -> Result<ChunkStream, FlightError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.fetch_delay).await;

        let items: Vec<Result<FlightData, FlightError>> = match &self.fetch {
            FetchScript::Chunks(chunks) => chunks.iter().cloned().map(Ok).collect(),
            FetchScript::FailAfter { chunks, message } => chunks
                .iter()
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(FlightError::Stream {
                    message: message.clone(),
                })))
                .collect(),
        };
        Ok(futures::stream::iter(items).boxed())
    }

    async fn list_flights(&mut self) -> Result<ListingStream, FlightError> {
        tokio::time::sleep(self.listing_delay).await;
        if self.listing_error {
            return Err(FlightError::Transport {
                message: "listing unavailable".to_string(),
            });
        }
        let items: Vec<Result<FlightInfo, FlightError>> =
            (0..self.listings).map(|_| Ok(FlightInfo::new())).collect();
        Ok(futures::stream::iter(items).boxed())
    }
}

/// [`TransportProvider`] handing out clones of one [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    template: ScriptedTransport,
    probe: Arc<ConcurrencyProbe>,
}

impl ScriptedProvider {
    pub fn new(template: ScriptedTransport) -> Self {
        Self {
            template,
            probe: Arc::new(ConcurrencyProbe::default()),
        }
    }

    /// Live/peak counter of the transports handed out.
    pub fn probe(&self) -> Arc<ConcurrencyProbe> {
        Arc::clone(&self.probe)
    }
}

impl TransportProvider for ScriptedProvider {
    type Transport = ScriptedTransport;

    fn acquire(&self) -> ScriptedTransport {
        self.probe.enter();
        let mut transport = self.template.clone();
        transport.guard = Some(Arc::new(LiveGuard(Arc::clone(&self.probe))));
        transport
    }
}
