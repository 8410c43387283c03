//! `flight-loadgen health` command implementation.

use anyhow::Result;
use colored::Colorize;
use std::io::IsTerminal;
use std::time::Duration;

use flight_loadgen::flight::{ConnectionPolicy, GrpcConnector, ProtocolClient, TransportProvider};

/// Execute the `health` command.
///
/// Prints `healthy` when the server streams at least one listing within the
/// timeout, `unhealthy` otherwise, and fails in the latter case.
pub async fn execute(server: String, timeout_ms: u64) -> Result<()> {
    let timeout = Duration::from_millis(timeout_ms);
    let connector = GrpcConnector::new(&server, ConnectionPolicy::PerRequest)?;
    let mut client = ProtocolClient::new(connector.acquire());

    let healthy = client.probe_health(timeout).await;

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
    if healthy {
        println!("{}: {}", connector.uri(), "healthy".green());
        Ok(())
    } else {
        println!("{}: {}", connector.uri(), "unhealthy".red());
        anyhow::bail!(
            "Server {} did not answer ListFlights within {timeout_ms}ms",
            connector.uri()
        )
    }
}
