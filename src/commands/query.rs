//! `flight-loadgen query` command implementation.

use anyhow::Result;
use std::io::IsTerminal;
use std::time::Duration;

use flight_loadgen::flight::{ConnectionPolicy, GrpcConnector, ProtocolClient, TransportProvider};
use flight_loadgen::loadtest::summary::render_query_result;

/// Execute the `query` command.
///
/// Runs one query on a fresh connection, prints the result block and fails
/// when the query failed.
pub async fn execute(
    server: String,
    tenant: String,
    dataset: String,
    row_limit: Option<u64>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let connector = GrpcConnector::new(&server, ConnectionPolicy::PerRequest)?;
    let mut client = ProtocolClient::new(connector.acquire());

    let result = client
        .query_with_deadline(
            &tenant,
            &dataset,
            row_limit,
            timeout_ms.map(Duration::from_millis),
        )
        .await;

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
    println!("{}", render_query_result(&result, &connector.uri()));

    if let Some(message) = result.error_message() {
        anyhow::bail!("Query for {tenant}/{dataset} failed: {message}");
    }
    Ok(())
}
