//! flight-loadgen: load generator and probe client for Arrow Flight servers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

/// Load generator and probe client for Arrow Flight servers
#[derive(Parser)]
#[command(name = "flight-loadgen")]
#[command(about = "Query, probe and load test Arrow Flight servers", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level when RUST_LOG is unset
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single query and print its timings
    ///
    /// Resolves `[tenant, dataset, row_limit?]` into a ticket, streams the
    /// data behind the first endpoint and reports rows, bytes and latencies.
    Query {
        /// Flight server address (host:port or URI)
        server: String,

        /// Tenant id, first descriptor path segment
        #[arg(long)]
        tenant: String,

        /// Dataset name, second descriptor path segment
        #[arg(long)]
        dataset: String,

        /// Row limit hint appended to the descriptor
        #[arg(long)]
        row_limit: Option<u64>,

        /// Abort the query after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Check whether a server answers ListFlights
    Health {
        /// Flight server address (host:port or URI)
        server: String,

        /// Give up after this many milliseconds
        #[arg(long, default_value = "2000")]
        timeout_ms: u64,
    },

    /// Load test a Flight server
    Loadtest {
        #[command(subcommand)]
        command: commands::loadtest::LoadtestCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    execute_command(cli.command)
}

/// Install the tracing subscriber on stderr.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` with `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Query {
            server,
            tenant,
            dataset,
            row_limit,
            timeout_ms,
        } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::query::execute(
                server, tenant, dataset, row_limit, timeout_ms,
            ))
        },
        Commands::Health { server, timeout_ms } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::health::execute(server, timeout_ms))
        },
        Commands::Loadtest { command } => command.execute(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_command() {
        let cli = Cli::try_parse_from([
            "flight-loadgen",
            "query",
            "localhost:50051",
            "--tenant",
            "acme",
            "--dataset",
            "orders",
            "--row-limit",
            "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Query {
                server,
                tenant,
                row_limit,
                timeout_ms,
                ..
            } => {
                assert_eq!(server, "localhost:50051");
                assert_eq!(tenant, "acme");
                assert_eq!(row_limit, Some(10));
                assert_eq!(timeout_ms, None);
            },
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn test_parse_health_default_timeout() {
        let cli = Cli::try_parse_from(["flight-loadgen", "-v", "health", "localhost:50051"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Health { timeout_ms, .. } => assert_eq!(timeout_ms, 2000),
            _ => panic!("expected health command"),
        }
    }

    #[test]
    fn test_query_requires_tenant() {
        assert!(Cli::try_parse_from([
            "flight-loadgen",
            "query",
            "localhost:50051",
            "--dataset",
            "orders"
        ])
        .is_err());
    }
}
