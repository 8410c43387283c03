//! `flight-loadgen loadtest` CLI subcommands.
//!
//! Provides `run` (execute a load test) and `init` (generate starter config).

mod init;
mod run;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use run::RunOverrides;

/// Load test commands for Flight servers.
#[derive(Debug, Subcommand)]
pub enum LoadtestCommand {
    /// Run a load test against a Flight server
    ///
    /// Reads .flight-loadgen/loadtest.toml (or a custom config path), applies
    /// CLI overrides, and prints a summary. Without a config file, `--tenants`
    /// and `--dataset` are required.
    Run {
        /// Flight server address (host:port or URI)
        server: String,

        /// Path to config file (default: auto-discover .flight-loadgen/loadtest.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Total number of queries (overrides config)
        #[arg(long)]
        requests: Option<usize>,

        /// Maximum queries in flight (overrides config)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Comma-separated tenant ids (overrides config)
        #[arg(long, value_delimiter = ',')]
        tenants: Option<Vec<String>>,

        /// Dataset name (overrides config)
        #[arg(long)]
        dataset: Option<String>,

        /// Row limit hint (overrides config)
        #[arg(long)]
        row_limit: Option<u64>,

        /// Multiplex all queries over one connection
        #[arg(long)]
        shared_connection: bool,

        /// Write the final metrics as JSON to this file or directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Skip the pre-flight health probe
        #[arg(long)]
        skip_probe: bool,
    },

    /// Generate a starter loadtest config file
    ///
    /// Creates .flight-loadgen/loadtest.toml in the current directory.
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

impl LoadtestCommand {
    /// Execute the selected loadtest subcommand.
    pub fn execute(self) -> Result<()> {
        match self {
            LoadtestCommand::Run {
                server,
                config,
                requests,
                concurrency,
                tenants,
                dataset,
                row_limit,
                shared_connection,
                output,
                no_color,
                skip_probe,
            } => {
                let overrides = RunOverrides {
                    requests,
                    concurrency,
                    tenants,
                    dataset,
                    row_limit,
                    shared_connection,
                };
                let runtime = tokio::runtime::Runtime::new()?;
                runtime.block_on(run::execute_run(
                    server, config, overrides, output, no_color, skip_probe,
                ))
            },
            LoadtestCommand::Init { force } => {
                let cwd = std::env::current_dir()?;
                init::execute_init(&cwd, force).map(|_| ())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: LoadtestCommand,
    }

    #[test]
    fn test_parse_run_with_overrides() {
        let parsed = Harness::try_parse_from([
            "loadtest",
            "run",
            "localhost:50051",
            "--tenants",
            "a,b,c",
            "--dataset",
            "orders",
            "--concurrency",
            "4",
            "--shared-connection",
        ])
        .unwrap();

        match parsed.command {
            LoadtestCommand::Run {
                tenants,
                dataset,
                concurrency,
                shared_connection,
                skip_probe,
                ..
            } => {
                assert_eq!(
                    tenants,
                    Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
                );
                assert_eq!(dataset.as_deref(), Some("orders"));
                assert_eq!(concurrency, Some(4));
                assert!(shared_connection);
                assert!(!skip_probe);
            },
            LoadtestCommand::Init { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_init_force() {
        let parsed = Harness::try_parse_from(["loadtest", "init", "--force"]).unwrap();
        assert!(matches!(parsed.command, LoadtestCommand::Init { force: true }));
    }
}
