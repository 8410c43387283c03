//! `flight-loadgen loadtest run` command implementation.

use anyhow::Result;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use flight_loadgen::flight::connector::DEFAULT_MAX_MESSAGE_BYTES;
use flight_loadgen::flight::{ConnectionPolicy, GrpcConnector, ProtocolClient, TransportProvider};
use flight_loadgen::loadtest::config::{
    LoadTestConfig, QueryTarget, Settings, CONFIG_DIR, CONFIG_FILE,
};
use flight_loadgen::loadtest::display::display_loop;
use flight_loadgen::loadtest::engine::LoadOrchestrator;
use flight_loadgen::loadtest::error::LoadTestError;
use flight_loadgen::loadtest::report::write_metrics;
use flight_loadgen::loadtest::summary::render_summary;

/// Defaults for runs without a config file.
const DEFAULT_TOTAL_REQUESTS: usize = 100;
const DEFAULT_CONCURRENCY: usize = 10;

/// CLI values that override the config file.
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub requests: Option<usize>,
    pub concurrency: Option<usize>,
    pub tenants: Option<Vec<String>>,
    pub dataset: Option<String>,
    pub row_limit: Option<u64>,
    pub shared_connection: bool,
}

/// Execute the `loadtest run` command.
///
/// Loads config (explicit path, auto-discovery, or CLI flags alone), applies
/// CLI overrides, probes the server, runs the orchestrator under a live
/// display, prints the summary and optionally exports the metrics.
pub async fn execute_run(
    server: String,
    config_path: Option<PathBuf>,
    overrides: RunOverrides,
    output: Option<PathBuf>,
    no_color: bool,
    skip_probe: bool,
) -> Result<()> {
    // Step 1: Load config
    let mut config = match locate_config(config_path, &std::env::current_dir()?)? {
        Some(path) => load_config(&path)?,
        None => config_from_flags(&overrides).ok_or_else(no_config_error)?,
    };

    // Step 2: Apply CLI overrides
    apply_overrides(&mut config, overrides);
    config.validate()?;

    // Step 3: Connect and probe
    let connector = GrpcConnector::new(&server, config.settings.connection)?
        .with_max_message_bytes(config.settings.max_message_bytes);
    let target = connector.uri();

    if !skip_probe {
        let mut probe = ProtocolClient::new(connector.acquire());
        if !probe.probe_health(config.settings.probe_timeout()).await {
            eprintln!(
                "Warning: {target} did not answer ListFlights within {}ms; running anyway.",
                config.settings.probe_timeout_ms
            );
        }
    }

    // Step 4: Run under the live display
    let orchestrator = LoadOrchestrator::new(connector, config.settings.concurrency)
        .with_query_timeout(config.settings.query_timeout());
    let cancel = CancellationToken::new();
    let display_handle = tokio::spawn(display_loop(
        orchestrator.subscribe_progress(),
        config.settings.concurrency,
        cancel.clone(),
        no_color,
        Instant::now(),
    ));

    let run = orchestrator
        .run_load_test_detailed(
            config.settings.total_requests,
            &config.query.tenants,
            &config.query.dataset,
            config.query.row_limit,
        )
        .await;
    cancel.cancel();
    let _ = display_handle.await;
    let run = run.map_err(|e| anyhow::anyhow!("Load test failed: {}", e))?;

    // Step 5: Output k6-style terminal summary
    if no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
    println!("{}", render_summary(&run, &config, &target));

    // Step 6: Export metrics
    if let Some(output) = output {
        match write_metrics(&run.metrics, &output) {
            Ok(path) => {
                eprintln!();
                eprintln!("Metrics written to: {}", path.display());
            },
            Err(e) => {
                eprintln!();
                eprintln!("Warning: {e}");
            },
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<LoadTestConfig> {
    eprintln!("Loading config from: {}", path.display());
    LoadTestConfig::load(path)
        .map_err(|e| anyhow::anyhow!("Failed to load config '{}': {}", path.display(), e))
}

/// Build a config from CLI flags alone, when tenants and dataset are given.
fn config_from_flags(overrides: &RunOverrides) -> Option<LoadTestConfig> {
    let tenants = overrides.tenants.clone()?;
    let dataset = overrides.dataset.clone()?;
    Some(LoadTestConfig {
        settings: Settings {
            total_requests: DEFAULT_TOTAL_REQUESTS,
            concurrency: DEFAULT_CONCURRENCY,
            connection: ConnectionPolicy::PerRequest,
            query_timeout_ms: None,
            probe_timeout_ms: 2000,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        },
        query: QueryTarget {
            tenants,
            dataset,
            row_limit: None,
        },
    })
}

/// Apply CLI flag overrides to a loaded config.
fn apply_overrides(config: &mut LoadTestConfig, overrides: RunOverrides) {
    if let Some(n) = overrides.requests {
        config.settings.total_requests = n;
    }
    if let Some(c) = overrides.concurrency {
        config.settings.concurrency = c;
    }
    if let Some(tenants) = overrides.tenants {
        config.query.tenants = tenants;
    }
    if let Some(dataset) = overrides.dataset {
        config.query.dataset = dataset;
    }
    if let Some(limit) = overrides.row_limit {
        config.query.row_limit = Some(limit);
    }
    if overrides.shared_connection {
        config.settings.connection = ConnectionPolicy::Shared;
    }
}

/// Pick the config file: an explicit path must exist, otherwise search
/// upward from `start`. `Ok(None)` means no file is in play.
fn locate_config(
    config_path: Option<PathBuf>,
    start: &Path,
) -> Result<Option<PathBuf>, LoadTestError> {
    match config_path {
        Some(path) if !path.exists() => Err(LoadTestError::Cli {
            message: format!(
                "Config file not found: {}\nUse `flight-loadgen loadtest init` to create one.",
                path.display()
            ),
        }),
        Some(path) => Ok(Some(path)),
        None => Ok(discover_config_from(start)),
    }
}

fn no_config_error() -> LoadTestError {
    LoadTestError::Cli {
        message: format!(
            "No loadtest config found.\n\
             Run `flight-loadgen loadtest init` to create {CONFIG_DIR}/{CONFIG_FILE},\n\
             use `--config path/to/file.toml`, or pass `--tenants` and `--dataset`."
        ),
    }
}

/// Walk parent directories of `start` until the config file is found or the
/// filesystem root is reached. Matches `.git` directory discovery semantics.
fn discover_config_from(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}
