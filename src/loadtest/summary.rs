//! k6-style terminal summary renderer for load test results.
//!
//! Produces a colorized, human-readable summary with:
//! - ASCII art header with the run configuration
//! - Dotted-line metric rows (metric.........: value)
//! - Error breakdown by message
//!
//! The renderers are pure functions returning a [`String`]. Color coding
//! respects the global override set by `colored::control::set_override(false)`
//! when `--no-color` is active or output is piped.

use colored::Colorize;

use crate::flight::result::{QueryOutcome, QueryResult};
use crate::loadtest::config::LoadTestConfig;
use crate::loadtest::engine::LoadTestRun;
use crate::loadtest::metrics::error_breakdown;

/// Width for dotted metric row padding.
const PAD_WIDTH: usize = 40;

/// Longest error message shown in the breakdown before truncation.
const MAX_ERROR_LEN: usize = 60;

/// Render a k6-style terminal summary of a finished run.
///
/// # Layout
///
/// ```text
///           /\      |  flight-loadgen loadtest
///          /  \     |
///     /\  /    \    |  target:      http://localhost:50051
///    /  \/      \   |  requests:    100
///   /    \       \  |  concurrency: 10
///  /      \       \ |  dataset:     orders (2 tenants)
///
///   flight_query_duration...................: avg=55.0ms  p95=100.0ms
///   flight_query_success_count..............: 98
///   flight_query_error_count................: 2
///   ...
///
///   errors:
///     transport error: Unavailable: ......: 2
/// ```
pub fn render_summary(run: &LoadTestRun, config: &LoadTestConfig, server: &str) -> String {
    let metrics = &run.metrics;
    let mut lines = Vec::new();

    lines.push(render_header(
        server,
        config.settings.total_requests,
        config.settings.concurrency,
        &config.query.dataset,
        config.query.tenants.len(),
    ));

    let latency_value = format!(
        "avg={:.1}ms  p95={:.1}ms",
        metrics.avg_latency_ms, metrics.p95_latency_ms
    );
    let latency_colored = if metrics.p95_latency_ms < 1000.0 {
        latency_value.green().to_string()
    } else {
        latency_value.yellow().to_string()
    };
    lines.push(format_metric_row(
        "flight_query_duration",
        &latency_colored,
        PAD_WIDTH,
    ));

    lines.push(format_metric_row(
        "flight_query_success_count",
        &metrics.successful_requests.to_string().green().to_string(),
        PAD_WIDTH,
    ));

    let error_count_str = if metrics.failed_requests > 0 {
        metrics.failed_requests.to_string().red().to_string()
    } else {
        metrics.failed_requests.to_string()
    };
    lines.push(format_metric_row(
        "flight_query_error_count",
        &error_count_str,
        PAD_WIDTH,
    ));

    let error_rate_pct = metrics.error_rate() * 100.0;
    let error_rate_str = format!("{error_rate_pct:.1}%");
    let error_rate_colored = if error_rate_pct > 5.0 {
        error_rate_str.red().to_string()
    } else if error_rate_pct > 1.0 {
        error_rate_str.yellow().to_string()
    } else {
        error_rate_str.green().to_string()
    };
    lines.push(format_metric_row(
        "flight_query_error_rate",
        &error_rate_colored,
        PAD_WIDTH,
    ));

    lines.push(format_metric_row(
        "flight_query_throughput",
        &format!("{:.1} req/s", metrics.throughput_rps)
            .green()
            .to_string(),
        PAD_WIDTH,
    ));
    lines.push(format_metric_row(
        "flight_query_total",
        &metrics.total_requests.to_string(),
        PAD_WIDTH,
    ));
    lines.push(format_metric_row(
        "flight_rows_received",
        &metrics.total_rows.to_string(),
        PAD_WIDTH,
    ));
    lines.push(format_metric_row(
        "flight_bytes_received",
        &format_bytes(metrics.total_bytes),
        PAD_WIDTH,
    ));
    lines.push(format_metric_row(
        "flight_peak_in_flight",
        &run.peak_in_flight.to_string(),
        PAD_WIDTH,
    ));
    lines.push(format_metric_row(
        "flight_run_elapsed",
        &format!("{:.1}s", metrics.duration_secs),
        PAD_WIDTH,
    ));

    let breakdown = error_breakdown(&run.results);
    if !breakdown.is_empty() {
        lines.push(String::new());
        lines.push("  errors:".to_string());
        for (message, count) in breakdown {
            lines.push(format_metric_row(
                &format!("    {}", truncate(&message, MAX_ERROR_LEN)),
                &count.to_string().red().to_string(),
                PAD_WIDTH,
            ));
        }
    }

    lines.join("\n")
}

/// Render the outcome of a single query.
pub fn render_query_result(result: &QueryResult, server: &str) -> String {
    let mut lines = vec![
        String::new(),
        format!("  {}", "flight-loadgen query".bold()),
        String::new(),
        format_metric_row("target", server, PAD_WIDTH),
        format_metric_row(
            "descriptor",
            &format!("{}/{}", result.tenant_id, result.dataset),
            PAD_WIDTH,
        ),
    ];

    match &result.outcome {
        QueryOutcome::Success(stats) => {
            lines.push(format_metric_row(
                "status",
                &result.status().to_string().green().to_string(),
                PAD_WIDTH,
            ));
            lines.push(format_metric_row("rows", &stats.rows.to_string(), PAD_WIDTH));
            lines.push(format_metric_row(
                "bytes",
                &format_bytes(stats.bytes),
                PAD_WIDTH,
            ));
            lines.push(format_metric_row(
                "metadata_latency",
                &format_ms(stats.metadata_latency.as_secs_f64()),
                PAD_WIDTH,
            ));
            lines.push(format_metric_row(
                "transfer_latency",
                &format_ms(stats.transfer_latency.as_secs_f64()),
                PAD_WIDTH,
            ));
            lines.push(format_metric_row(
                "total_latency",
                &format_ms(stats.total_latency.as_secs_f64()),
                PAD_WIDTH,
            ));
        },
        QueryOutcome::Error { message, elapsed } => {
            lines.push(format_metric_row(
                "status",
                &result.status().to_string().red().to_string(),
                PAD_WIDTH,
            ));
            lines.push(format_metric_row("error", &message.red().to_string(), PAD_WIDTH));
            lines.push(format_metric_row(
                "elapsed",
                &format_ms(elapsed.as_secs_f64()),
                PAD_WIDTH,
            ));
        },
    }

    lines.join("\n")
}

fn render_header(
    server: &str,
    total_requests: usize,
    concurrency: usize,
    dataset: &str,
    tenant_count: usize,
) -> String {
    format!(
        r#"
          /\      |  {}
         /  \     |
    /\  /    \    |  target:      {}
   /  \/      \   |  requests:    {}
  /    \       \  |  concurrency: {}
 /      \       \ |  dataset:     {} ({} tenants)
"#,
        "flight-loadgen loadtest".bold(),
        server,
        total_requests,
        concurrency,
        dataset,
        tenant_count,
    )
}

/// Format a single metric row with dot-padding.
///
/// Produces: `"  metric_name..................: value_string"`
fn format_metric_row(name: &str, value: &str, pad_width: usize) -> String {
    format!("  {name:.<pad_width$}: {value}")
}

fn format_ms(secs: f64) -> String {
    format!("{:.1}ms", secs * 1000.0)
}

/// Human-readable byte count with binary units.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn truncate(message: &str, max_chars: usize) -> String {
    if message.chars().count() <= max_chars {
        return message.to_owned();
    }
    let kept: String = message.chars().take(max_chars - 3).collect();
    format!("{kept}...")
}
