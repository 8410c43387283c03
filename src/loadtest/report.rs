//! JSON export of load test metrics.
//!
//! The file holds exactly the fields of [`LoadTestMetrics`] so that CI
//! pipelines can key on a flat, stable object.

use std::path::{Path, PathBuf};

use crate::loadtest::error::LoadTestError;
use crate::loadtest::metrics::LoadTestMetrics;

/// Write `metrics` as pretty-printed JSON and return the path written.
///
/// When `output` is an existing directory, a timestamped
/// `loadtest-<timestamp>.json` file is created inside it. Otherwise `output`
/// is the file path; missing parent directories are created.
pub fn write_metrics(metrics: &LoadTestMetrics, output: &Path) -> Result<PathBuf, LoadTestError> {
    let path = if output.is_dir() {
        output.join(report_filename(&chrono::Utc::now()))
    } else {
        output.to_path_buf()
    };
    let report_err = |message: String| LoadTestError::Report {
        path: path.display().to_string(),
        message,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| report_err(e.to_string()))?;
    }
    let json = serde_json::to_string_pretty(metrics).map_err(|e| report_err(e.to_string()))?;
    std::fs::write(&path, json).map_err(|e| report_err(e.to_string()))?;

    Ok(path)
}

/// Report filename for a given timestamp.
///
/// Uses hyphens instead of colons for cross-platform filename compatibility.
pub fn report_filename(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    format!("loadtest-{}.json", timestamp.format("%Y-%m-%dT%H-%M-%S"))
}
