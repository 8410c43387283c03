//! TOML-based load test configuration.
//!
//! Defines the typed structs parsed from `.flight-loadgen/loadtest.toml`.
//!
//! # Example TOML
//!
//! ```toml
//! [settings]
//! total_requests = 100
//! concurrency = 10
//! connection = "per-request"
//! query_timeout_ms = 30000
//! probe_timeout_ms = 2000
//!
//! [query]
//! tenants = ["tenant-a", "tenant-b"]
//! dataset = "orders"
//! row_limit = 1000
//! ```
//!
//! Note: The target server address is NOT part of the config file. It is
//! provided as a positional CLI argument.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::flight::connector::{ConnectionPolicy, DEFAULT_MAX_MESSAGE_BYTES};
use crate::loadtest::error::LoadTestError;

/// Directory holding the config file, discovered by walking parent directories.
pub const CONFIG_DIR: &str = ".flight-loadgen";

/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "loadtest.toml";

/// Starter config written by `loadtest init`.
pub const STARTER_CONFIG: &str = r#"# flight-loadgen load test configuration
#
# Run with: flight-loadgen loadtest run <server-address>

[settings]
# Number of queries to issue in total.
total_requests = 100
# Maximum number of queries in flight at once.
concurrency = 10
# "per-request" opens a fresh connection per query, "shared" multiplexes one.
connection = "per-request"
# Optional per-query deadline in milliseconds.
# query_timeout_ms = 30000
# Timeout of the pre-flight health probe.
probe_timeout_ms = 2000

[query]
# Requests rotate through tenants in order.
tenants = ["tenant-a", "tenant-b"]
dataset = "orders"
# Optional row limit hint sent with each descriptor.
# row_limit = 1000
"#;

/// Top-level load test configuration parsed from a TOML file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoadTestConfig {
    /// Execution settings.
    pub settings: Settings,
    /// What to query.
    pub query: QueryTarget,
}

/// Execution parameters of a run.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Number of queries to issue.
    pub total_requests: usize,
    /// Maximum number of queries in flight at once.
    pub concurrency: usize,
    /// Connection reuse policy across queries.
    #[serde(default)]
    pub connection: ConnectionPolicy,
    /// Optional per-query deadline in milliseconds. No deadline when absent.
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,
    /// Health probe timeout in milliseconds. Defaults to 2000ms.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
    /// Flight message size limit in bytes. Defaults to 512 MiB.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

/// Tenants and dataset that each query targets.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct QueryTarget {
    /// Tenants assigned round-robin by request index.
    pub tenants: Vec<String>,
    /// Dataset name sent in every descriptor.
    pub dataset: String,
    /// Optional row limit hint.
    #[serde(default)]
    pub row_limit: Option<u64>,
}

fn default_probe_timeout() -> u64 {
    2000
}

fn default_max_message_bytes() -> usize {
    DEFAULT_MAX_MESSAGE_BYTES
}

/// Check the query target shared by config files and direct engine calls.
///
/// Emptiness follows [`build_descriptor`](crate::flight::client::build_descriptor):
/// a tenant or dataset made only of whitespace is still a valid path segment.
pub fn validate_target(tenants: &[String], dataset: &str) -> Result<(), LoadTestError> {
    if tenants.is_empty() {
        return Err(LoadTestError::validation(
            "At least one tenant is required",
        ));
    }
    if let Some(pos) = tenants.iter().position(|t| t.is_empty()) {
        return Err(LoadTestError::validation(format!(
            "Tenant #{} is empty; tenant ids must be non-empty",
            pos + 1
        )));
    }
    if dataset.is_empty() {
        return Err(LoadTestError::validation("Dataset name must not be empty"));
    }
    Ok(())
}

impl LoadTestConfig {
    /// Parse a TOML string into a validated [`LoadTestConfig`].
    pub fn from_toml(content: &str) -> Result<Self, LoadTestError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a [`LoadTestConfig`] from a file path.
    ///
    /// Returns [`LoadTestError::ConfigIo`] if the file cannot be read,
    /// [`LoadTestError::ConfigParse`] if the TOML is malformed, or
    /// [`LoadTestError::ConfigValidation`] if validation fails.
    pub fn load(path: &Path) -> Result<Self, LoadTestError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadTestError::ConfigIo {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Validate that the config is semantically correct.
    ///
    /// Checks:
    /// - `concurrency` is at least 1
    /// - at least one tenant, none of them empty
    /// - dataset name is non-empty
    /// - `query_timeout_ms`, when set, is positive
    pub fn validate(&self) -> Result<(), LoadTestError> {
        if self.settings.concurrency == 0 {
            return Err(LoadTestError::validation(
                "settings.concurrency must be at least 1",
            ));
        }
        if self.settings.query_timeout_ms == Some(0) {
            return Err(LoadTestError::validation(
                "settings.query_timeout_ms must be positive when set",
            ));
        }
        validate_target(&self.query.tenants, &self.query.dataset)
    }
}

impl Settings {
    /// Per-query deadline, if configured.
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }

    /// Health probe timeout.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal_config() -> LoadTestConfig {
        LoadTestConfig {
            settings: Settings {
                total_requests: 10,
                concurrency: 3,
                connection: ConnectionPolicy::PerRequest,
                query_timeout_ms: None,
                probe_timeout_ms: 2000,
                max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            },
            query: QueryTarget {
                tenants: vec!["a".to_string(), "b".to_string()],
                dataset: "orders".to_string(),
                row_limit: None,
            },
        }
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml_str = r#"
[settings]
total_requests = 50
concurrency = 5

[query]
tenants = ["acme"]
dataset = "events"
"#;
        let config = LoadTestConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.settings.total_requests, 50);
        assert_eq!(config.settings.concurrency, 5);
        assert_eq!(config.settings.connection, ConnectionPolicy::PerRequest);
        assert_eq!(config.settings.query_timeout(), None);
        assert_eq!(config.settings.probe_timeout(), Duration::from_millis(2000));
        assert_eq!(config.settings.max_message_bytes, DEFAULT_MAX_MESSAGE_BYTES);
        assert_eq!(config.query.tenants, vec!["acme"]);
        assert_eq!(config.query.row_limit, None);
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[settings]
total_requests = 200
concurrency = 16
connection = "shared"
query_timeout_ms = 1500
probe_timeout_ms = 500
max_message_bytes = 1048576

[query]
tenants = ["a", "b", "c"]
dataset = "orders"
row_limit = 1000
"#;
        let config = LoadTestConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.settings.connection, ConnectionPolicy::Shared);
        assert_eq!(
            config.settings.query_timeout(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(config.settings.probe_timeout(), Duration::from_millis(500));
        assert_eq!(config.settings.max_message_bytes, 1_048_576);
        assert_eq!(config.query.tenants.len(), 3);
        assert_eq!(config.query.row_limit, Some(1000));
    }

    #[test]
    fn test_starter_config_parses() {
        let config = LoadTestConfig::from_toml(STARTER_CONFIG).unwrap();
        assert_eq!(config.settings.total_requests, 100);
        assert_eq!(config.settings.concurrency, 10);
        assert_eq!(config.query.dataset, "orders");
    }

    #[test]
    fn test_unknown_connection_policy_fails_parse() {
        let toml_str = r#"
[settings]
total_requests = 1
concurrency = 1
connection = "pooled"

[query]
tenants = ["a"]
dataset = "d"
"#;
        assert!(matches!(
            LoadTestConfig::from_toml(toml_str).unwrap_err(),
            LoadTestError::ConfigParse { .. }
        ));
    }

    #[test]
    fn test_validate_zero_concurrency_fails() {
        let mut config = minimal_config();
        config.settings.concurrency = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            LoadTestError::ConfigValidation { .. }
        ));
    }

    #[test]
    fn test_validate_zero_query_timeout_fails() {
        let mut config = minimal_config();
        config.settings.query_timeout_ms = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_tenants_fails() {
        let mut config = minimal_config();
        config.query.tenants.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tenant"), "{err}");
    }

    #[test]
    fn test_validate_empty_tenant_fails() {
        let mut config = minimal_config();
        config.query.tenants.push(String::new());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Tenant #3"), "{err}");
    }

    #[test]
    fn test_validate_whitespace_tenant_is_allowed() {
        let mut config = minimal_config();
        config.query.tenants.push("  ".to_string());
        config.query.dataset = " ".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_dataset_fails() {
        let mut config = minimal_config();
        config.query.dataset = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_total_requests_is_allowed() {
        let mut config = minimal_config();
        config.settings.total_requests = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        tmpfile.write_all(STARTER_CONFIG.as_bytes()).unwrap();
        tmpfile.flush().unwrap();

        let config = LoadTestConfig::load(tmpfile.path()).unwrap();
        assert_eq!(config.query.tenants, vec!["tenant-a", "tenant-b"]);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = LoadTestConfig::load(Path::new("/nonexistent/loadtest.toml"));
        assert!(matches!(
            result.unwrap_err(),
            LoadTestError::ConfigIo { .. }
        ));
    }
}
