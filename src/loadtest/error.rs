//! Error types for the load testing engine.
//!
//! [`LoadTestError`] covers the failures that stop a run before it starts or
//! after it ends: bad configuration, a missing config file, and report I/O. Individual query failures
//! are never errors here; they are recorded as error results and counted.

/// Errors that occur during load test configuration, validation, or report output.
#[derive(Debug, thiserror::Error)]
pub enum LoadTestError {
    /// TOML parse failure -- the config file contains invalid TOML syntax
    /// or does not match the expected schema.
    #[error("Failed to parse config TOML: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    /// Semantic validation failure -- the config parsed but contains invalid
    /// values (e.g., zero concurrency, empty tenant list).
    #[error("Config validation error: {message}")]
    ConfigValidation { message: String },

    /// File I/O failure -- the config file could not be read from disk.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigIo {
        source: std::io::Error,
        path: String,
    },

    /// The metrics report could not be serialized or written.
    #[error("Failed to write report '{path}': {message}")]
    Report { path: String, message: String },

    /// The run itself broke down (admission closed, a request task vanished).
    #[error("Load test execution failed: {message}")]
    Execution { message: String },

    /// CLI-level error (no config file to run with).
    #[error("{message}")]
    Cli { message: String },
}

impl LoadTestError {
    /// Shorthand for a [`LoadTestError::ConfigValidation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }
}
