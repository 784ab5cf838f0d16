//! Tracing subscriber configuration.
//!
//! Services call [`init_tracing`] once at startup. Library code only emits
//! `tracing` events and spans; where they go is decided here.

use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Human readable lines
    Text,
}

impl FromStr for LogFormat {
    type Err = TracingInitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" | "plain" => Ok(Self::Text),
            other => Err(TracingInitError::InvalidFormat(other.to_string())),
        }
    }
}

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingInitError {
    /// The filter directive could not be parsed
    #[error("invalid log filter '{directive}': {reason}")]
    InvalidFilter {
        /// Directive as configured
        directive: String,
        /// Parser message
        reason: String,
    },

    /// Unknown log format name
    #[error("invalid log format: {0}")]
    InvalidFormat(String),

    /// A global subscriber was already installed
    #[error("tracing subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name recorded on the startup event
    pub service_name: String,
    /// Log level filter, used when `RUST_LOG` is not set
    pub log_level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "rust-service".to_string(),
            log_level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl TracingConfig {
    /// Create config with custom service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Create config with custom log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Build the env filter. `RUST_LOG` wins over the configured level.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured directive does not parse.
    pub fn env_filter(&self) -> Result<EnvFilter, TracingInitError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.log_level).map_err(|e| TracingInitError::InvalidFilter {
            directive: self.log_level.clone(),
            reason: e.to_string(),
        })
    }
}

/// Install the global subscriber, reporting failures to the caller.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn try_init_tracing(config: &TracingConfig) -> Result<(), TracingInitError> {
    let filter = config.env_filter()?;

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    };
    result.map_err(|e| TracingInitError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(service = %config.service_name, "tracing initialized");
    Ok(())
}

/// Install the global subscriber.
///
/// Should be called once at application startup. A second call is ignored.
pub fn init_tracing(config: &TracingConfig) {
    if let Err(e) = try_init_tracing(config) {
        eprintln!("tracing not initialized: {e}");
    }
}
