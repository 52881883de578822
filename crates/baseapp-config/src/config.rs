//! Configuration types.
//!
//! [`HttpConfig`] is the value the server is built from. [`AppConfig`] is the
//! file/env-loadable root that embeds it next to the logging section.

use serde::{Deserialize, Serialize};

pub use baseapp_telemetry::logging::LogFormat;
use baseapp_telemetry::logging::{create_env_filter, LogConfig};

use crate::ConfigError;

/// Default bind address.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 8080;

/// Network binding settings of a server.
///
/// # Example
///
/// ```
/// use baseapp_config::HttpConfig;
///
/// let config = HttpConfig::new("0.0.0.0", 8080);
/// assert_eq!(config.bind_addr(), "0.0.0.0:8080");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Host or IP address to bind.
    #[serde(default = "default_address")]
    pub address: String,

    /// TCP port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl HttpConfig {
    /// Creates a configuration for `address:port`.
    #[must_use]
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// Returns the listener target, `address + ":" + port`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS, DEFAULT_PORT)
    }
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level or filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Converts this section into the telemetry crate's logger settings.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        let base = match self.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };

        LogConfig {
            level: self.level.clone(),
            format: self.format,
            file_line_info: self.include_location,
            ..base
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Root configuration of a baseapp service.
///
/// # Example
///
/// ```
/// use baseapp_config::AppConfig;
///
/// let config = AppConfig::default();
/// assert_eq!(config.server.bind_addr(), "0.0.0.0:8080");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP binding.
    #[serde(default)]
    pub server: HttpConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Development preset: pretty debug logs on localhost.
    #[must_use]
    pub fn development() -> Self {
        Self {
            server: HttpConfig::new("127.0.0.1", DEFAULT_PORT),
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                include_location: true,
            },
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the address is empty or the log
    /// level is not a valid filter directive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "server.address",
                "must not be empty",
            ));
        }

        if let Err(e) = create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value("logging.level", e.to_string()));
        }

        Ok(())
    }
}
