//! Structured logging for baseapp servers.
//!
//! The server holds a [`Logger`] rather than relying on whatever subscriber
//! happens to be installed globally. A logger wraps a [`Dispatch`], so
//! embedding applications can inject any `tracing` subscriber, while
//! [`Logger::from_config`] builds the usual JSON or pretty fmt subscriber.
//!
//! # Example
//!
//! ```rust
//! use baseapp_telemetry::logging::{LogConfig, Logger};
//!
//! let logger = Logger::from_config(&LogConfig::development()).unwrap();
//! logger.in_scope(|| tracing::debug!(port = 8080, "configured"));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::Dispatch;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Output format of a fmt-based logger.
///
/// Deserializes from `"json"` or `"pretty"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event (production).
    #[default]
    Json,
    /// Multi-line human-readable output (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level or filter directive (e.g., "info", "baseapp=debug,hyper=warn").
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to include span events (new, close).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,

    /// Whether to emit ANSI color codes.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            include_target: true,
            ansi: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            include_target: true,
            ansi: false,
        }
    }
}

/// The root logger of a server.
///
/// Cloning a `Logger` is cheap and every clone dispatches to the same
/// subscriber.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// Creates a logger that discards every event.
    #[must_use]
    pub fn nop() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    /// Creates a logger from an existing dispatcher.
    #[must_use]
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Creates a logger backed by the given subscriber.
    #[must_use]
    pub fn from_subscriber<S>(subscriber: S) -> Self
    where
        S: tracing::Subscriber + Send + Sync + 'static,
    {
        Self::new(Dispatch::new(subscriber))
    }

    /// Builds a fmt logger from configuration.
    ///
    /// The logger is not installed as the global default.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::InvalidFilter` if the level does not parse.
    pub fn from_config(config: &LogConfig) -> TelemetryResult<Self> {
        Ok(Self::new(build_dispatch(config)?))
    }

    /// Returns the underlying dispatcher.
    #[must_use]
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Returns `true` if this logger discards every event.
    #[must_use]
    pub fn is_nop(&self) -> bool {
        self.dispatch.is::<tracing::subscriber::NoSubscriber>()
    }

    /// Runs `f` with this logger as the thread's default subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::nop()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("nop", &self.is_nop())
            .finish()
    }
}

/// Installs a fmt subscriber built from `config` as the global default.
///
/// Binaries call this once at startup; servers should still receive a
/// [`Logger`] explicitly.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    tracing::dispatcher::set_global_default(build_dispatch(config)?)
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Creates an env filter from a string.
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter(format!("{filter}: {e}")))
}

fn span_events(config: &LogConfig) -> FmtSpan {
    if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

fn build_dispatch(config: &LogConfig) -> TelemetryResult<Dispatch> {
    let filter = create_env_filter(&config.level)?;
    let span_events = span_events(config);

    let dispatch = match config.format {
        LogFormat::Json => Dispatch::new(
            tracing_subscriber::registry().with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_span_events(span_events)
                    .with_file(config.file_line_info)
                    .with_line_number(config.file_line_info)
                    .with_target(config.include_target)
                    .with_filter(filter),
            ),
        ),
        LogFormat::Pretty => Dispatch::new(
            tracing_subscriber::registry().with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(config.ansi)
                    .with_span_events(span_events)
                    .with_file(config.file_line_info)
                    .with_line_number(config.file_line_info)
                    .with_target(config.include_target)
                    .with_filter(filter),
            ),
        ),
    };

    Ok(dispatch)
}
