//! Logger and metrics handles for baseapp servers.
//!
//! A baseapp server never reaches for process-global observability state.
//! Instead it holds two injectable handles:
//!
//! - [`Logger`]: a cloneable wrapper around a [`tracing::Dispatch`]. The
//!   default is a no-op logger; events emitted through [`Logger::in_scope`]
//!   reach only the subscriber the logger was built with.
//! - [`MetricsRegistry`]: a Prometheus recorder owned by the server rather
//!   than installed globally. Metric macros invoked inside
//!   [`MetricsRegistry::record`] land in that registry.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `baseapp_requests_total` | Counter | `method`, `status` | Total request count |
//! | `baseapp_request_duration_seconds` | Histogram | `method` | Request latency |
//! | `baseapp_in_flight_requests` | Gauge | - | Currently processing requests |
//! | `baseapp_panics_total` | Counter | - | Handler panics recovered |
//!
//! # Example
//!
//! ```
//! use baseapp_telemetry::{Logger, MetricsRegistry};
//!
//! let logger = Logger::nop();
//! let registry = MetricsRegistry::new();
//!
//! logger.in_scope(|| tracing::info!("discarded"));
//! registry.record(|| metrics::counter!("jobs_total").increment(1));
//!
//! assert!(registry.render().contains("jobs_total 1"));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat, Logger};
pub use metrics::{describe_standard_metrics, method_label, MetricsRegistry};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
