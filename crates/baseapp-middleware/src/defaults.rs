//! The default middleware stack.

use baseapp_telemetry::{Logger, MetricsRegistry};

use crate::chain::MiddlewareChain;
use crate::stages::{
    AccessLogMiddleware, MetricsMiddleware, RecoveryMiddleware, RequestIdMiddleware,
    RequestLoggerMiddleware,
};

/// Builds the stack a server uses when no middleware was configured.
///
/// Outermost first:
///
/// | # | Middleware       | Purpose                                      |
/// |---|------------------|----------------------------------------------|
/// | 1 | `request_logger` | Makes `logger` current for the request       |
/// | 2 | `request_id`     | Reuses or assigns `X-Request-Id`, echoes it  |
/// | 3 | `metrics`        | Request count, latency, in-flight gauge      |
/// | 4 | `access_log`     | One log event per completed request          |
/// | 5 | `recovery`       | Turns handler panics into 500 responses      |
///
/// Recovery sits innermost so the stages around it observe the 500 it
/// produces.
#[must_use]
pub fn default_middleware(logger: &Logger, registry: &MetricsRegistry) -> MiddlewareChain {
    MiddlewareChain::new()
        .with(RequestLoggerMiddleware::new(logger.clone()))
        .with(RequestIdMiddleware::trust_incoming())
        .with(MetricsMiddleware::new(registry.clone()))
        .with(AccessLogMiddleware::new())
        .with(RecoveryMiddleware::new(registry.clone()))
}
