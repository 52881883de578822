//! Per-server Prometheus metrics.
//!
//! [`MetricsRegistry`] owns a Prometheus recorder that is never installed as
//! the global `metrics` recorder. Two servers in one process therefore never
//! share counters unless they are handed the same registry.
//!
//! # Example
//!
//! ```rust
//! use baseapp_telemetry::metrics::MetricsRegistry;
//! use std::time::Duration;
//!
//! let registry = MetricsRegistry::new();
//! registry.record_request("GET", 200, Duration::from_millis(12));
//!
//! let text = registry.render();
//! assert!(text.contains("baseapp_requests_total"));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

/// Counter of completed requests, labelled by `method` and `status`.
pub const REQUESTS_TOTAL: &str = "baseapp_requests_total";

/// Histogram of request latency in seconds, labelled by `method`.
pub const REQUEST_DURATION_SECONDS: &str = "baseapp_request_duration_seconds";

/// Gauge of requests currently being processed.
pub const IN_FLIGHT_REQUESTS: &str = "baseapp_in_flight_requests";

/// Counter of handler panics caught by the recovery middleware.
pub const PANICS_TOTAL: &str = "baseapp_panics_total";

/// Label used for any request method outside the standard set.
pub const OTHER_METHOD: &str = "OTHER";

/// Maps a request method onto a bounded label set.
///
/// Clients choose the method, so extension methods all share
/// [`OTHER_METHOD`] instead of each creating a new series.
#[must_use]
pub fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "CONNECT" => "CONNECT",
        "OPTIONS" => "OPTIONS",
        "TRACE" => "TRACE",
        "PATCH" => "PATCH",
        _ => OTHER_METHOD,
    }
}

/// A metrics registry scoped to one server.
///
/// Clones share the same underlying recorder, so metrics recorded through a
/// clone held by the embedding application show up in the server's output.
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        Self {
            inner: Arc::new(Inner { recorder, handle }),
        }
    }

    /// Runs `f` with this registry as the thread-local recorder.
    ///
    /// Any `metrics` macro invoked inside `f` records into this registry.
    pub fn record<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(&self.inner.recorder, f)
    }

    /// Renders all metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.inner.handle.render()
    }

    /// Returns `true` if both handles refer to the same registry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Records a completed request.
    ///
    /// Updates `baseapp_requests_total` and `baseapp_request_duration_seconds`.
    /// The method label goes through [`method_label`].
    pub fn record_request(&self, method: &str, status_code: u16, duration: Duration) {
        let method = method_label(method);
        self.record(|| {
            counter!(
                REQUESTS_TOTAL,
                "method" => method,
                "status" => status_code.to_string()
            )
            .increment(1);

            histogram!(REQUEST_DURATION_SECONDS, "method" => method)
                .record(duration.as_secs_f64());
        });
    }

    /// Records a recovered handler panic.
    pub fn record_panic(&self) {
        self.record(|| counter!(PANICS_TOTAL).increment(1));
    }

    /// Increments the in-flight gauge until the returned guard is dropped.
    #[must_use]
    pub fn in_flight(&self) -> InFlightGuard {
        let gauge = self.record(|| gauge!(IN_FLIGHT_REQUESTS));
        gauge.increment(1.0);
        InFlightGuard { gauge }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("inner", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

/// Registers descriptions for the standard request metrics.
///
/// This is the work behind the server's lazy metrics initialization: it runs
/// once, right before the listener binds.
pub fn describe_standard_metrics(registry: &MetricsRegistry) {
    registry.record(|| {
        describe_counter!(REQUESTS_TOTAL, "Total number of HTTP requests processed");
        describe_histogram!(
            REQUEST_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "HTTP request duration in seconds"
        );
        describe_gauge!(
            IN_FLIGHT_REQUESTS,
            "Number of HTTP requests currently being processed"
        );
        describe_counter!(PANICS_TOTAL, "Handler panics recovered by middleware");

        // Touch the gauge so it renders before the first request arrives.
        gauge!(IN_FLIGHT_REQUESTS).set(0.0);
    });
}

/// Guard that decrements the in-flight gauge on drop.
///
/// Dropping happens on panic unwinds too, so the gauge never leaks.
pub struct InFlightGuard {
    gauge: Gauge,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.decrement(1.0);
    }
}
