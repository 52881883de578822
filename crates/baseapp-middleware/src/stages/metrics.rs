//! Per-request metrics.
//!
//! Counts requests by method and status, observes their duration, and tracks
//! how many are in flight. Everything is recorded into the server's own
//! [`MetricsRegistry`].

use std::time::Instant;

use baseapp_telemetry::MetricsRegistry;

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, Response},
};

/// Records request metrics into a registry.
#[derive(Debug, Clone)]
pub struct MetricsMiddleware {
    registry: MetricsRegistry,
}

impl MetricsMiddleware {
    /// Creates the middleware recording into `registry`.
    #[must_use]
    pub fn new(registry: MetricsRegistry) -> Self {
        Self { registry }
    }
}

impl Middleware for MetricsMiddleware {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        let method = request.method().clone();

        Box::pin(async move {
            let _in_flight = self.registry.in_flight();
            let started = Instant::now();

            let response = next.run(ctx, request).await;

            self.registry.record_request(
                method.as_str(),
                response.status().as_u16(),
                started.elapsed(),
            );
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baseapp_telemetry::metrics::REQUESTS_TOTAL;
    use bytes::Bytes;
    use http::{Method, Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;

    #[tokio::test]
    async fn test_counts_by_method_and_status() {
        let registry = MetricsRegistry::new();
        let middleware = MetricsMiddleware::new(registry.clone());

        for _ in 0..2 {
            let mut ctx = MiddlewareContext::new();
            let request = HttpRequest::builder()
                .method(Method::POST)
                .uri("/items")
                .body(Full::new(Bytes::new()))
                .unwrap();
            let next = Next::handler(|_ctx, _req| {
                Box::pin(async {
                    HttpResponse::builder()
                        .status(StatusCode::CREATED)
                        .body(Full::new(Bytes::new()))
                        .unwrap()
                })
            });
            let _ = middleware.process(&mut ctx, request, next).await;
        }

        let rendered = registry.render();
        let line = rendered
            .lines()
            .find(|l| l.starts_with(REQUESTS_TOTAL) && l.contains("method=\"POST\""))
            .unwrap();
        assert!(line.contains("status=\"201\""));
        assert!(line.ends_with(" 2"));
    }

    #[tokio::test]
    async fn test_extension_methods_do_not_grow_series() {
        let registry = MetricsRegistry::new();
        let middleware = MetricsMiddleware::new(registry.clone());

        for i in 0..50 {
            let mut ctx = MiddlewareContext::new();
            let request = HttpRequest::builder()
                .method(Method::from_bytes(format!("X{i}").as_bytes()).unwrap())
                .uri("/")
                .body(Full::new(Bytes::new()))
                .unwrap();
            let next = Next::handler(|_ctx, _req| {
                Box::pin(async { HttpResponse::new(Full::new(Bytes::new())) })
            });
            let _ = middleware.process(&mut ctx, request, next).await;
        }

        let rendered = registry.render();
        let series: Vec<_> = rendered
            .lines()
            .filter(|l| l.starts_with(REQUESTS_TOTAL))
            .collect();
        assert_eq!(series.len(), 1);
        assert!(series[0].contains("method=\"OTHER\""));
    }

    #[tokio::test]
    async fn test_registries_stay_isolated() {
        let used = MetricsRegistry::new();
        let untouched = MetricsRegistry::new();
        let middleware = MetricsMiddleware::new(used.clone());

        let mut ctx = MiddlewareContext::new();
        let request = HttpRequest::builder()
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { HttpResponse::new(Full::new(Bytes::new())) })
        });
        let _ = middleware.process(&mut ctx, request, next).await;

        assert!(used.render().contains(REQUESTS_TOTAL));
        assert!(!untouched.render().contains(REQUESTS_TOTAL));
    }
}
