//! Panic recovery.
//!
//! A panic anywhere further in the chain is caught here and turned into a
//! `500 {"error": "internal server error"}` response. The panic is logged
//! and counted; the connection keeps serving.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use baseapp_telemetry::MetricsRegistry;
use futures_util::FutureExt;
use http::StatusCode;

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, Response, ResponseExt},
};

/// Converts downstream panics into 500 responses.
#[derive(Debug, Clone)]
pub struct RecoveryMiddleware {
    registry: MetricsRegistry,
}

impl RecoveryMiddleware {
    /// Creates the middleware counting panics into `registry`.
    #[must_use]
    pub fn new(registry: MetricsRegistry) -> Self {
        Self { registry }
    }
}

impl Middleware for RecoveryMiddleware {
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        let request_id = ctx.request_id().map(str::to_string);
        let path = request.uri().path().to_string();

        Box::pin(async move {
            match AssertUnwindSafe(next.run(ctx, request)).catch_unwind().await {
                Ok(response) => response,
                Err(payload) => {
                    tracing::error!(
                        request_id = request_id.as_deref().unwrap_or("-"),
                        path = %path,
                        panic = %panic_message(payload.as_ref()),
                        "handler panicked"
                    );
                    self.registry.record_panic();
                    Response::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
                }
            }
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
