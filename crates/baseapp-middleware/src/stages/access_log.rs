//! One structured log line per completed request.

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, Response},
};

/// Emits an access log event after the response is produced.
///
/// Events go to whatever subscriber is current, which inside the default
/// stack is the server's logger.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLogMiddleware;

impl AccessLogMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for AccessLogMiddleware {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        Box::pin(async move {
            let response = next.run(ctx, request).await;

            tracing::info!(
                request_id = ctx.request_id().unwrap_or("-"),
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                elapsed_ms = ctx.elapsed().as_secs_f64() * 1000.0,
                "request completed"
            );

            response
        })
    }
}
