//! Binds the server's logger to each request.
//!
//! Everything downstream (other middleware, route handlers) is polled with
//! the server's [`Logger`] as its default subscriber, so plain `tracing`
//! macros in handler code reach the injected logger.

use baseapp_telemetry::Logger;
use tracing::instrument::WithSubscriber;

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, Response},
};

/// Scopes the rest of the chain to a logger.
#[derive(Debug, Clone)]
pub struct RequestLoggerMiddleware {
    logger: Logger,
}

impl RequestLoggerMiddleware {
    /// Creates the middleware for `logger`.
    #[must_use]
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl Middleware for RequestLoggerMiddleware {
    fn name(&self) -> &'static str {
        "request_logger"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        let dispatch = self.logger.dispatch().clone();
        Box::pin(next.run(ctx, request).with_subscriber(dispatch))
    }
}
