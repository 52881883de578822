//! Request ID assignment.
//!
//! Every request gets an ID: a fresh UUID v7 by default, or the caller's
//! `X-Request-Id` when the middleware is configured to trust it. The ID is
//! stored in the [`MiddlewareContext`], attached to the request as a
//! [`RequestId`] extension for handlers, and echoed on the response.

use http::HeaderValue;
use uuid::Uuid;

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, Response},
};

/// Header carrying the request ID in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest incoming ID accepted when incoming IDs are trusted.
const MAX_INCOMING_LEN: usize = 128;

/// Request ID attached to the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Assigns a request ID to every request.
#[derive(Debug, Clone, Default)]
pub struct RequestIdMiddleware {
    trust_incoming: bool,
}

impl RequestIdMiddleware {
    /// Creates the middleware; incoming IDs are ignored.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the middleware reusing a well-formed incoming `X-Request-Id`.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    fn incoming_id(&self, request: &Request) -> Option<String> {
        if !self.trust_incoming {
            return None;
        }

        let value = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
        if value.is_empty() || value.len() > MAX_INCOMING_LEN {
            return None;
        }
        Some(value.to_string())
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        let request_id = self
            .incoming_id(&request)
            .unwrap_or_else(|| Uuid::now_v7().to_string());

        ctx.set_request_id(request_id.clone());
        request.extensions_mut().insert(RequestId(request_id.clone()));

        Box::pin(async move {
            let mut response = next.run(ctx, request).await;
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            response
        })
    }
}
