//! Per-request middleware context.
//!
//! The [`MiddlewareContext`] travels alongside the request through the chain.
//! Middleware uses it to share the request ID and the request start time
//! with middleware further in. Handlers read per-request data from the
//! `http::Request` extensions instead.

use std::time::{Duration, Instant};

/// Context that flows through the middleware chain.
///
/// # Example
///
/// ```
/// use baseapp_middleware::MiddlewareContext;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_request_id("01890f3e-0000-7000-8000-000000000000".to_string());
/// assert_eq!(ctx.request_id(), Some("01890f3e-0000-7000-8000-000000000000"));
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: Option<String>,
    started_at: Instant,
}

impl MiddlewareContext {
    /// Creates a new context; the clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: None,
            started_at: Instant::now(),
        }
    }

    /// Returns the request ID, once the request-id middleware assigned one.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Sets the request ID.
    pub fn set_request_id(&mut self, request_id: String) {
        self.request_id = Some(request_id);
    }

    /// Returns when the request started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
