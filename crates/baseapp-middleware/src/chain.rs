//! Ordered middleware chain.
//!
//! A [`MiddlewareChain`] is an ordered list of middleware. The first entry is
//! the outermost wrapper: with `[A, B, C]`, a request passes through A, then
//! B, then C, then the handler, and the response flows back C, B, A.
//! Duplicates are allowed and order is never changed.

use std::fmt;
use std::sync::Arc;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

/// A type-erased middleware that can be stored in a chain.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An ordered sequence of middleware.
///
/// # Example
///
/// ```
/// use baseapp_middleware::stages::RequestIdMiddleware;
/// use baseapp_middleware::MiddlewareChain;
///
/// let chain = MiddlewareChain::new().with(RequestIdMiddleware::new());
/// assert_eq!(chain.names(), vec!["request_id"]);
/// ```
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    stages: Vec<BoxedMiddleware>,
}

impl MiddlewareChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware, builder style.
    #[must_use]
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.push(middleware);
        self
    }

    /// Appends a middleware as the new innermost entry.
    pub fn push<M: Middleware>(&mut self, middleware: M) {
        self.stages.push(Arc::new(middleware));
    }

    /// Appends an already shared middleware.
    pub fn push_boxed(&mut self, middleware: BoxedMiddleware) {
        self.stages.push(middleware);
    }

    /// Returns the middleware names, outermost first.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|m| m.name()).collect()
    }

    /// Returns the number of middleware in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if the chain has no middleware.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Iterates the middleware, outermost first.
    pub fn iter(&self) -> impl Iterator<Item = &BoxedMiddleware> {
        self.stages.iter()
    }

    /// Runs `request` through every middleware and then `handler`.
    pub async fn process<H>(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
        handler: H,
    ) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        let next = self.build_chain(handler);
        next.run(ctx, request).await
    }

    // Wraps from the innermost entry outwards so the first entry ends up outermost.
    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::handler(handler);

        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }

        next
    }
}

impl FromIterator<BoxedMiddleware> for MiddlewareChain {
    fn from_iter<I: IntoIterator<Item = BoxedMiddleware>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
