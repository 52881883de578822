//! Request routing.
//!
//! The [`Router`] maps a method and a path template (`/users/{id}`) to a
//! [`RouteHandler`], and runs every request through its middleware chain
//! before the handler. It is a shared handle: clones see the same routes and
//! middleware, so routes registered on [`Server::router`](crate::Server::router)
//! after construction are served by the running server.
//!
//! # Example
//!
//! ```
//! use baseapp_server::{write_json, PathParams, Router};
//! use http::{Method, StatusCode};
//!
//! let router = Router::new();
//! router.route(Method::GET, "/users/{id}", |req: baseapp_server::Request| async move {
//!     let id = req
//!         .extensions()
//!         .get::<PathParams>()
//!         .and_then(|p| p.get("id"))
//!         .unwrap_or_default()
//!         .to_string();
//!     write_json(StatusCode::OK, &serde_json::json!({ "id": id }))
//! });
//!
//! assert_eq!(router.route_count(), 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::header::{HeaderValue, ALLOW};
use http::{Method, StatusCode};
use parking_lot::RwLock;
use serde_json::json;

use baseapp_middleware::{
    BoxFuture, BoxedMiddleware, Middleware, MiddlewareChain, MiddlewareContext, Request, Response,
};

use crate::response::write_json;

/// Handles requests that matched a route.
///
/// Implemented for every `Fn(Request) -> impl Future<Output = Response>`.
pub trait RouteHandler: Send + Sync + 'static {
    /// Produces the response for `request`.
    fn call(&self, request: Request) -> BoxFuture<'static, Response>;
}

impl<F, Fut> RouteHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        Box::pin(self(request))
    }
}

/// Path parameters captured by a matched route.
///
/// Inserted into the request extensions before the handler runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    /// Returns the value captured for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns the number of captured parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(name, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    // Parameter names do not distinguish routes.
    fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Param(_), Self::Param(_)) => true,
            _ => false,
        }
    }
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(s.to_string()),
        })
        .collect()
}

struct Route {
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    handler: Arc<dyn RouteHandler>,
}

impl Route {
    fn same_shape(&self, method: &Method, segments: &[Segment]) -> bool {
        self.method == *method
            && self.segments.len() == segments.len()
            && self.segments.iter().zip(segments).all(|(a, b)| a.same_shape(b))
    }

    fn capture(&self, path: &[&str]) -> Option<PathParams> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, actual) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(expected) if expected == actual => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), (*actual).to_string());
                }
            }
        }
        Some(PathParams(params))
    }
}

enum Lookup {
    Found(Arc<dyn RouteHandler>, PathParams),
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

#[derive(Default)]
struct RouterInner {
    routes: Vec<Route>,
    middleware: MiddlewareChain,
}

/// Shared request router with its middleware chain.
#[derive(Clone, Default)]
pub struct Router {
    inner: Arc<RwLock<RouterInner>>,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware as the new innermost wrapper.
    pub fn use_middleware<M: Middleware>(&self, middleware: M) {
        self.inner.write().middleware.push(middleware);
    }

    /// Appends an already shared middleware as the new innermost wrapper.
    pub fn use_shared(&self, middleware: BoxedMiddleware) {
        self.inner.write().middleware.push_boxed(middleware);
    }

    /// Returns a snapshot of the applied middleware, outermost first.
    #[must_use]
    pub fn middleware(&self) -> MiddlewareChain {
        self.inner.read().middleware.clone()
    }

    /// Registers `handler` for `method` on `pattern`.
    ///
    /// `{name}` segments capture into [`PathParams`]. Registering the same
    /// method and pattern again replaces the earlier handler; patterns that
    /// differ only in parameter names count as the same.
    pub fn route<H: RouteHandler>(&self, method: Method, pattern: &str, handler: H) {
        let route = Route {
            method,
            pattern: pattern.to_string(),
            segments: parse_pattern(pattern),
            handler: Arc::new(handler),
        };

        let mut inner = self.inner.write();
        if let Some(existing) = inner
            .routes
            .iter_mut()
            .find(|r| r.same_shape(&route.method, &route.segments))
        {
            *existing = route;
        } else {
            inner.routes.push(route);
        }
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.inner.read().routes.len()
    }

    /// Returns `(method, pattern)` for every route, in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.inner
            .read()
            .routes
            .iter()
            .map(|r| (r.method.clone(), r.pattern.clone()))
            .collect()
    }

    /// Returns `true` if both handles share the same routes.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs `request` through the middleware chain and the matching handler.
    ///
    /// Unknown paths answer `404`, known paths with another method `405`;
    /// both pass through the middleware like any other response.
    pub async fn dispatch(&self, request: Request) -> Response {
        let chain = self.middleware();
        let router = self.clone();
        let mut ctx = MiddlewareContext::new();

        chain
            .process(&mut ctx, request, move |_ctx, request| router.handle(request))
            .await
    }

    fn handle(&self, mut request: Request) -> BoxFuture<'static, Response> {
        let path = request.uri().path().to_string();

        match self.lookup(request.method(), &path) {
            Lookup::Found(handler, params) => {
                request.extensions_mut().insert(params);
                handler.call(request)
            }
            Lookup::MethodNotAllowed(allowed) => {
                let mut response = write_json(
                    StatusCode::METHOD_NOT_ALLOWED,
                    &json!({ "error": "method not allowed", "path": path }),
                );
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(ALLOW, value);
                }
                Box::pin(std::future::ready(response))
            }
            Lookup::NotFound => Box::pin(std::future::ready(write_json(
                StatusCode::NOT_FOUND,
                &json!({ "error": "not found", "path": path }),
            ))),
        }
    }

    // First registered match wins.
    fn lookup(&self, method: &Method, path: &str) -> Lookup {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let inner = self.inner.read();

        let mut allowed = Vec::new();
        for route in &inner.routes {
            if let Some(params) = route.capture(&segments) {
                if route.method == *method {
                    return Lookup::Found(Arc::clone(&route.handler), params);
                }
                if !allowed.contains(&route.method) {
                    allowed.push(route.method.clone());
                }
            }
        }

        if allowed.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::MethodNotAllowed(allowed)
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Router")
            .field(
                "routes",
                &inner
                    .routes
                    .iter()
                    .map(|r| format!("{} {}", r.method, r.pattern))
                    .collect::<Vec<_>>(),
            )
            .field("middleware", &inner.middleware)
            .finish()
    }
}
