//! # Baseapp Middleware
//!
//! Ordered middleware chains for baseapp servers.
//!
//! A [`MiddlewareChain`] is applied outermost first: the first middleware
//! sees the request first and the response last. Unlike a fixed pipeline,
//! the chain is whatever the server was configured with; when nothing was
//! configured, [`default_middleware`] supplies the standard stack:
//!
//! ```text
//! Request → RequestLogger → RequestId → Metrics → AccessLog → Recovery → Handler
//!                                                                          ↓
//! Response ←───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use baseapp_middleware::default_middleware;
//! use baseapp_telemetry::{Logger, MetricsRegistry};
//!
//! let chain = default_middleware(&Logger::nop(), &MetricsRegistry::new());
//! assert_eq!(chain.names()[0], "request_logger");
//! assert_eq!(chain.len(), 5);
//! ```

#![doc(html_root_url = "https://docs.rs/baseapp-middleware/0.1.0")]

pub mod chain;
pub mod context;
mod defaults;
pub mod middleware;
pub mod stages;
pub mod types;

pub use chain::{BoxedMiddleware, MiddlewareChain};
pub use context::MiddlewareContext;
pub use defaults::default_middleware;
pub use middleware::{BoxFuture, FnMiddleware, Middleware, Next};
pub use types::{Request, Response, ResponseExt};
