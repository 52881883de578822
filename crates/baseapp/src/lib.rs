//! # Baseapp
//!
//! A reusable base server for HTTP services. Application servers embed a
//! [`Server`](server::Server) and get:
//!
//! - Construction from an [`HttpConfig`](config::HttpConfig) and ordered,
//!   fallible options
//! - A middleware chain applied outermost first, with a default stack of
//!   request logging, request IDs, metrics, access logs and panic recovery
//! - Lazy metrics initialization that runs once, right before the first bind
//! - JSON responses that degrade to a `500` error body instead of failing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use baseapp::prelude::*;
//! use http::{Method, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("service.toml")?
//!         .with_env_prefix("SERVICE")
//!         .load()?;
//!
//!     let logger = Logger::from_config(&config.logging.to_log_config())?;
//!     let server = Server::new(config.server, vec![with_logger(logger), with_metrics()])
//!         .map_err(|failure| failure.error)?;
//!
//!     server.router().route(Method::GET, "/ping", |_req: Request| async {
//!         write_json(StatusCode::OK, &serde_json::json!({ "pong": true }))
//!     });
//!
//!     server.start_with_shutdown(ShutdownSignal::with_os_signals()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Default middleware
//!
//! ```text
//! Request → RequestLogger → RequestId → Metrics → AccessLog → Recovery → Handler
//!                                                                          ↓
//! Response ←───────────────────────────────────────────────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/baseapp/0.1.0")]

// Re-export configuration types
pub use baseapp_config as config;

// Re-export telemetry types
pub use baseapp_telemetry as telemetry;

// Re-export middleware types
pub use baseapp_middleware as middleware;

// Re-export server types
pub use baseapp_server as server;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use baseapp::prelude::*;
///
/// let server = Server::new(HttpConfig::new("127.0.0.1", 8080), Vec::new()).unwrap();
/// assert_eq!(server.http_config().bind_addr(), "127.0.0.1:8080");
/// ```
pub mod prelude {
    pub use baseapp_config::{AppConfig, ConfigError, ConfigLoader, HttpConfig};

    pub use baseapp_telemetry::{init_logging, LogConfig, Logger, MetricsRegistry};

    pub use baseapp_middleware::{
        default_middleware, BoxFuture, FnMiddleware, Middleware, MiddlewareChain,
        MiddlewareContext, Next, Request, Response,
    };

    pub use baseapp_server::{
        option_fn, with_init, with_logger, with_metrics, with_middleware, with_registry,
        write_json, BuildFailure, JsonWriter, OptionError, PathParams, Router, Server,
        ServerError, ServerOption, ShutdownSignal,
    };
}
