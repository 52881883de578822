//! # Baseapp Server
//!
//! A configurable base HTTP server meant to be embedded by application
//! servers.
//!
//! - Construction from an [`HttpConfig`] plus ordered, fallible options
//! - A middleware chain applied outermost first, defaulting to
//!   [`default_middleware`](baseapp_middleware::default_middleware)
//! - A one-time initializer that runs before the first bind
//! - [`write_json`] responses that degrade to a `500` JSON error instead of
//!   failing
//! - Optional graceful shutdown
//!
//! ## Example
//!
//! ```no_run
//! use baseapp_server::{with_metrics, HttpConfig, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new(HttpConfig::new("0.0.0.0", 8080), vec![with_metrics()])
//!         .map_err(|failure| failure.error)?;
//!
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/baseapp-server/0.1.0")]

pub mod error;
pub mod once;
pub mod option;
pub mod response;
pub mod router;
pub mod server;
pub mod shutdown;

pub use baseapp_config::HttpConfig;
pub use baseapp_middleware::{Request, Response};
pub use error::{BuildFailure, OptionError, ServerError, ServerResult};
pub use once::OnceInit;
pub use option::{
    option_fn, with_init, with_logger, with_metrics, with_middleware, with_registry, ServerOption,
};
pub use response::{write_json, JsonWriter, APPLICATION_JSON};
pub use router::{PathParams, RouteHandler, Router};
pub use server::{Server, ServerBuilder, MAX_BODY_BYTES};
pub use shutdown::ShutdownSignal;
