//! Middleware that make up the default stack.
//!
//! See [`default_middleware`](crate::default_middleware) for the order they
//! are assembled in.

mod access_log;
mod metrics;
mod recovery;
mod request_id;
mod request_logger;

pub use access_log::AccessLogMiddleware;
pub use metrics::MetricsMiddleware;
pub use recovery::RecoveryMiddleware;
pub use request_id::{RequestId, RequestIdMiddleware, REQUEST_ID_HEADER};
pub use request_logger::RequestLoggerMiddleware;
