//! Construction options.
//!
//! A [`ServerOption`] mutates a [`ServerBuilder`] and may fail. Options are
//! applied in the order given and the first failure stops construction.
//! Closures of the right shape are options too:
//!
//! ```
//! use baseapp_server::{option_fn, with_metrics, HttpConfig, OptionError, Server};
//!
//! let reject_port_zero = option_fn(|builder| {
//!     if builder.http_config().port == 0 {
//!         return Err(OptionError::invalid("port", "must not be 0"));
//!     }
//!     Ok(())
//! });
//!
//! let server = Server::new(HttpConfig::new("127.0.0.1", 8080), vec![reject_port_zero, with_metrics()])
//!     .map_err(|failure| failure.error)
//!     .unwrap();
//! assert_eq!(server.middleware().len(), 5);
//! ```

use parking_lot::Mutex;

use baseapp_middleware::MiddlewareChain;
use baseapp_telemetry::{describe_standard_metrics, Logger, MetricsRegistry};

use crate::error::OptionError;
use crate::server::ServerBuilder;

/// A deferred, possibly failing change to a server under construction.
pub trait ServerOption: Send + Sync {
    /// Applies the option.
    fn apply(&self, builder: &mut ServerBuilder) -> Result<(), OptionError>;
}

impl<F> ServerOption for F
where
    F: Fn(&mut ServerBuilder) -> Result<(), OptionError> + Send + Sync,
{
    fn apply(&self, builder: &mut ServerBuilder) -> Result<(), OptionError> {
        self(builder)
    }
}

/// Boxes a closure as an option.
pub fn option_fn<F>(f: F) -> Box<dyn ServerOption>
where
    F: Fn(&mut ServerBuilder) -> Result<(), OptionError> + Send + Sync + 'static,
{
    Box::new(f)
}

/// Sets the server's logger. The default discards everything.
pub fn with_logger(logger: Logger) -> Box<dyn ServerOption> {
    option_fn(move |builder| {
        builder.set_logger(logger.clone());
        Ok(())
    })
}

/// Sets the metrics registry the server and its default middleware record into.
pub fn with_registry(registry: MetricsRegistry) -> Box<dyn ServerOption> {
    option_fn(move |builder| {
        builder.set_registry(registry.clone());
        Ok(())
    })
}

/// Sets the middleware chain, replacing the default stack.
///
/// An empty chain counts as set: the server then runs without middleware.
pub fn with_middleware(chain: MiddlewareChain) -> Box<dyn ServerOption> {
    option_fn(move |builder| {
        builder.set_middleware(chain.clone());
        Ok(())
    })
}

/// Describes the standard request metrics the first time the server starts.
///
/// The descriptions go to whatever registry the server ends up with, so this
/// may come before or after [`with_registry`].
pub fn with_metrics() -> Box<dyn ServerOption> {
    option_fn(|builder| {
        builder.set_init(describe_standard_metrics);
        Ok(())
    })
}

/// Registers an action that runs once, before the first bind.
///
/// Replaces any earlier initializer, including the one set by
/// [`with_metrics`]. The option itself can only be applied once.
pub fn with_init<F>(action: F) -> Box<dyn ServerOption>
where
    F: FnOnce() + Send + 'static,
{
    Box::new(InitOption {
        action: Mutex::new(Some(Box::new(action))),
    })
}

struct InitOption {
    action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ServerOption for InitOption {
    fn apply(&self, builder: &mut ServerBuilder) -> Result<(), OptionError> {
        let action = self
            .action
            .lock()
            .take()
            .ok_or_else(|| OptionError::invalid("with_init", "already applied"))?;

        builder.set_init(move |_registry: &MetricsRegistry| action());
        Ok(())
    }
}
