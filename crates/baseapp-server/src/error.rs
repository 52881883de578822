//! Error types for server construction and startup.

use std::fmt;
use std::io;

use baseapp_config::ConfigError;
use baseapp_telemetry::TelemetryError;
use thiserror::Error;

use crate::server::Server;

/// Result alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Error returned by a [`ServerOption`](crate::ServerOption).
#[derive(Debug, Error)]
pub enum OptionError {
    /// The option was given a value it cannot use.
    #[error("invalid option '{option}': {reason}")]
    Invalid {
        /// Name of the option.
        option: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Loading configuration failed while applying the option.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Building a logger failed while applying the option.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// Any other failure raised by a custom option.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl OptionError {
    /// Creates an invalid-option error.
    pub fn invalid(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Wraps an arbitrary error.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(error))
    }
}

/// Construction stopped at a failing option.
///
/// `partial` is the server as it stood when the option failed: every earlier
/// option is applied, no middleware has been resolved or applied yet.
#[derive(Error)]
#[error("server construction failed: {error}")]
pub struct BuildFailure {
    /// The failing option's own error.
    #[source]
    pub error: OptionError,

    /// The partially constructed server.
    pub partial: Box<Server>,
}

impl BuildFailure {
    /// Splits the failure into its error and partial server.
    pub fn into_parts(self) -> (OptionError, Server) {
        (self.error, *self.partial)
    }
}

impl fmt::Debug for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildFailure")
            .field("error", &self.error)
            .field("partial", &self.partial)
            .finish()
    }
}

/// Errors returned by [`Server::start`].
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not bind its address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The `address:port` target.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// `start` was already called on this server.
    #[error("server already started")]
    AlreadyStarted,

    /// I/O error while serving.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
