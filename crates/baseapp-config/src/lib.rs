//! Typed configuration for baseapp services.
//!
//! The server itself only needs an [`HttpConfig`] (address and port). This
//! crate also provides [`AppConfig`], a loadable root that pairs the binding
//! with logging settings, and a [`ConfigLoader`] that layers
//! defaults → file (TOML or JSON) → environment variables.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! address = "0.0.0.0"
//! port = 8080
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! With prefix `SERVICE`:
//!
//! - `SERVICE__SERVER__ADDRESS=127.0.0.1`
//! - `SERVICE__SERVER__PORT=9000`
//! - `SERVICE__LOGGING__LEVEL=debug`

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{
    AppConfig, HttpConfig, LogFormat, LoggingConfig, DEFAULT_ADDRESS, DEFAULT_PORT,
};
pub use error::ConfigError;
pub use loader::ConfigLoader;
