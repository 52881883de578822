//! The base server.
//!
//! A [`Server`] is built once from an [`HttpConfig`] and an ordered list of
//! options, then started. Building never touches the network; starting runs
//! the one-time initializer, binds `address:port` and serves every
//! connection on its own task through the router.
//!
//! # Example
//!
//! ```no_run
//! use baseapp_server::{with_logger, with_metrics, write_json, HttpConfig, Server};
//! use baseapp_telemetry::{LogConfig, Logger};
//! use http::{Method, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let logger = Logger::from_config(&LogConfig::development())?;
//!     let server = Server::new(
//!         HttpConfig::new("0.0.0.0", 8080),
//!         vec![with_logger(logger), with_metrics()],
//!     )
//!     .map_err(|failure| failure.error)?;
//!
//!     server.router().route(Method::GET, "/ping", |_req: baseapp_server::Request| async {
//!         write_json(StatusCode::OK, &serde_json::json!({ "pong": true }))
//!     });
//!
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::instrument::WithSubscriber;

use baseapp_config::HttpConfig;
use baseapp_middleware::{default_middleware, MiddlewareChain, Response};
use baseapp_telemetry::{Logger, MetricsRegistry};

use crate::error::{BuildFailure, ServerError, ServerResult};
use crate::once::OnceInit;
use crate::option::ServerOption;
use crate::response::write_json;
use crate::router::Router;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// How long a stopping server waits for open connections to finish.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest request body the server buffers before dispatching.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Bounds of the pause after a failed `accept`.
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Doubling pause between failed accepts, reset by the next success.
#[derive(Debug, Default)]
struct AcceptBackoff {
    current: Option<Duration>,
}

impl AcceptBackoff {
    fn next_delay(&mut self) -> Duration {
        let delay = self
            .current
            .map_or(ACCEPT_BACKOFF_MIN, |d| (d * 2).min(ACCEPT_BACKOFF_MAX));
        self.current = Some(delay);
        delay
    }

    fn reset(&mut self) {
        self.current = None;
    }
}

/// Errors that concern a single pending connection, not the listener.
fn is_connection_error(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

type RegistryInit = Box<dyn FnOnce(&MetricsRegistry) + Send>;

/// A server under construction, as seen by options.
pub struct ServerBuilder {
    config: HttpConfig,
    logger: Logger,
    registry: MetricsRegistry,
    router: Router,
    middleware: Option<MiddlewareChain>,
    init: Option<RegistryInit>,
}

impl ServerBuilder {
    /// The skeleton every server starts from: no middleware, a no-op logger,
    /// a fresh router and a fresh registry.
    pub(crate) fn new(config: HttpConfig) -> Self {
        Self {
            config,
            logger: Logger::nop(),
            registry: MetricsRegistry::new(),
            router: Router::new(),
            middleware: None,
            init: None,
        }
    }

    /// Returns the configuration the server is built for.
    #[must_use]
    pub fn http_config(&self) -> &HttpConfig {
        &self.config
    }

    /// Returns the logger set so far.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Replaces the logger.
    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger;
    }

    /// Returns the metrics registry set so far.
    #[must_use]
    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    /// Replaces the metrics registry.
    pub fn set_registry(&mut self, registry: MetricsRegistry) {
        self.registry = registry;
    }

    /// Returns the router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Replaces the router.
    pub fn set_router(&mut self, router: Router) {
        self.router = router;
    }

    /// Returns the explicitly set middleware chain, if any.
    #[must_use]
    pub fn middleware(&self) -> Option<&MiddlewareChain> {
        self.middleware.as_ref()
    }

    /// Sets the middleware chain. The default stack is then not used.
    pub fn set_middleware(&mut self, chain: MiddlewareChain) {
        self.middleware = Some(chain);
    }

    /// Sets the one-time initializer, replacing any earlier one.
    ///
    /// It receives the registry the server finally ends up with.
    pub fn set_init<F>(&mut self, action: F)
    where
        F: FnOnce(&MetricsRegistry) + Send + 'static,
    {
        self.init = Some(Box::new(action));
    }

    /// Returns `true` if a one-time initializer is registered.
    #[must_use]
    pub fn has_init(&self) -> bool {
        self.init.is_some()
    }

    fn finish(self, middleware: MiddlewareChain) -> Server {
        let init = match self.init {
            Some(action) => {
                let registry = self.registry.clone();
                OnceInit::new(move || action(&registry))
            }
            None => OnceInit::empty(),
        };

        Server {
            config: self.config,
            router: self.router,
            logger: self.logger,
            registry: self.registry,
            middleware,
            init,
            started: AtomicBool::new(false),
        }
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("logger", &self.logger)
            .field("middleware", &self.middleware)
            .field("has_init", &self.has_init())
            .finish_non_exhaustive()
    }
}

/// A configured HTTP server.
pub struct Server {
    config: HttpConfig,
    router: Router,
    logger: Logger,
    registry: MetricsRegistry,
    middleware: MiddlewareChain,
    init: OnceInit,
    started: AtomicBool,
}

impl Server {
    /// Builds a server from `config` and `options`.
    ///
    /// Options run in order. The first failing option stops construction:
    /// later options are not applied and the failure carries the partial
    /// server. When no option set a middleware chain, the
    /// [`default_middleware`] stack is used. The resolved chain is applied to
    /// the router in order, first entry outermost.
    pub fn new(config: HttpConfig, options: Vec<Box<dyn ServerOption>>) -> Result<Self, BuildFailure> {
        let mut builder = ServerBuilder::new(config);

        for option in &options {
            if let Err(error) = option.apply(&mut builder) {
                let configured = builder.middleware.take().unwrap_or_default();
                return Err(BuildFailure {
                    error,
                    partial: Box::new(builder.finish(configured)),
                });
            }
        }

        let chain = match builder.middleware.take() {
            Some(chain) => chain,
            None => default_middleware(&builder.logger, &builder.registry),
        };

        for middleware in chain.iter() {
            builder.router.use_shared(Arc::clone(middleware));
        }

        Ok(builder.finish(chain))
    }

    /// Returns the configuration the server was built with.
    #[must_use]
    pub fn http_config(&self) -> &HttpConfig {
        &self.config
    }

    /// Returns the router. Clones share routes with the server.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Returns the server's logger.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Returns the server's metrics registry. Clones share its metrics.
    #[must_use]
    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    /// Returns the resolved middleware chain, outermost first.
    ///
    /// On a partial server from a [`BuildFailure`] this is whatever options
    /// had set, and nothing has been applied to the router.
    #[must_use]
    pub fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    /// Returns `true` while `start` holds the listener.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Runs the one-time initializer, binds and serves until the listener fails.
    ///
    /// A second call returns [`ServerError::AlreadyStarted`].
    pub async fn start(&self) -> ServerResult<()> {
        // Never triggered, but keeps connection tasks on the same code path.
        self.serve(ShutdownSignal::new()).await
    }

    /// Like [`start`](Self::start), but returns once `shutdown` triggers and
    /// open connections have drained.
    pub async fn start_with_shutdown(&self, shutdown: ShutdownSignal) -> ServerResult<()> {
        self.serve(shutdown).await
    }

    async fn serve(&self, shutdown: ShutdownSignal) -> ServerResult<()> {
        self.init.run();

        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyStarted);
        }

        let addr = self.config.bind_addr();
        self.logger
            .in_scope(|| tracing::info!(address = %addr, "Server listening on {}", addr));

        let listener = match TcpListener::bind(addr.as_str()).await {
            Ok(listener) => listener,
            Err(source) => {
                self.started.store(false, Ordering::SeqCst);
                return Err(ServerError::Bind { addr, source });
            }
        };

        let tracker = ConnectionTracker::new();
        let mut backoff = AcceptBackoff::default();

        loop {
            let accepted = tokio::select! {
                result = listener.accept() => result,
                () = shutdown.recv() => break,
            };

            match accepted {
                Ok((stream, remote)) => {
                    backoff.reset();
                    self.spawn_connection(stream, remote, &tracker, &shutdown);
                }
                Err(e) if is_connection_error(&e) => {
                    self.logger
                        .in_scope(|| tracing::debug!(error = %e, "connection dropped before accept"));
                }
                Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
                    // The socket is no longer listening.
                    self.started.store(false, Ordering::SeqCst);
                    return Err(ServerError::Io(e));
                }
                Err(e) => {
                    // Errors like EMFILE repeat until a descriptor frees up.
                    let delay = backoff.next_delay();
                    self.logger.in_scope(|| {
                        tracing::error!(
                            error = %e,
                            retry_in_ms = delay.as_millis(),
                            "failed to accept connection"
                        );
                    });
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = shutdown.recv() => break,
                    }
                }
            }
        }

        drop(listener);
        self.logger.in_scope(|| {
            tracing::info!(
                connections = tracker.active_connections(),
                "shutdown signal received, draining connections"
            );
        });

        if tokio::time::timeout(DRAIN_TIMEOUT, tracker.wait_idle())
            .await
            .is_err()
        {
            self.logger.in_scope(|| {
                tracing::warn!(
                    connections = tracker.active_connections(),
                    "drain timeout reached, dropping connections"
                );
            });
        }

        self.logger.in_scope(|| tracing::info!("Server stopped"));
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        remote: SocketAddr,
        tracker: &ConnectionTracker,
        shutdown: &ShutdownSignal,
    ) {
        let router = self.router.clone();
        let shutdown = shutdown.clone();
        let token = tracker.acquire();

        let task = async move {
            if let Err(e) = serve_connection(stream, router, shutdown).await {
                tracing::debug!(remote = %remote, error = %e, "connection closed with error");
            }
            drop(token);
        };

        tokio::spawn(task.with_subscriber(self.logger.dispatch().clone()));
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("router", &self.router)
            .field("logger", &self.logger)
            .field("registry", &self.registry)
            .field("middleware", &self.middleware)
            .field("init", &self.init)
            .field("started", &self.is_started())
            .finish()
    }
}

async fn serve_connection(
    stream: TcpStream,
    router: Router,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let service = service_fn(move |request: http::Request<Incoming>| {
        let router = router.clone();
        async move { Ok::<_, Infallible>(handle_request(&router, request).await) }
    });

    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => return result,
        () = shutdown.recv() => conn.as_mut().graceful_shutdown(),
    }

    // Let the in-flight request finish before closing.
    conn.await
}

async fn handle_request<B>(router: &Router, request: http::Request<B>) -> Response
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = request.into_parts();

    match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => {
            let request = http::Request::from_parts(parts, Full::new(collected.to_bytes()));
            router.dispatch(request).await
        }
        Err(e) if e.is::<LengthLimitError>() => write_json(
            http::StatusCode::PAYLOAD_TOO_LARGE,
            &serde_json::json!({ "error": "request body too large", "limit": MAX_BODY_BYTES }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            write_json(
                http::StatusCode::BAD_REQUEST,
                &serde_json::json!({ "error": "failed to read request body" }),
            )
        }
    }
}
