//! End-to-end tests that start a real server and talk to it over TCP.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use baseapp_middleware::{BoxFuture, Middleware, MiddlewareChain, MiddlewareContext, Next};
use baseapp_server::{
    with_init, with_logger, with_metrics, with_middleware, write_json, HttpConfig, PathParams,
    Request, Response, Server, ServerError, ShutdownSignal,
};
use baseapp_telemetry::Logger;
use http::{HeaderValue, Method, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

struct RawResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl RawResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn wait_until_listening(addr: &str) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server at {addr} never started listening");
}

async fn send(addr: &str, method: &str, path: &str, headers: &[(&str, &str)]) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let mut request = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (name, value) in headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let mut lines = head.lines();
    let status = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap()
        .parse()
        .unwrap();
    let headers = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    RawResponse {
        status,
        headers,
        body: body.to_string(),
    }
}

/// Starts `server` in the background and waits until it accepts connections.
async fn spawn(server: Arc<Server>, shutdown: ShutdownSignal) -> (String, JoinHandle<Result<(), ServerError>>) {
    let addr = server.http_config().bind_addr();
    let handle = tokio::spawn(async move { server.start_with_shutdown(shutdown).await });
    wait_until_listening(&addr).await;
    (addr, handle)
}

fn local_config() -> HttpConfig {
    HttpConfig::new("127.0.0.1", free_port())
}

#[tokio::test]
async fn serves_json_through_default_stack() {
    let server = Arc::new(Server::new(local_config(), vec![with_metrics()]).unwrap());
    server.router().route(Method::GET, "/users/{id}", |req: Request| async move {
        let id = req
            .extensions()
            .get::<PathParams>()
            .and_then(|p| p.get("id"))
            .unwrap_or_default()
            .to_string();
        write_json(StatusCode::OK, &serde_json::json!({ "id": id }))
    });

    let shutdown = ShutdownSignal::new();
    let (addr, handle) = spawn(Arc::clone(&server), shutdown.clone()).await;

    let response = send(&addr, "GET", "/users/42", &[]).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert!(response.header("x-request-id").is_some());
    assert_eq!(response.json()["id"], "42");

    let response = send(&addr, "GET", "/nope", &[("x-request-id", "trace-me")]).await;
    assert_eq!(response.status, 404);
    assert_eq!(response.header("x-request-id"), Some("trace-me"));
    assert_eq!(response.json()["error"], "not found");

    shutdown.trigger();
    handle.await.unwrap().unwrap();

    let metrics = server.registry().render();
    assert!(metrics.contains("# HELP baseapp_requests_total"));
    assert!(metrics.contains("status=\"200\""));
    assert!(metrics.contains("status=\"404\""));
}

/// Appends its name to `x-exit` on the way out.
struct Tag(&'static str);

impl Middleware for Tag {
    fn name(&self) -> &'static str {
        self.0
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let mut response = next.run(ctx, request).await;
            response
                .headers_mut()
                .append("x-exit", HeaderValue::from_static(self.0));
            response
        })
    }
}

#[tokio::test]
async fn explicit_chain_wraps_outermost_first() {
    let chain = MiddlewareChain::new().with(Tag("A")).with(Tag("B")).with(Tag("C"));
    let server = Arc::new(Server::new(local_config(), vec![with_middleware(chain)]).unwrap());
    server.router().route(Method::GET, "/", |_req: Request| async {
        write_json(StatusCode::OK, &"ok")
    });

    let shutdown = ShutdownSignal::new();
    let (addr, handle) = spawn(server, shutdown.clone()).await;

    let response = send(&addr, "GET", "/", &[]).await;
    let exits: Vec<&str> = response
        .headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("x-exit"))
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(exits, vec!["C", "B", "A"]);
    assert!(response.header("x-request-id").is_none());

    shutdown.trigger();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn panicking_handler_answers_500_and_server_keeps_serving() {
    let server = Arc::new(Server::new(local_config(), Vec::new()).unwrap());
    let explode = true;
    server.router().route(Method::POST, "/boom", move |_req: Request| async move {
        assert!(!explode, "handler blew up");
        write_json(StatusCode::OK, &"unreachable")
    });
    server.router().route(Method::GET, "/ok", |_req: Request| async {
        write_json(StatusCode::OK, &"fine")
    });

    let shutdown = ShutdownSignal::new();
    let (addr, handle) = spawn(Arc::clone(&server), shutdown.clone()).await;

    let response = send(&addr, "POST", "/boom", &[("content-length", "0")]).await;
    assert_eq!(response.status, 500);
    assert_eq!(response.json()["error"], "internal server error");

    let response = send(&addr, "GET", "/ok", &[]).await;
    assert_eq!(response.status, 200);

    shutdown.trigger();
    handle.await.unwrap().unwrap();
    assert!(server.registry().render().contains("baseapp_panics_total 1"));
}

#[tokio::test]
async fn init_runs_once_across_concurrent_starts() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let server = Arc::new(
        Server::new(
            local_config(),
            vec![with_init(move || {
                std::thread::sleep(Duration::from_millis(20));
                counter.fetch_add(1, Ordering::SeqCst);
            })],
        )
        .unwrap(),
    );

    let shutdown = ShutdownSignal::new();
    let starts: Vec<_> = (0..4)
        .map(|_| {
            let server = Arc::clone(&server);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { server.start_with_shutdown(shutdown).await })
        })
        .collect();

    wait_until_listening(&server.http_config().bind_addr()).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(server.is_started());

    shutdown.trigger();

    let mut served = 0;
    let mut rejected = 0;
    for start in starts {
        match start.await.unwrap() {
            Ok(()) => served += 1,
            Err(ServerError::AlreadyStarted) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(served, 1);
    assert_eq!(rejected, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bind_failure_is_returned() {
    let held = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = held.local_addr().unwrap().port();

    let server = Server::new(HttpConfig::new("127.0.0.1", port), Vec::new()).unwrap();
    match server.start().await {
        Err(ServerError::Bind { addr, .. }) => assert_eq!(addr, format!("127.0.0.1:{port}")),
        other => panic!("expected bind error, got {other:?}"),
    }
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn events_reach_the_injected_logger() {
    let captured = Captured::default();
    let writer = captured.clone();
    let logger = Logger::from_subscriber(
        tracing_subscriber::fmt()
            .json()
            .with_writer(move || writer.clone())
            .finish(),
    );

    let server = Arc::new(Server::new(local_config(), vec![with_logger(logger)]).unwrap());
    let shutdown = ShutdownSignal::new();
    let (addr, handle) = spawn(server, shutdown.clone()).await;

    let _ = send(&addr, "GET", "/anything", &[]).await;

    shutdown.trigger();
    handle.await.unwrap().unwrap();

    let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains(&format!("Server listening on {addr}")));
    assert!(output.contains("request completed"));
    assert!(output.contains("\"path\":\"/anything\""));
}
