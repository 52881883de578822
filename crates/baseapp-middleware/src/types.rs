//! Common types used throughout the middleware chain.

use bytes::Bytes;
use http_body_util::Full;

/// The HTTP request type seen by middleware and handlers.
///
/// This is a standard `http::Request` with a fully buffered body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type produced by middleware and handlers.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building error responses without a serializer.
pub trait ResponseExt {
    /// Creates a plain-text response with the given status code.
    fn text(status: http::StatusCode, message: &str) -> Response;

    /// Creates a `{"error": "<message>"}` JSON response.
    fn json_error(status: http::StatusCode, message: &str) -> Response;
}

impl ResponseExt for Response {
    fn text(status: http::StatusCode, message: &str) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::from(message.to_string())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    fn json_error(status: http::StatusCode, message: &str) -> Response {
        let body = serde_json::json!({ "error": message });

        let mut response = http::Response::new(Full::new(Bytes::from(body.to_string())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        response
    }
}
