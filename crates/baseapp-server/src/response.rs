//! JSON response encoding.
//!
//! [`write_json`] never fails: when the value cannot be serialized the
//! caller gets a `500` with `{"error": "<message>"}` instead.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{response, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use baseapp_middleware::Response;

/// Content type set on every JSON response.
pub const APPLICATION_JSON: &str = "application/json";

/// Serializes `value` into a JSON response with `status`.
///
/// # Example
///
/// ```
/// use baseapp_server::write_json;
/// use http::StatusCode;
///
/// let response = write_json(StatusCode::CREATED, &serde_json::json!({"x": 1}));
/// assert_eq!(response.status(), StatusCode::CREATED);
/// assert_eq!(response.headers()["content-type"], "application/json");
/// ```
pub fn write_json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response {
    let (status, body) = encode(status, value);

    let mut response = Response::new(Full::new(body));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    *response.status_mut() = status;
    response
}

fn encode<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> (StatusCode, Bytes) {
    match serde_json::to_vec(value) {
        Ok(body) => (status, Bytes::from(body)),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode JSON response");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(&e.to_string()))
        }
    }
}

/// Renders `{"error": "<message>"}` with the message escaped as a JSON string.
fn error_body(message: &str) -> Bytes {
    let quoted = serde_json::Value::String(message.to_string());
    Bytes::from(format!("{{\"error\": {quoted}}}"))
}

/// Writes JSON through an existing response builder.
///
/// Headers already placed on the builder are kept; the content type and
/// status are set here.
///
/// # Example
///
/// ```
/// use baseapp_server::JsonWriter;
/// use http::StatusCode;
///
/// let builder = http::Response::builder().header("cache-control", "no-store");
/// let response = JsonWriter::new(builder).write(StatusCode::OK, &vec![1, 2, 3]);
///
/// assert_eq!(response.headers()["cache-control"], "no-store");
/// ```
#[derive(Debug)]
pub struct JsonWriter {
    builder: response::Builder,
}

impl JsonWriter {
    /// Wraps `builder`.
    #[must_use]
    pub fn new(builder: response::Builder) -> Self {
        Self { builder }
    }

    /// Sets the content type, then the status, then the body.
    pub fn write<T: Serialize + ?Sized>(self, status: StatusCode, value: &T) -> Response {
        let (status, body) = encode(status, value);

        match self
            .builder
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .status(status)
            .body(Full::new(body))
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "invalid response builder");
                write_json(StatusCode::INTERNAL_SERVER_ERROR, &ErrorBody { error: e.to_string() })
            }
        }
    }
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new(response::Builder::new())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}
