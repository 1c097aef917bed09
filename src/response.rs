//! Transport-free response model.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// Response data produced by a handler or by the router itself.
///
/// Contains the HTTP status code, headers, and JSON body for the HTTP
/// frontend to write out.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// HTTP status code (200, 404, 308, ...).
    pub status: u16,
    /// HTTP response headers.
    #[serde(skip_serializing)]
    pub headers: HashMap<String, String>,
    /// Response body as JSON.
    pub body: Value,
}

impl Response {
    /// An empty response with the given status code.
    pub fn new(status: u16) -> Response {
        Response {
            status,
            headers: HashMap::new(),
            body: Value::Null,
        }
    }

    /// A `200 OK` response with no body.
    pub fn ok() -> Response {
        Response::new(200)
    }

    /// A response with a JSON body.
    pub fn json(status: u16, body: Value) -> Response {
        Response {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    /// A response with a plain-text body.
    pub fn text(status: u16, body: impl Into<String>) -> Response {
        Response {
            status,
            headers: HashMap::new(),
            body: Value::String(body.into()),
        }
    }

    /// Attach a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Response {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    /// The built-in `404 Not Found` response.
    pub fn not_found() -> Response {
        Response::text(404, "Not Found")
    }

    /// The built-in `400 Bad Request` response, used for malformed
    /// percent-encoding in the request path.
    pub fn bad_request() -> Response {
        Response::text(400, "Bad Request")
    }

    /// The built-in `405 Method Not Allowed` response carrying the allowed
    /// methods.
    pub fn method_not_allowed(allow: &str) -> Response {
        Response::text(405, "Method Not Allowed").with_header("Allow", allow)
    }

    /// A `308 Permanent Redirect` to `location`. 308 preserves the request
    /// method across the redirect, which the trailing-slash and scheme
    /// policies rely on.
    pub fn permanent_redirect(location: impl Into<String>) -> Response {
        Response::new(308).with_header("Location", location)
    }

    /// The `Location` header, when present.
    pub fn location(&self) -> Option<&str> {
        self.headers.get("Location").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_carries_location() {
        let res = Response::permanent_redirect("https://example.com/orders/");
        assert_eq!(res.status, 308);
        assert_eq!(res.location(), Some("https://example.com/orders/"));
    }

    #[test]
    fn test_method_not_allowed_carries_allow() {
        let res = Response::method_not_allowed("GET, PUT");
        assert_eq!(res.status, 405);
        assert_eq!(res.headers.get("Allow").map(String::as_str), Some("GET, PUT"));
    }
}
