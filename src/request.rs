//! Transport-free request model.
//!
//! The router does not own a socket. Whatever HTTP frontend is in use parses
//! the wire format and hands the router a [`Request`] value; the router hands
//! back a [`Response`](crate::Response).

use std::collections::HashMap;

use http::Method;
use serde_json::Value;

/// Parsed HTTP request data handed to [`Router::serve`](crate::Router::serve).
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// True when the request arrived over https.
    pub secure: bool,
    /// The request's host, from the request line or the `Host` header.
    /// Empty when the frontend didn't supply one.
    pub host: String,
    /// The raw, still percent-encoded request path, starting with `/`.
    /// An encoded slash inside a segment stays encoded here; the router
    /// decodes segment by segment.
    pub path: String,
    /// HTTP headers, with lowercase names.
    pub headers: HashMap<String, String>,
    /// Request body parsed as JSON, if present.
    pub body: Option<Value>,
}

impl Request {
    /// Build a request from a method and a URL string of the form
    /// `[scheme://host]/path`. Anything after a `?` is dropped; query
    /// strings are not this router's concern.
    pub fn new(method: Method, url: &str) -> Request {
        let (rest, secure) = if let Some(rest) = url.strip_prefix("https://") {
            (rest, true)
        } else if let Some(rest) = url.strip_prefix("http://") {
            (rest, false)
        } else {
            ("", false)
        };

        let (host, path) = if rest.is_empty() && !url.starts_with("http") {
            (String::new(), url.to_string())
        } else {
            match rest.find('/') {
                Some(idx) => (rest[..idx].to_string(), rest[idx..].to_string()),
                None => (rest.to_string(), "/".to_string()),
            }
        };

        let mut path = match path.find('?') {
            Some(idx) => path[..idx].to_string(),
            None => path,
        };

        if path.is_empty() {
            path.push('/');
        }

        Request {
            method,
            secure,
            host,
            path,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Convenience constructor for a GET request.
    pub fn get(url: &str) -> Request {
        Request::new(Method::GET, url)
    }

    /// Convenience constructor for a POST request.
    pub fn post(url: &str) -> Request {
        Request::new(Method::POST, url)
    }

    /// Attach a header. Names are stored lowercase.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Request {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: Value) -> Request {
        self.body = Some(body);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_absolute_url() {
        let req = Request::get("https://example.com/orders/42?tab=all");
        assert_eq!(req.method, Method::GET);
        assert!(req.secure);
        assert_eq!(req.host, "example.com");
        assert_eq!(req.path, "/orders/42");
    }

    #[test]
    fn test_request_from_path_only() {
        let req = Request::get("/orders");
        assert!(!req.secure);
        assert_eq!(req.host, "");
        assert_eq!(req.path, "/orders");
    }

    #[test]
    fn test_request_host_without_path() {
        let req = Request::get("http://example.com");
        assert_eq!(req.host, "example.com");
        assert_eq!(req.path, "/");
    }
}
