//! Middleware trait for intercepting requests and responses.

use std::time::Duration;

use crate::request::Request;
use crate::response::Response;
use crate::tree::Args;

/// Middleware attached to a host or resource.
///
/// Middleware runs at the request boundary of the node that ends up handling
/// the request: `before` hooks can inspect the request and short-circuit it,
/// `after` hooks can modify the response before it's returned. Hooks run in
/// registration order.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use routrie::{Middleware, Request, Response, Args};
///
/// struct ServerHeader;
///
/// impl Middleware for ServerHeader {
///     fn after(&self, _req: &Request, res: &mut Response, _latency: Duration) {
///         res.headers.insert("Server".to_string(), "routrie".to_string());
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    /// Called before the request reaches the handler.
    ///
    /// Returning `Some(response)` short-circuits the handler; `None`
    /// continues to the next middleware or the handler itself.
    fn before(&self, _request: &Request, _args: &mut Args) -> Option<Response> {
        None
    }

    /// Called after the handler returned a response. The response can be
    /// modified in place; `latency` is the time the handler took.
    fn after(&self, _request: &Request, _response: &mut Response, _latency: Duration) {}
}
