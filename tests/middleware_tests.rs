//! Middleware hooks and handler wrapping across a registered tree.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use routrie::{Args, Middleware, Request, Response, Router};

fn ok(text: &'static str) -> impl routrie::Handler {
    move |_req: &Request, _args: &mut Args| Response::text(200, text)
}

struct CountingMiddleware {
    before_calls: Arc<AtomicUsize>,
    after_calls: Arc<AtomicUsize>,
}

impl Middleware for CountingMiddleware {
    fn before(&self, _request: &Request, _args: &mut Args) -> Option<Response> {
        self.before_calls.fetch_add(1, Ordering::SeqCst);
        None
    }

    fn after(&self, _request: &Request, response: &mut Response, _latency: Duration) {
        self.after_calls.fetch_add(1, Ordering::SeqCst);
        response
            .headers
            .insert("X-Seen".to_string(), "1".to_string());
    }
}

struct Gatekeeper;

impl Middleware for Gatekeeper {
    fn before(&self, request: &Request, _args: &mut Args) -> Option<Response> {
        if request.headers.get("authorization").is_none() {
            return Some(Response::text(401, "Unauthorized"));
        }

        None
    }
}

#[test]
fn test_middleware_runs_around_the_handler() {
    let before_calls = Arc::new(AtomicUsize::new(0));
    let after_calls = Arc::new(AtomicUsize::new(0));

    let mut router = Router::new();
    let resource = router.resource("/observed").unwrap();
    resource.set_handler_for("get", ok("observed")).unwrap();
    resource.add_middleware(CountingMiddleware {
        before_calls: before_calls.clone(),
        after_calls: after_calls.clone(),
    });

    let response = router.serve(&Request::get("/observed"));
    assert_eq!(response.status, 200);
    assert_eq!(response.headers.get("X-Seen").map(String::as_str), Some("1"));
    assert_eq!(before_calls.load(Ordering::SeqCst), 1);
    assert_eq!(after_calls.load(Ordering::SeqCst), 1);

    // Middleware only runs on the node that handles the request.
    let _ = router.serve(&Request::get("/elsewhere"));
    assert_eq!(before_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_middleware_short_circuits() {
    let mut router = Router::new();
    let resource = router.resource("/guarded").unwrap();
    resource.set_handler_for("get", ok("secret")).unwrap();
    resource.add_middleware(Gatekeeper);

    let response = router.serve(&Request::get("/guarded"));
    assert_eq!(response.status, 401);

    let request = Request::get("/guarded").with_header("Authorization", "Bearer t");
    let response = router.serve(&request);
    assert_eq!(response.status, 200);
}

#[test]
fn test_wrap_subtree_handlers() {
    let mut router = Router::new();
    let api = router.resource("/api").unwrap();
    api.set_path_handler_for("get", "/users", ok("users"))
        .unwrap();
    api.set_path_handler_for("get", "/orders", ok("orders"))
        .unwrap();
    // A placeholder in between is skipped by the sweep.
    api.resource("/internal/queue").unwrap();

    api.wrap_subtree_handlers_of("*", |inner| {
        Arc::new(move |req: &Request, args: &mut Args| {
            let mut response = inner.handle(req, args);
            response
                .headers
                .insert("X-Api".to_string(), "v1".to_string());
            response
        })
    })
    .unwrap();

    for path in ["/api/users", "/api/orders"] {
        let response = router.serve(&Request::get(path));
        assert_eq!(response.status, 200, "{}", path);
        assert_eq!(
            response.headers.get("X-Api").map(String::as_str),
            Some("v1"),
            "{}",
            path
        );
    }
}

#[test]
fn test_wrapping_order_is_innermost_first() {
    let mut router = Router::new();
    let resource = router.resource("/layers").unwrap();
    resource
        .set_handler_for("get", |_req: &Request, _args: &mut Args| {
            Response::text(200, "core")
        })
        .unwrap();

    for layer in ["a", "b"] {
        resource
            .wrap_handler_of("get", move |inner| {
                Arc::new(move |req: &Request, args: &mut Args| {
                    let mut response = inner.handle(req, args);
                    if let serde_json::Value::String(body) = &mut response.body {
                        body.push('+');
                        body.push_str(layer);
                    }

                    response
                })
            })
            .unwrap();
    }

    // The later wrapper is the outer one, so its suffix lands last.
    let response = router.serve(&Request::get("/layers"));
    assert_eq!(response.body, serde_json::json!("core+a+b"));
}
