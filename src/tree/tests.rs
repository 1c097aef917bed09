use std::sync::Arc;

use crate::config::Config;
use crate::error::RouterError;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::tree::{Args, Host, Resource};

fn marker(text: &'static str) -> impl crate::handler::Handler {
    move |_req: &Request, _args: &mut Args| Response::text(200, text)
}

fn capture(name: &'static str) -> impl crate::handler::Handler {
    move |_req: &Request, args: &mut Args| {
        Response::text(200, args.value(name).unwrap_or("").to_string())
    }
}

#[test]
fn test_resource_construction() {
    let orders = Resource::new("/orders").unwrap();
    assert_eq!(orders.name(), None);
    assert!(!orders.is_secure());

    let item = Resource::new("https://example.com/orders/{id:[0-9]+}/").unwrap();
    assert_eq!(item.name(), Some("id"));
    assert!(item.is_secure());
    assert!(item.has_trailing_slash());

    assert!(matches!(
        Resource::new("{a:[0-9]+}-{b:[a-z]+}"),
        Err(RouterError::UnnamedResource)
    ));

    assert!(matches!(
        Resource::with_config(
            "/orders",
            Config {
                redirect_insecure_request: true,
                ..Config::default()
            }
        ),
        Err(RouterError::ConflictingSecurity)
    ));
}

#[test]
fn test_host_construction() {
    let host = Host::new("https://example.com/").unwrap();
    assert!(host.is_secure());
    assert!(host.has_trailing_slash());

    assert!(matches!(
        Host::new("example.com/orders"),
        Err(RouterError::UnwantedPathTemplate)
    ));
    assert!(matches!(
        Host::new("{anything}"),
        Err(RouterError::WildcardHostTemplate)
    ));
    assert!(matches!(Host::new(""), Err(RouterError::EmptyHostTemplate)));
}

#[test]
fn test_resource_path_creates_prefix_placeholders() {
    let mut router = Router::new();
    router
        .resource("/store/orders/{id:[0-9]+}")
        .unwrap()
        .set_handler_for("get", marker("order"))
        .unwrap();

    // The prefix segments exist but cannot handle a request themselves.
    let store = router.registered_resource("/store").unwrap().unwrap();
    assert!(!store.can_handle_request());
    assert!(store.has_any_child_resources());

    let response = router.serve(&Request::get("/store/orders/7"));
    assert_eq!(response.status, 200);

    // A request landing on a placeholder is not handled.
    let response = router.serve(&Request::get("/store/orders"));
    assert_eq!(response.status, 404);
}

#[test]
fn test_resource_path_compatibility_checks() {
    let mut router = Router::new();
    router.resource("https:///payments/").unwrap();

    assert!(matches!(
        router.resource("/payments/"),
        Err(RouterError::ConflictingSecurity)
    ));
    assert!(matches!(
        router.resource("https:///payments"),
        Err(RouterError::ConflictingTrailingSlash)
    ));
    assert!(router.resource("https:///payments/").is_ok());
}

#[test]
fn test_collision_keeps_the_handling_resource() {
    let mut parent = Resource::new("/api").unwrap();

    // A placeholder-like child with two descendants and no handlers.
    let mut first = Resource::new("items").unwrap();
    first.resource("/one").unwrap();
    first.resource("/two").unwrap();
    parent.register_resource(first).unwrap();

    // Same template, this time with a handler: it replaces the first child
    // and adopts its descendants.
    let mut second = Resource::new("items").unwrap();
    second.set_handler_for("get", marker("items")).unwrap();
    parent.register_resource(second).unwrap();

    let items = parent.registered_resource("/items").unwrap().unwrap();
    assert!(items.can_handle_request());
    assert!(items.registered_resource("/one").unwrap().is_some());
    assert!(items.registered_resource("/two").unwrap().is_some());
}

#[test]
fn test_collision_merges_children_into_the_handling_resource() {
    let mut parent = Resource::new("/api").unwrap();

    let mut first = Resource::new("items").unwrap();
    first.set_handler_for("get", marker("items")).unwrap();
    parent.register_resource(first).unwrap();

    let mut second = Resource::new("items").unwrap();
    second.resource("/extra").unwrap();
    parent.register_resource(second).unwrap();

    let items = parent.registered_resource("/items").unwrap().unwrap();
    assert!(items.can_handle_request());
    assert!(items.registered_resource("/extra").unwrap().is_some());
}

#[test]
fn test_collision_of_two_handling_resources() {
    let mut parent = Resource::new("/api").unwrap();

    let mut first = Resource::new("items").unwrap();
    first.set_handler_for("get", marker("a")).unwrap();
    parent.register_resource(first).unwrap();

    let mut second = Resource::new("items").unwrap();
    second.set_handler_for("get", marker("b")).unwrap();
    assert!(matches!(
        parent.register_resource(second),
        Err(RouterError::DuplicateResourceTemplate { .. })
    ));
}

#[test]
fn test_sibling_name_collision() {
    let mut router = Router::new();
    let host = router.host("example.com").unwrap();
    host.resource("/$u:users/{id:[0-9]+}").unwrap();

    assert!(matches!(
        host.resource("/$u:accounts"),
        Err(RouterError::DuplicateNameAmongSiblings)
    ));
}

#[test]
fn test_sibling_name_collision_on_object_registration() {
    let mut router = Router::new();
    let host = router.host("example.com").unwrap();
    host.resource("/$u:users/{id:[0-9]+}").unwrap();

    // The object entry point enforces the same uniqueness as the path one.
    let accounts = Resource::new("$u:accounts").unwrap();
    assert!(matches!(
        host.register_resource(accounts),
        Err(RouterError::DuplicateNameAmongSiblings)
    ));

    // An equivalent template is the collision merge's partner, not a clash.
    let mut users = Resource::new("$u:users").unwrap();
    users.set_handler_for("get", marker("users")).unwrap();
    host.register_resource(users).unwrap();
    let users = host.registered_resource("/$u").unwrap().unwrap();
    assert!(users.can_handle_request());
}

#[test]
fn test_sibling_name_collision_under_prefix() {
    let mut router = Router::new();
    let host = router.host("example.com").unwrap();
    host.resource("/admin/$t:tools").unwrap();

    let clash = Resource::new("$t:tasks").unwrap();
    assert!(matches!(
        host.register_resource_under("/admin", clash),
        Err(RouterError::DuplicateNameAmongSiblings)
    ));

    // Directly under the host the check applies as well.
    host.resource("/$ops:operations").unwrap();
    let clash = Resource::new("$ops:maintenance").unwrap();
    assert!(matches!(
        host.register_resource_under("/", clash),
        Err(RouterError::DuplicateNameAmongSiblings)
    ));
}

#[test]
fn test_name_must_be_unique_in_the_url() {
    let mut router = Router::new();
    let host = router.host("example.com").unwrap();

    assert!(matches!(
        host.resource("/$u:users/{id:[0-9]+}/$u:detail"),
        Err(RouterError::DuplicateNameInTheUrl)
    ));
}

#[test]
fn test_value_name_must_be_unique_in_the_url() {
    let mut router = Router::new();
    let host = router.host("example.com").unwrap();

    assert!(matches!(
        host.resource("/{id:[0-9]+}/detail/{id}"),
        Err(RouterError::DuplicateValueNameInTheUrl)
    ));
}

#[test]
fn test_registered_subtree_names_are_checked_on_attach() {
    let mut detached = Resource::new("$v:versions").unwrap();
    detached.resource("/{id:[0-9]+}").unwrap();

    let mut router = Router::new();
    router.resource("/{id:[a-z]+}/list").unwrap();

    // The detached subtree's {id} clashes with the {id} already on the
    // path it would be attached under.
    let target = router.resource("/{id:[a-z]+}").unwrap();
    assert!(matches!(
        target.register_resource(detached),
        Err(RouterError::DuplicateValueNameInTheUrl)
    ));
}

#[test]
fn test_register_resource_resolves_url_template() {
    let mut router = Router::new();
    let mut item = Resource::new("https://example.com/store/orders/{id:[0-9]+}").unwrap();
    item.set_handler_for("get", capture("id")).unwrap();
    router.register_resource(item).unwrap();

    let response = router.serve(&Request::get("https://example.com/store/orders/42"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, serde_json::json!("42"));
}

#[test]
fn test_register_resource_rejects_conflicting_host() {
    let mut router = Router::new();
    let host = router.host("example.com").unwrap();

    let item = Resource::new("https://other.example/orders").unwrap();
    assert!(matches!(
        host.register_resource(item),
        Err(RouterError::DifferentTemplates)
    ));
}

#[test]
fn test_register_resource_under_prefix() {
    let mut router = Router::new();
    let host = router.host("example.com").unwrap();

    let mut reports = Resource::new("reports").unwrap();
    reports.set_handler_for("get", marker("reports")).unwrap();
    host.register_resource_under("/admin/tools", reports).unwrap();

    assert!(host
        .registered_resource("/admin/tools/reports")
        .unwrap()
        .is_some());

    let response = router.serve(&Request::get("http://example.com/admin/tools/reports"));
    assert_eq!(response.status, 200);
}

#[test]
fn test_register_resource_under_conflicting_prefix() {
    let mut router = Router::new();
    let host = router.host("example.com").unwrap();

    let reports = Resource::new("/admin/tools/reports").unwrap();
    assert!(matches!(
        host.register_resource_under("/other/tools", reports),
        Err(RouterError::ConflictingPath | RouterError::ConflictingPathSegment { .. })
    ));
}

#[test]
fn test_registered_resource_lookup_by_name() {
    let mut router = Router::new();
    router
        .resource("/$assets:files/{name}")
        .unwrap()
        .set_handler_for("get", capture("name"))
        .unwrap();

    assert!(router
        .registered_resource("/$assets/$name")
        .unwrap()
        .is_some());
    assert!(router
        .registered_resource("/$assets:files/$name")
        .unwrap()
        .is_some());
    assert!(router.registered_resource("/$missing").unwrap().is_none());

    // The bare content without the name is a different template.
    assert!(matches!(
        router.registered_resource("/files/$name"),
        Err(RouterError::DifferentNames)
    ));
}

#[test]
fn test_registered_resource_checks_trailing_slash() {
    let mut router = Router::new();
    router.resource("/docs/").unwrap();

    assert!(matches!(
        router.registered_resource("/docs"),
        Err(RouterError::ConflictingTrailingSlash)
    ));
    assert!(router.registered_resource("/docs/").unwrap().is_some());
}

#[test]
fn test_configure_and_query_path() {
    let mut router = Router::new();
    router
        .set_path_handler_for("get put", "/settings", marker("settings"))
        .unwrap();

    router
        .configure_path(
            "/settings",
            Config {
                subtree_handler: true,
                ..Config::default()
            },
        )
        .unwrap();

    let config = router.path_config("/settings").unwrap();
    assert!(config.subtree_handler);

    assert!(router.path_handler_of("get", "/settings").unwrap().is_some());
    assert!(router
        .path_handler_of("delete", "/settings")
        .unwrap()
        .is_none());

    assert!(matches!(
        router.path_config("/missing"),
        Err(RouterError::NonExistentResource)
    ));
}

#[test]
fn test_wrap_handler_composes() {
    let mut router = Router::new();
    router
        .set_path_handler_for("get", "/wrapped", marker("inner"))
        .unwrap();

    router
        .wrap_path_handler_of("*", "/wrapped", |inner| {
            Arc::new(move |req: &Request, args: &mut Args| {
                let mut response = inner.handle(req, args);
                response
                    .headers
                    .insert("X-Wrapped".to_string(), "1".to_string());
                response
            })
        })
        .unwrap();

    let response = router.serve(&Request::get("/wrapped"));
    assert_eq!(response.status, 200);
    assert_eq!(response.headers.get("X-Wrapped").map(String::as_str), Some("1"));
}

#[test]
fn test_wrapping_a_placeholder_fails() {
    let mut router = Router::new();
    router.resource("/hollow").unwrap();

    assert!(matches!(
        router.wrap_path_handler_of("get", "/hollow", |inner| inner),
        Err(RouterError::DummyResource)
    ));
}

#[test]
fn test_host_registration_and_merge() {
    let mut router = Router::new();

    let mut bare = Host::new("example.com").unwrap();
    bare.resource("/kept").unwrap();
    router.register_host(bare).unwrap();

    let mut serving = Host::new("example.com").unwrap();
    serving.set_handler_for("get", marker("host")).unwrap();
    router.register_host(serving).unwrap();

    let host = router.registered_host("example.com").unwrap().unwrap();
    assert!(host.can_handle_request());
    assert!(host.registered_resource("/kept").unwrap().is_some());

    let mut another = Host::new("example.com").unwrap();
    another.set_handler_for("get", marker("dup")).unwrap();
    assert!(matches!(
        router.register_host(another),
        Err(RouterError::DuplicateHostTemplate)
    ));
}

#[test]
fn test_pattern_host_dispatch() {
    let mut router = Router::new();
    let host = router.host("{sub:[a-z]+}.example.com").unwrap();
    host.resource("/hello")
        .unwrap()
        .set_handler_for("get", capture("sub"))
        .unwrap();

    let response = router.serve(&Request::get("http://docs.example.com/hello"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, serde_json::json!("docs"));

    let response = router.serve(&Request::get("http://123.example.com/hello"));
    assert_eq!(response.status, 404);
}

#[test]
fn test_dispatch_prefers_static_then_patterns_in_order() {
    let mut router = Router::new();
    router
        .set_path_handler_for("get", "/files/latest", marker("static"))
        .unwrap();
    router
        .set_path_handler_for("get", "/files/$num:{v:[0-9]+}", marker("number"))
        .unwrap();
    router
        .set_path_handler_for("get", "/files/$word:{v2:[a-z]+}", marker("word"))
        .unwrap();

    let cases = [
        ("/files/latest", "static"),
        ("/files/42", "number"),
        ("/files/abc", "word"),
    ];

    for (path, expected) in cases {
        let response = router.serve(&Request::get(path));
        assert_eq!(response.status, 200, "{}", path);
        assert_eq!(response.body, serde_json::json!(expected), "{}", path);
    }
}

#[test]
fn test_method_dispatch_and_not_allowed() {
    let mut router = Router::new();
    let item = router.resource("/item").unwrap();
    item.set_handler_for("get, put", marker("item")).unwrap();

    let response = router.serve(&Request::post("/item"));
    assert_eq!(response.status, 405);
    assert_eq!(
        response.headers.get("Allow").map(String::as_str),
        Some("GET, PUT")
    );

    let item = router.registered_resource("/item").unwrap().unwrap();
    item.set_handler_for("!", |_req: &Request, _args: &mut Args| {
        Response::text(418, "custom not allowed")
    })
    .unwrap();

    let response = router.serve(&Request::post("/item"));
    assert_eq!(response.status, 418);
}

#[test]
fn test_custom_not_found_handler() {
    let mut router = Router::new();
    router.set_not_found_handler(|_req: &Request, _args: &mut Args| {
        Response::text(404, "custom not found")
    });

    let response = router.serve(&Request::get("/nowhere"));
    assert_eq!(response.status, 404);
    assert_eq!(response.body, serde_json::json!("custom not found"));
}

#[test]
fn test_shared_data_reaches_handlers() {
    let mut router = Router::new();
    let greeting = router.resource("/greeting").unwrap();
    greeting.set_shared_data(Arc::new("hello".to_string()));

    let data = greeting.shared_data().cloned().unwrap();
    greeting
        .set_handler_for("get", move |_req: &Request, _args: &mut Args| {
            let text = data
                .downcast_ref::<String>()
                .cloned()
                .unwrap_or_default();
            Response::text(200, text)
        })
        .unwrap();

    let response = router.serve(&Request::get("/greeting"));
    assert_eq!(response.body, serde_json::json!("hello"));
}
