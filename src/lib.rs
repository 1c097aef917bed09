//! routrie — a hierarchical HTTP request router keyed by URL templates.
//!
//! Hosts and resources form a trie. Each node is matched by a template
//! mixing static literals, `{name:regex}` value patterns, and at most one
//! `{name}` wildcard; dispatch walks the trie one path segment per level,
//! reconciling the trailing-slash and scheme policies of the node a request
//! lands on.
//!
//! ```rust
//! use routrie::{Args, Config, Request, Resource, Response, Router};
//!
//! let mut router = Router::new();
//!
//! let mut orders = Resource::with_config(
//!     "https:///orders/",
//!     Config { subtree_handler: true, ..Config::default() },
//! ).unwrap();
//! orders
//!     .set_handler_for("get", |_req: &Request, args: &mut Args| {
//!         Response::text(200, format!("tail: {}", args.remaining_path()))
//!     })
//!     .unwrap();
//!
//! router.register_resource(orders).unwrap();
//!
//! let response = router.serve(&Request::get("https://example.com/orders/a/b"));
//! assert_eq!(response.status, 200);
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;
pub mod template;
pub mod tree;

mod url;

pub use config::Config;
pub use error::{RouterError, TemplateError};
pub use handler::{Handler, SharedHandler};
pub use middleware::Middleware;
pub use request::Request;
pub use response::Response;
pub use router::Router;
pub use template::{Similarity, Template, TemplateValues};
pub use tree::{Args, Host, Resource};
