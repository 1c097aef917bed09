//! Request dispatch: the top-down walk over the responder tree and the
//! per-request scratch state.
//!
//! Dispatch is synchronous and takes the tree by shared reference; the tree
//! is read-only once requests start flowing, so any number of threads can
//! dispatch concurrently. All mutable state lives in [`Args`], which the
//! router draws from a pool.

use std::time::Instant;

use http::Extensions;
use tracing::{debug, warn};

use crate::request::Request;
use crate::response::Response;
use crate::template::TemplateValues;
use crate::tree::node::ResponderCore;
use crate::url::{clean_path, path_unescape};

/// The request path carried a percent-escape that doesn't decode.
struct MalformedPath;

/// Per-request dispatch state, reused across requests via the router's pool.
///
/// Carries the request path in raw and cleaned form, the walk position, the
/// host and path values captured by matched templates, and typed custom
/// slots for handlers and middleware to exchange data through.
pub struct Args {
    raw_path: String,
    clean_path: String,
    segment_index: usize,
    tail_start: usize,
    values: TemplateValues,
    extensions: Extensions,
}

impl Args {
    pub(crate) fn new() -> Args {
        Args {
            raw_path: String::new(),
            clean_path: String::new(),
            segment_index: 0,
            tail_start: 0,
            values: TemplateValues::new(),
            extensions: Extensions::new(),
        }
    }

    /// Prime the scratch for a request. The cleaned path is computed once,
    /// and only when the raw path is not already canonical.
    pub(crate) fn init(&mut self, request: &Request) {
        if !request.path.starts_with('/') {
            self.raw_path.push('/');
        }

        self.raw_path.push_str(&request.path);
        if let Some(cleaned) = clean_path(&self.raw_path) {
            self.clean_path.push_str(&cleaned);
        }

        self.segment_index = 1;
        self.tail_start = usize::MAX;
    }

    /// Zero the logical state, keeping every backing buffer allocated, and
    /// hand the scratch back to the pool.
    pub(crate) fn reset(&mut self) {
        self.raw_path.clear();
        self.clean_path.clear();
        self.segment_index = 0;
        self.tail_start = 0;
        self.values.clear();
        self.extensions.clear();
    }

    /// The path dispatch walks: the cleaned path when the request's path
    /// was unclean, the raw path otherwise.
    pub(crate) fn effective_path(&self) -> &str {
        if self.clean_path.is_empty() {
            &self.raw_path
        } else {
            &self.clean_path
        }
    }

    pub(crate) fn path_was_cleaned(&self) -> bool {
        !self.clean_path.is_empty()
    }

    /// True when the request path is just `/`.
    pub fn path_is_root(&self) -> bool {
        self.effective_path() == "/"
    }

    pub(crate) fn path_has_trailing_slash(&self) -> bool {
        let path = self.effective_path();
        path.len() > 1 && path.ends_with('/')
    }

    pub(crate) fn reached_last_segment(&self) -> bool {
        self.segment_index >= self.effective_path().len()
    }

    pub(crate) fn segment_index(&self) -> usize {
        self.segment_index
    }

    pub(crate) fn restore_segment_index(&mut self, index: usize) {
        self.segment_index = index;
    }

    /// The next path segment, percent-decoded. Empty when the path is
    /// exhausted.
    fn next_path_segment(&mut self) -> Result<String, MalformedPath> {
        let (decoded, next_index) = {
            let path = self.effective_path();
            if self.segment_index >= path.len() {
                return Ok(String::new());
            }

            let rest = &path[self.segment_index..];
            match rest.find('/') {
                Some(idx) => (
                    path_unescape(&rest[..idx]),
                    self.segment_index + idx + 1,
                ),
                None => (path_unescape(rest), path.len()),
            }
        };

        self.segment_index = next_index;
        decoded.ok_or(MalformedPath)
    }

    /// The part of the request path below the responder handling the
    /// request, without a leading slash. For a responder that landed on its
    /// exact segment this is empty; for a subtree handler it starts at the
    /// handler's own segment; for a host or root resource it is the whole
    /// path after the leading slash.
    pub fn remaining_path(&self) -> &str {
        let path = self.effective_path();
        if self.tail_start >= path.len() {
            return "";
        }

        &path[self.tail_start..]
    }

    pub(crate) fn set_tail_start(&mut self, start: usize) {
        self.tail_start = start;
    }

    /// The values captured from the host and path templates matched so far.
    pub fn values(&self) -> &TemplateValues {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut TemplateValues {
        &mut self.values
    }

    /// A captured value by name.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name)
    }

    /// Typed custom slots passed between middleware and handlers.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

impl ResponderCore {
    /// Dispatch at one node. `segment_start` is the byte offset of this
    /// node's own path segment, used for the remaining-path contract when
    /// the node ends up serving a subtree request.
    ///
    /// `None` means "not handled": it bubbles up to the nearest
    /// subtree-handling ancestor, or to the router's not-found responder.
    pub(crate) fn handle(
        &self,
        request: &Request,
        args: &mut Args,
        segment_start: usize,
    ) -> Option<Response> {
        if args.reached_last_segment() {
            if self.can_handle_request() {
                return Some(self.respond(request, args, true, segment_start));
            }

            return None;
        }

        if let Some(response) = self.pass_to_child(request, args) {
            return Some(response);
        }

        if self.is_subtree_handler() && self.can_handle_request() {
            return Some(self.respond(request, args, false, segment_start));
        }

        None
    }

    /// Try the children against the next path segment: the static bucket
    /// first, then the pattern children in registration order, then the
    /// wildcard. The walk position is restored before returning so the
    /// caller can still compute its own remaining path.
    fn pass_to_child(&self, request: &Request, args: &mut Args) -> Option<Response> {
        let saved = args.segment_index();
        let segment = match args.next_path_segment() {
            Ok(segment) => segment,
            Err(MalformedPath) => {
                warn!(path = %request.path, "malformed percent-encoding in the request path");
                args.restore_segment_index(saved);
                return Some(Response::bad_request());
            }
        };

        let result = if segment.is_empty() {
            None
        } else if let Some(child) = self.static_children.get(segment.as_str()) {
            child.core.handle(request, args, saved)
        } else if let Some(child) = self
            .pattern_children
            .iter()
            .find(|child| child.core.template.matches(&segment, args.values_mut()))
        {
            child.core.handle(request, args, saved)
        } else if let Some(wildcard) = &self.wildcard_child {
            if wildcard.core.template.matches(&segment, args.values_mut()) {
                wildcard.core.handle(request, args, saved)
            } else {
                None
            }
        } else {
            None
        };

        args.restore_segment_index(saved);
        result
    }

    /// Serve the request at this node: apply the scheme, trailing-slash,
    /// and unclean-path policies, then run the method handler inside the
    /// node's middleware.
    fn respond(
        &self,
        request: &Request,
        args: &mut Args,
        exact: bool,
        segment_start: usize,
    ) -> Response {
        let scheme = if request.secure { "https" } else { "http" };

        if self.is_secure() && !request.secure {
            if self.redirects_insecure_request() {
                return Response::permanent_redirect(format!(
                    "https://{}{}",
                    request.host,
                    args.effective_path()
                ));
            }

            debug!(path = %request.path, "insecure request to a secure responder");
            return Response::not_found();
        }

        if exact
            && !args.path_is_root()
            && self.has_trailing_slash() != args.path_has_trailing_slash()
        {
            if self.is_strict_on_trailing_slash() {
                return Response::not_found();
            }

            if !self.is_lenient_on_trailing_slash() {
                let mut path = args.effective_path().to_string();
                if self.has_trailing_slash() {
                    path.push('/');
                } else {
                    path.pop();
                }

                return Response::permanent_redirect(format!(
                    "{}://{}{}",
                    scheme, request.host, path
                ));
            }
        }

        if args.path_was_cleaned() && !self.is_lenient_on_unclean_path() {
            return Response::permanent_redirect(format!(
                "{}://{}{}",
                scheme,
                request.host,
                args.effective_path()
            ));
        }

        if exact {
            args.set_tail_start(usize::MAX);
        } else {
            args.set_tail_start(segment_start);
        }

        let handler = self
            .handlers
            .get(request.method.as_str())
            .cloned();

        let started = Instant::now();
        let mut response = 'response: {
            for middleware in &self.middleware {
                if let Some(response) = middleware.before(request, args) {
                    break 'response response;
                }
            }

            match handler {
                Some(handler) => handler.handle(request, args),
                None => match self.handlers.not_allowed() {
                    Some(handler) => handler.handle(request, args),
                    None => Response::method_not_allowed(&self.handlers.allowed_methods()),
                },
            }
        };

        let latency = started.elapsed();
        for middleware in &self.middleware {
            middleware.after(request, &mut response, latency);
        }

        response
    }
}
