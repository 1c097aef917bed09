//! Request handlers and the per-node method table.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::RouterError;
use crate::request::Request;
use crate::response::Response;
use crate::tree::Args;

/// A request handler attached to a host or resource for one or more HTTP
/// methods.
///
/// Any `Fn(&Request, &mut Args) -> Response` closure is a handler.
pub trait Handler: Send + Sync {
    /// Produce the response for a request that landed on this handler's
    /// node.
    fn handle(&self, request: &Request, args: &mut Args) -> Response;
}

impl<F> Handler for F
where
    F: Fn(&Request, &mut Args) -> Response + Send + Sync,
{
    fn handle(&self, request: &Request, args: &mut Args) -> Response {
        self(request, args)
    }
}

/// A reference-counted handler, the form handlers take once registered.
/// Wrapping a handler produces a new `SharedHandler` closing over the old
/// one.
pub type SharedHandler = Arc<dyn Handler>;

pub(crate) static NOT_FOUND_HANDLER: Lazy<SharedHandler> = Lazy::new(|| {
    Arc::new(|_request: &Request, _args: &mut Args| Response::not_found())
});

/// Split a method list string on commas and spaces, uppercasing each entry.
/// `"get, PUT post"` becomes `["GET", "PUT", "POST"]`.
pub(crate) fn parse_method_list(methods: &str) -> Vec<String> {
    methods
        .split([',', ' '])
        .filter(|m| !m.is_empty())
        .map(str::to_uppercase)
        .collect()
}

/// The method→handler table of one host or resource, plus the distinguished
/// handler for methods with no entry.
///
/// Entries keep registration order; the `Allow` header and the wrap-all
/// operation enumerate them in that order.
#[derive(Default)]
pub(crate) struct HandlerTable {
    methods: Vec<(Box<str>, SharedHandler)>,
    not_allowed: Option<SharedHandler>,
}

impl HandlerTable {
    /// True when at least one HTTP method has a handler. A node without any
    /// is a dummy and never serves a request itself.
    pub(crate) fn can_handle(&self) -> bool {
        !self.methods.is_empty()
    }

    /// Set `handler` for every method in the list. `"!"` alone assigns the
    /// not-allowed-method handler, which requires at least one regular
    /// method handler to exist first.
    pub(crate) fn set(&mut self, methods: &str, handler: SharedHandler) -> Result<(), RouterError> {
        let names = parse_method_list(methods);
        if names.is_empty() {
            return Err(RouterError::NilArgument);
        }

        if names.len() == 1 && names[0] == "!" {
            if !self.can_handle() {
                return Err(RouterError::NoHandlerExists {
                    method: "!".to_string(),
                });
            }

            self.not_allowed = Some(handler);
            return Ok(());
        }

        for name in names {
            match self.methods.iter_mut().find(|(m, _)| **m == *name) {
                Some((_, slot)) => *slot = handler.clone(),
                None => self.methods.push((name.into_boxed_str(), handler.clone())),
            }
        }

        Ok(())
    }

    /// The handler of one HTTP method; `"!"` names the not-allowed-method
    /// handler.
    pub(crate) fn get(&self, method: &str) -> Option<&SharedHandler> {
        if method == "!" {
            return self.not_allowed.as_ref();
        }

        self.methods
            .iter()
            .find(|(m, _)| m.as_ref() == method)
            .map(|(_, h)| h)
    }

    pub(crate) fn not_allowed(&self) -> Option<&SharedHandler> {
        self.not_allowed.as_ref()
    }

    /// Wrap the handlers of the listed methods in place. `"*"` alone wraps
    /// every method handler registered at the time of the call, `"!"` alone
    /// wraps the not-allowed-method handler.
    pub(crate) fn wrap(
        &mut self,
        methods: &str,
        wrapper: &dyn Fn(SharedHandler) -> SharedHandler,
    ) -> Result<(), RouterError> {
        let names = parse_method_list(methods);
        if names.is_empty() {
            return Err(RouterError::NilArgument);
        }

        if names.len() == 1 && names[0] == "*" {
            if self.methods.is_empty() {
                return Err(RouterError::NoHandlerExists {
                    method: "*".to_string(),
                });
            }

            for (_, slot) in &mut self.methods {
                *slot = wrapper(slot.clone());
            }

            return Ok(());
        }

        if names.len() == 1 && names[0] == "!" {
            match self.not_allowed.take() {
                Some(handler) => {
                    self.not_allowed = Some(wrapper(handler));
                    return Ok(());
                }
                None => {
                    return Err(RouterError::NoHandlerExists {
                        method: "!".to_string(),
                    })
                }
            }
        }

        for name in names {
            match self.methods.iter_mut().find(|(m, _)| **m == *name) {
                Some((_, slot)) => *slot = wrapper(slot.clone()),
                None => return Err(RouterError::NoHandlerExists { method: name }),
            }
        }

        Ok(())
    }

    /// The registered method names joined for an `Allow` header.
    pub(crate) fn allowed_methods(&self) -> String {
        let mut out = String::new();
        for (method, _) in &self.methods {
            if !out.is_empty() {
                out.push_str(", ");
            }

            out.push_str(method);
        }

        out
    }
}
