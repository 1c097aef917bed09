//! Responder tree nodes.
//!
//! A host and a resource share one payload: the parsed template they are
//! matched by, their config flags, their handler table and middleware, and
//! three child buckets. Children are owned by their parent; registering a
//! resource moves it into the tree, so a node is attached to exactly one
//! parent by construction.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Config, ConfigFlags};
use crate::error::RouterError;
use crate::handler::{Handler, HandlerTable, SharedHandler};
use crate::middleware::Middleware;
use crate::template::Template;
use crate::url::{host_template, split_url, UrlTemplate};

/// Whether a node is a host or a path resource. Drives the few behaviors
/// that differ, like which dummy error to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponderKind {
    Host,
    Resource,
}

/// A stable handle to one child inside a node's buckets.
#[derive(Debug, Clone)]
pub(crate) enum ChildRef {
    Static(Box<str>),
    Pattern(usize),
    Wildcard,
}

/// The payload shared by hosts and resources.
pub(crate) struct ResponderCore {
    pub(crate) kind: ResponderKind,
    pub(crate) template: Template,
    pub(crate) flags: ConfigFlags,
    pub(crate) handlers: HandlerTable,
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
    pub(crate) shared_data: Option<Arc<dyn Any + Send + Sync>>,
    pub(crate) static_children: HashMap<Box<str>, Resource>,
    pub(crate) pattern_children: Vec<Resource>,
    pub(crate) wildcard_child: Option<Box<Resource>>,
}

impl ResponderCore {
    pub(crate) fn new(kind: ResponderKind, template: Template) -> ResponderCore {
        ResponderCore {
            kind,
            template,
            flags: ConfigFlags::empty(),
            handlers: HandlerTable::default(),
            middleware: Vec::new(),
            shared_data: None,
            static_children: HashMap::new(),
            pattern_children: Vec::new(),
            wildcard_child: None,
        }
    }

    pub(crate) fn can_handle_request(&self) -> bool {
        self.handlers.can_handle()
    }

    /// The error matching the node kind for operations that need a request
    /// handler to exist.
    pub(crate) fn dummy_error(&self) -> RouterError {
        match self.kind {
            ResponderKind::Host => RouterError::DummyHost,
            ResponderKind::Resource => RouterError::DummyResource,
        }
    }

    /// The direct child with the given name, if any. Wildcard and pattern
    /// children are looked at before static ones.
    pub(crate) fn child_named(&self, name: &str) -> Option<&Resource> {
        if name.is_empty() {
            return None;
        }

        if let Some(wildcard) = &self.wildcard_child {
            if wildcard.name() == Some(name) {
                return Some(&**wildcard);
            }
        }

        for child in &self.pattern_children {
            if child.name() == Some(name) {
                return Some(child);
            }
        }

        self.static_children
            .values()
            .find(|child| child.name() == Some(name))
    }

    pub(crate) fn locate_child_named(&self, name: &str) -> Option<ChildRef> {
        if name.is_empty() {
            return None;
        }

        if let Some(wildcard) = &self.wildcard_child {
            if wildcard.name() == Some(name) {
                return Some(ChildRef::Wildcard);
            }
        }

        for (idx, child) in self.pattern_children.iter().enumerate() {
            if child.name() == Some(name) {
                return Some(ChildRef::Pattern(idx));
            }
        }

        self.static_children
            .iter()
            .find(|(_, child)| child.name() == Some(name))
            .map(|(key, _)| ChildRef::Static(key.clone()))
    }

    pub(crate) fn has_any_children(&self) -> bool {
        !self.static_children.is_empty()
            || !self.pattern_children.is_empty()
            || self.wildcard_child.is_some()
    }

    pub(crate) fn children(&self) -> impl Iterator<Item = &Resource> {
        self.static_children
            .values()
            .chain(self.pattern_children.iter())
            .chain(self.wildcard_child.iter().map(|child| &**child))
    }

    /// Detach every child, leaving the buckets empty but allocated.
    pub(crate) fn take_children(&mut self) -> Vec<Resource> {
        let mut children: Vec<Resource> = self.static_children.drain().map(|(_, r)| r).collect();
        children.extend(self.pattern_children.drain(..));
        if let Some(wildcard) = self.wildcard_child.take() {
            children.push(*wildcard);
        }

        children
    }

    /// Insert a child into the bucket its template shape selects. The caller
    /// has already resolved collisions.
    pub(crate) fn register_child(&mut self, child: Resource) {
        if let Some(content) = child.core.template.static_content() {
            self.static_children
                .insert(content.to_string().into_boxed_str(), child);
        } else if child.core.template.is_wildcard() {
            self.wildcard_child = Some(Box::new(child));
        } else {
            self.pattern_children.push(child);
        }
    }

    pub(crate) fn child_by_ref(&self, child_ref: &ChildRef) -> &Resource {
        match child_ref {
            ChildRef::Static(key) => self
                .static_children
                .get(key)
                .expect("a child ref always points at an existing child"),
            ChildRef::Pattern(idx) => &self.pattern_children[*idx],
            ChildRef::Wildcard => self
                .wildcard_child
                .as_deref()
                .expect("a child ref always points at an existing child"),
        }
    }

    pub(crate) fn child_by_ref_mut(&mut self, child_ref: &ChildRef) -> &mut Resource {
        match child_ref {
            ChildRef::Static(key) => self
                .static_children
                .get_mut(key)
                .expect("a child ref always points at an existing child"),
            ChildRef::Pattern(idx) => &mut self.pattern_children[*idx],
            ChildRef::Wildcard => self
                .wildcard_child
                .as_deref_mut()
                .expect("a child ref always points at an existing child"),
        }
    }

    pub(crate) fn remove_child(&mut self, child_ref: &ChildRef) -> Resource {
        match child_ref {
            ChildRef::Static(key) => self
                .static_children
                .remove(key)
                .expect("a child ref always points at an existing child"),
            ChildRef::Pattern(idx) => self.pattern_children.remove(*idx),
            ChildRef::Wildcard => *self
                .wildcard_child
                .take()
                .expect("a child ref always points at an existing child"),
        }
    }

    /// Navigate a ref path downward, returning the node at its end.
    pub(crate) fn descend_mut(&mut self, refs: &[ChildRef]) -> &mut ResponderCore {
        let mut current = self;
        for child_ref in refs {
            current = &mut current.child_by_ref_mut(child_ref).core;
        }

        current
    }

    pub(crate) fn descend(&self, refs: &[ChildRef]) -> &ResponderCore {
        let mut current = self;
        for child_ref in refs {
            current = &current.child_by_ref(child_ref).core;
        }

        current
    }

    // ----- configuration -----

    pub(crate) fn configure(&mut self, config: Config) {
        self.flags = ConfigFlags::ACTIVE | config.as_flags();
    }

    pub(crate) fn config(&self) -> Config {
        self.flags.as_config()
    }

    pub(crate) fn is_subtree_handler(&self) -> bool {
        self.flags.contains(ConfigFlags::SUBTREE_HANDLER)
    }

    pub(crate) fn is_secure(&self) -> bool {
        self.flags.contains(ConfigFlags::SECURE)
    }

    pub(crate) fn redirects_insecure_request(&self) -> bool {
        self.flags.contains(ConfigFlags::REDIRECT_INSECURE)
    }

    pub(crate) fn has_trailing_slash(&self) -> bool {
        self.flags.contains(ConfigFlags::TRAILING_SLASH)
    }

    pub(crate) fn is_strict_on_trailing_slash(&self) -> bool {
        self.flags.contains(ConfigFlags::STRICT_ON_TRAILING_SLASH)
    }

    pub(crate) fn is_lenient_on_trailing_slash(&self) -> bool {
        self.flags.contains(ConfigFlags::LENIENT_TRAILING_SLASH)
    }

    pub(crate) fn is_lenient_on_unclean_path(&self) -> bool {
        self.flags.contains(ConfigFlags::LENIENT_UNCLEAN_PATH)
    }

    pub(crate) fn handles_the_path_as_is(&self) -> bool {
        self.flags.contains(ConfigFlags::HANDLE_PATH_AS_IS)
    }

    // ----- handlers -----

    pub(crate) fn set_handler_for(
        &mut self,
        methods: &str,
        handler: SharedHandler,
    ) -> Result<(), RouterError> {
        self.handlers.set(methods, handler).map_err(|err| {
            if matches!(err, RouterError::NoHandlerExists { .. }) {
                self.dummy_error()
            } else {
                err
            }
        })
    }

    pub(crate) fn wrap_handler_of(
        &mut self,
        methods: &str,
        wrapper: &dyn Fn(SharedHandler) -> SharedHandler,
    ) -> Result<(), RouterError> {
        if !self.handlers.can_handle() {
            return Err(self.dummy_error());
        }

        self.handlers.wrap(methods, wrapper)
    }
}

/// A resource: a responder at a path position beneath a host or router.
///
/// A resource is created detached, optionally configured and given handlers
/// and children, and then *moved* into the tree by one of the registration
/// methods. Its template describes how it matches one path segment of a
/// request URL.
pub struct Resource {
    pub(crate) core: ResponderCore,
    pub(crate) url_template: Option<UrlTemplate>,
}

impl Resource {
    /// Create a resource from a URL template.
    ///
    /// The template may be a lone segment template (`"{id:[0-9]+}"`), a path
    /// (`"/orders/{id:[0-9]+}"`), or a full URL
    /// (`"https://example.com/orders/{id:[0-9]+}/"`). Host and prefix path
    /// parts are kept and checked against the actual tree when the resource
    /// is registered; the scheme and a trailing slash configure the
    /// resource's `secure` and `trailing_slash` properties.
    pub fn new(url_template: &str) -> Result<Resource, RouterError> {
        Resource::build(url_template, None)
    }

    /// Create a resource from a URL template and a config.
    ///
    /// Requesting `redirect_insecure_request` together with an insecure URL
    /// template is rejected as conflicting.
    pub fn with_config(url_template: &str, config: Config) -> Result<Resource, RouterError> {
        Resource::build(url_template, Some(config))
    }

    fn build(url_template: &str, config: Option<Config>) -> Result<Resource, RouterError> {
        let (host, prefix_path, segment, secure, tslash) = split_url(url_template)?;
        if segment.is_empty() {
            return Err(RouterError::EmptyPathTemplate);
        }

        if let Some(config) = config {
            if config.redirect_insecure_request && !secure {
                return Err(RouterError::ConflictingSecurity);
            }
        }

        let template = Template::parse(&segment)?;
        if !template.is_static() && template.name().is_none() {
            return Err(RouterError::UnnamedResource);
        }

        let mut core = ResponderCore::new(ResponderKind::Resource, template);
        if secure || tslash || config.is_some() {
            core.flags
                .check_compatibility(secure, tslash, config.map(Config::as_flags))?;
        }

        let url_template = if host.is_empty() && prefix_path.is_empty() {
            None
        } else {
            Some(UrlTemplate { host, prefix_path })
        };

        Ok(Resource {
            core,
            url_template,
        })
    }

    /// A placeholder created while materializing prefix path segments. It
    /// has no handlers and never serves a request itself.
    pub(crate) fn dummy(template: Template) -> Resource {
        Resource {
            core: ResponderCore::new(ResponderKind::Resource, template),
            url_template: None,
        }
    }

    /// The resource's name, from its template.
    pub fn name(&self) -> Option<&str> {
        self.core.template.name()
    }

    /// The resource's path segment template.
    pub fn template(&self) -> &Template {
        &self.core.template
    }

    /// True for the root resource `/`.
    pub fn is_root(&self) -> bool {
        self.core.template.is_root()
    }

    /// Reconfigure the resource, replacing any earlier configuration.
    pub fn configure(&mut self, config: Config) {
        self.core.configure(config);
    }

    /// The resource's current configuration.
    pub fn config(&self) -> Config {
        self.core.config()
    }

    /// True when the resource handles requests for which no deeper resource
    /// matched; the unmatched tail is the handler's remaining path.
    pub fn is_subtree_handler(&self) -> bool {
        self.core.is_subtree_handler()
    }

    /// True when the resource responds only over https.
    pub fn is_secure(&self) -> bool {
        self.core.is_secure()
    }

    /// True when insecure requests are redirected to https instead of
    /// getting a 404.
    pub fn redirects_insecure_request(&self) -> bool {
        self.core.redirects_insecure_request()
    }

    /// True when the resource's URL ends with a trailing slash.
    pub fn has_trailing_slash(&self) -> bool {
        self.core.has_trailing_slash()
    }

    pub fn is_strict_on_trailing_slash(&self) -> bool {
        self.core.is_strict_on_trailing_slash()
    }

    pub fn is_lenient_on_trailing_slash(&self) -> bool {
        self.core.is_lenient_on_trailing_slash()
    }

    pub fn is_lenient_on_unclean_path(&self) -> bool {
        self.core.is_lenient_on_unclean_path()
    }

    pub fn handles_the_path_as_is(&self) -> bool {
        self.core.handles_the_path_as_is()
    }

    /// True when at least one HTTP method has a handler.
    pub fn can_handle_request(&self) -> bool {
        self.core.can_handle_request()
    }

    /// Attach opaque data shared with every handler of this resource.
    pub fn set_shared_data(&mut self, data: Arc<dyn Any + Send + Sync>) {
        self.core.shared_data = Some(data);
    }

    /// The data attached with [`set_shared_data`](Resource::set_shared_data).
    pub fn shared_data(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.core.shared_data.as_ref()
    }

    /// Set a handler for the HTTP methods in the list.
    ///
    /// `methods` is a case-insensitive list separated by commas and/or
    /// spaces, e.g. `"get"`, `"PUT POST"`, or `"get, custom"`. An exclamation
    /// mark `"!"` alone assigns the handler of the not-allowed methods and
    /// must be used in a call of its own.
    pub fn set_handler_for(
        &mut self,
        methods: &str,
        handler: impl Handler + 'static,
    ) -> Result<(), RouterError> {
        self.core.set_handler_for(methods, Arc::new(handler))
    }

    /// The handler of one HTTP method, `"!"` naming the not-allowed-method
    /// handler.
    pub fn handler_of(&self, method: &str) -> Option<SharedHandler> {
        self.core.handlers.get(&method.to_uppercase()).cloned()
    }

    /// Wrap the handlers of the listed methods in place, innermost first.
    /// An asterisk `"*"` alone wraps every method handler registered at the
    /// time of the call; `"!"` alone wraps the not-allowed-method handler.
    pub fn wrap_handler_of(
        &mut self,
        methods: &str,
        wrapper: impl Fn(SharedHandler) -> SharedHandler,
    ) -> Result<(), RouterError> {
        self.core.wrap_handler_of(methods, &wrapper)
    }

    /// Attach middleware running at this resource's request boundary.
    pub fn add_middleware(&mut self, middleware: impl Middleware + 'static) {
        self.core.middleware.push(Arc::new(middleware));
    }

    /// The direct child with the given name, if any.
    pub fn child_resource_named(&self, name: &str) -> Option<&Resource> {
        self.core.child_named(name)
    }

    /// True when the resource has any child resources.
    pub fn has_any_child_resources(&self) -> bool {
        self.core.has_any_children()
    }
}

/// A host: a top-level responder matched against the host of a request.
///
/// Hosts are registered on a [`Router`](crate::Router); resources hang below
/// them. A host template may carry value patterns but must not be a
/// wildcard.
pub struct Host {
    pub(crate) core: ResponderCore,
}

impl Host {
    /// Create a host from a host template, e.g. `"example.com"`,
    /// `"https://example.com/"`, or `"{sub:[a-z]+}.example.com"`. A path
    /// beyond a bare trailing slash is rejected.
    pub fn new(url_template: &str) -> Result<Host, RouterError> {
        Host::build(url_template, None)
    }

    /// Create a host with a config; see [`Host::new`].
    pub fn with_config(url_template: &str, config: Config) -> Result<Host, RouterError> {
        Host::build(url_template, Some(config))
    }

    fn build(url_template: &str, config: Option<Config>) -> Result<Host, RouterError> {
        let (host, secure, tslash) = host_template(url_template)?;
        if host.is_empty() {
            return Err(RouterError::EmptyHostTemplate);
        }

        if let Some(config) = config {
            if config.redirect_insecure_request && !secure {
                return Err(RouterError::ConflictingSecurity);
            }
        }

        let template = Template::parse(&host)?;
        if template.is_wildcard() {
            return Err(RouterError::WildcardHostTemplate);
        }

        if !template.is_static() && template.name().is_none() {
            return Err(RouterError::UnnamedResource);
        }

        let mut core = ResponderCore::new(ResponderKind::Host, template);
        if secure || tslash || config.is_some() {
            core.flags
                .check_compatibility(secure, tslash, config.map(Config::as_flags))?;
        }

        Ok(Host { core })
    }

    /// The host's name, from its template.
    pub fn name(&self) -> Option<&str> {
        self.core.template.name()
    }

    /// The host's template.
    pub fn template(&self) -> &Template {
        &self.core.template
    }

    /// Reconfigure the host, replacing any earlier configuration.
    pub fn configure(&mut self, config: Config) {
        self.core.configure(config);
    }

    /// The host's current configuration.
    pub fn config(&self) -> Config {
        self.core.config()
    }

    pub fn is_subtree_handler(&self) -> bool {
        self.core.is_subtree_handler()
    }

    pub fn is_secure(&self) -> bool {
        self.core.is_secure()
    }

    pub fn redirects_insecure_request(&self) -> bool {
        self.core.redirects_insecure_request()
    }

    pub fn has_trailing_slash(&self) -> bool {
        self.core.has_trailing_slash()
    }

    pub fn is_lenient_on_trailing_slash(&self) -> bool {
        self.core.is_lenient_on_trailing_slash()
    }

    pub fn is_lenient_on_unclean_path(&self) -> bool {
        self.core.is_lenient_on_unclean_path()
    }

    /// True when at least one HTTP method has a handler.
    pub fn can_handle_request(&self) -> bool {
        self.core.can_handle_request()
    }

    /// Attach opaque data shared with every handler of this host.
    pub fn set_shared_data(&mut self, data: Arc<dyn Any + Send + Sync>) {
        self.core.shared_data = Some(data);
    }

    pub fn shared_data(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.core.shared_data.as_ref()
    }

    /// Set a handler for the HTTP methods in the list; see
    /// [`Resource::set_handler_for`] for the method list syntax.
    pub fn set_handler_for(
        &mut self,
        methods: &str,
        handler: impl Handler + 'static,
    ) -> Result<(), RouterError> {
        self.core.set_handler_for(methods, Arc::new(handler))
    }

    pub fn handler_of(&self, method: &str) -> Option<SharedHandler> {
        self.core.handlers.get(&method.to_uppercase()).cloned()
    }

    pub fn wrap_handler_of(
        &mut self,
        methods: &str,
        wrapper: impl Fn(SharedHandler) -> SharedHandler,
    ) -> Result<(), RouterError> {
        self.core.wrap_handler_of(methods, &wrapper)
    }

    /// Attach middleware running at this host's request boundary.
    pub fn add_middleware(&mut self, middleware: impl Middleware + 'static) {
        self.core.middleware.push(Arc::new(middleware));
    }

    /// The direct child resource with the given name, if any.
    pub fn child_resource_named(&self, name: &str) -> Option<&Resource> {
        self.core.child_named(name)
    }

    /// True when the host has any child resources.
    pub fn has_any_child_resources(&self) -> bool {
        self.core.has_any_children()
    }
}
