//! The router: the outermost container owning hosts and the root resource.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigFlags};
use crate::error::RouterError;
use crate::handler::{Handler, SharedHandler, NOT_FOUND_HANDLER};
use crate::request::Request;
use crate::response::Response;
use crate::template::{Similarity, Template};
use crate::tree::{Ancestors, Args, Host, Resource, ResponderCore, ResponderKind};
use crate::url::{host_template, split_host_and_path};

static ROOT_TEMPLATE: Lazy<Template> =
    Lazy::new(|| Template::parse("/").expect("the root template is valid"));

/// How many scratch values the pool retains between requests.
const MAX_POOLED_ARGS: usize = 64;

/// A handle to one host inside the router's buckets.
enum HostRef {
    Static(Box<str>),
    Pattern(usize),
}

/// Pool of per-request [`Args`] scratch values. Releasing zeroes the
/// logical state but keeps the backing buffers allocated.
struct ArgsPool {
    slots: Mutex<Vec<Box<Args>>>,
}

impl ArgsPool {
    fn new() -> ArgsPool {
        ArgsPool {
            slots: Mutex::new(Vec::new()),
        }
    }

    fn acquire(&self) -> Box<Args> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.pop().unwrap_or_else(|| Box::new(Args::new()))
    }

    fn release(&self, mut args: Box<Args>) {
        args.reset();
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.len() < MAX_POOLED_ARGS {
            slots.push(args);
        }
    }
}

/// A hierarchical HTTP request router keyed by URL templates.
///
/// The router owns hosts, matched against the request's host, and optionally
/// a root resource `/` under which path resources hang. Build the whole tree
/// first — registration is single-threaded by contract — then dispatch with
/// [`serve`](Router::serve) from as many threads as needed; the tree is
/// read-only once requests flow.
///
/// # Example
///
/// ```rust
/// use routrie::{Args, Request, Response, Router};
///
/// let mut router = Router::new();
/// router
///     .set_path_handler_for("get", "/orders/{id:[0-9]+}", |_req: &Request, args: &mut Args| {
///         Response::text(200, format!("order {}", args.value("id").unwrap_or("")))
///     })
///     .unwrap();
///
/// let response = router.serve(&Request::get("http://example.com/orders/42"));
/// assert_eq!(response.status, 200);
/// ```
pub struct Router {
    static_hosts: HashMap<Box<str>, Host>,
    pattern_hosts: Vec<Host>,
    root: Option<Resource>,
    not_found: Option<SharedHandler>,
    pool: ArgsPool,
}

impl Default for Router {
    fn default() -> Router {
        Router::new()
    }
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Router {
        Router {
            static_hosts: HashMap::new(),
            pattern_hosts: Vec::new(),
            root: None,
            not_found: None,
            pool: ArgsPool::new(),
        }
    }

    /// Replace the built-in `404 Not Found` responder.
    pub fn set_not_found_handler(&mut self, handler: impl Handler + 'static) {
        self.not_found = Some(std::sync::Arc::new(handler));
    }

    // ----- hosts -----

    fn locate_host(&self, template: &Template) -> Result<Option<HostRef>, RouterError> {
        if let Some(content) = template.static_content() {
            let Some(host) = self.static_hosts.get(content) else {
                return Ok(None);
            };

            if host.core.template.name() != template.name() {
                return Err(RouterError::DifferentNames);
            }

            return Ok(Some(HostRef::Static(content.to_string().into_boxed_str())));
        }

        for (idx, host) in self.pattern_hosts.iter().enumerate() {
            match host.core.template.similarity(template) {
                Similarity::TheSame => return Ok(Some(HostRef::Pattern(idx))),
                Similarity::Different => continue,
                similarity => return similarity.as_error().map(|_| None),
            }
        }

        Ok(None)
    }

    fn host_by_ref_mut(&mut self, host_ref: &HostRef) -> &mut Host {
        match host_ref {
            HostRef::Static(key) => self
                .static_hosts
                .get_mut(key)
                .expect("a host ref always points at an existing host"),
            HostRef::Pattern(idx) => &mut self.pattern_hosts[*idx],
        }
    }

    fn insert_host(&mut self, host: Host) {
        if let Some(content) = host.core.template.static_content() {
            self.static_hosts
                .insert(content.to_string().into_boxed_str(), host);
        } else {
            self.pattern_hosts.push(host);
        }
    }

    /// Find the host with the template, creating an unconfigured one when it
    /// doesn't exist. Used by the URL-resolving operations below.
    fn host_for(&mut self, host_template_str: &str) -> Result<&mut Host, RouterError> {
        let template = Template::parse(host_template_str)?;
        if template.is_wildcard() {
            return Err(RouterError::WildcardHostTemplate);
        }

        if !template.is_static() && template.name().is_none() {
            return Err(RouterError::UnnamedResource);
        }

        let host_ref = match self.locate_host(&template)? {
            Some(host_ref) => host_ref,
            None => {
                info!(template = %template, "host registered");
                let content = template.static_content().map(str::to_string);
                self.insert_host(Host {
                    core: ResponderCore::new(ResponderKind::Host, template),
                });

                match content {
                    Some(content) => HostRef::Static(content.into_boxed_str()),
                    None => HostRef::Pattern(self.pattern_hosts.len() - 1),
                }
            }
        };

        Ok(self.host_by_ref_mut(&host_ref))
    }

    /// Find the host with the template, creating it when it doesn't exist.
    ///
    /// The scheme and trailing-slash properties in the template must agree
    /// with an existing host's; a new host is configured from them.
    pub fn host(&mut self, host_template_str: &str) -> Result<&mut Host, RouterError> {
        let (content, secure, tslash) = host_template(host_template_str)?;
        let host = self.host_for(&content)?;
        host.core
            .flags
            .check_compatibility(secure, tslash, None)?;
        Ok(host)
    }

    /// Register a host. A host with an equivalent template may already
    /// exist if only one of the two has request handlers; the other one's
    /// child resources are merged into it.
    pub fn register_host(&mut self, host: Host) -> Result<(), RouterError> {
        let Some(host_ref) = self.locate_host(&host.core.template)? else {
            info!(template = %host.core.template, "host registered");
            self.insert_host(host);
            return Ok(());
        };

        // Dry-run the merge before mutating anything.
        let flags = host.core.flags;
        {
            let existing = match &host_ref {
                HostRef::Static(key) => &self.static_hosts[key],
                HostRef::Pattern(idx) => &self.pattern_hosts[*idx],
            };

            let mut probe = existing.core.flags;
            probe.check_compatibility(
                flags.contains(ConfigFlags::SECURE),
                flags.contains(ConfigFlags::TRAILING_SLASH),
                Some(flags),
            )?;

            if !host.core.can_handle_request() {
                for child in host.core.children() {
                    existing.core.absorb_check(child)?;
                }
            } else if !existing.core.can_handle_request() {
                for child in existing.core.children() {
                    host.core.absorb_check(child)?;
                }
            } else {
                return Err(RouterError::DuplicateHostTemplate);
            }
        }

        let existing = self.host_by_ref_mut(&host_ref);
        existing.core.flags.check_compatibility(
            flags.contains(ConfigFlags::SECURE),
            flags.contains(ConfigFlags::TRAILING_SLASH),
            Some(flags),
        )?;

        if !host.core.can_handle_request() {
            let mut host = host;
            for child in host.core.take_children() {
                existing.core.absorb(child)?;
            }

            return Ok(());
        }

        // The new host has handlers, the existing one doesn't: the new one
        // takes its place and adopts its children.
        let mut host = host;
        let mut old = match &host_ref {
            HostRef::Static(key) => self
                .static_hosts
                .remove(key.as_ref())
                .expect("a host ref always points at an existing host"),
            HostRef::Pattern(idx) => self.pattern_hosts.remove(*idx),
        };

        for child in old.core.take_children() {
            host.core.absorb(child)?;
        }

        self.insert_host(host);
        Ok(())
    }

    /// The registered host with the template, if any. The scheme and
    /// trailing-slash properties in the template must agree with the
    /// host's.
    pub fn registered_host(
        &mut self,
        host_template_str: &str,
    ) -> Result<Option<&mut Host>, RouterError> {
        let (content, secure, tslash) = host_template(host_template_str)?;
        let template = Template::parse(&content)?;
        match self.locate_host(&template)? {
            None => Ok(None),
            Some(host_ref) => {
                let host = self.host_by_ref_mut(&host_ref);
                host.core
                    .flags
                    .check_compatibility(secure, tslash, None)?;
                Ok(Some(host))
            }
        }
    }

    // ----- the root resource and path resources -----

    fn root_for(&mut self) -> &mut Resource {
        self.root
            .get_or_insert_with(|| Resource::dummy(ROOT_TEMPLATE.clone()))
    }

    /// The root resource `/`, if one has been created.
    pub fn root_resource(&self) -> Option<&Resource> {
        self.root.as_ref()
    }

    /// Find the resource at the URL, creating it — and any missing prefix
    /// segments, the host included — when it doesn't exist yet.
    ///
    /// Without a host part the resource is resolved under the root
    /// resource, which is created on demand.
    pub fn resource(&mut self, url_template: &str) -> Result<&mut Resource, RouterError> {
        self.resource_with(url_template, None)
    }

    /// Like [`resource`](Router::resource), also checking or applying the
    /// config.
    pub fn resource_using_config(
        &mut self,
        url_template: &str,
        config: Config,
    ) -> Result<&mut Resource, RouterError> {
        self.resource_with(url_template, Some(config))
    }

    fn resource_with(
        &mut self,
        url_template: &str,
        config: Option<Config>,
    ) -> Result<&mut Resource, RouterError> {
        let (host, path, secure, tslash) = split_host_and_path(url_template)?;
        if let Some(config) = &config {
            if config.redirect_insecure_request && !secure {
                return Err(RouterError::ConflictingSecurity);
            }
        }

        if !host.is_empty() {
            let host = self.host_for(&host)?;
            if path.is_empty() {
                return Err(RouterError::EmptyPathTemplate);
            }

            let ancestors = Ancestors::below_host(host.core.template.clone());
            return host
                .core
                .resource_at(ancestors, &rebuild_path(&path, secure, tslash), config);
        }

        if path == "/" {
            let required = config.map(Config::as_flags);
            let root = self.root_for();
            root.core
                .flags
                .check_compatibility(secure, tslash, required)?;
            return Ok(root);
        }

        let root = self.root_for();
        let ancestors = Ancestors::below_resource(root.core.template.clone());
        root.core
            .resource_at(ancestors, &rebuild_path(&path, secure, tslash), config)
    }

    /// Register a resource. A root resource goes directly under the router;
    /// a resource whose URL template names a host is registered below that
    /// host (created on demand); everything else lands under the root
    /// resource.
    pub fn register_resource(&mut self, resource: Resource) -> Result<(), RouterError> {
        if resource.is_root() {
            if let Some(url_template) = &resource.url_template {
                if !url_template.host.is_empty() {
                    return Err(RouterError::ConflictingHost);
                }
            }

            return self.register_root(resource);
        }

        if let Some(url_template) = resource.url_template.clone() {
            if !url_template.host.is_empty() {
                let host = self.host_for(&url_template.host)?;
                let ancestors = Ancestors::below_host(host.core.template.clone());
                return host.core.register_in(&ancestors, resource);
            }
        }

        let root = self.root_for();
        let ancestors = Ancestors::below_resource(root.core.template.clone());
        root.core.register_in(&ancestors, resource)
    }

    fn register_root(&mut self, resource: Resource) -> Result<(), RouterError> {
        let Some(existing) = &mut self.root else {
            info!("root resource registered");
            self.root = Some(resource);
            return Ok(());
        };

        let flags = resource.core.flags;
        let mut probe = existing.core.flags;
        probe.check_compatibility(
            flags.contains(ConfigFlags::SECURE),
            flags.contains(ConfigFlags::TRAILING_SLASH),
            Some(flags),
        )?;

        if !resource.core.can_handle_request() {
            for child in resource.core.children() {
                existing.core.absorb_check(child)?;
            }
        } else if !existing.core.can_handle_request() {
            for child in existing.core.children() {
                resource.core.absorb_check(child)?;
            }
        } else {
            return Err(RouterError::DuplicateResourceTemplate {
                template: "/".to_string(),
            });
        }

        existing.core.flags.check_compatibility(
            flags.contains(ConfigFlags::SECURE),
            flags.contains(ConfigFlags::TRAILING_SLASH),
            Some(flags),
        )?;

        if !resource.core.can_handle_request() {
            let mut resource = resource;
            for child in resource.core.take_children() {
                existing.core.absorb(child)?;
            }

            return Ok(());
        }

        let mut resource = resource;
        let mut old = self
            .root
            .take()
            .expect("the root resource was just matched");
        for child in old.core.take_children() {
            resource.core.absorb(child)?;
        }

        self.root = Some(resource);
        Ok(())
    }

    /// Register a resource under the prefix URL. A host part in the prefix
    /// selects (or creates) the host to register below.
    pub fn register_resource_under(
        &mut self,
        prefix_url: &str,
        resource: Resource,
    ) -> Result<(), RouterError> {
        let (host, path, _, _) = split_host_and_path(prefix_url)?;
        if !host.is_empty() {
            let host = self.host_for(&host)?;
            let ancestors = Ancestors::below_host(host.core.template.clone());
            let prefix = if path.is_empty() { "/" } else { path.as_str() };
            return host.core.register_under_in(ancestors, prefix, resource);
        }

        let root = self.root_for();
        let ancestors = Ancestors::below_resource(root.core.template.clone());
        if path == "/" {
            // A bare slash means directly under the root resource.
            return root.core.register_in(&ancestors, resource);
        }

        root.core.register_under_in(ancestors, &path, resource)
    }

    /// The registered resource reachable with the URL, in which each path
    /// segment may be a full template or a `$name` reference.
    pub fn registered_resource(
        &mut self,
        url_template: &str,
    ) -> Result<Option<&mut Resource>, RouterError> {
        let (host, path, secure, tslash) = split_host_and_path(url_template)?;
        if !host.is_empty() {
            let template = Template::parse(&host)?;
            let Some(host_ref) = self.locate_host(&template)? else {
                return Ok(None);
            };

            if path.is_empty() {
                return Err(RouterError::EmptyPathTemplate);
            }

            let host = self.host_by_ref_mut(&host_ref);
            return host
                .core
                .registered_resource_in(&rebuild_path(&path, secure, tslash));
        }

        if path == "/" {
            let Some(root) = &mut self.root else {
                return Ok(None);
            };

            root.core
                .flags
                .check_compatibility(secure, tslash, None)?;
            return Ok(Some(root));
        }

        match &mut self.root {
            None => Ok(None),
            Some(root) => root
                .core
                .registered_resource_in(&rebuild_path(&path, secure, tslash)),
        }
    }

    /// Reconfigure the existing resource at the URL.
    pub fn configure_path(&mut self, url: &str, config: Config) -> Result<(), RouterError> {
        match self.registered_resource(url)? {
            Some(resource) => {
                resource.configure(config);
                Ok(())
            }
            None => Err(RouterError::NonExistentResource),
        }
    }

    /// The configuration of the existing resource at the URL.
    pub fn path_config(&mut self, url: &str) -> Result<Config, RouterError> {
        match self.registered_resource(url)? {
            Some(resource) => Ok(resource.config()),
            None => Err(RouterError::NonExistentResource),
        }
    }

    /// Set the HTTP method handlers of the resource at the URL, creating
    /// the resource — and its host, for an absolute URL — when it doesn't
    /// exist.
    pub fn set_path_handler_for(
        &mut self,
        methods: &str,
        url: &str,
        handler: impl Handler + 'static,
    ) -> Result<(), RouterError> {
        self.resource(url)?.set_handler_for(methods, handler)
    }

    /// The HTTP method's handler of the existing resource at the URL.
    pub fn path_handler_of(
        &mut self,
        method: &str,
        url: &str,
    ) -> Result<Option<SharedHandler>, RouterError> {
        match self.registered_resource(url)? {
            Some(resource) => Ok(resource.handler_of(method)),
            None => Err(RouterError::NonExistentResource),
        }
    }

    /// Wrap the listed method handlers of the existing resource at the URL.
    pub fn wrap_path_handler_of(
        &mut self,
        methods: &str,
        url: &str,
        wrapper: impl Fn(SharedHandler) -> SharedHandler,
    ) -> Result<(), RouterError> {
        match self.registered_resource(url)? {
            Some(resource) => resource.core.wrap_handler_of(methods, &wrapper),
            None => Err(RouterError::NonExistentResource),
        }
    }

    /// Reconfigure every responder in the router.
    pub fn configure_all(&mut self, config: Config) {
        for host in self.static_hosts.values_mut() {
            host.configure(config);
            host.core.configure_subtree_in(config);
        }

        for host in &mut self.pattern_hosts {
            host.configure(config);
            host.core.configure_subtree_in(config);
        }

        if let Some(root) = &mut self.root {
            root.configure(config);
            root.core.configure_subtree_in(config);
        }
    }

    /// Wrap the listed method handlers on every responder in the router;
    /// placeholders without handlers are skipped.
    pub fn wrap_all_handlers_of(
        &mut self,
        methods: &str,
        wrapper: impl Fn(SharedHandler) -> SharedHandler,
    ) -> Result<(), RouterError> {
        for host in self.static_hosts.values_mut() {
            if host.can_handle_request() {
                host.core.handlers.wrap(methods, &wrapper)?;
            }

            host.core.wrap_subtree_handlers_in(methods, &wrapper)?;
        }

        for host in &mut self.pattern_hosts {
            if host.can_handle_request() {
                host.core.handlers.wrap(methods, &wrapper)?;
            }

            host.core.wrap_subtree_handlers_in(methods, &wrapper)?;
        }

        if let Some(root) = &mut self.root {
            if root.can_handle_request() {
                root.core.handlers.wrap(methods, &wrapper)?;
            }

            root.core.wrap_subtree_handlers_in(methods, &wrapper)?;
        }

        Ok(())
    }

    // ----- dispatch -----

    /// Dispatch a request through the tree and produce its response.
    ///
    /// Safe to call from many threads at once; the tree must not be mutated
    /// after the first call.
    pub fn serve(&self, request: &Request) -> Response {
        let mut args = self.pool.acquire();
        args.init(request);

        debug!(
            method = %request.method,
            host = %request.host,
            path = %request.path,
            "route match attempt"
        );

        let outcome = self.route(request, &mut args);
        let response = match outcome {
            Some(response) => response,
            None => {
                warn!(
                    method = %request.method,
                    host = %request.host,
                    path = %request.path,
                    "no route matched"
                );

                match &self.not_found {
                    Some(handler) => handler.handle(request, &mut args),
                    None => NOT_FOUND_HANDLER.handle(request, &mut args),
                }
            }
        };

        self.pool.release(args);
        response
    }

    fn route(&self, request: &Request, args: &mut Args) -> Option<Response> {
        if !request.host.is_empty() {
            if let Some(host) = self.static_hosts.get(request.host.as_str()) {
                return host.core.handle(request, args, 1);
            }

            for host in &self.pattern_hosts {
                if host
                    .core
                    .template
                    .matches(&request.host, args.values_mut())
                {
                    return host.core.handle(request, args, 1);
                }
            }
        }

        let root = self.root.as_ref()?;
        root.core.handle(request, args, 1)
    }
}

/// Rebuild a path template string carrying the scheme and trailing-slash
/// properties split off by `split_host_and_path`, for handing down to the
/// per-node operations that split it again.
fn rebuild_path(path: &str, secure: bool, tslash: bool) -> String {
    let mut out = String::with_capacity(path.len() + 10);
    if secure {
        out.push_str("https://");
    }

    out.push_str(path);
    if tslash {
        out.push('/');
    }

    out
}
