//! The registration protocol: child resolution by template, hierarchical
//! uniqueness checks, URL template validation, prefix materialization, and
//! collision resolution.
//!
//! Registration fails fast. Every operation validates against the current
//! tree — including a dry run of any collision merge — before the first
//! mutation, so an error never leaves a half-registered node behind.

use tracing::{debug, info};

use crate::config::{Config, ConfigFlags};
use crate::error::RouterError;
use crate::handler::{Handler, SharedHandler};
use crate::template::{template_name_and_content, Similarity, Template};
use crate::tree::node::{ChildRef, Host, Resource, ResponderCore, ResponderKind};
use crate::url::{
    decode_encoded_slash, split_host_and_path, split_path_segments, PathSegmentIterator,
    UrlTemplate,
};

/// The templates above a registration point: the enclosing host (when known)
/// and the chain of resource templates from just below the host down to the
/// registration point itself. Name-uniqueness checks walk this chain; prefix
/// path templates are validated against it segment by segment.
#[derive(Clone)]
pub(crate) struct Ancestors {
    pub(crate) host: Option<Template>,
    pub(crate) chain: Vec<Template>,
}

impl Ancestors {
    pub(crate) fn below_host(host: Template) -> Ancestors {
        Ancestors {
            host: Some(host),
            chain: Vec::new(),
        }
    }

    pub(crate) fn below_resource(resource: Template) -> Ancestors {
        Ancestors {
            host: None,
            chain: vec![resource],
        }
    }

    fn templates(&self) -> impl Iterator<Item = &Template> {
        self.host.iter().chain(self.chain.iter())
    }

    /// The name and every value name of `template` must be unique on the
    /// path up to and including the host.
    pub(crate) fn check_template(&self, template: &Template) -> Result<(), RouterError> {
        let value_names = template.value_names();
        let name = template.name();
        if name.is_none() && value_names.is_empty() {
            return Ok(());
        }

        for ancestor in self.templates() {
            if let Some(name) = name {
                if ancestor.name() == Some(name) {
                    return Err(RouterError::DuplicateNameInTheUrl);
                }
            }

            if ancestor.has_any_value_name(&value_names) {
                return Err(RouterError::DuplicateValueNameInTheUrl);
            }
        }

        Ok(())
    }

    /// Every descendant of `resource` must also satisfy
    /// [`check_template`](Ancestors::check_template) against this chain.
    pub(crate) fn check_subtree(&self, resource: &Resource) -> Result<(), RouterError> {
        for child in resource.core.children() {
            self.check_template(&child.core.template)?;
            self.check_subtree(child)?;
        }

        Ok(())
    }
}

/// The outcome of resolving a path's segments against the existing tree:
/// refs to the nodes that already exist, then the templates of the segments
/// that still have to be materialized as dummy resources.
pub(crate) struct SegmentWalk {
    pub(crate) refs: Vec<ChildRef>,
    pub(crate) new_templates: Vec<Template>,
}

impl ResponderCore {
    /// The existing child whose template has the same shape as `template`:
    /// the same static content, the same patterns, or the wildcard slot. A
    /// shape match with different names or value names is an error rather
    /// than a miss.
    pub(crate) fn locate_child(
        &self,
        template: &Template,
    ) -> Result<Option<ChildRef>, RouterError> {
        if let Some(content) = template.static_content() {
            let Some(child) = self.static_children.get(content) else {
                return Ok(None);
            };

            if child.core.template.name() != template.name() {
                return Err(RouterError::DifferentNames);
            }

            return Ok(Some(ChildRef::Static(
                content.to_string().into_boxed_str(),
            )));
        }

        if template.is_wildcard() {
            let Some(wildcard) = &self.wildcard_child else {
                return Ok(None);
            };

            return match wildcard.core.template.similarity(template) {
                Similarity::TheSame => Ok(Some(ChildRef::Wildcard)),
                similarity => similarity.as_error().map(|_| None),
            };
        }

        for (idx, child) in self.pattern_children.iter().enumerate() {
            match child.core.template.similarity(template) {
                Similarity::TheSame => return Ok(Some(ChildRef::Pattern(idx))),
                Similarity::Different => continue,
                similarity => return similarity.as_error().map(|_| None),
            }
        }

        Ok(None)
    }

    pub(crate) fn child_with_template(
        &self,
        template: &Template,
    ) -> Result<Option<&Resource>, RouterError> {
        Ok(self
            .locate_child(template)?
            .map(|child_ref| self.child_by_ref(&child_ref)))
    }

    /// A sibling other than the resource's own merge partner must not
    /// already claim the resource's name. The child with an equivalent
    /// template carries the same name by definition and is resolved by the
    /// collision merge instead.
    fn check_sibling_name(&self, resource: &Resource) -> Result<(), RouterError> {
        let Some(name) = resource.name() else {
            return Ok(());
        };

        if let Some(sibling) = self.child_named(name) {
            if sibling.core.template.similarity(&resource.core.template) != Similarity::TheSame {
                return Err(RouterError::DuplicateNameAmongSiblings);
            }
        }

        Ok(())
    }

    /// Dry run of [`absorb`](ResponderCore::absorb): verify the whole merge
    /// would succeed without touching the tree.
    pub(crate) fn absorb_check(&self, resource: &Resource) -> Result<(), RouterError> {
        let Some(existing) = self.child_with_template(&resource.core.template)? else {
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

            return Ok(());
        }

        if !existing.core.can_handle_request() {
            for child in existing.core.children() {
                resource.core.absorb_check(child)?;
            }

            return Ok(());
        }

        Err(RouterError::DuplicateResourceTemplate {
            template: resource.core.template.to_string(),
        })
    }

    /// Register `resource` as a child, resolving a template collision with
    /// an existing child by keeping whichever of the two has request
    /// handlers and passing the other one's children to it. When both can
    /// handle a request the registration is rejected.
    ///
    /// Callers run [`absorb_check`](ResponderCore::absorb_check) first, so
    /// this cannot fail halfway through a merge.
    pub(crate) fn absorb(&mut self, resource: Resource) -> Result<(), RouterError> {
        let Some(child_ref) = self.locate_child(&resource.core.template)? else {
            debug!(template = %resource.core.template, "resource registered");
            self.register_child(resource);
            return Ok(());
        };

        let flags = resource.core.flags;
        {
            let existing = self.child_by_ref_mut(&child_ref);
            existing.core.flags.check_compatibility(
                flags.contains(ConfigFlags::SECURE),
                flags.contains(ConfigFlags::TRAILING_SLASH),
                Some(flags),
            )?;
        }

        if !resource.core.can_handle_request() {
            let mut resource = resource;
            info!(
                template = %resource.core.template,
                "merging children into the existing resource"
            );
            for child in resource.core.take_children() {
                self.child_by_ref_mut(&child_ref).core.absorb(child)?;
            }

            return Ok(());
        }

        if !self.child_by_ref(&child_ref).core.can_handle_request() {
            info!(
                template = %resource.core.template,
                "replacing the placeholder resource"
            );
            let mut existing = self.remove_child(&child_ref);
            let mut resource = resource;
            for child in existing.core.take_children() {
                resource.core.absorb(child)?;
            }

            self.register_child(resource);
            return Ok(());
        }

        Err(RouterError::DuplicateResourceTemplate {
            template: self.child_by_ref(&child_ref).core.template.to_string(),
        })
    }

    /// Resolve path segments against the existing children, extending
    /// `ancestors` with every segment template on the way down. Segments
    /// past the first missing one become templates for dummy resources.
    pub(crate) fn plan_segment_walk(
        &self,
        segments: &[String],
        ancestors: &mut Ancestors,
    ) -> Result<SegmentWalk, RouterError> {
        let mut refs = Vec::new();
        let mut new_templates: Vec<Template> = Vec::new();
        let mut current = self;

        for segment in segments {
            let template = Template::parse(segment)?;
            if new_templates.is_empty() {
                if let Some(child_ref) = current.locate_child(&template)? {
                    let child = current.child_by_ref(&child_ref);
                    ancestors.chain.push(child.core.template.clone());
                    refs.push(child_ref);
                    current = &child.core;
                    continue;
                }
            }

            if !template.is_static() && template.name().is_none() {
                return Err(RouterError::UnnamedResource);
            }

            ancestors.check_template(&template)?;
            ancestors.chain.push(template.clone());
            new_templates.push(template);
        }

        Ok(SegmentWalk {
            refs,
            new_templates,
        })
    }

    /// Navigate to the resource at the end of a non-empty ref path.
    pub(crate) fn child_at_refs_mut(&mut self, refs: &[ChildRef]) -> &mut Resource {
        let (last, parents) = refs
            .split_last()
            .expect("navigation is only used with at least one ref");
        self.descend_mut(parents).child_by_ref_mut(last)
    }

    fn descend_new_chain_mut<'a>(
        core: &'a mut ResponderCore,
        templates: &[Template],
    ) -> &'a mut Resource {
        let (first, rest) = templates
            .split_first()
            .expect("the new chain always has at least one segment");
        let child_ref = core
            .locate_child(first)
            .ok()
            .flatten()
            .expect("the new chain was just attached");
        let child = core.child_by_ref_mut(&child_ref);
        if rest.is_empty() {
            child
        } else {
            Self::descend_new_chain_mut(&mut child.core, rest)
        }
    }

    /// Nest `templates` into a chain of dummy resources, with `leaf` (when
    /// given) attached under the last one. Returns the chain's head.
    fn build_dummy_chain(templates: &[Template], leaf: Option<Resource>) -> Option<Resource> {
        let mut node = leaf;
        for template in templates.iter().rev() {
            let mut dummy = Resource::dummy(template.clone());
            if let Some(child) = node.take() {
                dummy.core.register_child(child);
            }

            node = Some(dummy);
        }

        node
    }

    /// Find the resource at `path` below this node, creating it — and any
    /// missing prefix segments — when it doesn't exist yet.
    pub(crate) fn resource_at(
        &mut self,
        mut ancestors: Ancestors,
        path: &str,
        config: Option<Config>,
    ) -> Result<&mut Resource, RouterError> {
        let (host, path, secure, tslash) = split_host_and_path(path)?;
        if !host.is_empty() {
            return Err(RouterError::NonRouterParent);
        }

        if path.is_empty() {
            return Err(RouterError::EmptyPathTemplate);
        }

        if let Some(config) = &config {
            if config.redirect_insecure_request && !secure {
                return Err(RouterError::ConflictingSecurity);
            }
        }

        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };

        let (segments, root, _) = split_path_segments(&path)?;
        if root {
            return Err(RouterError::NonRouterParent);
        }

        let walk = self.plan_segment_walk(&segments, &mut ancestors)?;
        let required = config.map(Config::as_flags);

        if walk.new_templates.is_empty() {
            let target = self.child_at_refs_mut(&walk.refs);
            target
                .core
                .flags
                .check_compatibility(secure, tslash, required)?;
            return Ok(target);
        }

        let mut dummies = walk.new_templates.clone();
        let mut last = Resource::dummy(
            dummies
                .pop()
                .expect("the new chain always has at least one segment"),
        );
        last.core
            .flags
            .check_compatibility(secure, tslash, required)?;

        let attach = self.descend(&walk.refs);
        let head_template = &walk.new_templates[0];
        if let Some(name) = head_template.name() {
            if attach.child_named(name).is_some() {
                return Err(RouterError::DuplicateNameAmongSiblings);
            }
        }

        let chain = Self::build_dummy_chain(&dummies, Some(last))
            .expect("the new chain always has at least one segment");

        let attach = self.descend_mut(&walk.refs);
        debug!(template = %chain.core.template, "materializing prefix path segments");
        attach.register_child(chain);
        Ok(Self::descend_new_chain_mut(attach, &walk.new_templates))
    }

    /// Register `resource` below this node, after resolving its own URL
    /// template (when it has one) against the actual position in the tree.
    pub(crate) fn register_in(
        &mut self,
        ancestors: &Ancestors,
        resource: Resource,
    ) -> Result<(), RouterError> {
        if resource.is_root() {
            return Err(RouterError::NonRouterParent);
        }

        let template = &resource.core.template;
        if !template.is_static() && template.name().is_none() {
            return Err(RouterError::UnnamedResource);
        }

        ancestors.check_template(template)?;
        ancestors.check_subtree(&resource)?;

        if let Some(url_template) = resource.url_template.clone() {
            let remaining = self.validate_url(ancestors, &url_template)?;
            if !remaining.is_empty() {
                return self.attach_under(ancestors.clone(), &remaining, resource);
            }
        }

        self.check_sibling_name(&resource)?;
        self.absorb_check(&resource)?;
        self.absorb(resource)
    }

    /// Register `resource` under the prefix path below this node,
    /// reconciling the prefix with the resource's own URL template when it
    /// carries one. Missing prefix segments are materialized as dummies.
    pub(crate) fn register_under_in(
        &mut self,
        ancestors: Ancestors,
        prefix_path: &str,
        resource: Resource,
    ) -> Result<(), RouterError> {
        if resource.is_root() {
            return Err(RouterError::NonRouterParent);
        }

        let template = &resource.core.template;
        if !template.is_static() && template.name().is_none() {
            return Err(RouterError::UnnamedResource);
        }

        ancestors.check_template(template)?;
        ancestors.check_subtree(&resource)?;

        let mut prefix = prefix_path.to_string();
        if prefix == "/" {
            if self.kind == ResponderKind::Host {
                prefix.clear();
            } else {
                return Err(RouterError::NonRouterParent);
            }
        }

        if !prefix.is_empty() && !prefix.starts_with('/') {
            prefix.insert(0, '/');
        }

        if let Some(url_template) = resource.url_template.clone() {
            if !url_template.prefix_path.is_empty() {
                let trimmed = prefix.strip_suffix('/').unwrap_or(&prefix);
                if trimmed.len() > url_template.prefix_path.len() {
                    return Err(RouterError::ConflictingPath);
                }

                // The caller's prefix names the lower part of the
                // resource's own prefix path; only the part above it is
                // validated against the existing chain.
                let upper = match url_template.prefix_path.strip_suffix(trimmed) {
                    Some(upper) => upper,
                    None => url_template.prefix_path.as_str(),
                };

                let remaining = self.validate_url(
                    &ancestors,
                    &UrlTemplate {
                        host: url_template.host.clone(),
                        prefix_path: upper.to_string(),
                    },
                )?;

                if !remaining.is_empty() {
                    return Err(RouterError::ConflictingPath);
                }
            } else if !url_template.host.is_empty() {
                self.validate_url(&ancestors, &url_template)?;
            }
        }

        if prefix.is_empty() {
            self.check_sibling_name(&resource)?;
            self.absorb_check(&resource)?;
            return self.absorb(resource);
        }

        self.attach_under(ancestors, &prefix, resource)
    }

    fn attach_under(
        &mut self,
        mut ancestors: Ancestors,
        prefix: &str,
        resource: Resource,
    ) -> Result<(), RouterError> {
        let (segments, root, _) = split_path_segments(prefix)?;
        if root {
            if self.kind != ResponderKind::Host {
                return Err(RouterError::NonRouterParent);
            }

            self.check_sibling_name(&resource)?;
            self.absorb_check(&resource)?;
            return self.absorb(resource);
        }

        let walk = self.plan_segment_walk(&segments, &mut ancestors)?;

        // The prefix sits between the registration point and the resource;
        // the resource and its subtree must stay unique against it too.
        ancestors.check_template(&resource.core.template)?;
        ancestors.check_subtree(&resource)?;

        if walk.new_templates.is_empty() {
            let attach = self.descend(&walk.refs);
            attach.check_sibling_name(&resource)?;
            attach.absorb_check(&resource)?;
            return self.descend_mut(&walk.refs).absorb(resource);
        }

        let attach = self.descend(&walk.refs);
        if let Some(name) = walk.new_templates[0].name() {
            if attach.child_named(name).is_some() {
                return Err(RouterError::DuplicateNameAmongSiblings);
            }
        }

        let chain = Self::build_dummy_chain(&walk.new_templates, Some(resource))
            .expect("the new chain always has at least one segment");
        self.descend_mut(&walk.refs).register_child(chain);
        Ok(())
    }

    /// Validate a resource's URL template against the host and the ancestor
    /// chain, returning the prefix path part below the registration point.
    fn validate_url(
        &self,
        ancestors: &Ancestors,
        url_template: &UrlTemplate,
    ) -> Result<String, RouterError> {
        if !url_template.host.is_empty() {
            let Some(host) = &ancestors.host else {
                return Err(RouterError::ConflictingHost);
            };

            let template = Template::parse(&url_template.host)?;
            if template.is_wildcard() {
                return Err(RouterError::WildcardHostTemplate);
            }

            host.similarity(&template).as_error()?;
        }

        let mut iter = PathSegmentIterator::new(&url_template.prefix_path);
        for ancestor in &ancestors.chain {
            let segment = iter.next_segment();
            if segment.is_empty() {
                return Err(RouterError::ConflictingPath);
            }

            let template = Template::parse(&decode_encoded_slash(segment))?;
            if ancestor.similarity(&template) != Similarity::TheSame {
                return Err(RouterError::ConflictingPathSegment {
                    segment: segment.to_string(),
                });
            }
        }

        Ok(iter.remaining_path().to_string())
    }

    /// Walk a lookup path below this node. Each segment may be a full
    /// template or just `$name`; an empty result means some segment had no
    /// matching child.
    fn find_registered(&self, path: &str) -> Result<Option<Vec<ChildRef>>, RouterError> {
        let mut refs = Vec::new();
        let mut current = self;
        let mut iter = PathSegmentIterator::new(path);

        loop {
            let segment = iter.next_segment();
            if segment.is_empty() {
                break;
            }

            let segment = decode_encoded_slash(segment);
            let (name, content) = template_name_and_content(&segment)?;
            let child_ref = if content.is_empty() {
                match name.as_deref() {
                    None | Some("") => return Err(RouterError::EmptyPathSegmentTemplate),
                    Some(name) => current.locate_child_named(name),
                }
            } else {
                let template = Template::parse(&segment)?;
                current.locate_child(&template)?
            };

            match child_ref {
                Some(child_ref) => {
                    current = &current.child_by_ref(&child_ref).core;
                    refs.push(child_ref);
                }
                None => return Ok(None),
            }
        }

        if !iter.remaining_path().is_empty() {
            return Err(RouterError::EmptyPathSegmentTemplate);
        }

        Ok(Some(refs))
    }

    /// The registered resource reachable with the lookup path, whose scheme
    /// and trailing-slash properties must agree with the path's.
    pub(crate) fn registered_resource_in(
        &mut self,
        path: &str,
    ) -> Result<Option<&mut Resource>, RouterError> {
        let (host, path, secure, tslash) = split_host_and_path(path)?;
        if !host.is_empty() {
            return Err(RouterError::NonRouterParent);
        }

        if path.is_empty() {
            return Err(RouterError::EmptyPathTemplate);
        }

        if path == "/" {
            return Err(RouterError::NonRouterParent);
        }

        match self.find_registered(&path)? {
            None => Ok(None),
            Some(refs) => {
                let target = self.child_at_refs_mut(&refs);
                target
                    .core
                    .flags
                    .check_compatibility(secure, tslash, None)?;
                Ok(Some(target))
            }
        }
    }

    // ----- path-configuring wrappers over the operations above -----

    pub(crate) fn configure_path_in(
        &mut self,
        path: &str,
        config: Config,
    ) -> Result<(), RouterError> {
        match self.registered_resource_in(path)? {
            Some(resource) => {
                resource.configure(config);
                Ok(())
            }
            None => Err(RouterError::NonExistentResource),
        }
    }

    pub(crate) fn path_config_in(&mut self, path: &str) -> Result<Config, RouterError> {
        match self.registered_resource_in(path)? {
            Some(resource) => Ok(resource.config()),
            None => Err(RouterError::NonExistentResource),
        }
    }

    pub(crate) fn path_handler_of_in(
        &mut self,
        method: &str,
        path: &str,
    ) -> Result<Option<SharedHandler>, RouterError> {
        match self.registered_resource_in(path)? {
            Some(resource) => Ok(resource.handler_of(method)),
            None => Err(RouterError::NonExistentResource),
        }
    }

    pub(crate) fn wrap_path_handler_of_in(
        &mut self,
        methods: &str,
        path: &str,
        wrapper: &dyn Fn(SharedHandler) -> SharedHandler,
    ) -> Result<(), RouterError> {
        match self.registered_resource_in(path)? {
            Some(resource) => resource.core.wrap_handler_of(methods, wrapper),
            None => Err(RouterError::NonExistentResource),
        }
    }

    // ----- subtree sweeps -----

    pub(crate) fn for_each_descendant(
        &mut self,
        f: &mut dyn FnMut(&mut Resource) -> Result<(), RouterError>,
    ) -> Result<(), RouterError> {
        for child in self.static_children.values_mut() {
            f(child)?;
            child.core.for_each_descendant(f)?;
        }

        for child in &mut self.pattern_children {
            f(child)?;
            child.core.for_each_descendant(f)?;
        }

        if let Some(wildcard) = &mut self.wildcard_child {
            f(wildcard)?;
            wildcard.core.for_each_descendant(f)?;
        }

        Ok(())
    }

    pub(crate) fn configure_subtree_in(&mut self, config: Config) {
        let _ = self.for_each_descendant(&mut |resource| {
            resource.configure(config);
            Ok(())
        });
    }

    /// Wrap the listed method handlers on every resource below this node.
    /// Placeholders without any handlers are skipped.
    pub(crate) fn wrap_subtree_handlers_in(
        &mut self,
        methods: &str,
        wrapper: &dyn Fn(SharedHandler) -> SharedHandler,
    ) -> Result<(), RouterError> {
        self.for_each_descendant(&mut |resource| {
            if !resource.can_handle_request() {
                return Ok(());
            }

            resource.core.handlers.wrap(methods, wrapper)
        })
    }
}

impl Resource {
    fn ancestors(&self) -> Ancestors {
        Ancestors::below_resource(self.core.template.clone())
    }

    /// Find the resource at `path` below this resource, creating it — and
    /// any missing prefix segments — when it doesn't exist yet.
    ///
    /// An existing resource's scheme and trailing-slash properties must
    /// agree with the values in the path template; a newly created resource
    /// is configured from them. Names in the path must be unique in the URL
    /// and among their siblings.
    pub fn resource(&mut self, path: &str) -> Result<&mut Resource, RouterError> {
        let ancestors = self.ancestors();
        self.core.resource_at(ancestors, path, None)
    }

    /// Like [`resource`](Resource::resource), also checking (for an
    /// existing resource) or applying (for a new one) the config.
    pub fn resource_using_config(
        &mut self,
        path: &str,
        config: Config,
    ) -> Result<&mut Resource, RouterError> {
        let ancestors = self.ancestors();
        self.core.resource_at(ancestors, path, Some(config))
    }

    /// Register `resource` below this resource, resolving the host and
    /// prefix path of its URL template (when it has one) against the
    /// actual tree and materializing any missing prefix segments.
    pub fn register_resource(&mut self, resource: Resource) -> Result<(), RouterError> {
        let ancestors = self.ancestors();
        self.core.register_in(&ancestors, resource)
    }

    /// Register `resource` below this resource under the prefix path,
    /// creating prefix segment resources that don't exist yet. A trailing
    /// slash in the prefix is ignored.
    pub fn register_resource_under(
        &mut self,
        prefix_path: &str,
        resource: Resource,
    ) -> Result<(), RouterError> {
        let ancestors = self.ancestors();
        self.core.register_under_in(ancestors, prefix_path, resource)
    }

    /// The resource below this one reachable with the lookup path, in which
    /// each segment may be a full template or a `$name` reference. The
    /// path's scheme and trailing-slash properties must agree with the
    /// found resource's.
    pub fn registered_resource(
        &mut self,
        path: &str,
    ) -> Result<Option<&mut Resource>, RouterError> {
        self.core.registered_resource_in(path)
    }

    /// Reconfigure the existing resource at `path`.
    pub fn configure_path(&mut self, path: &str, config: Config) -> Result<(), RouterError> {
        self.core.configure_path_in(path, config)
    }

    /// The configuration of the existing resource at `path`.
    pub fn path_config(&mut self, path: &str) -> Result<Config, RouterError> {
        self.core.path_config_in(path)
    }

    /// Set the HTTP method handlers of the resource at `path`, creating the
    /// resource when it doesn't exist.
    pub fn set_path_handler_for(
        &mut self,
        methods: &str,
        path: &str,
        handler: impl Handler + 'static,
    ) -> Result<(), RouterError> {
        self.resource(path)?.set_handler_for(methods, handler)
    }

    /// The HTTP method's handler of the existing resource at `path`.
    pub fn path_handler_of(
        &mut self,
        method: &str,
        path: &str,
    ) -> Result<Option<SharedHandler>, RouterError> {
        self.core.path_handler_of_in(&method.to_uppercase(), path)
    }

    /// Wrap the listed method handlers of the existing resource at `path`.
    pub fn wrap_path_handler_of(
        &mut self,
        methods: &str,
        path: &str,
        wrapper: impl Fn(SharedHandler) -> SharedHandler,
    ) -> Result<(), RouterError> {
        self.core.wrap_path_handler_of_in(methods, path, &wrapper)
    }

    /// Reconfigure every resource below this one.
    pub fn configure_subtree(&mut self, config: Config) {
        self.core.configure_subtree_in(config);
    }

    /// Wrap the listed method handlers on every resource below this one;
    /// placeholders without handlers are skipped.
    pub fn wrap_subtree_handlers_of(
        &mut self,
        methods: &str,
        wrapper: impl Fn(SharedHandler) -> SharedHandler,
    ) -> Result<(), RouterError> {
        self.core.wrap_subtree_handlers_in(methods, &wrapper)
    }
}

impl Host {
    fn ancestors(&self) -> Ancestors {
        Ancestors::below_host(self.core.template.clone())
    }

    /// Find the resource at `path` below this host, creating it — and any
    /// missing prefix segments — when it doesn't exist yet; see
    /// [`Resource::resource`].
    pub fn resource(&mut self, path: &str) -> Result<&mut Resource, RouterError> {
        let ancestors = self.ancestors();
        self.core.resource_at(ancestors, path, None)
    }

    /// Like [`resource`](Self::resource), also checking or applying the
    /// config.
    pub fn resource_using_config(
        &mut self,
        path: &str,
        config: Config,
    ) -> Result<&mut Resource, RouterError> {
        let ancestors = self.ancestors();
        self.core.resource_at(ancestors, path, Some(config))
    }

    /// Register `resource` below this host; see
    /// [`Resource::register_resource`]. The host part of the resource's URL
    /// template, when present, must have the same template as this host.
    pub fn register_resource(&mut self, resource: Resource) -> Result<(), RouterError> {
        let ancestors = self.ancestors();
        self.core.register_in(&ancestors, resource)
    }

    /// Register `resource` under the prefix path below this host. A prefix
    /// of just `/` registers directly under the host.
    pub fn register_resource_under(
        &mut self,
        prefix_path: &str,
        resource: Resource,
    ) -> Result<(), RouterError> {
        let ancestors = self.ancestors();
        self.core.register_under_in(ancestors, prefix_path, resource)
    }

    /// The resource below this host reachable with the lookup path; see
    /// [`Resource::registered_resource`].
    pub fn registered_resource(
        &mut self,
        path: &str,
    ) -> Result<Option<&mut Resource>, RouterError> {
        self.core.registered_resource_in(path)
    }

    /// Reconfigure the existing resource at `path`.
    pub fn configure_path(&mut self, path: &str, config: Config) -> Result<(), RouterError> {
        self.core.configure_path_in(path, config)
    }

    /// The configuration of the existing resource at `path`.
    pub fn path_config(&mut self, path: &str) -> Result<Config, RouterError> {
        self.core.path_config_in(path)
    }

    /// Set the HTTP method handlers of the resource at `path`, creating the
    /// resource when it doesn't exist.
    pub fn set_path_handler_for(
        &mut self,
        methods: &str,
        path: &str,
        handler: impl Handler + 'static,
    ) -> Result<(), RouterError> {
        self.resource(path)?.set_handler_for(methods, handler)
    }

    /// The HTTP method's handler of the existing resource at `path`.
    pub fn path_handler_of(
        &mut self,
        method: &str,
        path: &str,
    ) -> Result<Option<SharedHandler>, RouterError> {
        self.core.path_handler_of_in(&method.to_uppercase(), path)
    }

    /// Wrap the listed method handlers of the existing resource at `path`.
    pub fn wrap_path_handler_of(
        &mut self,
        methods: &str,
        path: &str,
        wrapper: impl Fn(SharedHandler) -> SharedHandler,
    ) -> Result<(), RouterError> {
        self.core.wrap_path_handler_of_in(methods, path, &wrapper)
    }

    /// Reconfigure every resource below this host.
    pub fn configure_subtree(&mut self, config: Config) {
        self.core.configure_subtree_in(config);
    }

    /// Wrap the listed method handlers on every resource below this host;
    /// placeholders without handlers are skipped.
    pub fn wrap_subtree_handlers_of(
        &mut self,
        methods: &str,
        wrapper: impl Fn(SharedHandler) -> SharedHandler,
    ) -> Result<(), RouterError> {
        self.core.wrap_subtree_handlers_in(methods, &wrapper)
    }
}
