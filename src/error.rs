//! Error types returned by the template engine and the responder tree.
//!
//! Every failure mode is a distinct, matchable variant. Registration
//! operations fail fast: an error is returned before any part of the tree
//! is mutated, so a failed call never leaves a half-registered node behind.

use thiserror::Error;

/// Errors produced while parsing, matching, or rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template string is empty or structurally incomplete.
    #[error("invalid template: {reason}")]
    InvalidTemplate {
        /// What exactly was wrong (e.g. "unescaped curly brace '}' at index 4").
        reason: String,
    },

    /// A value passed to [`Template::apply`](crate::Template::apply) doesn't
    /// match the pattern of its value name.
    #[error("invalid value for {name:?}")]
    InvalidValue { name: String },

    /// A value required by [`Template::apply`](crate::Template::apply) was
    /// not supplied.
    #[error("missing value for {name:?}")]
    MissingValue { name: String },

    /// A repeated value name came with a pattern different from the one it
    /// was first defined with.
    #[error("different pattern for value {name:?}")]
    DifferentPattern { name: String },

    /// The wildcard's name appears a second time in the template.
    #[error("repeated wildcard name {name:?}")]
    RepeatedWildcardName { name: String },

    /// The template contains a second, differently named wildcard.
    #[error("another wildcard name {name:?}")]
    AnotherWildcardName { name: String },

    /// A value pattern is not a valid regular expression.
    #[error("invalid regex in template")]
    InvalidRegex(#[from] regex::Error),
}

/// Errors produced by the responder tree: host/resource construction,
/// registration, and lookup.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A template failed to parse or apply.
    #[error(transparent)]
    Template(#[from] TemplateError),

    // ----- similarity, surfaced as errors where equivalence is required -----
    /// Compared templates have different static and/or pattern parts.
    #[error("different templates")]
    DifferentTemplates,

    /// Compared templates differ only in the value names of their patterns.
    #[error("different value names")]
    DifferentValueNames,

    /// Compared templates are identical except for their names.
    #[error("different names")]
    DifferentNames,

    // ----- tree construction and registration -----
    /// A required argument was empty where a value was expected.
    #[error("nil argument")]
    NilArgument,

    /// A URL template's host part conflicts with the host the resource is
    /// (or is being) registered under.
    #[error("conflicting host")]
    ConflictingHost,

    /// A URL template's prefix path conflicts with the resource's actual
    /// position in the tree.
    #[error("conflicting path")]
    ConflictingPath,

    /// One prefix path segment template differs from the resource sitting at
    /// that position.
    #[error("conflicting path segment {segment:?}")]
    ConflictingPathSegment { segment: String },

    /// The scheme required by the argument differs from the scheme the node
    /// was configured with, or `redirect_insecure` was requested for an
    /// insecure node.
    #[error("conflicting security")]
    ConflictingSecurity,

    /// The trailing-slash property required by the argument differs from the
    /// node's configured one.
    #[error("conflicting trailing slash")]
    ConflictingTrailingSlash,

    /// The argument config requires flags the node was not configured with.
    #[error("conflicting config")]
    ConflictingConfig,

    /// A host template was required but empty.
    #[error("empty host template")]
    EmptyHostTemplate,

    /// A path template was required but empty.
    #[error("empty path template")]
    EmptyPathTemplate,

    /// A path template contains an empty segment.
    #[error("empty path segment template")]
    EmptyPathSegmentTemplate,

    /// A host template must not be a wildcard.
    #[error("wildcard host template")]
    WildcardHostTemplate,

    /// A host template string also carried a path.
    #[error("unwanted path template")]
    UnwantedPathTemplate,

    /// Only a router may parent a host or a root resource.
    #[error("non-router parent")]
    NonRouterParent,

    /// A non-static template carries no name: none was given and none could
    /// be derived from its dynamic slices.
    #[error("unnamed resource")]
    UnnamedResource,

    /// Two hosts with equivalent templates can both handle a request.
    #[error("duplicate host template")]
    DuplicateHostTemplate,

    /// Two sibling resources with equivalent templates can both handle a
    /// request.
    #[error("duplicate resource template {template}")]
    DuplicateResourceTemplate { template: String },

    /// The resource's name is already used by one of its ancestors.
    #[error("duplicate name in the URL")]
    DuplicateNameInTheUrl,

    /// A value name in the resource's template is already used by an
    /// ancestor's template.
    #[error("duplicate value name in the URL")]
    DuplicateValueNameInTheUrl,

    /// The resource's name is already used by one of its would-be siblings.
    #[error("duplicate name among siblings")]
    DuplicateNameAmongSiblings,

    /// The host has no request handler for any HTTP method, so the attempted
    /// operation (not-allowed handler, wrapping) has nothing to work on.
    #[error("dummy host")]
    DummyHost,

    /// The resource has no request handler for any HTTP method, so the
    /// attempted operation has nothing to work on.
    #[error("dummy resource")]
    DummyResource,

    /// Kept for API stability: with the owning tree a host is moved into the
    /// router at registration, so re-registering it cannot be expressed.
    #[error("registered host")]
    RegisteredHost,

    /// Kept for API stability: with the owning tree a resource is moved into
    /// its parent at registration, so re-registering it cannot be expressed.
    #[error("registered resource")]
    RegisteredResource,

    /// No host with the given template exists.
    #[error("non-existent host")]
    NonExistentHost,

    /// No resource at the given path exists.
    #[error("non-existent resource")]
    NonExistentResource,

    /// A wrap operation was called without middleware.
    #[error("no middleware")]
    NoMiddleware,

    /// No handler exists for one of the listed HTTP methods.
    #[error("no handler exists for method {method:?}")]
    NoHandlerExists { method: String },
}

impl RouterError {
    /// True when the error is one of the three similarity kinds.
    pub fn is_similarity(&self) -> bool {
        matches!(
            self,
            RouterError::DifferentTemplates
                | RouterError::DifferentValueNames
                | RouterError::DifferentNames
        )
    }
}
