//! # Responder Tree Module
//!
//! Hosts and resources form a trie keyed by URL templates. Each node owns
//! its template, its configuration, a method→handler table, and three child
//! buckets — a static map, an ordered pattern list, and a wildcard slot.
//!
//! ## Registration
//!
//! The tree is built single-threaded, before the first request. Resources
//! are created detached, configured, and moved into the tree; the
//! registration protocol resolves prefix paths, enforces that names and
//! value names stay unique within any URL, and merges template collisions
//! toward whichever side has request handlers.
//!
//! ## Dispatch
//!
//! Dispatch walks from a host (or the root resource) downward, consuming
//! one path segment per level and trying children in static → pattern →
//! wildcard order. A node configured as a subtree handler picks up requests
//! no descendant claims. The tree is read-only during dispatch; per-request
//! state lives in [`Args`].

mod dispatch;
mod node;
mod registration;
#[cfg(test)]
mod tests;

pub use self::dispatch::Args;
pub use self::node::{Host, Resource};
pub(crate) use self::node::{ChildRef, ResponderCore, ResponderKind};
pub(crate) use self::registration::Ancestors;
