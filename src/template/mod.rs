//! # Template Module
//!
//! The template module implements the URL template DSL used to describe
//! hosts and path segments.
//!
//! ## Overview
//!
//! A template string mixes three kinds of parts:
//!
//! - **static literals** that must match verbatim,
//! - **value patterns** `{name:regex}` that capture the matched text under
//!   `name`,
//! - at most one **wildcard** `{name}` that captures everything its
//!   neighbors leave over.
//!
//! A template may carry its own name with a `$name:` prefix. Without one, a
//! template with exactly one dynamic slice takes that slice's value name as
//! its own.
//!
//! ## Example
//!
//! ```rust
//! use routrie::{Template, TemplateValues};
//!
//! let tmpl = Template::parse("$item:{id:[0-9]+}-{rest}").unwrap();
//! assert_eq!(tmpl.name(), Some("item"));
//!
//! let mut values = TemplateValues::new();
//! assert!(tmpl.matches("42-left-overs", &mut values));
//! assert_eq!(values.get("id"), Some("42"));
//! assert_eq!(values.get("rest"), Some("left-overs"));
//! ```
//!
//! ## Matching
//!
//! Matching is anchored from both ends: parts left of the wildcard consume
//! the input from the start, parts right of it consume from the end, and the
//! remainder belongs to the wildcard. Templates match a whole host string or
//! a whole path segment at once; there is no streaming.

mod core;
mod parser;
#[cfg(test)]
mod tests;

pub use self::core::{Similarity, Template, TemplateValues, MAX_INLINE_VALUES};
pub(crate) use self::parser::template_name_and_content;
