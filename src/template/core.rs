//! Template type and its matching, rendering, and comparison operations.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use smallvec::SmallVec;

use crate::error::{RouterError, TemplateError};

/// Maximum number of captured host/path values before heap allocation.
/// Most URLs carry a handful of dynamic segments at most.
pub const MAX_INLINE_VALUES: usize = 8;

/// Values captured from the host and path segments of a request URL,
/// keyed by the value names of the matched templates.
///
/// Value names are `Arc<str>` shared with the templates that captured them,
/// so recording a capture never copies the name. Lookups use "last write
/// wins" semantics, although registration guarantees value names are unique
/// within any single URL.
#[derive(Debug, Clone, Default)]
pub struct TemplateValues(SmallVec<[(Arc<str>, String); MAX_INLINE_VALUES]>);

impl TemplateValues {
    /// Create an empty value list.
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Get a captured value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Record a captured value.
    pub fn push(&mut self, name: Arc<str>, value: String) {
        self.0.push((name, value));
    }

    /// Number of recorded values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no values have been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, value)` pairs in recording order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// Drop all values recorded at or after `len`, keeping the backing
    /// buffer allocated.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Clear the list, keeping the backing buffer allocated.
    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}

impl<N: Into<Arc<str>>, V: Into<String>> FromIterator<(N, V)> for TemplateValues {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect())
    }
}

/// Degree of difference between two templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Similarity {
    /// The templates have different static and/or pattern parts.
    Different,
    /// The templates have the same static and pattern parts but different
    /// value names for their patterns.
    DifferentValueNames,
    /// The templates are identical except for their names.
    DifferentNames,
    /// The templates have no differences.
    TheSame,
}

impl Similarity {
    /// Convert the similarity into a result: [`Similarity::TheSame`] is
    /// `Ok(())`, every other degree is the corresponding error.
    pub fn as_error(self) -> Result<(), RouterError> {
        match self {
            Similarity::TheSame => Ok(()),
            Similarity::Different => Err(RouterError::DifferentTemplates),
            Similarity::DifferentValueNames => Err(RouterError::DifferentValueNames),
            Similarity::DifferentNames => Err(RouterError::DifferentNames),
        }
    }
}

/// A named value pattern of a template.
///
/// The regex is `None` exactly when the pattern is the template's wildcard.
/// `source` keeps the pattern as written in the template string; `regex`
/// compiles it with an anchor chosen by the pattern's position relative to
/// the wildcard (see the parser).
#[derive(Debug)]
pub(crate) struct ValuePattern {
    pub(crate) name: Arc<str>,
    pub(crate) source: Option<Box<str>>,
    pub(crate) regex: Option<Regex>,
}

/// One slice of a parsed template: a static literal or a dynamic value
/// pattern. Dynamic slices with a repeated value name share one
/// [`ValuePattern`].
#[derive(Debug, Clone)]
pub(crate) enum TemplateSlice {
    Static(Box<str>),
    Dynamic(Arc<ValuePattern>),
}

/// The parsed template of a host or resource.
///
/// A template mixes static literals with `{name:pattern}` value patterns and
/// at most one `{name}` wildcard. If the template has no explicit `$name:`
/// prefix and exactly one dynamic slice, that slice's value name becomes the
/// template's name.
///
/// A repeated value name may omit its pattern; when the template matches, all
/// occurrences of the name must capture the same text.
///
/// The colon in a template name or value name, the curly braces in a static
/// part, and a `$` at the very start of the content can be escaped with a
/// backslash.
///
/// Some examples:
///
/// ```text
/// $orders:list
/// {id:[0-9]+}
/// {slug}
/// $page:{lang:[a-z]{2}}-{rest}
/// \$literal-dollar{tail}
/// ```
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) name: Option<Arc<str>>,
    pub(crate) slices: Vec<TemplateSlice>,
    pub(crate) wildcard_index: Option<usize>,
}

impl Template {
    /// Parse a template string.
    pub fn parse(template: &str) -> Result<Template, TemplateError> {
        super::parser::parse_template(template)
    }

    /// The template's name, used as the name of the host or resource it
    /// belongs to.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Rename the template. The name becomes the name of the host or
    /// resource.
    pub fn set_name(&mut self, name: impl Into<Arc<str>>) {
        self.name = Some(name.into());
    }

    /// True when the template is a single static literal.
    pub fn is_static(&self) -> bool {
        matches!(self.slices.as_slice(), [TemplateSlice::Static(_)])
    }

    /// True when the template is a single wildcard with no statics or
    /// patterns.
    pub fn is_wildcard(&self) -> bool {
        match self.slices.as_slice() {
            [TemplateSlice::Dynamic(vp)] => vp.regex.is_none(),
            _ => false,
        }
    }

    /// True when the template contains at least one value pattern.
    pub fn has_pattern(&self) -> bool {
        self.slices.iter().any(|s| match s {
            TemplateSlice::Dynamic(vp) => vp.regex.is_some(),
            TemplateSlice::Static(_) => false,
        })
    }

    /// The unescaped content of a static template.
    pub(crate) fn static_content(&self) -> Option<&str> {
        match self.slices.as_slice() {
            [TemplateSlice::Static(s)] => Some(s),
            _ => None,
        }
    }

    /// True for the root resource template `/`.
    pub(crate) fn is_root(&self) -> bool {
        self.static_content() == Some("/")
    }

    /// The distinct value names of the template's dynamic slices, in first
    /// appearance order.
    pub(crate) fn value_names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = Vec::new();
        for slice in &self.slices {
            if let TemplateSlice::Dynamic(vp) = slice {
                if !names.iter().any(|n| n == &vp.name) {
                    names.push(vp.name.clone());
                }
            }
        }

        names
    }

    /// True when any of `names` is a value name of this template.
    pub(crate) fn has_any_value_name(&self, names: &[Arc<str>]) -> bool {
        self.slices.iter().any(|s| match s {
            TemplateSlice::Dynamic(vp) => names.iter().any(|n| n.as_ref() == vp.name.as_ref()),
            TemplateSlice::Static(_) => false,
        })
    }

    /// Compare this template with another one and return the degree of
    /// their difference.
    pub fn similarity(&self, other: &Template) -> Similarity {
        if self.is_static() {
            if other.is_static() && self.static_content() == other.static_content() {
                if self.name != other.name {
                    return Similarity::DifferentNames;
                }

                return Similarity::TheSame;
            }

            return Similarity::Different;
        }

        if self.is_wildcard() {
            if !other.is_wildcard() {
                return Similarity::Different;
            }

            let (wc, other_wc) = match (&self.slices[0], &other.slices[0]) {
                (TemplateSlice::Dynamic(a), TemplateSlice::Dynamic(b)) => (a, b),
                _ => return Similarity::Different,
            };

            if wc.name != other_wc.name {
                return Similarity::DifferentValueNames;
            }

            if self.name != other.name {
                return Similarity::DifferentNames;
            }

            return Similarity::TheSame;
        }

        if other.is_static() || other.is_wildcard() {
            return Similarity::Different;
        }

        if self.wildcard_index != other.wildcard_index
            || self.slices.len() != other.slices.len()
        {
            return Similarity::Different;
        }

        let mut similarity = Similarity::TheSame;
        for (a, b) in self.slices.iter().zip(&other.slices) {
            match (a, b) {
                (TemplateSlice::Static(sa), TemplateSlice::Static(sb)) => {
                    if sa != sb {
                        return Similarity::Different;
                    }
                }
                (TemplateSlice::Dynamic(va), TemplateSlice::Dynamic(vb)) => {
                    if va.source != vb.source {
                        return Similarity::Different;
                    }

                    if va.name != vb.name {
                        similarity = Similarity::DifferentValueNames;
                    }
                }
                _ => return Similarity::Different,
            }
        }

        if similarity == Similarity::TheSame && self.name != other.name {
            similarity = Similarity::DifferentNames;
        }

        similarity
    }

    /// Match a string against the template, recording captured values into
    /// `values`. On a failed match `values` is left exactly as it was.
    ///
    /// Matching consumes static literals and patterns from the left up to the
    /// wildcard, then from the right down to it (the rightmost occurrence of
    /// each right-side pattern wins); whatever remains becomes the wildcard's
    /// value. A repeated value name must capture the same text at every
    /// occurrence.
    pub fn matches(&self, input: &str, values: &mut TemplateValues) -> bool {
        if let Some(content) = self.static_content() {
            return content == input;
        }

        if self.is_wildcard() {
            if let TemplateSlice::Dynamic(vp) = &self.slices[0] {
                values.push(vp.name.clone(), input.to_string());
            }

            return true;
        }

        let checkpoint = values.len();
        let mut rest = input;
        let bound = self.wildcard_index.unwrap_or(self.slices.len());

        for slice in &self.slices[..bound] {
            match slice {
                TemplateSlice::Static(s) => match rest.strip_prefix(s.as_ref()) {
                    Some(r) => rest = r,
                    None => {
                        values.truncate(checkpoint);
                        return false;
                    }
                },
                TemplateSlice::Dynamic(vp) => {
                    let re = vp
                        .regex
                        .as_ref()
                        .expect("a dynamic slice before the wildcard always has a regex");
                    let end = match re.find(rest) {
                        Some(m) => m.end(),
                        None => {
                            values.truncate(checkpoint);
                            return false;
                        }
                    };

                    if !record_value(values, vp, &rest[..end]) {
                        values.truncate(checkpoint);
                        return false;
                    }

                    rest = &rest[end..];
                }
            }
        }

        if bound < self.slices.len() {
            for slice in self.slices[bound + 1..].iter().rev() {
                match slice {
                    TemplateSlice::Static(s) => match rest.strip_suffix(s.as_ref()) {
                        Some(r) => rest = r,
                        None => {
                            values.truncate(checkpoint);
                            return false;
                        }
                    },
                    TemplateSlice::Dynamic(vp) => {
                        let re = vp
                            .regex
                            .as_ref()
                            .expect("a dynamic slice after the wildcard always has a regex");
                        let start = match re.find_iter(rest).last() {
                            Some(m) => m.start(),
                            None => {
                                values.truncate(checkpoint);
                                return false;
                            }
                        };

                        if !record_value(values, vp, &rest[start..]) {
                            values.truncate(checkpoint);
                            return false;
                        }

                        rest = &rest[..start];
                    }
                }
            }
        }

        match self.wildcard_index {
            Some(idx) => {
                if !rest.is_empty() {
                    if let TemplateSlice::Dynamic(vp) = &self.slices[idx] {
                        values.push(vp.name.clone(), rest.to_string());
                    }
                }
            }
            None => {
                if !rest.is_empty() {
                    values.truncate(checkpoint);
                    return false;
                }
            }
        }

        true
    }

    /// Substitute `values` into the template's dynamic slices.
    ///
    /// A substituted value must be matched in full by its value pattern,
    /// otherwise [`TemplateError::InvalidValue`] is returned. A missing value
    /// is skipped when `ignore_missing` is set and is
    /// [`TemplateError::MissingValue`] otherwise.
    pub fn apply(
        &self,
        values: &TemplateValues,
        ignore_missing: bool,
    ) -> Result<String, TemplateError> {
        let mut out = String::new();
        for slice in &self.slices {
            match slice {
                TemplateSlice::Static(s) => out.push_str(s),
                TemplateSlice::Dynamic(vp) => match values.get(&vp.name) {
                    Some(v) => {
                        if let Some(re) = &vp.regex {
                            let whole = re
                                .find(v)
                                .map(|m| m.start() == 0 && m.end() == v.len())
                                .unwrap_or(false);
                            if !whole {
                                return Err(TemplateError::InvalidValue {
                                    name: vp.name.to_string(),
                                });
                            }
                        }

                        out.push_str(v);
                    }
                    None if ignore_missing => continue,
                    None => {
                        return Err(TemplateError::MissingValue {
                            name: vp.name.to_string(),
                        })
                    }
                },
            }
        }

        Ok(out)
    }

    /// The content of the template without its name, with curly braces
    /// re-escaped and a repeated value pattern omitted from its second
    /// occurrence on.
    pub fn content(&self) -> String {
        let mut out = String::new();
        let mut seen: Vec<&str> = Vec::new();

        if self.name.is_none() {
            if let Some(TemplateSlice::Static(s)) = self.slices.first() {
                if s.starts_with('$') {
                    out.push('\\');
                }
            }
        }

        for slice in &self.slices {
            match slice {
                TemplateSlice::Static(s) => {
                    for ch in s.chars() {
                        if ch == '{' || ch == '}' {
                            out.push('\\');
                        }

                        out.push(ch);
                    }
                }
                TemplateSlice::Dynamic(vp) => {
                    out.push('{');
                    push_colon_escaped(&mut out, &vp.name);
                    if let Some(source) = &vp.source {
                        if !seen.contains(&vp.name.as_ref()) {
                            out.push(':');
                            out.push_str(source);
                            seen.push(&vp.name);
                        }
                    }

                    out.push('}');
                }
            }
        }

        out
    }
}

/// Record a capture, or verify it against an earlier capture of the same
/// value name. Returns false when a repeated name captured different text.
fn record_value(values: &mut TemplateValues, vp: &ValuePattern, captured: &str) -> bool {
    match values.get(&vp.name) {
        Some(existing) => existing == captured,
        None => {
            values.push(vp.name.clone(), captured.to_string());
            true
        }
    }
}

fn push_colon_escaped(out: &mut String, s: &str) {
    for ch in s.chars() {
        if ch == ':' {
            out.push('\\');
        }

        out.push(ch);
    }
}

impl fmt::Display for Template {
    /// Renders the template's string form; `Template::parse` accepts the
    /// result and produces an equivalent template.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            let mut prefix = String::with_capacity(name.len() + 2);
            prefix.push('$');
            push_colon_escaped(&mut prefix, name);
            prefix.push(':');
            f.write_str(&prefix)?;
        }

        f.write_str(&self.content())
    }
}
