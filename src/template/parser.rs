//! Template string parsing.
//!
//! A template string has an optional `$name:` prefix followed by content
//! that alternates static literals with `{name[:pattern]}` dynamic slices.
//! Patterns are scanned with a curly-brace depth counter; a backslash inside
//! a pattern passes the next byte through, and a `[...]` character class
//! suspends `}` depth tracking until it closes. `[]` and `[^]` do not close
//! a class: a `]` ends the class only when at least one content character
//! precedes it.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use super::core::{Template, TemplateSlice, ValuePattern};
use crate::error::TemplateError;

fn invalid(reason: impl Into<String>) -> TemplateError {
    TemplateError::InvalidTemplate {
        reason: reason.into(),
    }
}

/// Split a template string into its name and content.
///
/// A template starting with an unescaped `$` carries a name running up to
/// the first unescaped `:`; `\:` is kept in the name as a literal colon.
/// A leading `\$` is an escaped literal `$` belonging to the content.
pub(crate) fn template_name_and_content(
    template: &str,
) -> Result<(Option<String>, &str), TemplateError> {
    let bytes = template.as_bytes();
    if bytes.first() == Some(&b'$') {
        if bytes.len() == 1 {
            return Err(invalid("a name without content"));
        }

        let mut name = String::new();
        let mut i = 1;
        loop {
            match bytes[i..].iter().position(|&b| b == b':') {
                None => {
                    name.push_str(&template[i..]);
                    return Ok((Some(name), ""));
                }
                Some(offset) => {
                    let colon = i + offset;
                    if colon > i && bytes[colon - 1] == b'\\' {
                        name.push_str(&template[i..colon - 1]);
                        name.push(':');
                        i = colon + 1;
                        continue;
                    }

                    name.push_str(&template[i..colon]);
                    return Ok((Some(name), &template[colon + 1..]));
                }
            }
        }
    }

    if bytes.len() > 1 && bytes[0] == b'\\' && bytes[1] == b'$' {
        return Ok((None, &template[1..]));
    }

    Ok((None, template))
}

/// Read the static slice at the beginning of the content. Returns the
/// unescaped literal (possibly empty) and the rest of the content, which is
/// either empty or starts at an unescaped `{`.
fn static_slice(content: &str) -> Result<(String, &str), TemplateError> {
    let mut out = String::new();
    let mut from = 0;
    let mut prev = '\0';

    for (i, ch) in content.char_indices() {
        if ch == '{' {
            if prev != '\\' {
                out.push_str(&content[from..i]);
                return Ok((out, &content[i..]));
            }

            out.push_str(&content[from..i - 1]);
            out.push('{');
            from = i + 1;
        } else if ch == '}' {
            if prev != '\\' {
                return Err(invalid(format!(
                    "unescaped curly brace '}}' at index {}",
                    i
                )));
            }

            out.push_str(&content[from..i - 1]);
            out.push('}');
            from = i + 1;
        }

        prev = ch;
    }

    out.push_str(&content[from..]);
    Ok((out, ""))
}

/// Read the dynamic slice at the beginning of the content, which must start
/// with `{`. Returns the value name, the pattern (when present), and the
/// rest of the content after the closing `}`.
fn dynamic_slice(content: &str) -> Result<(String, Option<String>, &str), TemplateError> {
    let bytes = content.as_bytes();
    let len = bytes.len();

    let mut in_pattern = false;
    let mut depth = 1usize;
    let mut name = String::new();
    let mut from = 1;
    let mut class_start: Option<usize> = None;

    let mut i = 1;
    while i < len {
        let b = bytes[i];
        if b == b'{' {
            depth += 1;
            i += 1;
            continue;
        }

        if !in_pattern {
            if b == b':' {
                if i > 1 && bytes[i - 1] == b'\\' {
                    name.push_str(&content[from..i - 1]);
                    name.push(':');
                    from = i + 1;
                    i += 1;
                    continue;
                }

                if depth > 1 {
                    return Err(invalid("open curly brace in a value name"));
                }

                name.push_str(&content[from..i]);
                if name.is_empty() {
                    return Err(invalid("empty value name"));
                }

                in_pattern = true;
                from = i + 1;
                i += 1;
                continue;
            }

            if b == b'}' {
                depth -= 1;
                if depth > 0 {
                    // Not the end of the value name; braces may be part
                    // of it.
                    i += 1;
                    continue;
                }

                name.push_str(&content[from..i]);
                if name.is_empty() {
                    return Err(invalid("empty dynamic slice"));
                }

                return Ok((name, None, &content[i + 1..]));
            }
        } else {
            if b == b'\\' {
                // A backslash in a pattern escapes any byte.
                i += 2;
                continue;
            }

            if let Some(start) = class_start {
                if b == b']' {
                    let d = i - start;
                    if d > 1 && !(d == 2 && bytes[i - 1] == b'^') {
                        class_start = None;
                    }
                }

                i += 1;
                continue;
            }

            if b == b'[' {
                class_start = Some(i);
                i += 1;
                continue;
            }

            if b == b'}' {
                depth -= 1;
                if depth > 0 {
                    i += 1;
                    continue;
                }

                if i == from {
                    return Err(invalid("empty pattern"));
                }

                return Ok((name, Some(content[from..i].to_string()), &content[i + 1..]));
            }
        }

        i += 1;
    }

    Err(invalid("incomplete dynamic slice"))
}

/// Append a dynamic slice, reusing the value pattern recorded for a repeated
/// value name. When the slice introduces the wildcard, the recorded patterns
/// are re-anchored at the end so later occurrences match right-to-left.
fn append_dynamic_slice(
    slices: &mut Vec<TemplateSlice>,
    name: String,
    pattern: Option<String>,
    patterns: &mut HashMap<String, Arc<ValuePattern>>,
    wildcard_index: &mut Option<usize>,
) -> Result<(), TemplateError> {
    if let Some(vp) = patterns.get(&name) {
        if let Some(pattern) = pattern {
            if vp.source.as_deref() != Some(pattern.as_str()) {
                return Err(TemplateError::DifferentPattern { name });
            }
        }

        slices.push(TemplateSlice::Dynamic(vp.clone()));
        return Ok(());
    }

    let wildcard_name = wildcard_index.map(|idx| match &slices[idx] {
        TemplateSlice::Dynamic(vp) => vp.name.clone(),
        TemplateSlice::Static(_) => unreachable!("the wildcard index points at a dynamic slice"),
    });

    if let Some(wildcard_name) = &wildcard_name {
        if wildcard_name.as_ref() == name {
            // The wildcard's name must not come again, with or without a
            // pattern.
            return Err(TemplateError::RepeatedWildcardName { name });
        }
    }

    let Some(pattern) = pattern else {
        if wildcard_name.is_some() {
            return Err(TemplateError::AnotherWildcardName { name });
        }

        *wildcard_index = Some(slices.len());
        slices.push(TemplateSlice::Dynamic(Arc::new(ValuePattern {
            name: Arc::from(name),
            source: None,
            regex: None,
        })));

        // With a wildcard present, reused patterns must match the string
        // from its end; re-anchor every recorded pattern.
        for vp in patterns.values_mut() {
            let source = vp
                .source
                .clone()
                .expect("recorded value patterns always carry a source");
            let regex = Regex::new(&format!("{}$", source))?;
            *vp = Arc::new(ValuePattern {
                name: vp.name.clone(),
                source: Some(source),
                regex: Some(regex),
            });
        }

        return Ok(());
    };

    let anchored = if wildcard_index.is_some() {
        format!("{}$", pattern)
    } else {
        format!("^{}", pattern)
    };

    let regex = Regex::new(&anchored)?;
    let vp = Arc::new(ValuePattern {
        name: Arc::from(name.as_str()),
        source: Some(pattern.into_boxed_str()),
        regex: Some(regex),
    });

    slices.push(TemplateSlice::Dynamic(vp.clone()));
    patterns.insert(name, vp);
    Ok(())
}

/// Parse the content of a template into its slices and the index of the
/// wildcard slice, if any.
fn parse_content(
    content: &str,
) -> Result<(Vec<TemplateSlice>, Option<usize>), TemplateError> {
    if content.is_empty() {
        return Err(invalid("empty template"));
    }

    let mut slices = Vec::new();
    let mut patterns = HashMap::new();
    let mut wildcard_index = None;
    let mut rest = content;

    while !rest.is_empty() {
        let (static_str, left) = static_slice(rest)?;
        if !static_str.is_empty() {
            slices.push(TemplateSlice::Static(static_str.into_boxed_str()));
        }

        if left.is_empty() {
            break;
        }

        let (name, pattern, left) = dynamic_slice(left)?;
        append_dynamic_slice(&mut slices, name, pattern, &mut patterns, &mut wildcard_index)?;
        rest = left;
    }

    if let [TemplateSlice::Dynamic(vp)] = slices.as_slice() {
        if let (Some(source), Some(_)) = (&vp.source, &vp.regex) {
            // A single value-pattern slice must match the whole string;
            // anchor it at both ends.
            let regex = Regex::new(&format!("^{}$", source))?;
            let anchored = Arc::new(ValuePattern {
                name: vp.name.clone(),
                source: Some(source.clone()),
                regex: Some(regex),
            });
            slices[0] = TemplateSlice::Dynamic(anchored);
        }
    }

    Ok((slices, wildcard_index))
}

/// Parse a complete template string into a [`Template`].
pub(crate) fn parse_template(template: &str) -> Result<Template, TemplateError> {
    if template.is_empty() {
        return Err(invalid("empty template"));
    }

    let (name, content) = template_name_and_content(template)?;
    let (slices, wildcard_index) = parse_content(content)?;

    let mut template = Template {
        name: name.map(Arc::from),
        slices,
        wildcard_index,
    };

    if template.name.is_none() && !template.is_static() {
        let mut dynamic = template.slices.iter().filter_map(|s| match s {
            TemplateSlice::Dynamic(vp) => Some(vp.name.clone()),
            TemplateSlice::Static(_) => None,
        });

        // A single dynamic slice lends the template its name; with more
        // than one the template stays unnamed.
        if let (Some(name), None) = (dynamic.next(), dynamic.next()) {
            template.name = Some(name);
        }
    }

    Ok(template)
}
