//! URL template splitting and path segment iteration.
//!
//! Registration-side template strings and request paths share one segment
//! model: segments are separated by `/`, and a percent-encoded slash
//! (`%2F` / `%2f`) inside a segment is a literal `/` that is *not* a
//! separator. Template strings decode only the encoded slash; request paths
//! are strictly percent-decoded segment by segment.

use crate::error::RouterError;

/// The scheme, host, and prefix path a resource was created with, kept until
/// registration resolves them against the actual tree.
#[derive(Debug, Clone)]
pub(crate) struct UrlTemplate {
    pub(crate) host: String,
    pub(crate) prefix_path: String,
}

/// Decode `%2F`/`%2f` into a literal `/`, leaving everything else intact.
pub(crate) fn decode_encoded_slash(segment: &str) -> String {
    if !segment.contains("%2F") && !segment.contains("%2f") {
        return segment.to_string();
    }

    segment.replace("%2F", "/").replace("%2f", "/")
}

/// Strictly percent-decode one path segment. Returns `None` on a malformed
/// escape (`%` not followed by two hex digits) or on invalid UTF-8, which
/// dispatch turns into a 400 response.
pub(crate) fn path_unescape(segment: &str) -> Option<String> {
    if !segment.contains('%') {
        return Some(segment.to_string());
    }

    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = (*bytes.get(i + 1)? as char).to_digit(16)?;
            let lo = (*bytes.get(i + 2)? as char).to_digit(16)?;
            out.push((hi * 16 + lo) as u8);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}

/// Collapse `.` and `..` segments and empty segments, preserving a trailing
/// slash. Returns `None` when the path is already canonical.
pub(crate) fn clean_path(path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }

    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let mut kept: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                kept.pop();
            }
            _ => kept.push(segment),
        }
    }

    let mut cleaned = String::with_capacity(path.len());
    for segment in &kept {
        cleaned.push('/');
        cleaned.push_str(segment);
    }

    if cleaned.is_empty() {
        cleaned.push('/');
    } else if trailing_slash {
        cleaned.push('/');
    }

    if cleaned == path {
        None
    } else {
        Some(cleaned)
    }
}

/// Split a URL template into its host and path templates, together with the
/// security and trailing-slash properties encoded in it.
///
/// Only an absolute URL template has a host. A template starting with a
/// scheme but no host (e.g. `https:///orders`) is a path template that
/// carries the security bit. After a host, a path of a single `/` means
/// "trailing slash, no path".
pub(crate) fn split_host_and_path(
    url_template: &str,
) -> Result<(String, String, bool, bool), RouterError> {
    if url_template.is_empty() {
        return Err(RouterError::EmptyPathTemplate);
    }

    let (rest, absolute, secure) = if let Some(rest) = url_template.strip_prefix("https://") {
        (rest, true, true)
    } else if let Some(rest) = url_template.strip_prefix("http://") {
        (rest, true, false)
    } else {
        (url_template, false, false)
    };

    let (host, mut path) = if absolute {
        match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => {
                if rest.is_empty() {
                    return Err(RouterError::EmptyPathTemplate);
                }

                return Ok((rest.to_string(), String::new(), secure, false));
            }
        }
    } else {
        ("", rest)
    };

    let mut tslash = false;
    if !host.is_empty() {
        if path == "/" {
            return Ok((host.to_string(), String::new(), secure, true));
        }
    } else if path.is_empty() {
        return Err(RouterError::EmptyPathTemplate);
    }

    if path.len() > 1 && path.ends_with('/') {
        tslash = true;
        path = &path[..path.len() - 1];
    }

    Ok((host.to_string(), path.to_string(), secure, tslash))
}

/// Split a URL template into host, prefix path, and the final resource
/// segment template.
pub(crate) fn split_url(
    url_template: &str,
) -> Result<(String, String, String, bool, bool), RouterError> {
    let (host, path, secure, tslash) = split_host_and_path(url_template)?;
    if path.is_empty() || path == "/" {
        return Ok((host, String::new(), path, secure, tslash));
    }

    match path.rfind('/') {
        None => Ok((host, String::new(), decode_encoded_slash(&path), secure, tslash)),
        Some(idx) => {
            let resource = decode_encoded_slash(&path[idx + 1..]);
            Ok((host, path[..idx].to_string(), resource, secure, tslash))
        }
    }
}

/// Extract the host template from a URL template. A path beyond a bare
/// trailing `/` is rejected.
pub(crate) fn host_template(url_template: &str) -> Result<(String, bool, bool), RouterError> {
    if url_template.is_empty() {
        return Err(RouterError::EmptyHostTemplate);
    }

    let (rest, secure) = if let Some(rest) = url_template.strip_prefix("https://") {
        (rest, true)
    } else if let Some(rest) = url_template.strip_prefix("http://") {
        (rest, false)
    } else {
        (url_template, false)
    };

    let Some(idx) = rest.find('/') else {
        return Ok((rest.to_string(), secure, false));
    };

    if &rest[idx..] != "/" {
        return Err(RouterError::UnwantedPathTemplate);
    }

    Ok((rest[..idx].to_string(), secure, true))
}

/// Split a path template into its segment templates. The root path `/`
/// reports itself via the second return value.
pub(crate) fn split_path_segments(
    path: &str,
) -> Result<(Vec<String>, bool, bool), RouterError> {
    if path == "/" {
        return Ok((vec!["/".to_string()], true, false));
    }

    let mut iter = PathSegmentIterator::new(path);
    let mut segments = Vec::new();
    loop {
        let segment = iter.next_segment();
        if segment.is_empty() {
            break;
        }

        segments.push(decode_encoded_slash(segment));
    }

    if !iter.remaining_path().is_empty() {
        return Err(RouterError::EmptyPathSegmentTemplate);
    }

    Ok((segments, false, iter.has_trailing_slash()))
}

/// Iterates over the `/`-separated segments of a path or path template.
/// An empty segment ends the iteration; callers use [`remaining_path`]
/// to detect an interior empty segment.
///
/// [`remaining_path`]: PathSegmentIterator::remaining_path
pub(crate) struct PathSegmentIterator<'p> {
    path: &'p str,
    root: bool,
    tslash: bool,
}

impl<'p> PathSegmentIterator<'p> {
    pub(crate) fn new(path: &'p str) -> Self {
        Self {
            path,
            root: path == "/",
            tslash: path.len() > 1 && path.ends_with('/'),
        }
    }

    /// True when the whole path is `/`.
    pub(crate) fn is_root(&self) -> bool {
        self.root
    }

    /// The next segment, or an empty string when the path is exhausted.
    /// The leading slash is not part of any segment.
    pub(crate) fn next_segment(&mut self) -> &'p str {
        if self.path.is_empty() {
            return "";
        }

        if let Some(rest) = self.path.strip_prefix('/') {
            self.path = rest;
        }

        match self.path.find('/') {
            None => {
                let segment = self.path;
                self.path = "";
                segment
            }
            Some(idx) => {
                let segment = &self.path[..idx];
                self.path = &self.path[idx + 1..];
                segment
            }
        }
    }

    /// The not-yet-consumed part of the path, without a leading slash.
    pub(crate) fn remaining_path(&mut self) -> &'p str {
        if let Some(rest) = self.path.strip_prefix('/') {
            self.path = rest;
        }

        self.path
    }

    /// True when the path ends with a trailing slash.
    pub(crate) fn has_trailing_slash(&self) -> bool {
        self.tslash
    }
}
