//! Helpers for `Location` targets.
//!
//! A redirect target is either absolute (`https://host/path`, `//host/path`),
//! or relative to the request that produced it (`/path?q`, `?q`, `path`).

use http::uri::{Parts, PathAndQuery};
use http::Uri;

use crate::{Error, Result};

const SCHEMES: &[&str] = &["https", "http", "feed", "ftp"];

/// Tell whether a url is relative, i.e. does not have the shape of an
/// absolute `scheme://authority[/path]` url.
///
/// ```
/// # use barehttp::url::is_relative_url;
/// assert!(is_relative_url("/path"));
/// assert!(!is_relative_url("http://example.com/"));
/// ```
pub fn is_relative_url(url: &str) -> bool {
    !is_absolute_url(url)
}

fn is_absolute_url(url: &str) -> bool {
    let rest = strip_scheme(url);

    let Some(rest) = rest.strip_prefix("//") else {
        return false;
    };

    let end = rest.find(&['/', '?', '|'][..]).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(end);

    is_authority(authority) && is_tail(tail)
}

// Strips "<scheme>:" where scheme is one of SCHEMES. A bare "//" is kept.
fn strip_scheme(url: &str) -> &str {
    for scheme in SCHEMES {
        let Some(prefix) = url.get(..scheme.len()) else {
            continue;
        };
        if prefix.eq_ignore_ascii_case(scheme) {
            if let Some(rest) = url[scheme.len()..].strip_prefix(':') {
                return rest;
            }
        }
    }
    url
}

fn is_authority(authority: &str) -> bool {
    let host_port = match authority.rsplit_once('@') {
        Some((userinfo, host_port)) => {
            if userinfo.is_empty() || !all_chars(userinfo, is_userinfo_char) {
                return false;
            }
            host_port
        }
        None => authority,
    };

    let (host, port) = if host_port.starts_with('[') {
        let Some(close) = host_port.find(']') else {
            return false;
        };
        let (host, rest) = host_port.split_at(close + 1);
        let inner = &host[1..host.len() - 1];
        if !inner.chars().all(|c| c.is_ascii_hexdigit() || c == ':') {
            return false;
        }
        (host, rest)
    } else {
        let n = host_port.find(':').unwrap_or(host_port.len());
        let (host, rest) = host_port.split_at(n);
        if host.is_empty() || !all_chars(host, is_host_char) {
            return false;
        }
        (host, rest)
    };

    if host.is_empty() {
        return false;
    }

    match port.strip_prefix(':') {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => port.is_empty(),
    }
}

fn is_tail(tail: &str) -> bool {
    all_chars(tail, is_tail_char)
}

fn is_userinfo_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_.-+!$&'()*,;=:".contains(c)
}

fn is_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '.'
}

fn is_tail_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_#!:.?+|=&@$'~*,;/()[]-".contains(c)
}

/// Check every char against `allowed`, letting through `%XX` escapes.
fn all_chars(s: &str, allowed: fn(char) -> bool) -> bool {
    let b = s.as_bytes();
    let mut i = 0;
    while i < b.len() {
        if b[i] == b'%' {
            let ok = b.len() > i + 2 && b[i + 1].is_ascii_hexdigit() && b[i + 2].is_ascii_hexdigit();
            if !ok {
                return false;
            }
            i += 3;
            continue;
        }
        // Non-ascii bytes never pass `allowed`.
        if !allowed(b[i] as char) {
            return false;
        }
        i += 1;
    }
    true
}

/// Split a relative url into `(path, query)`.
///
/// The path defaults to `/` and the query to the empty string. Any fragment
/// is dropped.
///
/// ```
/// # use barehttp::url::extract_relative_components;
/// let (path, query) = extract_relative_components("/path/to?foo=bar").unwrap();
/// assert_eq!(path, "/path/to");
/// assert_eq!(query, "foo=bar");
/// ```
pub fn extract_relative_components(url: &str) -> Result<(String, String)> {
    if url.chars().any(|c| c.is_ascii_control() || c == ' ') {
        return Err(Error::MalformedUrl(url.to_string()));
    }

    let url = url.split_once('#').map(|(u, _)| u).unwrap_or(url);

    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url, ""),
    };

    let path = if path.is_empty() { "/" } else { path };

    Ok((path.to_string(), query.to_string()))
}

/// The request target (origin-form) of an uri: path plus query.
pub(crate) fn request_target(uri: &Uri) -> String {
    let path = match uri.path() {
        "" => "/",
        p => p,
    };
    match uri.query() {
        Some(q) => format!("{}?{}", path, q),
        None => path.to_string(),
    }
}

/// Rewrite only path and query of `current` from a relative location.
pub(crate) fn resolve_relative(current: &Uri, location: &str) -> Result<Uri> {
    let (path, query) = extract_relative_components(location)?;

    let path = if path.starts_with('/') {
        path
    } else {
        // Relative path, resolve against the "directory" of current.
        let base = current.path();
        let dir = base.rfind('/').map(|n| &base[..=n]).unwrap_or("/");
        format!("{}{}", dir, path)
    };

    let pq = if query.is_empty() {
        path
    } else {
        format!("{}?{}", path, query)
    };

    let pq: PathAndQuery = pq
        .parse()
        .map_err(|_| Error::MalformedUrl(location.to_string()))?;

    let mut parts = Parts::from(current.clone());
    parts.path_and_query = Some(pq);

    Uri::from_parts(parts).map_err(|_| Error::MalformedUrl(location.to_string()))
}

/// Parse an absolute location. Protocol relative `//host/path` inherits the
/// scheme of `current`.
pub(crate) fn parse_absolute(current: &Uri, location: &str) -> Result<Uri> {
    let full;
    let location = if location.starts_with("//") {
        full = format!("{}:{}", current.scheme_str().unwrap_or("http"), location);
        &full
    } else {
        location
    };

    let uri: Uri = location
        .parse()
        .map_err(|_| Error::MalformedUrl(location.to_string()))?;

    if uri.scheme().is_none() || uri.host().is_none() {
        return Err(Error::MalformedUrl(location.to_string()));
    }

    Ok(uri)
}
