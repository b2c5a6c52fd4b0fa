//! Request head serialization and response head parsing.
//!
//! The request side always produces a complete head with `Host`,
//! `Content-Length` and `Connection: close`. The response side is lenient:
//! blank lines are skipped, the first `HTTP/` line is the status line and
//! every other line is `name: value`.

use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Version};

use crate::body::Body;
use crate::ext::{MethodExt, UriExt, VersionExt};
use crate::stream::Stream;
use crate::url::request_target;
use crate::{Error, Result};

/// Request extension overriding the request target in the request line.
///
/// Without it the target is the path and query of the request uri.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget(pub String);

/// Response extension holding the reason phrase of the status line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasonPhrase(pub String);

/// A parsed response head.
#[derive(Debug)]
pub struct ParsedHead {
    pub version: Version,
    pub status: StatusCode,
    pub reason: String,
    /// Header names are lowercase. Repeated headers keep every value.
    pub headers: HeaderMap,
}

/// Serialize the head of a request, including the blank line ending it.
///
/// Fails if the method does not allow a body but the body is non-empty, or if
/// the version cannot be sent.
pub fn build_head(request: &Request<Body>) -> Result<Vec<u8>> {
    let method = request.method();
    let version = request.version().wire_str()?;
    let body = request.body();
    let size = body.size().unwrap_or(0);

    if size > 0 && !method.allows_request_body() {
        return Err(Error::MethodForbidsBody(method.clone()));
    }

    let target = match request.extensions().get::<RequestTarget>() {
        Some(t) if !t.0.is_empty() => t.0.clone(),
        _ => request_target(request.uri()),
    };

    let mut headers = HeaderMap::with_capacity(request.headers().len() + 4);

    if !request.headers().contains_key(HOST) {
        if let Some(host) = request.uri().host_header() {
            headers.insert(HOST, header_value(&host)?);
        }
    }

    for (name, value) in request.headers() {
        headers.append(name.clone(), value.clone());
    }

    if let Some(content_type) = body.structured_content_type() {
        headers.insert(CONTENT_TYPE, header_value(&content_type)?);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(CONNECTION, HeaderValue::from_static("close"));

    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(format!("{} {} HTTP/{}\r\n", method, target, version).as_bytes());
    out.extend_from_slice(&serialize_headers(&headers));
    out.extend_from_slice(b"\r\n");

    Ok(out)
}

/// One `name: value` line per header name, repeated values joined by `, `.
pub fn serialize_headers(headers: &HeaderMap) -> Vec<u8> {
    let mut out = Vec::new();
    for name in headers.keys() {
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        for (i, value) in headers.get_all(name).iter().enumerate() {
            if i > 0 {
                out.extend_from_slice(b", ");
            }
            out.extend_from_slice(value.as_bytes());
        }
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Parse a response head. Trailing CR/LF is allowed but not required.
pub fn parse_head(raw: &[u8]) -> Result<ParsedHead> {
    let mut status_line = None;
    let mut headers = HeaderMap::new();

    for line in lines(raw) {
        if line.is_empty() {
            continue;
        }

        if status_line.is_none() && line.starts_with(b"HTTP/") {
            status_line = Some(parse_status_line(line)?);
            continue;
        }

        if let Some((name, value)) = parse_header_line(line)? {
            headers.append(name, value);
        }
    }

    let (version, status, reason) = status_line.ok_or(Error::MissingStatusLine)?;

    Ok(ParsedHead {
        version,
        status,
        reason,
        headers,
    })
}

fn lines(raw: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = raw;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match find_crlf(rest) {
            Some(n) => {
                let line = &rest[..n];
                rest = &rest[n + 2..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = &[];
                Some(line)
            }
        }
    })
}

fn find_crlf(b: &[u8]) -> Option<usize> {
    b.windows(2).position(|w| w == b"\r\n")
}

fn parse_status_line(line: &[u8]) -> Result<(Version, StatusCode, String)> {
    let invalid = || Error::InvalidStatusLine(String::from_utf8_lossy(line).into_owned());

    let text = std::str::from_utf8(line).map_err(|_| invalid())?;
    let rest = &text["HTTP/".len()..];

    let mut parts = rest.splitn(3, ' ');
    let version = parts.next().ok_or_else(invalid)?;
    let code = parts.next().ok_or_else(invalid)?;
    let reason = parts.next().unwrap_or("");

    let version = Version::from_wire(version).ok_or_else(invalid)?;
    let status = StatusCode::from_bytes(code.as_bytes()).map_err(|_| invalid())?;

    Ok((version, status, reason.to_string()))
}

/// A line without a colon is an error. A line whose name or value cannot be
/// represented in a `HeaderMap` is skipped.
fn parse_header_line(line: &[u8]) -> Result<Option<(HeaderName, HeaderValue)>> {
    let text = || String::from_utf8_lossy(line).into_owned();

    let colon = line
        .iter()
        .position(|c| *c == b':')
        .ok_or_else(|| Error::MalformedHeaderLine(text()))?;
    let name = trim(&line[..colon]);
    let value = trim(&line[colon + 1..]);

    let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name), HeaderValue::from_bytes(value))
    else {
        warn!("Skipping unrepresentable header line: {:?}", text());
        return Ok(None);
    };

    Ok(Some((name, value)))
}

fn trim(b: &[u8]) -> &[u8] {
    let start = b.iter().position(|c| !c.is_ascii_whitespace()).unwrap_or(b.len());
    let end = b.iter().rposition(|c| !c.is_ascii_whitespace()).map(|n| n + 1).unwrap_or(start);
    &b[start..end.max(start)]
}

pub(crate) fn header_value(s: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(s).map_err(|_| Error::BadHeader(s.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stream::{Form, MultipartStream};
    use http::Method;

    fn head_str(req: &Request<Body>) -> String {
        String::from_utf8(build_head(req).unwrap()).unwrap()
    }

    #[test]
    fn simple_get() {
        let req = Request::get("http://foo.test/page?x=1").body(Body::empty()).unwrap();
        assert_eq!(
            head_str(&req),
            "GET /page?x=1 HTTP/1.1\r\n\
             host: foo.test\r\n\
             content-length: 0\r\n\
             connection: close\r\n\
             \r\n"
        );
    }

    #[test]
    fn explicit_host_port_and_headers() {
        let req = Request::post("http://foo.test:8080/")
            .header("accept", "text/html")
            .header("accept", "text/plain")
            .body(Body::text("hello"))
            .unwrap();
        assert_eq!(
            head_str(&req),
            "POST / HTTP/1.1\r\n\
             host: foo.test:8080\r\n\
             accept: text/html, text/plain\r\n\
             content-length: 5\r\n\
             connection: close\r\n\
             \r\n"
        );
    }

    #[test]
    fn keeps_given_host() {
        let req = Request::get("http://foo.test/")
            .header("host", "other.test")
            .body(Body::empty())
            .unwrap();
        let head = head_str(&req);
        assert!(head.contains("host: other.test\r\n"));
        assert!(!head.contains("foo.test"));
    }

    #[test]
    fn request_target_override() {
        let req = Request::get("http://foo.test/ignored")
            .extension(RequestTarget("/real?y=2".to_string()))
            .body(Body::empty())
            .unwrap();
        assert!(head_str(&req).starts_with("GET /real?y=2 HTTP/1.1\r\n"));
    }

    #[test]
    fn http10_version() {
        let req = Request::get("http://foo.test/")
            .version(Version::HTTP_10)
            .body(Body::empty())
            .unwrap();
        assert!(head_str(&req).starts_with("GET / HTTP/1.0\r\n"));
    }

    #[test]
    fn http2_is_rejected() {
        let req = Request::get("http://foo.test/")
            .version(Version::HTTP_2)
            .body(Body::empty())
            .unwrap();
        let err = build_head(&req).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion(Version::HTTP_2)));
    }

    #[test]
    fn get_with_body() {
        let req = Request::get("http://foo.test/").body(Body::text("x")).unwrap();
        let err = build_head(&req).unwrap_err();
        assert!(matches!(err, Error::MethodForbidsBody(m) if m == Method::GET));
    }

    #[test]
    fn delete_without_body() {
        let req = Request::delete("http://foo.test/x").body(Body::empty()).unwrap();
        assert!(head_str(&req).starts_with("DELETE /x HTTP/1.1\r\n"));
    }

    #[test]
    fn multipart_content_type() {
        let form = MultipartStream::with_boundary(Form::new().text("a", "1"), "BND").unwrap();
        let req = Request::put("http://foo.test/")
            .header("content-type", "text/plain")
            .body(Body::new(form))
            .unwrap();
        let head = head_str(&req);
        assert!(head.contains("content-type: multipart/form-data; boundary=BND\r\n"));
        assert!(!head.contains("text/plain"));
    }

    #[test]
    fn serialize_then_parse() {
        let mut headers = HeaderMap::new();
        headers.append("x-a", HeaderValue::from_static("1"));
        headers.append("x-a", HeaderValue::from_static("2"));
        headers.append("x-b", HeaderValue::from_static("three"));

        let mut raw = b"HTTP/1.1 200 OK\r\n".to_vec();
        raw.extend_from_slice(&serialize_headers(&headers));

        let parsed = parse_head(&raw).unwrap();
        assert_eq!(parsed.headers["x-a"], "1, 2");
        assert_eq!(parsed.headers["x-b"], "three");
        assert_eq!(parsed.headers.len(), 2);
    }

    #[test]
    fn parse_status_and_headers() {
        let raw = b"HTTP/1.1 404 Not Found Here\r\n\
                    Content-Type: text/plain\r\n\
                    Set-Cookie: a=1\r\n\
                    set-cookie: b=2\r\n\
                    X-Empty:\r\n\r\n";
        let parsed = parse_head(raw).unwrap();
        assert_eq!(parsed.version, Version::HTTP_11);
        assert_eq!(parsed.status, StatusCode::NOT_FOUND);
        assert_eq!(parsed.reason, "Not Found Here");
        assert_eq!(parsed.headers["content-type"], "text/plain");
        let cookies: Vec<_> = parsed.headers.get_all("set-cookie").iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert_eq!(parsed.headers["x-empty"], "");
    }

    #[test]
    fn parse_without_reason() {
        let parsed = parse_head(b"HTTP/1.0 204").unwrap();
        assert_eq!(parsed.version, Version::HTTP_10);
        assert_eq!(parsed.status, StatusCode::NO_CONTENT);
        assert_eq!(parsed.reason, "");
    }

    #[test]
    fn parse_skips_blank_lines() {
        let parsed = parse_head(b"\r\nHTTP/1.1 200 OK\r\n\r\nfoo: bar").unwrap();
        assert_eq!(parsed.headers["foo"], "bar");
    }

    #[test]
    fn parse_missing_status_line() {
        let err = parse_head(b"foo: bar\r\n").unwrap_err();
        assert!(matches!(err, Error::MissingStatusLine));
    }

    #[test]
    fn parse_bad_status_line() {
        assert!(matches!(
            parse_head(b"HTTP/1.1 abc OK").unwrap_err(),
            Error::InvalidStatusLine(_)
        ));
        assert!(matches!(
            parse_head(b"HTTP/7.7 200 OK").unwrap_err(),
            Error::InvalidStatusLine(_)
        ));
        assert!(matches!(
            parse_head(b"HTTP/1.1").unwrap_err(),
            Error::InvalidStatusLine(_)
        ));
    }

    #[test]
    fn parse_malformed_header() {
        let err = parse_head(b"HTTP/1.1 200 OK\r\nno colon here").unwrap_err();
        assert!(matches!(err, Error::MalformedHeaderLine(_)));
    }

    #[test]
    fn parse_skips_invalid_header_name() {
        let parsed =
            parse_head(b"HTTP/1.1 200 OK\r\nX Weird: v\r\nContent-Length: 0").unwrap();
        assert_eq!(parsed.status, StatusCode::OK);
        assert_eq!(parsed.headers.len(), 1);
        assert_eq!(parsed.headers["content-length"], "0");

        let parsed = parse_head(b"HTTP/1.1 200 OK\r\n: v").unwrap();
        assert!(parsed.headers.is_empty());
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(trim(b"  a b \t"), b"a b");
        assert_eq!(trim(b"   "), b"");
        assert_eq!(trim(b""), b"");
    }
}
