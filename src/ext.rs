use http::{HeaderMap, Method, StatusCode, Uri, Version};

use crate::Error;

pub(crate) trait MethodExt {
    fn allows_request_body(&self) -> bool;
}

impl MethodExt for Method {
    fn allows_request_body(&self) -> bool {
        self == Method::POST || self == Method::PUT || self == Method::PATCH
    }
}

pub(crate) trait VersionExt {
    fn wire_str(&self) -> Result<&'static str, Error>;
    fn from_wire(s: &str) -> Option<Version>;
}

impl VersionExt for Version {
    fn wire_str(&self) -> Result<&'static str, Error> {
        match *self {
            Version::HTTP_09 => Ok("0.9"),
            Version::HTTP_10 => Ok("1.0"),
            Version::HTTP_11 => Ok("1.1"),
            v => Err(Error::UnsupportedVersion(v)),
        }
    }

    fn from_wire(s: &str) -> Option<Version> {
        match s {
            "0.9" => Some(Version::HTTP_09),
            "1.0" => Some(Version::HTTP_10),
            "1.1" => Some(Version::HTTP_11),
            "2" | "2.0" => Some(Version::HTTP_2),
            "3" | "3.0" => Some(Version::HTTP_3),
            _ => None,
        }
    }
}

pub(crate) trait StatusExt {
    /// 300-308 as treated by the redirect controller.
    fn is_followable_redirect(&self) -> bool;
}

impl StatusExt for StatusCode {
    fn is_followable_redirect(&self) -> bool {
        (300..=308).contains(&self.as_u16())
    }
}

pub(crate) trait UriExt {
    fn is_secure(&self) -> bool;
    fn port_or_default(&self) -> u16;
    /// host[:port] as it goes into the `Host` header.
    fn host_header(&self) -> Option<String>;
}

impl UriExt for Uri {
    fn is_secure(&self) -> bool {
        self.scheme_str()
            .map(|s| s.eq_ignore_ascii_case("https"))
            .unwrap_or(false)
    }

    fn port_or_default(&self) -> u16 {
        self.port_u16()
            .unwrap_or(if self.is_secure() { 443 } else { 80 })
    }

    fn host_header(&self) -> Option<String> {
        let host = self.host()?;
        Some(match self.port_u16() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }
}

pub(crate) trait HeaderMapExt {
    /// Last value of a header, as a string.
    fn last_str(&self, name: &str) -> Option<&str>;
    fn content_length(&self) -> Option<u64>;
}

impl HeaderMapExt for HeaderMap {
    fn last_str(&self, name: &str) -> Option<&str> {
        self.get_all(name)
            .into_iter()
            .last()
            .and_then(|v| v.to_str().ok())
    }

    fn content_length(&self) -> Option<u64> {
        self.last_str("content-length")
            .and_then(|v| v.trim().parse().ok())
    }
}
