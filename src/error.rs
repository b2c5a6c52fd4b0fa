use std::io;
use std::path::PathBuf;

use http::{Method, Request, Version};
use thiserror::Error;

/// Errors produced by barehttp.
///
/// Every error is fatal to the exchange it happened in. Use [`Error::kind()`]
/// to tell the broad categories apart.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported http version: {0:?}")]
    UnsupportedVersion(Version),

    #[error("method {0} does not support a body")]
    MethodForbidsBody(Method),

    #[error("bad header: {0}")]
    BadHeader(String),

    #[error("empty response head")]
    EmptyResponseHead,

    #[error("response head has no status line")]
    MissingStatusLine,

    #[error("response has an invalid status line: {0}")]
    InvalidStatusLine(String),

    #[error("malformed header line: {0}")]
    MalformedHeaderLine(String),

    #[error("response head larger than {0} bytes")]
    ResponseHeadTooLarge(usize),

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("request body cannot be replayed for redirect")]
    BodyNotReplayable,

    #[error("multipart stream cannot be nested in multipart data")]
    NestedMultipart,

    #[error("malformed url: {0}")]
    MalformedUrl(String),

    #[error("network error ({} {}): {message}: {source}", .request.method(), .request.uri())]
    Network {
        request: Box<Request<()>>,
        message: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("cannot open {}: {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to encode data to json: {0}")]
    JsonEncode(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("stream is not seekable")]
    NotSeekable,

    #[error("stream is not writable")]
    NotWritable,

    #[error("stream is detached")]
    StreamDetached,

    #[error("stream position is before offset {0}")]
    ReadBeforeOffset(u64),

    #[error("io: {0}")]
    Io(#[from] io::Error),
}

/// The broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unsupported request/response shape.
    Protocol,
    /// Failure at the transport layer. Carries the offending request.
    Network,
    /// Invalid local input such as an unreadable file or bad config.
    Argument,
    /// Capability or I/O failure on a body stream.
    Stream,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedVersion(_)
            | Error::MethodForbidsBody(_)
            | Error::BadHeader(_)
            | Error::EmptyResponseHead
            | Error::MissingStatusLine
            | Error::InvalidStatusLine(_)
            | Error::MalformedHeaderLine(_)
            | Error::ResponseHeadTooLarge(_)
            | Error::TooManyRedirects
            | Error::BodyNotReplayable
            | Error::NestedMultipart
            | Error::MalformedUrl(_) => ErrorKind::Protocol,

            Error::Network { .. } => ErrorKind::Network,

            Error::FileOpen { .. } | Error::JsonEncode(_) | Error::InvalidConfig(_) => {
                ErrorKind::Argument
            }

            Error::NotSeekable
            | Error::NotWritable
            | Error::StreamDetached
            | Error::ReadBeforeOffset(_)
            | Error::Io(_) => ErrorKind::Stream,
        }
    }

    /// The request that was in flight, for network errors.
    pub fn request(&self) -> Option<&Request<()>> {
        match self {
            Error::Network { request, .. } => Some(request),
            _ => None,
        }
    }

    pub(crate) fn network<B>(request: &Request<B>, message: &'static str, source: io::Error) -> Self {
        Error::Network {
            request: Box::new(snapshot(request)),
            message,
            source,
        }
    }
}

/// Body-less copy of a request, kept for error context.
pub(crate) fn snapshot<B>(request: &Request<B>) -> Request<()> {
    let mut copy = Request::new(());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            Error::Network { source, .. } => source,
            e => io::Error::new(io::ErrorKind::Other, e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn network_error_carries_request() {
        let req = Request::post("http://a.test/x")
            .header("x-foo", "bar")
            .body(())
            .unwrap();

        let err = Error::network(
            &req,
            "connect failed",
            io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        );

        assert_eq!(err.kind(), ErrorKind::Network);
        let carried = err.request().unwrap();
        assert_eq!(carried.method(), Method::POST);
        assert_eq!(carried.uri(), "http://a.test/x");
        assert_eq!(carried.headers()["x-foo"], "bar");
        assert_eq!(
            err.to_string(),
            "network error (POST http://a.test/x): connect failed: refused"
        );
    }

    #[test]
    fn kinds() {
        assert_eq!(Error::TooManyRedirects.kind(), ErrorKind::Protocol);
        assert_eq!(Error::NotSeekable.kind(), ErrorKind::Stream);
        assert_eq!(
            Error::InvalidConfig("x".into()).kind(),
            ErrorKind::Argument
        );
    }
}
