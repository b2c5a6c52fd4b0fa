//! HTTP/1.1 client
//!
//! Every call to [`Client::send_request()`] goes through these states, once
//! per redirect hop:
//!
//! * **Build** - Serialize the request head, filling in `Host`,
//!   `Content-Length` and `Connection: close`
//! * **Connect** - Resolve the host and open a socket, wrapped in TLS for
//!   `https`
//! * **SendHead** - Write the head
//! * **SendBody** - Stream the request body in fixed size chunks
//! * **RecvHead** - Read up to the blank line and parse status and headers.
//!   Interim `1xx` responses are skipped
//! * **Redirect** - For 3xx with a `Location` and redirects enabled, spend
//!   one unit of the budget and start over with the new target
//! * **Finalize** - Hand the socket to the response body
//!
//! ```text
//!                 ┌──────────────────┐
//! ┌ ─ ─ ─ ─ ─ ─ ─▶│      Build       │
//!                 └──────────────────┘
//! │                         │
//!                           ▼
//! │               ┌──────────────────┐
//!                 │     Connect      │
//! │               └──────────────────┘
//!                           │
//! │                         ▼
//!                 ┌──────────────────┐
//! │               │     SendHead     │
//!                 └──────────────────┘
//! │                         │
//!                           ▼
//! │               ┌──────────────────┐
//!                 │     SendBody     │
//! │               └──────────────────┘
//!                           │
//! │                         ▼
//!                 ┌──────────────────┐
//! │         ┌─────│     RecvHead     │◀─┐ 1xx
//!           │     └──────────────────┘──┘
//! │         │               │
//!           ▼               ▼
//! │ ┌──────────────┐ ┌──────────────┐
//!  ─│   Redirect   │ │   Finalize   │
//!   └──────────────┘ └──────────────┘
//! ```
//!
//! The socket of a hop is closed before the next hop connects. The socket of
//! the final response lives in the response body, and is closed when the
//! body is closed or dropped.

use std::sync::Arc;

use http::header::{HOST, LOCATION};
use http::{Method, Request, Response, StatusCode};
use rustls::ClientConfig;

use crate::body::Body;
use crate::codec::{self, header_value, ParsedHead, ReasonPhrase, RequestTarget};
use crate::config::Config;
use crate::ext::{HeaderMapExt, StatusExt, UriExt};
use crate::stream::Stream;
use crate::transport::{tls, Transport};
use crate::url;
use crate::{Error, Result};

#[cfg(test)]
mod test;

const BUFFER_SIZE: usize = 8192;

/// A blocking HTTP/1.1 client.
///
/// Each request opens its own connection.
///
/// ```no_run
/// use barehttp::{Body, Client, Config};
/// use barehttp::http::Request;
/// use std::io::Read;
///
/// let client = Client::new(Config::default()).unwrap();
///
/// let request = Request::get("https://example.test/").body(Body::empty()).unwrap();
/// let mut response = client.send_request(request).unwrap();
///
/// let mut text = String::new();
/// response.body_mut().read_to_string(&mut text).unwrap();
/// ```
#[derive(Debug)]
pub struct Client {
    config: Config,
    tls: Arc<ClientConfig>,
    prototype: Response<()>,
}

impl Client {
    /// Validate the config and set up TLS.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let tls = tls::client_config(&config.ssl, config.ssl_protocol)?;
        Ok(Client {
            config,
            tls,
            prototype: Response::new(()),
        })
    }

    /// Use the headers of `prototype` as the starting point of every
    /// response. Headers of the received response replace them.
    pub fn with_response_prototype(mut self, prototype: Response<()>) -> Self {
        self.prototype = prototype;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Send a request and receive the response head.
    ///
    /// The response body is read from the connection as it is consumed.
    pub fn send_request(&self, request: Request<Body>) -> Result<Response<Body>> {
        let mut budget = RedirectBudget::new(self.config.max_redirects);
        self.send_with_budget(request, &mut budget)
    }

    /// Like [`Client::send_request()`], but spending redirects from a given
    /// budget.
    pub fn send_with_budget(
        &self,
        request: Request<Body>,
        budget: &mut RedirectBudget,
    ) -> Result<Response<Body>> {
        let mut request = request;
        loop {
            match self.exchange(request, budget)? {
                Hop::Done(response) => return Ok(response),
                Hop::Redirect(next) => request = next,
            }
        }
    }

    fn exchange(&self, mut request: Request<Body>, budget: &mut RedirectBudget) -> Result<Hop> {
        let head = codec::build_head(&request)?;

        let mut transport = Transport::connect(&request, self.config.timeout, &self.tls)?;

        trace!("Send head: {:?}", String::from_utf8_lossy(&head));
        transport.send(&head)?;

        send_body(&mut transport, request.body_mut())?;

        let parsed = loop {
            let raw = transport.read_head(self.config.max_head_size)?;
            if raw.is_empty() {
                return Err(Error::EmptyResponseHead);
            }

            let parsed = codec::parse_head(&raw)?;

            if parsed.status.is_informational() && parsed.status != StatusCode::SWITCHING_PROTOCOLS
            {
                debug!("Skip interim response: {}", parsed.status);
                continue;
            }

            break parsed;
        };

        debug!(
            "Response: {} {} ({})",
            request.method(),
            request.uri(),
            parsed.status
        );

        if self.config.follow_location && parsed.status.is_followable_redirect() {
            if let Some(value) = parsed.headers.get_all(LOCATION).iter().last() {
                let location = value
                    .to_str()
                    .map_err(|_| {
                        Error::MalformedUrl(String::from_utf8_lossy(value.as_bytes()).into_owned())
                    })?
                    .to_string();
                drop(transport);
                let next = redirect(request, &location, budget)?;
                return Ok(Hop::Redirect(next));
            }
        }

        let response = self.finalize(&request, parsed, transport)?;

        Ok(Hop::Done(response))
    }

    fn finalize(
        &self,
        request: &Request<Body>,
        parsed: ParsedHead,
        transport: Transport,
    ) -> Result<Response<Body>> {
        let ParsedHead {
            version,
            status,
            reason,
            headers,
        } = parsed;

        let declared = headers.content_length();
        let no_body = request.method() == Method::HEAD
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED;
        let limit = if no_body { Some(0) } else { declared };

        let body = transport.into_body(declared, limit)?;

        let mut response = Response::new(Body::new(body));
        *response.status_mut() = status;
        *response.version_mut() = version;

        let map = response.headers_mut();
        *map = self.prototype.headers().clone();
        for name in headers.keys() {
            map.remove(name);
        }
        for (name, value) in &headers {
            map.append(name.clone(), value.clone());
        }

        response.extensions_mut().insert(ReasonPhrase(reason));

        Ok(response)
    }
}

enum Hop {
    Done(Response<Body>),
    Redirect(Request<Body>),
}

/// How many more redirects a call may follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectBudget {
    remaining: u32,
}

impl RedirectBudget {
    pub fn new(max_redirects: u32) -> Self {
        RedirectBudget {
            remaining: max_redirects,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Use one redirect, failing when none are left.
    pub fn spend(&mut self) -> Result<()> {
        if self.remaining == 0 {
            return Err(Error::TooManyRedirects);
        }
        self.remaining -= 1;
        Ok(())
    }
}

fn send_body(transport: &mut Transport, body: &mut Body) -> Result<()> {
    // The head promised this many bytes.
    let mut left = body.size().unwrap_or(0);
    if left == 0 {
        return Ok(());
    }

    let mut buf = vec![0_u8; BUFFER_SIZE];
    let mut sent = 0_u64;

    while left > 0 && !body.eof() {
        let max = buf.len().min(left.min(usize::MAX as u64) as usize);
        let n = body.read(&mut buf[..max])?;
        if n == 0 {
            break;
        }
        transport.send(&buf[..n])?;
        left -= n as u64;
        sent += n as u64;
        trace!("Sent body chunk: {}", n);
    }

    debug!("Sent body: {} bytes", sent);

    Ok(())
}

/// The request for the next hop.
fn redirect(
    request: Request<Body>,
    location: &str,
    budget: &mut RedirectBudget,
) -> Result<Request<Body>> {
    budget.spend()?;

    let current = request.uri().clone();

    let (uri, host) = if url::is_relative_url(location) {
        (url::resolve_relative(&current, location)?, None)
    } else {
        let uri = url::parse_absolute(&current, location)?;
        let host = uri.host_header();
        (uri, host)
    };

    debug!(
        "Redirect {} -> {} ({} left)",
        current,
        uri,
        budget.remaining()
    );

    let (mut parts, mut body) = request.into_parts();

    if let Some(host) = host {
        parts.headers.insert(HOST, header_value(&host)?);
    }
    parts
        .extensions
        .insert(RequestTarget(url::request_target(&uri)));
    parts.uri = uri;

    if body.size().unwrap_or(0) > 0 {
        body.rewind().map_err(|_| Error::BodyNotReplayable)?;
    }

    Ok(Request::from_parts(parts, body))
}
