//! One socket per exchange.

use std::io::{self, BufRead, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use http::Request;
use rustls::ClientConfig;

use crate::error::snapshot;
use crate::ext::UriExt;
use crate::stream::SocketStream;
use crate::{Error, Result};

mod connection;
pub(crate) mod tls;

pub use connection::Connection;
use connection::Socket;

/// The socket of a single request.
///
/// Connected in [`Transport::connect()`] and shut down when dropped, unless
/// the connection was handed over to the response body.
pub(crate) struct Transport {
    request: Request<()>,
    conn: Option<Connection>,
}

impl Transport {
    /// Resolve and dial the request's host, with TLS for `https`.
    pub fn connect<B>(
        request: &Request<B>,
        timeout: Duration,
        tls_config: &Arc<ClientConfig>,
    ) -> Result<Transport> {
        let uri = request.uri();
        let Some(host) = uri.host() else {
            return Err(Error::MalformedUrl(uri.to_string()));
        };
        // Uri keeps the brackets of ipv6 hosts.
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = uri.port_or_default();
        let secure = uri.is_secure();

        debug!(
            "Connecting to {}:{} ({})",
            host,
            port,
            if secure { "tls" } else { "tcp" }
        );

        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| Error::network(request, "cannot resolve host", e))?
            .collect();

        let tcp = dial(&addrs, timeout).map_err(|e| Error::network(request, "cannot connect", e))?;

        let socket = if secure {
            let tls = tls::handshake(tcp, host, tls_config.clone())
                .map_err(|e| Error::network(request, "tls handshake failed", e))?;
            Socket::Tls(Box::new(tls))
        } else {
            Socket::Plain(tcp)
        };

        Ok(Transport {
            request: snapshot(request),
            conn: Some(Connection::new(socket)),
        })
    }

    /// Write all bytes, blocking until the kernel accepted them.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let Transport { request, conn } = self;
        let request = &*request;
        let conn = connection(request, conn)?;
        conn.write_all(bytes)
            .and_then(|_| conn.flush())
            .map_err(|e| Error::network(request, "cannot write to socket", e))
    }

    /// Read up to and including the blank line ending a response head.
    ///
    /// The returned bytes have the trailing CR/LF removed. Anything after the
    /// head stays buffered in the connection.
    pub fn read_head(&mut self, max_size: usize) -> Result<Vec<u8>> {
        let Transport { request, conn } = self;
        let request = &*request;
        let conn = connection(request, conn)?;

        let mut head = Vec::with_capacity(1024);

        loop {
            let buf = match conn.fill_buf() {
                Ok(b) => b,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::network(request, "cannot read response head", e)),
            };

            if buf.is_empty() {
                let e = io::Error::from(io::ErrorKind::UnexpectedEof);
                return Err(Error::network(request, "connection closed in response head", e));
            }

            let mut used = 0;
            let mut done = false;
            for b in buf {
                used += 1;
                head.push(*b);
                if head.len() > max_size {
                    return Err(Error::ResponseHeadTooLarge(max_size));
                }
                if head.ends_with(b"\r\n\r\n") {
                    done = true;
                    break;
                }
            }
            conn.consume(used);

            if done {
                break;
            }
        }

        trace!("Read head: {:?}", String::from_utf8_lossy(&head));

        while matches!(head.last(), Some(b'\r' | b'\n')) {
            head.pop();
        }

        Ok(head)
    }

    /// Hand the connection over to a response body.
    pub fn into_body(mut self, declared: Option<u64>, limit: Option<u64>) -> Result<SocketStream> {
        match self.conn.take() {
            Some(conn) => Ok(SocketStream::new(conn, declared, limit)),
            None => Err(released(&self.request)),
        }
    }
}

fn connection<'a>(
    request: &Request<()>,
    conn: &'a mut Option<Connection>,
) -> Result<&'a mut Connection> {
    conn.as_mut().ok_or_else(|| released(request))
}

fn released(request: &Request<()>) -> Error {
    let e = io::Error::from(io::ErrorKind::NotConnected);
    Error::network(request, "connection released", e)
}

fn dial(addrs: &[SocketAddr], timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;

    for addr in addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(tcp) => {
                trace!("Connected to {}", addr);
                // Past the connect phase, I/O blocks without timeout.
                tcp.set_nonblocking(false)?;
                tcp.set_read_timeout(None)?;
                tcp.set_write_timeout(None)?;
                tcp.set_nodelay(true)?;
                return Ok(tcp);
            }
            Err(e) => {
                trace!("Connect to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address for host")))
}

impl Drop for Transport {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            trace!("Release connection");
            conn.shutdown();
        }
    }
}
