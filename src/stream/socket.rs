use std::fmt;
use std::io::{self, Read, Write};

use super::{Detached, Stream};
use crate::transport::Connection;
use crate::Result;

/// The body of a response, read straight off the connection.
///
/// Reads never go past the declared `Content-Length`. Without one the body
/// runs until the server closes the connection.
pub struct SocketStream {
    conn: Option<Connection>,
    declared: Option<u64>,
    remaining: Option<u64>,
    ended: bool,
}

impl SocketStream {
    /// `declared` is the size reported by [`Stream::size()`], `limit` caps
    /// how much is read from the connection.
    pub(crate) fn new(conn: Connection, declared: Option<u64>, limit: Option<u64>) -> Self {
        SocketStream {
            conn: Some(conn),
            declared,
            remaining: limit,
            ended: limit == Some(0),
        }
    }
}

impl Stream for SocketStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.ended || buf.is_empty() {
            return Ok(0);
        }
        let Some(conn) = self.conn.as_mut() else {
            return Ok(0);
        };

        let max = match self.remaining {
            Some(r) => buf.len().min(r.min(usize::MAX as u64) as usize),
            None => buf.len(),
        };

        let n = loop {
            match conn.read(&mut buf[..max]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                // TLS peers closing without close_notify.
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break 0,
                Err(e) => return Err(e.into()),
            }
        };

        if n == 0 {
            self.ended = true;
            trace!("Response body ended");
        }

        if let Some(r) = &mut self.remaining {
            *r -= n as u64;
            if *r == 0 {
                self.ended = true;
            }
        }

        Ok(n)
    }

    fn eof(&self) -> bool {
        self.ended || self.conn.is_none()
    }

    fn size(&self) -> Option<u64> {
        self.declared
    }

    fn is_writable(&self) -> bool {
        self.conn.is_some()
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match self.conn.as_mut() {
            Some(conn) => Ok(conn.write(buf)?),
            None => Err(crate::Error::StreamDetached),
        }
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.shutdown();
        }
    }

    fn detach(&mut self) -> Option<Detached> {
        self.conn.take().map(Detached::Connection)
    }
}

impl fmt::Debug for SocketStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketStream")
            .field("conn", &self.conn)
            .field("declared", &self.declared)
            .field("ended", &self.ended)
            .finish()
    }
}

impl Drop for SocketStream {
    fn drop(&mut self) {
        self.close();
    }
}
