use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};

use super::tls::{self, TlsStream};

pub(crate) enum Socket {
    Plain(TcpStream),
    Tls(Box<TlsStream>),
}

impl Read for Socket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Socket::Plain(s) => s.read(buf),
            Socket::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Socket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Socket::Plain(s) => s.write(buf),
            Socket::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Socket::Plain(s) => s.flush(),
            Socket::Tls(s) => s.flush(),
        }
    }
}

/// An open connection to a server, plain or TLS, with a read buffer.
///
/// Bytes read past the response head stay in the buffer, so the body can be
/// read from the same connection.
pub struct Connection {
    reader: BufReader<Socket>,
}

impl Connection {
    pub(crate) fn new(socket: Socket) -> Self {
        Connection {
            reader: BufReader::new(socket),
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self.reader.get_ref(), Socket::Tls(_))
    }

    /// Close the connection. For TLS a close_notify is sent first.
    pub fn shutdown(self) {
        let tcp = match self.reader.into_inner() {
            Socket::Plain(tcp) => tcp,
            Socket::Tls(mut stream) => {
                tls::close_notify(&mut stream);
                let stream = *stream;
                stream.sock
            }
        };
        if let Err(e) = tcp.shutdown(Shutdown::Both) {
            trace!("Socket shutdown: {}", e);
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl BufRead for Connection {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.reader.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.reader.get_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.reader.get_mut().flush()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("tls", &self.is_tls())
            .field("buffered", &self.reader.buffer().len())
            .finish()
    }
}
