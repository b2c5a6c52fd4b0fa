//! Body streams.
//!
//! Every request and response body is a [`Stream`]. The trait is a uniform
//! byte source with capability queries, since not every stream can seek or be
//! written to. Streams are composed: a [`MultipartStream`] is a sequence of
//! other streams, and a [`WrapStream`] hides a prefix of another stream.
//!
//! ```
//! use barehttp::stream::{Stream, TextStream};
//!
//! let mut s = TextStream::new("hello");
//! assert_eq!(s.size(), Some(5));
//! assert_eq!(s.contents().unwrap(), b"hello");
//! assert!(s.eof());
//! ```

use std::fmt;
use std::fs::File;
use std::io::SeekFrom;

use crate::transport::Connection;
use crate::{Error, Result};

mod file;
mod headers;
mod json;
mod multipart;
mod socket;
mod text;
mod wrap;

pub use file::FileStream;
pub use headers::PartHeaders;
pub use json::JsonStream;
pub use multipart::{Form, FormValue, MultipartStream};
pub use socket::SocketStream;
pub use text::TextStream;
pub use wrap::WrapStream;

const CHUNK: usize = 8192;

/// A readable byte source with optional capabilities.
///
/// Operations a stream does not support fail with [`Error::NotSeekable`] or
/// [`Error::NotWritable`]. After [`Stream::detach()`] or [`Stream::close()`]
/// reads fail with [`Error::StreamDetached`] or return 0.
pub trait Stream: Send {
    /// Read up to `buf.len()` bytes. 0 means no more data.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// No more bytes will be produced.
    fn eof(&self) -> bool;

    /// Total size in bytes, if known.
    fn size(&self) -> Option<u64>;

    fn is_readable(&self) -> bool {
        true
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn is_seekable(&self) -> bool {
        false
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(Error::NotWritable)
    }

    fn seek(&mut self, _pos: SeekFrom) -> Result<u64> {
        Err(Error::NotSeekable)
    }

    /// Current position.
    fn tell(&mut self) -> Result<u64> {
        Err(Error::NotSeekable)
    }

    fn rewind(&mut self) -> Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Release the underlying resource. Calling it twice is a no-op.
    fn close(&mut self);

    /// Take the underlying resource out of the stream, leaving it unusable.
    fn detach(&mut self) -> Option<Detached>;

    /// Read the remaining bytes.
    fn contents(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = vec![0_u8; CHUNK];
        loop {
            let n = self.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        Ok(out)
    }

    /// Extra headers for this stream as a multipart part.
    fn part_headers(&self) -> Option<&PartHeaders> {
        None
    }

    /// Filename for a multipart part. Marks the stream as a file upload.
    fn filename(&self) -> Option<&str> {
        None
    }

    /// The multipart boundary. Only multipart streams have one.
    fn boundary(&self) -> Option<&str> {
        None
    }

    /// Content-Type the stream imposes on the whole request.
    fn structured_content_type(&self) -> Option<String> {
        None
    }
}

/// The resource that backed a stream, returned by [`Stream::detach()`].
pub enum Detached {
    Connection(Connection),
    File(File),
    Bytes(Vec<u8>),
    Parts(Vec<Detached>),
}

impl fmt::Debug for Detached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Detached::Connection(_) => write!(f, "Connection"),
            Detached::File(file) => f.debug_tuple("File").field(file).finish(),
            Detached::Bytes(b) => write!(f, "Bytes({})", b.len()),
            Detached::Parts(p) => f.debug_tuple("Parts").field(p).finish(),
        }
    }
}

impl<S: Stream + ?Sized> Stream for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn eof(&self) -> bool {
        (**self).eof()
    }

    fn size(&self) -> Option<u64> {
        (**self).size()
    }

    fn is_readable(&self) -> bool {
        (**self).is_readable()
    }

    fn is_writable(&self) -> bool {
        (**self).is_writable()
    }

    fn is_seekable(&self) -> bool {
        (**self).is_seekable()
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        (**self).seek(pos)
    }

    fn tell(&mut self) -> Result<u64> {
        (**self).tell()
    }

    fn rewind(&mut self) -> Result<()> {
        (**self).rewind()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn detach(&mut self) -> Option<Detached> {
        (**self).detach()
    }

    fn contents(&mut self) -> Result<Vec<u8>> {
        (**self).contents()
    }

    fn part_headers(&self) -> Option<&PartHeaders> {
        (**self).part_headers()
    }

    fn filename(&self) -> Option<&str> {
        (**self).filename()
    }

    fn boundary(&self) -> Option<&str> {
        (**self).boundary()
    }

    fn structured_content_type(&self) -> Option<String> {
        (**self).structured_content_type()
    }
}
