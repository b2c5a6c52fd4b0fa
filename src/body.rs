use std::fmt;
use std::io::{self, SeekFrom};
use std::path::Path;

use serde::Serialize;

use crate::stream::{Detached, FileStream, Form, JsonStream, MultipartStream};
use crate::stream::{PartHeaders, Stream, TextStream};
use crate::Result;

/// Body of a request or response.
///
/// A thin owner of a boxed [`Stream`]. Request bodies are usually made with
/// the constructors here or the `From` impls. Response bodies read from the
/// connection, and implement [`io::Read`].
///
/// ```
/// use barehttp::Body;
/// use barehttp::stream::Stream;
///
/// let mut body = Body::from("hello");
/// assert_eq!(body.size(), Some(5));
/// assert_eq!(body.contents().unwrap(), b"hello");
/// ```
pub struct Body {
    inner: Box<dyn Stream>,
}

impl Body {
    pub fn new(stream: impl Stream + 'static) -> Self {
        Body {
            inner: Box::new(stream),
        }
    }

    pub fn from_boxed(inner: Box<dyn Stream>) -> Self {
        Body { inner }
    }

    pub fn empty() -> Self {
        Body::new(TextStream::raw(Vec::new()))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Body::new(TextStream::new(text.into()))
    }

    /// Serialize a value to a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Body::new(JsonStream::new(value)?))
    }

    pub fn file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Body::new(FileStream::open(path)?))
    }

    /// A `multipart/form-data` body.
    pub fn form(form: Form) -> Result<Self> {
        Ok(Body::new(MultipartStream::new(form)?))
    }

    pub fn into_stream(self) -> Box<dyn Stream> {
        self.inner
    }
}

impl Stream for Body {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf)
    }

    fn eof(&self) -> bool {
        self.inner.eof()
    }

    fn size(&self) -> Option<u64> {
        self.inner.size()
    }

    fn is_readable(&self) -> bool {
        self.inner.is_readable()
    }

    fn is_writable(&self) -> bool {
        self.inner.is_writable()
    }

    fn is_seekable(&self) -> bool {
        self.inner.is_seekable()
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.inner.write(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.inner.seek(pos)
    }

    fn tell(&mut self) -> Result<u64> {
        self.inner.tell()
    }

    fn rewind(&mut self) -> Result<()> {
        self.inner.rewind()
    }

    fn close(&mut self) {
        self.inner.close()
    }

    fn detach(&mut self) -> Option<Detached> {
        self.inner.detach()
    }

    fn contents(&mut self) -> Result<Vec<u8>> {
        self.inner.contents()
    }

    fn part_headers(&self) -> Option<&PartHeaders> {
        self.inner.part_headers()
    }

    fn filename(&self) -> Option<&str> {
        self.inner.filename()
    }

    fn boundary(&self) -> Option<&str> {
        self.inner.boundary()
    }

    fn structured_content_type(&self) -> Option<String> {
        self.inner.structured_content_type()
    }
}

impl io::Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(Stream::read(self, buf)?)
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Body::empty()
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::new(TextStream::raw(v))
    }
}

impl From<&[u8]> for Body {
    fn from(v: &[u8]) -> Self {
        Body::new(TextStream::raw(v.to_vec()))
    }
}

impl From<String> for Body {
    fn from(v: String) -> Self {
        Body::text(v)
    }
}

impl From<&str> for Body {
    fn from(v: &str) -> Self {
        Body::text(v)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("size", &self.inner.size())
            .field("eof", &self.inner.eof())
            .finish()
    }
}
