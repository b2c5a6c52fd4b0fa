use std::io::{self, SeekFrom};

use super::{Detached, PartHeaders, Stream};
use crate::{Error, Result};

/// A view of another stream that starts at a fixed offset.
///
/// Positions and size are reported relative to the offset. Reading or
/// writing while the inner stream is positioned before the offset fails.
#[derive(Debug)]
pub struct WrapStream<S> {
    inner: S,
    offset: u64,
}

impl<S: Stream> WrapStream<S> {
    pub fn new(inner: S, offset: u64) -> Self {
        WrapStream { inner, offset }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn check_position(&mut self) -> Result<()> {
        if self.inner.is_seekable() && self.inner.tell()? < self.offset {
            return Err(Error::ReadBeforeOffset(self.offset));
        }
        Ok(())
    }

    fn relative(&self, absolute: u64) -> Result<u64> {
        absolute
            .checked_sub(self.offset)
            .ok_or(Error::ReadBeforeOffset(self.offset))
    }
}

impl<S: Stream> Stream for WrapStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_position()?;
        self.inner.read(buf)
    }

    fn eof(&self) -> bool {
        self.inner.eof()
    }

    fn size(&self) -> Option<u64> {
        self.inner.size().map(|s| s.saturating_sub(self.offset))
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
        self.check_position()?;
        self.inner.write(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let pos = match pos {
            SeekFrom::Start(n) => {
                let n = n.checked_add(self.offset).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek position overflows")
                })?;
                SeekFrom::Start(n)
            }
            p => p,
        };
        let absolute = self.inner.seek(pos)?;
        self.relative(absolute)
    }

    fn tell(&mut self) -> Result<u64> {
        let absolute = self.inner.tell()?;
        self.relative(absolute)
    }

    fn close(&mut self) {
        self.inner.close()
    }

    fn detach(&mut self) -> Option<Detached> {
        self.inner.detach()
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

#[cfg(test)]
mod test {
    use super::*;
    use crate::stream::TextStream;

    #[test]
    fn hides_prefix() {
        let mut inner = TextStream::new("HEADbody");
        inner.seek(SeekFrom::Start(4)).unwrap();

        let mut s = WrapStream::new(inner, 4);
        assert_eq!(s.size(), Some(4));
        assert_eq!(s.tell().unwrap(), 0);
        assert_eq!(s.contents().unwrap(), b"body");

        s.rewind().unwrap();
        assert_eq!(s.tell().unwrap(), 0);
        assert_eq!(s.contents().unwrap(), b"body");
    }

    #[test]
    fn read_before_offset() {
        let inner = TextStream::new("HEADbody");
        let mut s = WrapStream::new(inner, 4);

        let err = s.read(&mut [0; 8]).unwrap_err();
        assert!(matches!(err, Error::ReadBeforeOffset(4)));
        assert!(s.tell().is_err());
    }

    #[test]
    fn relative_seek_before_offset() {
        let mut inner = TextStream::new("HEADbody");
        inner.seek(SeekFrom::Start(4)).unwrap();
        let mut s = WrapStream::new(inner, 4);

        assert!(s.seek(SeekFrom::Current(-2)).is_err());
    }

    #[test]
    fn seek_past_u64_max() {
        let mut s = WrapStream::new(TextStream::new("HEADbody"), 4);
        let err = s.seek(SeekFrom::Start(u64::MAX)).unwrap_err();
        match err {
            Error::Io(e) => assert_eq!(e.kind(), io::ErrorKind::InvalidInput),
            e => panic!("unexpected error: {:?}", e),
        }
    }

    #[test]
    fn delegates_metadata() {
        let inner = TextStream::new("x").mime("text/csv");
        let s = WrapStream::new(inner, 0);
        assert_eq!(s.part_headers().unwrap().get_line("content-type"), "text/csv");
        assert!(s.is_writable());
        assert!(s.boundary().is_none());
    }
}
