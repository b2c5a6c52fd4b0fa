use std::io::{Cursor, Read, Seek, SeekFrom};

use super::{Detached, PartHeaders, Stream};
use crate::{Error, Result};

/// In-memory bytes, readable, writable and seekable.
///
/// As a multipart part it sends `Content-Type: text/plain` unless changed
/// with [`TextStream::mime()`].
#[derive(Debug)]
pub struct TextStream {
    data: Option<Cursor<Vec<u8>>>,
    headers: PartHeaders,
    mime: String,
    charset: Option<String>,
}

impl TextStream {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        let mut s = Self::raw(data);
        s.mime = "text/plain".to_string();
        s.update_content_type();
        s
    }

    /// Bytes without any part headers.
    pub(crate) fn raw(data: impl Into<Vec<u8>>) -> Self {
        TextStream {
            data: Some(Cursor::new(data.into())),
            headers: PartHeaders::new(),
            mime: String::new(),
            charset: None,
        }
    }

    pub fn mime(mut self, mime: &str) -> Self {
        self.mime = mime.to_string();
        self.update_content_type();
        self
    }

    pub fn charset(mut self, charset: &str) -> Self {
        self.charset = Some(charset.to_string());
        self.update_content_type();
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn headers_mut(&mut self) -> &mut PartHeaders {
        &mut self.headers
    }

    fn update_content_type(&mut self) {
        let value = match &self.charset {
            Some(c) => format!("{}; charset={}", self.mime, c),
            None => self.mime.clone(),
        };
        self.headers.set("content-type", value);
    }

    fn cursor(&mut self) -> Result<&mut Cursor<Vec<u8>>> {
        self.data.as_mut().ok_or(Error::StreamDetached)
    }
}

impl Stream for TextStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.cursor()?.read(buf)?)
    }

    fn eof(&self) -> bool {
        match &self.data {
            Some(c) => c.position() >= c.get_ref().len() as u64,
            None => true,
        }
    }

    fn size(&self) -> Option<u64> {
        self.data.as_ref().map(|c| c.get_ref().len() as u64)
    }

    fn is_writable(&self) -> bool {
        self.data.is_some()
    }

    fn is_seekable(&self) -> bool {
        self.data.is_some()
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let cursor = self.cursor()?;
        let pos = cursor.position() as usize;
        let data = cursor.get_mut();
        // Writes overwrite from the position and extend at the end.
        let end = pos + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[pos..end].copy_from_slice(buf);
        cursor.set_position(end as u64);
        Ok(buf.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.cursor()?.seek(pos)?)
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.cursor()?.position())
    }

    fn close(&mut self) {
        self.data = None;
    }

    fn detach(&mut self) -> Option<Detached> {
        self.data.take().map(|c| Detached::Bytes(c.into_inner()))
    }

    fn part_headers(&self) -> Option<&PartHeaders> {
        Some(&self.headers)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn read_seek_write() {
        let mut s = TextStream::new("hello world");
        assert!(s.is_seekable());
        assert!(s.is_writable());

        let mut buf = [0; 5];
        assert_eq!(s.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(s.tell().unwrap(), 5);
        assert!(!s.eof());

        s.seek(SeekFrom::Start(6)).unwrap();
        s.write(b"there!").unwrap();
        s.rewind().unwrap();
        assert_eq!(s.contents().unwrap(), b"hello there!");
        assert_eq!(s.size(), Some(12));
        assert!(s.eof());
    }

    #[test]
    fn content_type_header() {
        let s = TextStream::new("x");
        assert_eq!(s.part_headers().unwrap().get_line("content-type"), "text/plain");

        let s = TextStream::new("x").mime("text/csv").charset("utf-8");
        assert_eq!(
            s.part_headers().unwrap().get_line("content-type"),
            "text/csv; charset=utf-8"
        );

        let s = TextStream::raw("x");
        assert!(s.part_headers().unwrap().is_empty());
    }

    #[test]
    fn detached_stream() {
        let mut s = TextStream::new("abc");
        match s.detach() {
            Some(Detached::Bytes(b)) => assert_eq!(b, b"abc"),
            d => panic!("unexpected {:?}", d),
        }
        assert!(s.detach().is_none());
        assert!(s.eof());
        assert!(matches!(s.read(&mut [0; 4]), Err(Error::StreamDetached)));
        assert_eq!(s.size(), None);
    }
}
