use std::fmt;
use std::iter::repeat_with;
use std::path::Path;

use super::{Detached, FileStream, Stream, TextStream};
use crate::{Error, Result};

const BOUNDARY_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const BOUNDARY_LEN: usize = 24;

/// A value in a [`Form`].
pub enum FormValue {
    Text(String),
    Stream(Box<dyn Stream>),
    Nested(Form),
}

/// Form fields to be sent as `multipart/form-data`.
///
/// Nested forms are flattened with bracketed keys, so `user` containing
/// `name` becomes the field `user[name]`.
///
/// ```
/// use barehttp::stream::{Form, MultipartStream, Stream};
///
/// let form = Form::new()
///     .text("a", "1")
///     .nested("user", Form::new().text("name", "martin"));
///
/// let mut s = MultipartStream::new(form).unwrap();
/// let body = String::from_utf8(s.contents().unwrap()).unwrap();
/// assert!(body.contains("name=\"user[name]\""));
/// ```
#[derive(Default)]
pub struct Form {
    fields: Vec<(String, FormValue)>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.push(name, FormValue::Text(value.to_string()));
        self
    }

    pub fn stream(mut self, name: impl Into<String>, stream: impl Stream + 'static) -> Self {
        self.push(name, FormValue::Stream(Box::new(stream)));
        self
    }

    /// Add a file upload.
    pub fn file(self, name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        Ok(self.stream(name, FileStream::open(path)?))
    }

    pub fn nested(mut self, name: impl Into<String>, form: Form) -> Self {
        self.push(name, FormValue::Nested(form));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: FormValue) {
        self.fields.push((name.into(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn flatten(self, prefix: Option<&str>, out: &mut Vec<(String, Leaf)>) {
        for (name, value) in self.fields {
            let key = match prefix {
                Some(p) => format!("{}[{}]", p, name),
                None => name,
            };
            match value {
                FormValue::Text(t) => out.push((key, Leaf::Text(t))),
                FormValue::Stream(s) => out.push((key, Leaf::Stream(s))),
                FormValue::Nested(form) => form.flatten(Some(&key), out),
            }
        }
    }
}

enum Leaf {
    Text(String),
    Stream(Box<dyn Stream>),
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (name, value) in &self.fields {
            match value {
                FormValue::Text(t) => list.entry(&(name, t)),
                FormValue::Stream(_) => list.entry(&(name, "<stream>")),
                FormValue::Nested(form) => list.entry(&(name, form)),
            };
        }
        list.finish()
    }
}

/// A `multipart/form-data` body.
///
/// The encoding is laid out up front as a sequence of child streams: framing
/// text, and the streams of the form. Reading goes through the children in
/// order, so file contents are never buffered.
pub struct MultipartStream {
    boundary: String,
    children: Vec<Box<dyn Stream>>,
    index: usize,
}

impl MultipartStream {
    pub fn new(form: Form) -> Result<Self> {
        Self::with_boundary(form, random_boundary())
    }

    pub fn with_boundary(form: Form, boundary: impl Into<String>) -> Result<Self> {
        let boundary = boundary.into();

        let mut fields = Vec::new();
        form.flatten(None, &mut fields);

        let mut children: Vec<Box<dyn Stream>> = Vec::with_capacity(fields.len() * 3 + 1);

        for (name, leaf) in fields {
            let mut meta = format!("--{}\r\n", boundary);

            match leaf {
                Leaf::Text(text) => {
                    push_disposition(&mut meta, &name, None);
                    meta.push_str("\r\n");
                    meta.push_str(&text);
                    children.push(Box::new(TextStream::raw(meta)));
                }
                Leaf::Stream(stream) => {
                    if stream.boundary().is_some() {
                        return Err(Error::NestedMultipart);
                    }
                    push_disposition(&mut meta, &name, stream.filename());
                    if let Some(headers) = stream.part_headers() {
                        for (hname, values) in headers.iter() {
                            meta.push_str(hname);
                            meta.push_str(": ");
                            meta.push_str(&values.join(", "));
                            meta.push_str("\r\n");
                        }
                    }
                    meta.push_str("\r\n");
                    children.push(Box::new(TextStream::raw(meta)));
                    children.push(stream);
                }
            }

            children.push(Box::new(TextStream::raw("\r\n")));
        }

        if !children.is_empty() {
            children.push(Box::new(TextStream::raw(format!("--{}--", boundary))));
        }

        debug!(
            "Multipart body with boundary {} ({} parts)",
            boundary,
            children.len()
        );

        Ok(MultipartStream {
            boundary,
            children,
            index: 0,
        })
    }
}

fn push_disposition(meta: &mut String, name: &str, filename: Option<&str>) {
    meta.push_str("Content-Disposition: form-data; name=\"");
    meta.push_str(&escape_quoted(name));
    meta.push('"');
    if let Some(filename) = filename {
        meta.push_str("; filename=\"");
        meta.push_str(&escape_quoted(filename));
        meta.push('"');
    }
    meta.push_str("\r\n");
}

fn escape_quoted(s: &str) -> String {
    s.replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn random_boundary() -> String {
    let mut rng = fastrand::Rng::new();
    repeat_with(|| BOUNDARY_CHARS[rng.usize(..BOUNDARY_CHARS.len())] as char)
        .take(BOUNDARY_LEN)
        .collect()
}

impl Stream for MultipartStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut filled = 0;
        while filled < buf.len() {
            let Some(child) = self.children.get_mut(self.index) else {
                break;
            };
            let n = child.read(&mut buf[filled..])?;
            filled += n;
            if n == 0 || child.eof() {
                if self.index + 1 >= self.children.len() {
                    break;
                }
                self.index += 1;
            }
        }
        Ok(filled)
    }

    fn eof(&self) -> bool {
        match self.children.last() {
            Some(last) => self.index + 1 >= self.children.len() && last.eof(),
            None => true,
        }
    }

    fn size(&self) -> Option<u64> {
        self.children.iter().map(|c| c.size()).sum()
    }

    fn rewind(&mut self) -> Result<()> {
        for child in &mut self.children {
            child.rewind()?;
        }
        self.index = 0;
        Ok(())
    }

    fn close(&mut self) {
        for child in &mut self.children {
            child.close();
        }
    }

    fn detach(&mut self) -> Option<Detached> {
        if self.children.is_empty() {
            return None;
        }
        let parts = self.children.iter_mut().filter_map(|c| c.detach()).collect();
        self.children.clear();
        self.index = 0;
        Some(Detached::Parts(parts))
    }

    fn boundary(&self) -> Option<&str> {
        Some(&self.boundary)
    }

    fn structured_content_type(&self) -> Option<String> {
        Some(format!("multipart/form-data; boundary={}", self.boundary))
    }
}

impl fmt::Debug for MultipartStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartStream")
            .field("boundary", &self.boundary)
            .field("children", &self.children.len())
            .field("index", &self.index)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::decode_multipart;
    use std::fs::File;
    use std::io::Write;

    fn temp_file(name: &str, content: &[u8]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("barehttp-mp-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        File::create(&path).unwrap().write_all(content).unwrap();
        path
    }

    #[test]
    fn boundary_is_memoized() {
        let s = MultipartStream::new(Form::new().text("a", "1")).unwrap();
        let b = s.boundary().unwrap().to_string();
        assert_eq!(b.len(), BOUNDARY_LEN);
        assert!(b.bytes().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(s.boundary().unwrap(), b);
        assert_eq!(
            s.structured_content_type().unwrap(),
            format!("multipart/form-data; boundary={}", b)
        );
    }

    #[test]
    fn exact_encoding() {
        let form = Form::new().text("a", "1").text("b", "two");
        let mut s = MultipartStream::with_boundary(form, "XyZ").unwrap();
        let body = String::from_utf8(s.contents().unwrap()).unwrap();
        assert_eq!(
            body,
            "--XyZ\r\n\
             Content-Disposition: form-data; name=\"a\"\r\n\
             \r\n\
             1\r\n\
             --XyZ\r\n\
             Content-Disposition: form-data; name=\"b\"\r\n\
             \r\n\
             two\r\n\
             --XyZ--"
        );
    }

    #[test]
    fn text_and_file_parts() {
        let path = temp_file("x.txt", b"file body");
        let form = Form::new().text("a", 1).file("upload", &path).unwrap();

        let mut s = MultipartStream::new(form).unwrap();
        let boundary = s.boundary().unwrap().to_string();
        let size = s.size().unwrap();

        let body = s.contents().unwrap();
        assert_eq!(size, body.len() as u64);
        assert!(s.eof());

        let parts = decode_multipart(&body, &boundary);
        assert_eq!(parts.len(), 2);

        assert_eq!(
            parts[0].header("content-disposition"),
            Some("form-data; name=\"a\"")
        );
        assert_eq!(parts[0].body, b"1");

        assert_eq!(
            parts[1].header("content-disposition"),
            Some("form-data; name=\"upload\"; filename=\"x.txt\"")
        );
        assert_eq!(parts[1].header("content-type"), Some("text/plain"));
        assert_eq!(parts[1].body, b"file body");
    }

    #[test]
    fn nested_keys() {
        let form = Form::new().nested(
            "user",
            Form::new()
                .text("name", "m")
                .nested("tags", Form::new().text("0", "x")),
        );
        let mut s = MultipartStream::new(form).unwrap();
        let boundary = s.boundary().unwrap().to_string();
        let parts = decode_multipart(&s.contents().unwrap(), &boundary);

        let names: Vec<_> = parts
            .iter()
            .map(|p| p.header("content-disposition").unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "form-data; name=\"user[name]\"",
                "form-data; name=\"user[tags][0]\""
            ]
        );
    }

    #[test]
    fn small_reads_match_contents() {
        let form = Form::new()
            .text("a", "1")
            .stream("s", TextStream::new("streamed").mime("text/x-test"));
        let mut s = MultipartStream::with_boundary(form, "B").unwrap();
        let all = s.contents().unwrap();

        s.rewind().unwrap();
        let mut chunked = Vec::new();
        let mut buf = [0_u8; 3];
        loop {
            let n = s.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            chunked.extend_from_slice(&buf[..n]);
        }
        assert_eq!(chunked, all);
        assert!(s.eof());
    }

    #[test]
    fn part_headers_are_emitted() {
        let form = Form::new().stream(
            "doc",
            TextStream::new("{}")
                .mime("application/json")
                .with_header("x-extra", "yes"),
        );
        let mut s = MultipartStream::with_boundary(form, "B").unwrap();
        let parts = decode_multipart(&s.contents().unwrap(), "B");
        assert_eq!(parts[0].header("content-type"), Some("application/json"));
        assert_eq!(parts[0].header("x-extra"), Some("yes"));
        assert_eq!(parts[0].body, b"{}");
    }

    #[test]
    fn nested_multipart_rejected() {
        let inner = MultipartStream::new(Form::new().text("a", "1")).unwrap();
        let err = MultipartStream::new(Form::new().stream("inner", inner)).unwrap_err();
        assert!(matches!(err, Error::NestedMultipart));
    }

    #[test]
    fn empty_form() {
        let mut s = MultipartStream::new(Form::new()).unwrap();
        assert_eq!(s.size(), Some(0));
        assert!(s.eof());
        assert_eq!(s.read(&mut [0; 8]).unwrap(), 0);
    }

    #[test]
    fn quotes_are_escaped() {
        let form = Form::new().text("we\"ird", "v");
        let mut s = MultipartStream::with_boundary(form, "B").unwrap();
        let body = String::from_utf8(s.contents().unwrap()).unwrap();
        assert!(body.contains("name=\"we%22ird\""));
    }

    #[test]
    fn detach_once() {
        let form = Form::new().text("a", "1");
        let mut s = MultipartStream::with_boundary(form, "B").unwrap();
        assert!(matches!(s.detach(), Some(Detached::Parts(_))));
        assert!(s.detach().is_none());
        assert!(s.eof());
    }
}
