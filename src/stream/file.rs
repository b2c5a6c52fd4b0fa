use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::{Detached, PartHeaders, Stream};
use crate::{Error, Result};

/// A file opened read-only.
///
/// As a multipart part it is sent as a file upload with the file's base name,
/// and a `Content-Type` guessed from the extension.
#[derive(Debug)]
pub struct FileStream {
    file: Option<File>,
    path: PathBuf,
    filename: String,
    headers: PartHeaders,
    len: u64,
    pos: u64,
}

impl FileStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::open_as(path, filename)
    }

    /// Open a file, but present it under another filename.
    pub fn open_as(path: impl AsRef<Path>, filename: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| Error::FileOpen {
            path: path.clone(),
            source,
        };

        let file = File::open(&path).map_err(open_err)?;
        let len = file.metadata().map_err(open_err)?.len();

        let mut headers = PartHeaders::new();
        headers.set("content-type", mime_for(&path));

        trace!("Open file {} ({} bytes)", path.display(), len);

        Ok(FileStream {
            file: Some(file),
            path,
            filename: filename.into(),
            headers,
            len,
            pos: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn headers_mut(&mut self) -> &mut PartHeaders {
        &mut self.headers
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(Error::StreamDetached)
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

impl Stream for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.file()?.read(buf)?;
        self.pos += n as u64;
        if n == 0 && !buf.is_empty() {
            // File shrunk since it was opened.
            self.len = self.pos;
        }
        Ok(n)
    }

    fn eof(&self) -> bool {
        self.file.is_none() || self.pos >= self.len
    }

    fn size(&self) -> Option<u64> {
        self.file.as_ref().map(|_| self.len)
    }

    fn is_seekable(&self) -> bool {
        self.file.is_some()
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.pos = self.file()?.seek(pos)?;
        Ok(self.pos)
    }

    fn tell(&mut self) -> Result<u64> {
        self.file()?;
        Ok(self.pos)
    }

    fn close(&mut self) {
        self.file = None;
    }

    fn detach(&mut self) -> Option<Detached> {
        self.file.take().map(Detached::File)
    }

    fn part_headers(&self) -> Option<&PartHeaders> {
        Some(&self.headers)
    }

    fn filename(&self) -> Option<&str> {
        Some(&self.filename)
    }
}
