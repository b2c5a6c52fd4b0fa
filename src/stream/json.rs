use std::io::SeekFrom;

use serde::Serialize;

use super::{Detached, PartHeaders, Stream, TextStream};
use crate::Result;

/// A value serialized to JSON.
///
/// Sent as a whole body it sets `Content-Type: application/json; charset=UTF-8`
/// on the request.
#[derive(Debug)]
pub struct JsonStream(TextStream);

impl JsonStream {
    pub fn new<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let json = serde_json::to_vec(value)?;
        Ok(JsonStream(TextStream::new(json).mime("application/json")))
    }
}

impl Stream for JsonStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.0.read(buf)
    }

    fn eof(&self) -> bool {
        self.0.eof()
    }

    fn size(&self) -> Option<u64> {
        self.0.size()
    }

    fn is_seekable(&self) -> bool {
        self.0.is_seekable()
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.0.seek(pos)
    }

    fn tell(&mut self) -> Result<u64> {
        self.0.tell()
    }

    fn close(&mut self) {
        self.0.close()
    }

    fn detach(&mut self) -> Option<Detached> {
        self.0.detach()
    }

    fn part_headers(&self) -> Option<&PartHeaders> {
        self.0.part_headers()
    }

    fn structured_content_type(&self) -> Option<String> {
        Some("application/json; charset=UTF-8".to_string())
    }
}
