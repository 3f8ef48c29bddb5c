//! Incremental `text/event-stream` decoder
//!
//! Chunks from the HTTP body arrive at arbitrary boundaries. The decoder
//! buffers partial lines, joins consecutive `data:` lines with `\n`, and
//! yields one payload per blank-line-terminated event. Fields other than
//! `data` and comment lines are ignored.

use bytes::{Bytes, BytesMut};

use crate::error::StreamError;

#[derive(Debug)]
pub struct SseDecoder {
    line: BytesMut,
    data: Vec<u8>,
    has_data: bool,
    oversized: bool,
    /// Dropping the rest of a line that already blew the limit
    skipping_line: bool,
    max_event_bytes: usize,
}

impl SseDecoder {
    pub fn new(max_event_bytes: usize) -> Self {
        Self {
            line: BytesMut::new(),
            data: Vec::new(),
            has_data: false,
            oversized: false,
            skipping_line: false,
            max_event_bytes,
        }
    }

    /// Feed a chunk; returns every event it completed, in order
    ///
    /// An event larger than the limit is reported as `EventTooLarge` in
    /// its position and its data discarded.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<Bytes, StreamError>> {
        let mut out = Vec::new();
        self.line.extend_from_slice(chunk);

        while let Some(pos) = self.line.iter().position(|b| *b == b'\n') {
            let raw = self.line.split_to(pos + 1);
            if self.skipping_line {
                self.skipping_line = false;
                continue;
            }
            let line = trim_line_ending(&raw);
            if let Some(event) = self.process_line(line) {
                out.push(event);
            }
        }

        if self.line.len() > self.max_event_bytes {
            self.line.clear();
            self.skipping_line = true;
            self.oversized = true;
        }

        out
    }

    fn process_line(&mut self, line: &[u8]) -> Option<Result<Bytes, StreamError>> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line[0] == b':' {
            return None;
        }

        let (field, value) = match line.iter().position(|b| *b == b':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                (&line[..idx], value.strip_prefix(b" ").unwrap_or(value))
            }
            None => (line, &b""[..]),
        };

        if field == b"data" && !self.oversized {
            if self.has_data {
                self.data.push(b'\n');
            }
            self.data.extend_from_slice(value);
            self.has_data = true;
            if self.data.len() > self.max_event_bytes {
                self.data.clear();
                self.oversized = true;
            }
        }
        None
    }

    fn dispatch(&mut self) -> Option<Result<Bytes, StreamError>> {
        let result = if self.oversized {
            Some(Err(StreamError::EventTooLarge {
                limit: self.max_event_bytes,
            }))
        } else if self.has_data {
            Some(Ok(Bytes::from(std::mem::take(&mut self.data))))
        } else {
            None
        };

        self.data.clear();
        self.has_data = false;
        self.oversized = false;
        result
    }
}

fn trim_line_ending(raw: &[u8]) -> &[u8] {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    line.strip_suffix(b"\r").unwrap_or(line)
}
