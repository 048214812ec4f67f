//! Incremental decoder for the newline-delimited reply stream.
//!
//! Network reads can end anywhere, including in the middle of a record or of
//! a multi-byte character. The decoder keeps raw bytes until a full line is
//! available and only then decodes it as UTF-8. `\n` never occurs inside a
//! multi-byte UTF-8 sequence, so splitting on the byte is safe.

use crate::event::StreamEvent;

/// Prefix of the lines that carry an event payload
pub const DATA_PREFIX: &str = "data: ";

/// Longest line kept while waiting for its `\n`; anything longer is dropped
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug)]
pub struct SseDecoder {
    /// Trailing fragment of the last read, not yet terminated by `\n`
    pending: Vec<u8>,
    max_line: usize,
    /// Inside an oversized line; skip bytes up to its `\n`
    discarding: bool,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line,
            discarding: false,
        }
    }

    /// Feed one network read and return every event completed by it, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut bytes = bytes;
        if self.discarding {
            match bytes.iter().position(|b| *b == b'\n') {
                Some(end) => {
                    self.discarding = false;
                    bytes = &bytes[end + 1..];
                }
                None => return Vec::new(),
            }
        }
        self.pending.extend_from_slice(bytes);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            if end - start > self.max_line {
                tracing::warn!(bytes = end - start, "Dropping oversized stream line");
            } else if let Some(event) = decode_line(&self.pending[start..end]) {
                events.push(event);
            }
            start = end + 1;
        }
        self.pending.drain(..start);

        if self.pending.len() > self.max_line {
            tracing::warn!(
                bytes = self.pending.len(),
                "Stream line exceeds {} bytes without a newline, dropping it",
                self.max_line
            );
            self.pending = Vec::new();
            self.discarding = true;
        }

        events
    }

    /// Flush the unterminated last line once the body has ended.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        self.discarding = false;
        let rest = std::mem::take(&mut self.pending);
        if rest.is_empty() {
            return Vec::new();
        }
        decode_line(&rest).into_iter().collect()
    }

    /// Bytes carried over to the next read
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(raw: &[u8]) -> Option<StreamEvent> {
    let line = String::from_utf8_lossy(raw);
    let line: &str = &line;
    let line = line.strip_suffix('\r').unwrap_or(line);

    let payload = line.strip_prefix(DATA_PREFIX)?;
    match StreamEvent::parse_data(payload) {
        Ok(Some(event)) => Some(event),
        Ok(None) => {
            tracing::debug!("Skipping stream record of unknown type: {}", payload);
            None
        }
        Err(e) => {
            tracing::warn!("Failed to parse stream record: {} - data: {}", e, payload);
            None
        }
    }
}
