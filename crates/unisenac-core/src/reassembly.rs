//! Byte stream to line reassembly.
//!
//! TCP delivers an unframed byte stream: a single read may carry half a
//! command, several commands, or a line whose `\r\n` terminator is split
//! across two segments. `LineReassembler` buffers bytes per connection and
//! yields every complete line as soon as its terminator arrives.
//!
//! Accepted terminators are `\r\n`, `\n` and a bare `\r`. Whichever occurs
//! first in the buffer ends the line. The terminator and surrounding
//! whitespace are stripped, so a blank line comes out as `""`.
//!
//! Without a cap, a peer that never sends a terminator grows the buffer
//! without bound. `with_limit` turns that into `ReassemblyError::LineTooLong`.

use std::borrow::Cow;

use crate::error::ReassemblyError;

/// Per-connection line reassembly buffer.
///
/// # Example
///
/// ```
/// use unisenac_core::LineReassembler;
///
/// let mut lines = LineReassembler::new();
/// assert!(lines.feed(b"hel").unwrap().is_empty());
/// assert_eq!(lines.feed(b"p\r\nti").unwrap(), vec!["help".to_string()]);
/// assert_eq!(lines.pending(), b"ti");
/// ```
#[derive(Debug, Default, Clone)]
pub struct LineReassembler {
    /// Bytes read but not yet terminated
    buffer: Vec<u8>,

    /// Optional cap on `buffer` length
    max_line_bytes: Option<usize>,

    /// The previous chunk ended on a bare `\r`. If the next chunk opens with
    /// `\n`, the pair was a split `\r\n` and the `\n` is dropped.
    skip_lf: bool,
}

impl LineReassembler {
    /// Creates an unbounded reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reassembler that rejects more than `max_line_bytes`
    /// pending bytes.
    pub fn with_limit(max_line_bytes: usize) -> Self {
        Self {
            max_line_bytes: Some(max_line_bytes),
            ..Self::default()
        }
    }

    /// Creates a reassembler from an optional cap.
    pub fn with_optional_limit(max_line_bytes: Option<usize>) -> Self {
        Self {
            max_line_bytes,
            ..Self::default()
        }
    }

    /// Appends freshly read bytes and extracts every complete line.
    ///
    /// Lines are returned in arrival order. Any trailing bytes without a
    /// terminator stay buffered for the next call. On return the buffer
    /// never holds a complete line.
    ///
    /// # Errors
    ///
    /// Returns `ReassemblyError::LineTooLong` if a cap is configured and
    /// the unterminated remainder exceeds it. The buffer is discarded.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<String>, ReassemblyError> {
        let mut input = bytes;
        if self.skip_lf && !input.is_empty() {
            if let Some(rest) = input.strip_prefix(b"\n") {
                input = rest;
            }
            self.skip_lf = false;
        }

        self.buffer.extend_from_slice(input);

        let mut lines = Vec::new();
        while let Some(line) = self.next_line() {
            lines.push(line);
        }

        if let Some(max) = self.max_line_bytes {
            if self.buffer.len() > max {
                let len = self.buffer.len();
                self.buffer.clear();
                return Err(ReassemblyError::LineTooLong { len, max });
            }
        }

        Ok(lines)
    }

    /// Removes the next complete line from the buffer, if any.
    fn next_line(&mut self) -> Option<String> {
        let pos = self
            .buffer
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')?;

        let delimiter_len = match (self.buffer.get(pos), self.buffer.get(pos + 1)) {
            (Some(b'\r'), Some(b'\n')) => 2,
            (Some(b'\r'), None) => {
                self.skip_lf = true;
                1
            }
            _ => 1,
        };

        let line: Vec<u8> = self.buffer.drain(..pos).collect();
        self.buffer.drain(..delimiter_len);

        Some(String::from_utf8_lossy(&line).trim().to_string())
    }

    /// Returns the buffered bytes that do not yet form a line.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns the buffered remainder decoded as UTF-8 (lossy, untrimmed).
    pub fn pending_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    /// Discards the buffered remainder.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
