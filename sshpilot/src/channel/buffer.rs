//! Output buffer with streaming ANSI stripping.
//!
//! Bytes coming off the PTY run through a `vte` parser before they land in
//! the buffer, so prompt and sentinel matching only ever sees printable text
//! plus line control characters. The parser keeps its state between calls,
//! which means an escape sequence split across two reads is still removed.

use std::ops::Range;

use bytes::{Buf, BytesMut};
use vte::{Parser, Perform};

/// Buffer for accumulating cleaned output and carving off matched prefixes.
pub struct PatternBuffer {
    /// The accumulated, cleaned output.
    buffer: BytesMut,

    /// Escape-sequence parser, carried across chunks.
    parser: Parser,
}

impl PatternBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            parser: Parser::new(),
        }
    }

    /// Extend the buffer with raw PTY data, stripping escape sequences.
    pub fn extend(&mut self, data: &[u8]) {
        let mut printer = Printer(&mut self.buffer);
        self.parser.advance(&mut printer, data);
    }

    /// Split off everything up to the end of `range`.
    ///
    /// Returns `(before, matched)`. Bytes after the match stay buffered for
    /// the next wait.
    pub fn consume(&mut self, range: Range<usize>) -> (Vec<u8>, Vec<u8>) {
        let before = self.buffer[..range.start].to_vec();
        let matched = self.buffer[range.clone()].to_vec();
        self.buffer.advance(range.end);
        (before, matched)
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        self.buffer.split().to_vec()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("buffer", &self.as_str_lossy())
            .finish()
    }
}

/// `vte` performer that keeps text and line control, drops everything else.
struct Printer<'a>(&'a mut BytesMut);

impl Perform for Printer<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.0.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\r' | b'\n' | b'\t') {
            self.0.extend_from_slice(&[byte]);
        }
    }
}
