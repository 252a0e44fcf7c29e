//! Pattern-wait channel over a [`Transport`].

use std::time::Duration;

use tokio::time::Instant;

use super::buffer::PatternBuffer;
use super::patterns::{Expectation, Matched, earliest_match};
use crate::diagnostics::Diagnostics;
use crate::error::{ChannelError, Result};
use crate::transport::Transport;

/// High-level channel for an interactive process.
///
/// Wraps the transport and provides the one blocking primitive the session
/// protocol is built on: send some input, then wait until one of a set of
/// expectations shows up in the output, the stream ends, or time runs out.
pub struct PtyChannel<T> {
    transport: T,

    /// Cleaned output not yet consumed by a match.
    buffer: PatternBuffer,

    /// Set once the transport reported end-of-stream.
    eof: bool,

    diagnostics: Diagnostics,
}

impl<T: Transport> PtyChannel<T> {
    pub fn new(transport: T, diagnostics: Diagnostics) -> Self {
        Self {
            transport,
            buffer: PatternBuffer::new(),
            eof: false,
            diagnostics,
        }
    }

    /// Write raw bytes to the process.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.diagnostics.trace(format_args!(
            "send: {:?}",
            String::from_utf8_lossy(data)
        ));
        self.transport.send(data).await
    }

    /// Write a line (input plus `\n`).
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        self.send(format!("{}\n", line).as_bytes()).await
    }

    /// Write a line without logging its content (passwords).
    pub async fn send_hidden_line(&mut self, line: &str) -> Result<()> {
        self.diagnostics.trace(format_args!("send: <hidden>"));
        self.transport
            .send(format!("{}\n", line).as_bytes())
            .await
    }

    /// Wait up to `timeout` for the first of `patterns`.
    pub async fn expect(&mut self, patterns: &[Expectation], timeout: Duration) -> Result<Matched> {
        self.expect_until(patterns, Instant::now() + timeout).await
    }

    /// Wait up to `timeout` for an exact string.
    pub async fn expect_exact(&mut self, text: &str, timeout: Duration) -> Result<Matched> {
        self.expect(&[Expectation::exact(text)], timeout).await
    }

    /// Wait until `deadline` for the first of `patterns`.
    ///
    /// Data patterns are searched over everything buffered so far; the one
    /// matching earliest in the output wins. Output after the match stays
    /// buffered. If `patterns` contains [`Expectation::Eof`] or
    /// [`Expectation::Timeout`] those outcomes return a match carrying the
    /// whole buffer as `before`; otherwise they surface as
    /// [`ChannelError::Closed`] and [`ChannelError::PatternTimeout`].
    pub async fn expect_until(
        &mut self,
        patterns: &[Expectation],
        deadline: Instant,
    ) -> Result<Matched> {
        let started = Instant::now();
        loop {
            if let Some((index, range)) = earliest_match(patterns, self.buffer.as_slice()) {
                let (before, matched) = self.buffer.consume(range);
                self.diagnostics.trace(format_args!(
                    "matched {} after {} bytes",
                    patterns[index],
                    before.len()
                ));
                return Ok(Matched {
                    index,
                    before,
                    matched,
                });
            }

            if self.eof {
                return match patterns.iter().position(Expectation::is_eof) {
                    Some(index) => Ok(self.drain_as(index)),
                    None => Err(ChannelError::Closed.into()),
                };
            }

            match tokio::time::timeout_at(deadline, self.transport.recv()).await {
                Ok(Ok(Some(chunk))) => self.buffer.extend(&chunk),
                Ok(Ok(None)) => {
                    self.diagnostics.trace(format_args!("end of stream"));
                    self.eof = true;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    let waited = deadline.saturating_duration_since(started);
                    return match patterns.iter().position(Expectation::is_timeout) {
                        Some(index) => Ok(self.drain_as(index)),
                        None => {
                            self.diagnostics.trace(format_args!(
                                "no match after {:?}, buffered: {:?}",
                                waited,
                                self.buffer.as_str_lossy()
                            ));
                            Err(ChannelError::PatternTimeout(waited).into())
                        }
                    };
                }
            }
        }
    }

    /// Pseudo-pattern match: everything buffered becomes `before`.
    fn drain_as(&mut self, index: usize) -> Matched {
        Matched {
            index,
            before: self.buffer.take(),
            matched: Vec::new(),
        }
    }

    /// Whether the output stream has ended.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Drop any buffered output.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Release the underlying process.
    pub async fn close(&mut self, timeout: Duration) -> Result<()> {
        self.transport.close(timeout).await
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
