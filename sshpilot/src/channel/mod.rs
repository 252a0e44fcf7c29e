//! Channel layer for pattern matching over the client's output.
//!
//! This module handles waiting on the interactive process: an
//! ANSI-stripping output buffer, expectation sets, and the `expect`
//! primitive with timeout and end-of-stream handling.

mod buffer;
mod patterns;
mod pty;

pub use buffer::PatternBuffer;
pub use patterns::{Expectation, Matched, earliest_match};
pub use pty::PtyChannel;
