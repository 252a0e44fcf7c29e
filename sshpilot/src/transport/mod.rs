//! Transport layer: the byte pipe to the spawned ssh client.
//!
//! The session protocol only needs to write bytes and read chunks of output,
//! so it is written against the [`Transport`] trait. [`PtyTransport`] is the
//! real implementation, running the client on a pseudoterminal.

pub mod config;
mod process;

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

pub use config::LaunchConfig;
pub use process::PtyTransport;

/// Bidirectional byte stream to an interactive process.
pub trait Transport: Send {
    /// Write raw bytes to the process input.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Read the next chunk of output.
    ///
    /// Returns `Ok(None)` once the stream has ended. Must be cancel-safe:
    /// waits race this future against a deadline and drop it on timeout.
    fn recv(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Wait up to `timeout` for the process to exit, then release it.
    fn close(&mut self, timeout: Duration) -> impl Future<Output = Result<()>> + Send;
}
