//! # sshpilot
//!
//! Async driver for interactive shell sessions over an external `ssh` client.
//!
//! sshpilot spawns `ssh user@host` on a pseudoterminal, answers the login
//! prompts, replaces the remote prompt with a random sentinel, and then runs
//! commands one at a time, returning their output lines with the command
//! echo removed. Every wait is bounded and every failure is surfaced as a
//! typed error.
//!
//! ## Features
//!
//! - Login state machine: unknown host keys, password prompts, early exit
//! - Exact-match sentinel prompt, so command output can't fake a boundary
//! - Optional intermediate patterns for open-ended commands
//! - Explicit resynchronization after a timed-out command
//! - Injected `log` logger per session
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sshpilot::Session;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sshpilot::Error> {
//!     let mut session = Session::connect("foo", "s3cr3t", "172.16.8.38").await?;
//!
//!     let lines = session.run("uname -a").await?;
//!     println!("{}", lines.join("\n"));
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod diagnostics;
pub mod error;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use channel::Expectation;
pub use diagnostics::Diagnostics;
pub use error::{Error, Result};
pub use session::{Sentinel, Session, SessionBuilder, SessionConfig, SessionState};
pub use transport::{LaunchConfig, PtyTransport, Transport};
