//! Error types for sshpilot.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for sshpilot operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Process/PTY transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Pattern-wait errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session protocol errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl Error {
    /// True for any bounded wait that ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Channel(ChannelError::PatternTimeout(_))
                | Error::Session(
                    SessionError::LoginTimeout(_)
                        | SessionError::SetupFailed { .. }
                        | SessionError::CommandTimeout { .. }
                        | SessionError::ExpectTimeout { .. }
                        | SessionError::ResyncTimeout(_)
                )
        )
    }

    /// True if the remote end rejected the login.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Error::Session(SessionError::AuthenticationFailed { .. }))
    }

    /// True if the client process went away while the session was in use.
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(
            self,
            Error::Session(SessionError::UnexpectedEof)
                | Error::Channel(ChannelError::Closed)
                | Error::Transport(TransportError::Closed)
        )
    }
}

/// Transport layer errors (process spawn, PTY I/O).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to allocate the PTY or spawn the client
    #[error("Failed to spawn '{program}': {message}")]
    Spawn { program: String, message: String },

    /// I/O error on the PTY
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Write attempted after the transport was closed
    #[error("Transport closed")]
    Closed,
}

/// Channel layer errors (pattern waits).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Output stream reached end-of-file
    #[error("Channel closed")]
    Closed,
}

/// Session protocol errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// End-of-stream before any login prompt, or the secret was rejected
    #[error("Authentication failed for '{user}@{host}': {reason}")]
    AuthenticationFailed {
        user: String,
        host: String,
        reason: String,
    },

    /// No login prompt appeared in time
    #[error("No login prompt within {0:?}")]
    LoginTimeout(Duration),

    /// The prompt sentinel never showed up
    #[error("Prompt sentinel not observed within {timeout:?}")]
    SetupFailed { timeout: Duration },

    /// The sentinel did not reappear after a command
    #[error("Command '{command}' did not complete within {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    /// The intermediate pattern of a command never appeared
    #[error("Command '{command}' never produced '{pattern}' within {timeout:?}")]
    ExpectTimeout {
        command: String,
        pattern: String,
        timeout: Duration,
    },

    /// `resync()` never saw its marker and the sentinel
    #[error("Prompt not recovered within {0:?}")]
    ResyncTimeout(Duration),

    /// Client process exited mid-session
    #[error("Remote session ended unexpectedly")]
    UnexpectedEof,

    /// A previous command timed out; call `resync()` first
    #[error("Session out of sync after a timeout - call resync() first")]
    Desynchronized,

    /// Session already closed
    #[error("Session closed")]
    Closed,

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias using sshpilot's Error.
pub type Result<T> = std::result::Result<T, Error>;
