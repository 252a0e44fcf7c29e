//! Prompt sentinel negotiation.
//!
//! After login the shell prompt is replaced by a random token so that the
//! end of every command can be found with an exact string match.

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use crate::channel::{Expectation, PtyChannel};
use crate::error::{ChannelError, Error, Result, SessionError};
use crate::transport::Transport;

use super::config::SessionConfig;

/// A per-session prompt token (a random UUID).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sentinel(String);

impl Sentinel {
    pub fn generate() -> Self {
        Sentinel(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact-match expectation for this sentinel.
    pub fn expectation(&self) -> Expectation {
        Expectation::exact(self.0.as_str())
    }

    /// The line that replaces the login shell with one prompting `self`.
    pub fn install_command(&self, shell_command: &str) -> String {
        format!("exec env PS1=\"{}\" {}", self.0, shell_command)
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Install a fresh sentinel prompt and run the setup commands.
pub(crate) async fn negotiate<T: Transport>(
    channel: &mut PtyChannel<T>,
    config: &SessionConfig,
) -> Result<Sentinel> {
    let sentinel = Sentinel::generate();
    let prompt = [sentinel.expectation()];
    let timeout = config.negotiation_timeout;

    channel
        .send_line(&sentinel.install_command(&config.shell_command))
        .await?;

    // Once in the echoed command line, once as the new shell's prompt.
    for _ in 0..2 {
        await_sentinel(channel, &prompt, timeout).await?;
    }
    config
        .diagnostics
        .debug(format_args!("prompt sentinel installed: {}", sentinel));

    for command in &config.setup_commands {
        channel.send_line(command).await?;
        await_sentinel(channel, &prompt, timeout).await?;
    }

    Ok(sentinel)
}

async fn await_sentinel<T: Transport>(
    channel: &mut PtyChannel<T>,
    prompt: &[Expectation],
    timeout: Duration,
) -> Result<()> {
    match channel.expect(prompt, timeout).await {
        Ok(_) => Ok(()),
        Err(Error::Channel(ChannelError::PatternTimeout(_))) => {
            Err(SessionError::SetupFailed { timeout }.into())
        }
        Err(Error::Channel(ChannelError::Closed)) => Err(SessionError::UnexpectedEof.into()),
        Err(e) => Err(e),
    }
}
