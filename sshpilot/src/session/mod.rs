//! Interactive shell sessions.
//!
//! A [`Session`] logs in through the ssh client, swaps the shell prompt for
//! a random sentinel, and then runs commands one at a time, using the
//! sentinel to tell where each command's output ends.

mod builder;
mod config;
pub mod login;
pub mod prompt;
pub(crate) mod response;

pub use builder::SessionBuilder;
pub use config::{DEFAULT_COMMAND_TIMEOUT, LIST_ONE_PER_LINE, SessionConfig};
pub use prompt::Sentinel;

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::channel::{Expectation, PtyChannel};
use crate::error::{ChannelError, Error, Result, SessionError, TransportError};
use crate::transport::{PtyTransport, Transport};
use response::FirstLine;

/// Pause after an interrupt so the shell handles it before the next line.
const INTERRUPT_SETTLE: Duration = Duration::from_millis(100);

/// Protocol state of a negotiated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// At the sentinel prompt, ready for a command.
    Ready,
    /// A command is in flight. Seen from outside only if the command's
    /// future was dropped before it finished.
    Busy,
    /// A wait failed; the prompt position is unknown until `resync`.
    Desynchronized,
    /// The session has ended.
    Closed,
}

/// A logged-in shell with a sentinel prompt.
///
/// All operations take `&mut self`, so commands on one session are strictly
/// sequential. Independent sessions share nothing and may run concurrently.
///
/// # Example
///
/// ```rust,no_run
/// use sshpilot::Session;
///
/// # async fn example() -> Result<(), sshpilot::Error> {
/// let mut session = Session::connect("foo", "s3cr3t", "172.16.8.38").await?;
/// for line in session.run("ls").await? {
///     println!("{}", line);
/// }
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Session<T: Transport = PtyTransport> {
    channel: PtyChannel<T>,
    config: SessionConfig,
    sentinel: Sentinel,
    /// Exact-match expectation for `sentinel`.
    prompt: Expectation,
    state: SessionState,
    /// The transport has been closed and its resources returned.
    released: bool,
}

impl Session<PtyTransport> {
    /// Log in with defaults for everything but the credentials.
    pub async fn connect(
        username: impl Into<String>,
        secret: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Result<Self> {
        Self::open(SessionConfig::new(username, secret, hostname)).await
    }

    /// Spawn the ssh client and negotiate a session.
    pub async fn open(config: SessionConfig) -> Result<Self> {
        let transport = PtyTransport::spawn(&config.launch, config.diagnostics.clone())?;
        Self::negotiate(transport, config).await
    }
}

impl<T: Transport> Session<T> {
    /// Log in and install the sentinel prompt over an already started
    /// transport.
    ///
    /// On failure the transport is dropped, which releases the process.
    pub async fn negotiate(transport: T, config: SessionConfig) -> Result<Self> {
        let mut channel = PtyChannel::new(transport, config.diagnostics.clone());

        login::login(&mut channel, &config).await?;
        let sentinel = prompt::negotiate(&mut channel, &config).await?;

        config.diagnostics.debug(format_args!(
            "session ready on {}@{}",
            config.username(),
            config.host()
        ));

        Ok(Self {
            prompt: sentinel.expectation(),
            sentinel,
            channel,
            config,
            state: SessionState::Ready,
            released: false,
        })
    }

    /// Run `command` and return its output lines.
    ///
    /// If `expected` is given, it must show up in the output before the
    /// prompt does; output up to and including it is discarded. Both waits
    /// share `timeout`.
    pub async fn execute(
        &mut self,
        command: &str,
        expected: Option<&Expectation>,
        timeout: Duration,
    ) -> Result<Vec<String>> {
        self.ensure_ready()?;
        self.state = SessionState::Busy;
        let deadline = Instant::now() + timeout;

        if let Err(e) = self.channel.send_line(command).await {
            return Err(self.fail(e, |_| SessionError::Desynchronized));
        }

        let mut first = FirstLine::Echo;
        if let Some(pattern) = expected {
            match self
                .channel
                .expect_until(std::slice::from_ref(pattern), deadline)
                .await
            {
                Ok(m) => first = FirstLine::after_match(&m.matched),
                Err(e) => {
                    return Err(self.fail(e, |_| SessionError::ExpectTimeout {
                        command: command.to_string(),
                        pattern: pattern.to_string(),
                        timeout,
                    }));
                }
            }
        }

        let matched = match self
            .channel
            .expect_until(std::slice::from_ref(&self.prompt), deadline)
            .await
        {
            Ok(m) => m,
            Err(e) => {
                return Err(self.fail(e, |_| SessionError::CommandTimeout {
                    command: command.to_string(),
                    timeout,
                }));
            }
        };

        self.state = SessionState::Ready;
        let lines = response::parse_lines(&matched.before, first);
        self.config.diagnostics.trace(format_args!(
            "{:?} -> {} line(s)",
            command,
            lines.len()
        ));
        Ok(lines)
    }

    /// Run `command` with the configured default timeout.
    pub async fn run(&mut self, command: &str) -> Result<Vec<String>> {
        let timeout = self.config.command_timeout;
        self.execute(command, None, timeout).await
    }

    /// Run several commands in order, stopping at the first error.
    pub async fn execute_all(&mut self, commands: &[&str]) -> Result<Vec<Vec<String>>> {
        let mut outputs = Vec::with_capacity(commands.len());
        for command in commands {
            outputs.push(self.run(command).await?);
        }
        Ok(outputs)
    }

    /// Get back to a known prompt after a failed wait.
    ///
    /// Interrupts whatever is running, prints a fresh marker and waits for
    /// it and then the sentinel. Earlier stale prompts are skipped because
    /// the marker only appears joined in real output, never in the echo.
    /// Running out of time fails with [`SessionError::ResyncTimeout`] and
    /// leaves the session desynchronized.
    pub async fn resync(&mut self, timeout: Duration) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(SessionError::Closed.into());
        }

        let nonce = Uuid::new_v4().simple().to_string();
        let (head, tail) = nonce.split_at(nonce.len() / 2);
        let deadline = Instant::now() + timeout;

        if let Err(e) = self.channel.send(&[0x03]).await {
            return Err(self.fail(e, |_| SessionError::Desynchronized));
        }
        tokio::time::sleep(INTERRUPT_SETTLE).await;

        let marker = format!("printf '%s%s\\n' '{}' '{}'", head, tail);
        if let Err(e) = self.channel.send_line(&marker).await {
            return Err(self.fail(e, |_| SessionError::Desynchronized));
        }

        for expectation in [Expectation::exact(nonce.as_str()), self.prompt.clone()] {
            if let Err(e) = self.channel.expect_until(&[expectation], deadline).await {
                return Err(self.fail(e, |_| SessionError::ResyncTimeout(timeout)));
            }
        }

        self.config
            .diagnostics
            .debug(format_args!("session resynchronized"));
        self.state = SessionState::Ready;
        Ok(())
    }

    /// End the session: send `exit`, wait for the client, release it.
    ///
    /// Also releases a session whose remote end already went away. Calling
    /// it again is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        if self.state != SessionState::Closed {
            self.state = SessionState::Closed;
            if let Err(e) = self.channel.send_line("exit").await {
                self.config
                    .diagnostics
                    .debug(format_args!("could not send exit: {}", e));
            }
        }
        self.released = true;
        self.channel.close(self.config.close_timeout).await
    }

    /// The negotiated prompt sentinel.
    pub fn sentinel(&self) -> &Sentinel {
        &self.sentinel
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn username(&self) -> &str {
        self.config.username()
    }

    pub fn host(&self) -> &str {
        self.config.host()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        self.channel.transport()
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Closed => Err(SessionError::Closed.into()),
            SessionState::Busy | SessionState::Desynchronized => {
                Err(SessionError::Desynchronized.into())
            }
        }
    }

    /// Classify a failed wait and update the state to match.
    fn fail(
        &mut self,
        err: Error,
        on_timeout: impl FnOnce(Duration) -> SessionError,
    ) -> Error {
        match err {
            Error::Channel(ChannelError::PatternTimeout(waited)) => {
                self.state = SessionState::Desynchronized;
                on_timeout(waited).into()
            }
            Error::Channel(ChannelError::Closed) | Error::Transport(TransportError::Closed) => {
                self.state = SessionState::Closed;
                SessionError::UnexpectedEof.into()
            }
            other => {
                self.state = SessionState::Desynchronized;
                other
            }
        }
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if !self.released {
            self.config.diagnostics.warn(format_args!(
                "session to {}@{} dropped without close()",
                self.config.username(),
                self.config.host()
            ));
        }
    }
}
