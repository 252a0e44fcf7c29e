//! Login negotiation.
//!
//! The handshake with the ssh client is a small state machine. Each state
//! watches a fixed set of prompts; whichever shows up first becomes a
//! [`LoginEvent`], and [`transition`] maps `(state, event)` to the action to
//! take and the next state. New prompt kinds (e.g. a second factor) only
//! need a new event and a few table rows.

use secrecy::ExposeSecret;

use crate::channel::{Expectation, PtyChannel};
use crate::error::{ChannelError, Error, Result, SessionError};
use crate::transport::Transport;

use super::config::SessionConfig;

/// Where the handshake currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// Waiting for the client's first prompt.
    AwaitingPrompt,
    /// Answered `yes` to an unknown host key once.
    HostKeyAccepted,
    /// Secret sent, waiting for the login shell.
    PasswordSent,
    /// Handshake finished.
    LoggedIn,
}

/// Something the client printed (or didn't).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginEvent {
    /// "Are you sure you want to continue connecting"
    HostKey,
    /// "password:"
    Password,
    /// A line ending in `$ ` or `# `.
    ShellPrompt,
    /// Nothing matched in time.
    Timeout,
    /// The client exited.
    Eof,
}

/// What to do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginAction {
    /// Answer `yes` to the host key question.
    ConfirmHostKey,
    /// Send the secret.
    SendSecret,
    /// Nothing to send.
    Proceed,
    /// Give up with this reason.
    Fail(&'static str),
}

/// The login transition table.
pub fn transition(state: LoginState, event: LoginEvent) -> (LoginAction, LoginState) {
    use LoginAction::*;
    use LoginEvent::*;
    use LoginState::*;

    match (state, event) {
        (AwaitingPrompt, HostKey) => (ConfirmHostKey, HostKeyAccepted),
        (HostKeyAccepted, HostKey) => (Fail("host key confirmation requested again"), state),
        (AwaitingPrompt | HostKeyAccepted, Password) => (SendSecret, PasswordSent),
        (AwaitingPrompt | HostKeyAccepted, Eof) => {
            (Fail("connection closed before a login prompt"), state)
        }
        // The prompt wait after the password is only diagnostic; sentinel
        // negotiation decides whether the shell is really there.
        (PasswordSent, ShellPrompt | Timeout | Eof) => (Proceed, LoggedIn),
        (PasswordSent, Password) => (Fail("password rejected"), state),
        (_, _) => (Fail("unexpected login state"), state),
    }
}

/// Prompts recognized during login.
struct LoginPatterns {
    host_key: Expectation,
    password: Expectation,
    /// A fresh password prompt at the end of the output, so a banner that
    /// merely mentions "password:" does not count as a rejection.
    password_again: Expectation,
    user_prompt: Expectation,
    root_prompt: Expectation,
}

impl LoginPatterns {
    fn new() -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            host_key: Expectation::regex(r"(?i)are you sure you want to continue connecting")?,
            password: Expectation::regex(r"(?i)password:")?,
            password_again: Expectation::regex(r"(?i)password: ?$")?,
            user_prompt: Expectation::regex(r".*\$ ")?,
            root_prompt: Expectation::regex(r".*# ")?,
        })
    }

    /// The expectation set watched in `state`, paired with the event each
    /// entry produces.
    fn watch(&self, state: LoginState) -> Vec<(Expectation, LoginEvent)> {
        match state {
            LoginState::AwaitingPrompt | LoginState::HostKeyAccepted => vec![
                (self.host_key.clone(), LoginEvent::HostKey),
                (self.password.clone(), LoginEvent::Password),
                (Expectation::Eof, LoginEvent::Eof),
            ],
            LoginState::PasswordSent => vec![
                (self.user_prompt.clone(), LoginEvent::ShellPrompt),
                (self.root_prompt.clone(), LoginEvent::ShellPrompt),
                (self.password_again.clone(), LoginEvent::Password),
                (Expectation::Timeout, LoginEvent::Timeout),
                (Expectation::Eof, LoginEvent::Eof),
            ],
            LoginState::LoggedIn => Vec::new(),
        }
    }
}

/// Drive the client from spawn to a logged-in shell.
pub(crate) async fn login<T: Transport>(
    channel: &mut PtyChannel<T>,
    config: &SessionConfig,
) -> Result<()> {
    let diag = &config.diagnostics;
    let patterns = LoginPatterns::new().map_err(|e| SessionError::InvalidConfig {
        message: e.to_string(),
    })?;

    let mut state = LoginState::AwaitingPrompt;
    while state != LoginState::LoggedIn {
        let (expectations, events): (Vec<_>, Vec<_>) = patterns.watch(state).into_iter().unzip();
        let timeout = if state == LoginState::PasswordSent {
            config.prompt_timeout
        } else {
            config.login_timeout
        };

        let matched = channel
            .expect(&expectations, timeout)
            .await
            .map_err(|e| match e {
                Error::Channel(ChannelError::PatternTimeout(waited)) => {
                    SessionError::LoginTimeout(waited).into()
                }
                other => other,
            })?;

        let event = events[matched.index];
        diag.debug(format_args!(
            "login {:?} -> {:?}: {:?}",
            state,
            event,
            matched.before_str()
        ));

        let (action, next) = transition(state, event);
        match action {
            LoginAction::ConfirmHostKey => channel.send_line("yes").await?,
            LoginAction::SendSecret => {
                channel
                    .send_hidden_line(config.secret.expose_secret())
                    .await?
            }
            LoginAction::Proceed => {}
            LoginAction::Fail(reason) => {
                return Err(SessionError::AuthenticationFailed {
                    user: config.username().to_string(),
                    host: config.host().to_string(),
                    reason: reason.to_string(),
                }
                .into());
            }
        }
        state = next;
    }

    Ok(())
}
