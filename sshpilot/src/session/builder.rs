//! Builder for creating sessions.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use super::Session;
use super::config::SessionConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{Result, SessionError};
use crate::transport::{PtyTransport, Transport};

/// Builder for constructing sessions.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use sshpilot::SessionBuilder;
///
/// # async fn example() -> Result<(), sshpilot::Error> {
/// let mut session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .port(2222)
///     .command_timeout(Duration::from_secs(10))
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    username: Option<String>,
    secret: Option<SecretString>,
    config: SessionConfig,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            config: SessionConfig::new("", "", host.clone()),
            host,
            username: None,
            secret: None,
        }
    }

    /// Set the username for the login.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password sent at the login prompt.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.secret = Some(SecretString::from(password.into()));
        self
    }

    /// Set the ssh port (default: the client's own default).
    pub fn port(mut self, port: u16) -> Self {
        self.config.launch.port = Some(port);
        self
    }

    /// Use a different client executable (default: `ssh`).
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.config.launch.program = program.into();
        self
    }

    /// Pass an extra argument to the client, before the destination.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.config.launch.extra_args.push(arg.into());
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u16, height: u16) -> Self {
        self.config.launch.terminal_width = width;
        self.config.launch.terminal_height = height;
        self
    }

    /// Set `TERM` for the client (default: `dumb`).
    pub fn term(mut self, term: impl Into<String>) -> Self {
        self.config.launch.term = term.into();
        self
    }

    /// Bound on waiting for the first login prompt.
    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.config.login_timeout = timeout;
        self
    }

    /// Bound on waiting for a shell prompt after the password.
    pub fn prompt_timeout(mut self, timeout: Duration) -> Self {
        self.config.prompt_timeout = timeout;
        self
    }

    /// Bound on each sentinel wait during prompt negotiation.
    pub fn negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.config.negotiation_timeout = timeout;
        self
    }

    /// Default timeout for `Session::run`.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    /// How long `close` waits for the client to exit.
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.config.close_timeout = timeout;
        self
    }

    /// Shell started with the sentinel prompt (default: `bash --norc --noediting`).
    pub fn shell_command(mut self, command: impl Into<String>) -> Self {
        self.config.shell_command = command.into();
        self
    }

    /// Run a command once the prompt is installed.
    pub fn setup_command(mut self, command: impl Into<String>) -> Self {
        self.config.setup_commands.push(command.into());
        self
    }

    /// Use this logger for the session.
    pub fn logger(mut self, logger: Arc<dyn log::Log>) -> Self {
        self.config.diagnostics = Diagnostics::new(logger);
        self
    }

    /// Use a fully configured diagnostics handle.
    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.config.diagnostics = diagnostics;
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<SessionConfig> {
        if self.host.is_empty() {
            return Err(invalid("Host is required"));
        }
        let username = self
            .username
            .filter(|u| !u.is_empty())
            .ok_or_else(|| invalid("Username is required"))?;
        let secret = self.secret.ok_or_else(|| invalid("Password is required"))?;
        if self.config.shell_command.trim().is_empty() {
            return Err(invalid("Shell command must not be empty"));
        }
        if self.config.launch.program.is_empty() {
            return Err(invalid("Client program must not be empty"));
        }

        let mut config = self.config;
        config.launch.username = username;
        config.secret = secret;
        Ok(config)
    }

    /// Spawn the client and negotiate the session.
    pub async fn connect(self) -> Result<Session<PtyTransport>> {
        Session::open(self.build()?).await
    }

    /// Negotiate the session over a caller-provided transport.
    pub async fn connect_with<T: Transport>(self, transport: T) -> Result<Session<T>> {
        Session::negotiate(transport, self.build()?).await
    }
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("host", &self.host)
            .field("username", &self.username)
            .field(
                "secret",
                &self.secret.as_ref().map(|s| !s.expose_secret().is_empty()),
            )
            .field("config", &self.config)
            .finish()
    }
}

fn invalid(message: &str) -> crate::Error {
    SessionError::InvalidConfig {
        message: message.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::testing::FakeHost;

    #[test]
    fn test_build_defaults() {
        let config = SessionBuilder::new("172.16.8.38")
            .username("foo")
            .password("s3cr3t")
            .build()
            .unwrap();
        assert_eq!(config.username(), "foo");
        assert_eq!(config.host(), "172.16.8.38");
        assert_eq!(config.secret.expose_secret(), "s3cr3t");
        assert_eq!(config.command_timeout, Duration::from_secs(2));
        assert_eq!(config.shell_command, "bash --norc --noediting");
        assert_eq!(config.launch.args(), vec!["foo@172.16.8.38"]);
    }

    #[test]
    fn test_build_overrides() {
        let config = SessionBuilder::new("router1")
            .username("admin")
            .password("pw")
            .port(2222)
            .program("/usr/local/bin/ssh")
            .arg("-oStrictHostKeyChecking=accept-new")
            .term("vt100")
            .shell_command("sh")
            .setup_command(crate::session::LIST_ONE_PER_LINE)
            .build()
            .unwrap();
        assert_eq!(config.launch.program, "/usr/local/bin/ssh");
        assert_eq!(config.launch.term, "vt100");
        assert_eq!(
            config.launch.args(),
            vec!["-oStrictHostKeyChecking=accept-new", "-p", "2222", "admin@router1"]
        );
        assert_eq!(config.setup_commands, vec!["alias ls='ls -1'"]);
    }

    #[test]
    fn test_missing_username() {
        let err = SessionBuilder::new("host").password("pw").build().unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_missing_password() {
        let err = SessionBuilder::new("host").username("foo").build().unwrap_err();
        assert!(err.to_string().contains("Password is required"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let builder = SessionBuilder::new("host").username("foo").password("hunter2");
        assert!(!format!("{:?}", builder).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_connect_with_transport() {
        let mut session = SessionBuilder::new("fake")
            .username("foo")
            .password("s3cr3t")
            .prompt_timeout(Duration::from_millis(100))
            .connect_with(FakeHost::new("s3cr3t"))
            .await
            .unwrap();
        assert_eq!(session.run("echo HELLO").await.unwrap(), vec!["HELLO"]);
        session.close().await.unwrap();
    }
}
