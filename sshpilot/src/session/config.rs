//! Session configuration.

use std::time::Duration;

use secrecy::SecretString;

use crate::diagnostics::Diagnostics;
use crate::transport::LaunchConfig;

/// Default timeout for a single command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Convenience setup command: one entry per line from `ls`.
pub const LIST_ONE_PER_LINE: &str = "alias ls='ls -1'";

/// Everything a session needs to log in and run commands.
#[derive(Debug)]
pub struct SessionConfig {
    /// How to start the ssh client.
    pub launch: LaunchConfig,

    /// Login secret, sent at the password prompt.
    pub secret: SecretString,

    /// Bound on waiting for the first login prompt.
    pub login_timeout: Duration,

    /// Bound on waiting for a shell prompt after the password.
    pub prompt_timeout: Duration,

    /// Bound on each sentinel wait while installing the prompt.
    pub negotiation_timeout: Duration,

    /// Default timeout used by `Session::run`.
    pub command_timeout: Duration,

    /// How long `close` waits for the client to exit before killing it.
    pub close_timeout: Duration,

    /// Shell started with the sentinel prompt; must skip startup files.
    pub shell_command: String,

    /// Commands run once the sentinel is installed.
    pub setup_commands: Vec<String>,

    /// Injected logger.
    pub diagnostics: Diagnostics,
}

impl SessionConfig {
    /// Defaults for logging in as `username` on `host`.
    pub fn new(
        username: impl Into<String>,
        secret: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            launch: LaunchConfig::new(username, host),
            secret: SecretString::from(secret.into()),
            login_timeout: Duration::from_secs(30),
            prompt_timeout: Duration::from_secs(2),
            negotiation_timeout: Duration::from_secs(10),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            close_timeout: Duration::from_secs(5),
            shell_command: "bash --norc --noediting".to_string(),
            setup_commands: Vec::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn username(&self) -> &str {
        &self.launch.username
    }

    pub fn host(&self) -> &str {
        &self.launch.host
    }
}
