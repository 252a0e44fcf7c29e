//! Client launch configuration.

/// How to start the external ssh client.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Client executable (default: `ssh`).
    pub program: String,

    /// Target host (hostname or IP address).
    pub host: String,

    /// Username for the login.
    pub username: String,

    /// Port passed as `-p`, if not the client's default.
    pub port: Option<u16>,

    /// Extra arguments placed before the destination (e.g. `-o`, options).
    pub extra_args: Vec<String>,

    /// Terminal width for the PTY.
    pub terminal_width: u16,

    /// Terminal height for the PTY.
    pub terminal_height: u16,

    /// Value of `TERM` for the client (forwarded to the remote shell).
    pub term: String,
}

impl LaunchConfig {
    pub fn new(username: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            program: "ssh".to_string(),
            host: host.into(),
            username: username.into(),
            port: None,
            extra_args: Vec::new(),
            terminal_width: 511,
            terminal_height: 24,
            term: "dumb".to_string(),
        }
    }

    /// `user@host` as given to the client.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    /// Arguments passed to the client, destination last.
    pub fn args(&self) -> Vec<String> {
        let mut args = self.extra_args.clone();
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        args.push(self.destination());
        args
    }
}
