//! In-memory transports for unit tests.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::Result;
use crate::transport::Transport;

/// Size of the chunks fake output is delivered in, small enough to split
/// prompts and sentinels across reads.
const CHUNK: usize = 5;

fn chunked(data: &[u8]) -> impl Iterator<Item = Vec<u8>> + '_ {
    data.chunks(CHUNK).map(<[u8]>::to_vec)
}

async fn stall() -> Result<Option<Vec<u8>>> {
    std::future::pending().await
}

/// Replays canned output, then either ends the stream or goes silent.
pub(crate) struct ScriptedTransport {
    pending: VecDeque<Vec<u8>>,
    eof: bool,
    pub sent: Vec<u8>,
}

impl ScriptedTransport {
    pub fn new(chunks: &[&str], eof: bool) -> Self {
        Self {
            pending: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            eof,
            sent: Vec::new(),
        }
    }
}

impl Transport for ScriptedTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.sent.extend_from_slice(data);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        match self.pending.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None if self.eof => Ok(None),
            None => stall().await,
        }
    }

    async fn close(&mut self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

/// Knobs for [`FakeHost`] misbehavior.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeHostOptions {
    /// Ask to confirm an unknown host key first.
    pub unknown_host_key: bool,
    /// Ask for the host key again after `yes`.
    pub repeat_host_key: bool,
    /// Refuse the connection outright.
    pub refuse_connection: bool,
    /// Print no shell prompt after login.
    pub quiet_login: bool,
    /// Never display the installed prompt.
    pub ignore_prompt: bool,
    /// Keep running commands through Ctrl-C.
    pub ignore_interrupt: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Stage {
    HostKey,
    Password,
    LoginShell,
    Shell { prompt: String },
    Gone,
}

const HOST_KEY_PROMPT: &str = "The authenticity of host 'fake (10.0.0.1)' can't be established.\r\n\
ED25519 key fingerprint is SHA256:abc.\r\n\
Are you sure you want to continue connecting (yes/no/[fingerprint])? ";
const PASSWORD_PROMPT: &str = "foo@fake's password: ";

/// Simulates an ssh client talking to a host with a bash-like shell.
///
/// Input is echoed the way a terminal would, commands get canned output,
/// and once a `PS1="..."` line arrives that prompt is printed after every
/// command.
pub(crate) struct FakeHost {
    secret: String,
    options: FakeHostOptions,
    stage: Stage,
    host_key_asked: usize,
    /// A command is "running" and has not printed its prompt yet.
    busy: bool,
    line: Vec<u8>,
    pending: VecDeque<Vec<u8>>,
    pub sent_lines: Vec<String>,
    pub closed: bool,
}

impl FakeHost {
    pub fn new(secret: &str) -> Self {
        Self::with_options(secret, FakeHostOptions::default())
    }

    pub fn with_options(secret: &str, options: FakeHostOptions) -> Self {
        let mut host = Self {
            secret: secret.to_string(),
            stage: Stage::Password,
            host_key_asked: 0,
            busy: false,
            line: Vec::new(),
            pending: VecDeque::new(),
            sent_lines: Vec::new(),
            closed: false,
            options,
        };
        if host.options.refuse_connection {
            host.emit("ssh: connect to host fake port 22: Connection refused\r\n");
            host.stage = Stage::Gone;
        } else if host.options.unknown_host_key {
            host.ask_host_key();
        } else {
            host.emit(PASSWORD_PROMPT);
        }
        host
    }

    /// The prompt the shell currently prints, once installed.
    pub fn prompt(&self) -> Option<&str> {
        match &self.stage {
            Stage::Shell { prompt } => Some(prompt),
            _ => None,
        }
    }

    fn emit(&mut self, text: &str) {
        self.pending.extend(chunked(text.as_bytes()));
    }

    fn ask_host_key(&mut self) {
        self.host_key_asked += 1;
        self.stage = Stage::HostKey;
        self.emit(HOST_KEY_PROMPT);
    }

    fn show_prompt(&mut self) {
        if let Stage::Shell { prompt } = &self.stage {
            if !self.options.ignore_prompt {
                let prompt = prompt.clone();
                self.emit(&prompt);
            }
        }
    }

    fn interrupt(&mut self) {
        if self.busy && self.options.ignore_interrupt {
            return;
        }
        self.line.clear();
        self.busy = false;
        self.emit("^C\r\n");
        self.show_prompt();
    }

    fn handle_line(&mut self, line: String) {
        self.sent_lines.push(line.clone());
        match self.stage.clone() {
            Stage::HostKey => {
                self.emit(&format!("{}\r\n", line));
                if line != "yes" {
                    self.emit("Host key verification failed.\r\n");
                    self.stage = Stage::Gone;
                } else {
                    self.emit("Warning: Permanently added 'fake' (ED25519) to the list of known hosts.\r\n");
                    if self.options.repeat_host_key && self.host_key_asked < 2 {
                        self.ask_host_key();
                    } else {
                        self.stage = Stage::Password;
                        self.emit(PASSWORD_PROMPT);
                    }
                }
            }
            Stage::Password => {
                // Passwords are not echoed.
                self.emit("\r\n");
                if line == self.secret {
                    self.emit("Last login: Mon Oct 19 05:56:01 2026 from 10.0.0.2\r\n");
                    if !self.options.quiet_login {
                        self.emit("\x1b[01;32mfoo@fake\x1b[00m:~$ ");
                    }
                    self.stage = Stage::LoginShell;
                } else {
                    self.emit("Permission denied, please try again.\r\n");
                    self.emit(PASSWORD_PROMPT);
                }
            }
            Stage::LoginShell => {
                self.emit(&format!("{}\r\n", line));
                match line.split_once("PS1=\"") {
                    Some((_, rest)) => {
                        let prompt = rest.split('"').next().unwrap_or_default().to_string();
                        self.stage = Stage::Shell { prompt };
                        self.show_prompt();
                    }
                    None => self.emit("foo@fake:~$ "),
                }
            }
            Stage::Shell { .. } => {
                self.emit(&format!("{}\r\n", line));
                self.run(&line);
            }
            Stage::Gone => {}
        }
    }

    fn run(&mut self, command: &str) {
        let (program, args) = command.split_once(' ').unwrap_or((command, ""));
        match program {
            "exit" => {
                self.emit("logout\r\nConnection to fake closed.\r\n");
                self.stage = Stage::Gone;
                return;
            }
            "true" | "alias" | "" => {}
            "echo" => self.emit(&format!("{}\r\n", args)),
            "printf" => {
                // printf '%s%s\n' 'a' 'b'
                let parts: Vec<&str> = args.split('\'').collect();
                if parts.len() >= 6 {
                    self.emit(&format!("{}{}\r\n", parts[3], parts[5]));
                }
            }
            "lines" => self.emit("one\r\ntwo\r\n\x1b[1;34mthree\x1b[0m\r\n"),
            "follow" => self.emit("starting\r\nREADY\r\nline1\r\nline2\r\n"),
            "sleep" | "tail" => {
                self.busy = true;
                return;
            }
            other => self.emit(&format!("bash: {}: command not found\r\n", other)),
        }
        self.show_prompt();
    }
}

impl Transport for FakeHost {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        for &byte in data {
            match byte {
                0x03 => self.interrupt(),
                b'\n' => {
                    let line = String::from_utf8_lossy(&std::mem::take(&mut self.line)).into_owned();
                    if self.busy {
                        // Typed ahead while a command runs: lost to the ^C.
                        continue;
                    }
                    self.handle_line(line);
                }
                _ => self.line.push(byte),
            }
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        match self.pending.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None if self.stage == Stage::Gone => Ok(None),
            None => stall().await,
        }
    }

    async fn close(&mut self, _timeout: Duration) -> Result<()> {
        self.closed = true;
        self.stage = Stage::Gone;
        Ok(())
    }
}
