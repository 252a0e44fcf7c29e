//! ssh client running on a pseudoterminal, via `portable-pty`.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc;

use super::Transport;
use super::config::LaunchConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{Result, TransportError};

/// How often `close` polls for the child to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// The spawned client plus the PTY it is attached to.
///
/// PTY output is read on a detached background thread and forwarded
/// through an unbounded channel; the channel closing is end-of-stream. The
/// thread ends on its own once the PTY reports EOF. Writes go through the
/// blocking pool, so a child that stops reading cannot stall the runtime.
/// Dropping the transport kills a child that is still running.
pub struct PtyTransport {
    master: Option<Box<dyn MasterPty + Send>>,
    writer: Option<Arc<Mutex<Box<dyn Write + Send>>>>,
    child: Box<dyn Child + Send + Sync>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    program: String,
    diagnostics: Diagnostics,
}

impl PtyTransport {
    /// Allocate a PTY and spawn the client on it.
    pub fn spawn(config: &LaunchConfig, diagnostics: Diagnostics) -> Result<Self> {
        let spawn_err = |e: &dyn std::fmt::Display| TransportError::Spawn {
            program: config.program.clone(),
            message: e.to_string(),
        };

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: config.terminal_height,
                cols: config.terminal_width,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| spawn_err(&e))?;

        let mut cmd = CommandBuilder::new(&config.program);
        cmd.args(config.args());
        cmd.env("TERM", &config.term);

        let child = pair.slave.spawn_command(cmd).map_err(|e| spawn_err(&e))?;
        // Only the child may hold the slave side, so EOF shows up when it exits.
        drop(pair.slave);

        let mut reader = pair.master.try_clone_reader().map_err(|e| spawn_err(&e))?;
        let writer = pair.master.take_writer().map_err(|e| spawn_err(&e))?;

        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("sshpilot-pty-reader".into())
            .spawn(move || {
                let mut buf = [0u8; 8192];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).is_err() {
                                break;
                            }
                        }
                        // EIO once the slave side is gone
                        Err(_) => break,
                    }
                }
            })
            .map_err(|e| spawn_err(&e))?;

        diagnostics.debug(format_args!(
            "spawned {} {} (pid {:?})",
            config.program,
            config.args().join(" "),
            child.process_id()
        ));

        Ok(Self {
            master: Some(pair.master),
            writer: Some(Arc::new(Mutex::new(writer))),
            child,
            rx,
            program: config.program.clone(),
            diagnostics,
        })
    }

    /// OS process id of the client, if still known.
    pub fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }

    /// Whether the client process has exited.
    pub fn has_exited(&mut self) -> bool {
        !matches!(self.child.try_wait(), Ok(None))
    }

    fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            self.diagnostics
                .warn(format_args!("failed to kill {}: {}", self.program, e));
        }
        let _ = self.child.wait();
    }
}

impl Transport for PtyTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let writer = Arc::clone(self.writer.as_ref().ok_or(TransportError::Closed)?);
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut writer = writer
                .lock()
                .map_err(|_| io::Error::other("pty writer poisoned"))?;
            writer.write_all(&data)?;
            writer.flush()
        })
        .await
        .map_err(io::Error::other)
        .and_then(|written| written)
        .map_err(TransportError::Io)?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self, timeout: Duration) -> Result<()> {
        // Dropping the writer also signals EOF on the PTY input. A write still
        // blocked in the pool keeps its own handle until it gives up.
        self.writer.take();

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.child.try_wait().map_err(TransportError::Io)? {
                Some(status) => {
                    self.diagnostics.debug(format_args!(
                        "{} exited with {:?}",
                        self.program, status
                    ));
                    break;
                }
                None if tokio::time::Instant::now() >= deadline => {
                    self.diagnostics.warn(format_args!(
                        "{} still running after {:?}, killing it",
                        self.program, timeout
                    ));
                    self.kill();
                    break;
                }
                None => tokio::time::sleep(EXIT_POLL_INTERVAL).await,
            }
        }

        self.master.take();
        self.rx.close();
        Ok(())
    }
}

impl Drop for PtyTransport {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            self.diagnostics.warn(format_args!(
                "{} dropped while running, killing it",
                self.program
            ));
            self.kill();
        }
    }
}
