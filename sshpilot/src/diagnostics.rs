//! Injected logging handle.
//!
//! Every session carries its own [`Diagnostics`] instead of reaching for the
//! process-wide logger directly. By default it forwards to whatever the
//! application installed through the `log` facade (e.g. `env_logger`), but a
//! caller can hand in any `log::Log` implementation to capture a single
//! session's transcript.

use std::fmt;
use std::sync::Arc;

use log::{Level, Log, Metadata, Record};

/// Default log target for session records.
pub const DEFAULT_TARGET: &str = "sshpilot";

/// Logger handle passed to a session at construction.
#[derive(Clone)]
pub struct Diagnostics {
    logger: Arc<dyn Log>,
    target: String,
}

impl Diagnostics {
    /// Use the given logger for this session.
    pub fn new(logger: Arc<dyn Log>) -> Self {
        Self {
            logger,
            target: DEFAULT_TARGET.to_string(),
        }
    }

    /// Forward to the globally installed `log` logger.
    pub fn global() -> Self {
        Self::new(Arc::new(GlobalLogger))
    }

    /// Override the log target (useful to tell sessions apart).
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// The log target used for every record.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether a record at `level` would be emitted.
    pub fn enabled(&self, level: Level) -> bool {
        self.logger.enabled(
            &Metadata::builder()
                .level(level)
                .target(&self.target)
                .build(),
        )
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        self.logger.log(
            &Record::builder()
                .level(level)
                .target(&self.target)
                .module_path_static(Some(module_path!()))
                .args(args)
                .build(),
        );
    }

    pub fn trace(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Trace, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Forwards to `log::logger()`, honoring `log::max_level()`.
struct GlobalLogger;

impl Log for GlobalLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            log::logger().log(record);
        }
    }

    fn flush(&self) {
        log::logger().flush();
    }
}
