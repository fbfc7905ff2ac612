//! Routes the transport's leveled logger calls into `tracing`.

use std::{fmt::Write as _, io, sync::Arc};

use p2praft_raft_net::{Level, LogValue, Logger};

/// Target every bridged message is emitted under.
pub const LOG_TARGET: &str = "raftlib";

/// [`Logger`] implementation that forwards to `tracing`.
///
/// Key/value arguments are rendered into the message text. The bridge never
/// filters: every `is_*` query answers `true` and verbosity is left entirely to
/// the installed subscriber.
///
/// Deriving a bridge with [`Logger::with`], [`Logger::named`] or
/// [`Logger::reset_named`] copies its state; the original is never modified.
#[derive(Debug, Clone, Default)]
pub struct LogBridge {
    name: String,
    implied: Vec<LogValue>,
}

impl LogBridge {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implied: Vec::new(),
        }
    }

    /// Render `args` followed by the implied arguments as ` key=value.` pairs.
    ///
    /// Pairs whose key is not text are skipped. A trailing key without a
    /// value is dropped.
    pub fn format_args(&self, args: &[LogValue]) -> String {
        let mut out = String::new();
        for pair in args.chunks_exact(2).chain(self.implied.chunks_exact(2)) {
            let [key, value] = pair else { continue };
            let Some(key) = key.as_key() else { continue };
            let _ = write!(out, " {key}={value}.");
        }
        out
    }

    /// Full message line: `<name>: <msg>. Args: <pairs>`.
    pub fn format(&self, msg: &str, args: &[LogValue]) -> String {
        let args = self.format_args(args);

        let mut line = String::with_capacity(self.name.len() + msg.len() + args.len() + 8);
        if !self.name.is_empty() {
            line.push_str(&self.name);
            line.push_str(": ");
        }
        line.push_str(msg);
        if !args.is_empty() {
            line.push_str(". Args:");
            line.push_str(&args);
        }
        line
    }

    fn derive(&self, name: String, implied: Vec<LogValue>) -> Arc<dyn Logger> {
        Arc::new(Self { name, implied })
    }
}

impl Logger for LogBridge {
    fn log(&self, level: Level, msg: &str, args: &[LogValue]) {
        let line = self.format(msg, args);
        match level {
            Level::Trace | Level::Debug => tracing::debug!(target: LOG_TARGET, "{line}"),
            Level::NoLevel | Level::Info => tracing::info!(target: LOG_TARGET, "{line}"),
            Level::Warn => tracing::warn!(target: LOG_TARGET, "{line}"),
            Level::Error => tracing::error!(target: LOG_TARGET, "{line}"),
            // Not an emission level; surface it rather than drop it.
            Level::Off => tracing::warn!(target: LOG_TARGET, "{line}"),
        }
    }

    fn is_trace(&self) -> bool {
        true
    }

    fn is_debug(&self) -> bool {
        true
    }

    fn is_info(&self) -> bool {
        true
    }

    fn is_warn(&self) -> bool {
        true
    }

    fn is_error(&self) -> bool {
        true
    }

    fn implied_args(&self) -> Vec<LogValue> {
        self.implied.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn with(&self, args: &[LogValue]) -> Arc<dyn Logger> {
        let mut implied = self.implied.clone();
        implied.extend_from_slice(args);
        self.derive(self.name.clone(), implied)
    }

    fn named(&self, name: &str) -> Arc<dyn Logger> {
        let name = if self.name.is_empty() {
            name.to_string()
        } else {
            format!("{}: {name}", self.name)
        };
        self.derive(name, self.implied.clone())
    }

    fn reset_named(&self, name: &str) -> Arc<dyn Logger> {
        self.derive(name.to_string(), self.implied.clone())
    }

    fn set_level(&self, _level: Level) {}

    fn standard_writer(&self) -> Option<Box<dyn io::Write + Send>> {
        None
    }
}
