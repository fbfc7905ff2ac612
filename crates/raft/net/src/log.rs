//! Leveled, named, key/value logger contract used by the transport.

use std::{fmt, io, sync::Arc, time::Duration};

use strum::{Display, EnumString};

use crate::{ServerAddress, ServerId};

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Level {
    /// No explicit level was requested.
    #[default]
    #[strum(serialize = "unset")]
    NoLevel,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// Disables output where a logger honours levels.
    Off,
}

/// A single positional logging argument.
///
/// Arguments are passed as a flat, alternating `key, value, key, value` list.
/// Only [`LogValue::Str`] is accepted in key position.
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    Str(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    /// Any other value, already rendered.
    Other(String),
}

impl LogValue {
    /// Render an arbitrary value through its `Debug` implementation.
    pub fn debug(value: &impl fmt::Debug) -> Self {
        Self::Other(format!("{value:?}"))
    }

    /// Returns the value as text if it can be used as a key.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(v) | Self::Other(v) => f.write_str(v),
            Self::I64(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from {
    ($variant:ident: $($ty:ty => $conv:expr),+ $(,)?) => {
        $(
            impl From<$ty> for LogValue {
                fn from(value: $ty) -> Self {
                    Self::$variant($conv(value))
                }
            }
        )+
    };
}

impl_from!(Str:
    &str => str::to_owned,
    String => std::convert::identity,
    &String => String::clone,
    &ServerId => |v: &ServerId| v.to_string(),
    &ServerAddress => |v: &ServerAddress| v.to_string(),
);
impl_from!(I64: i32 => i64::from, i64 => std::convert::identity);
impl_from!(U64: u32 => u64::from, u64 => std::convert::identity, usize => |v: usize| v as u64);
impl_from!(F64: f64 => std::convert::identity);
impl_from!(Bool: bool => std::convert::identity);
impl_from!(Other: Duration => |v: Duration| format!("{v:?}"));

/// Leveled logger with derivable names and contextual arguments.
///
/// `with`, `named` and `reset_named` never modify `self`; they return a new
/// logger, so derived loggers can be used concurrently without coordination.
pub trait Logger: Send + Sync + fmt::Debug + 'static {
    /// Emit a message at the given level.
    fn log(&self, level: Level, msg: &str, args: &[LogValue]);

    fn trace(&self, msg: &str, args: &[LogValue]) {
        self.log(Level::Trace, msg, args);
    }

    fn debug(&self, msg: &str, args: &[LogValue]) {
        self.log(Level::Debug, msg, args);
    }

    fn info(&self, msg: &str, args: &[LogValue]) {
        self.log(Level::Info, msg, args);
    }

    fn warn(&self, msg: &str, args: &[LogValue]) {
        self.log(Level::Warn, msg, args);
    }

    fn error(&self, msg: &str, args: &[LogValue]) {
        self.log(Level::Error, msg, args);
    }

    fn is_trace(&self) -> bool;
    fn is_debug(&self) -> bool;
    fn is_info(&self) -> bool;
    fn is_warn(&self) -> bool;
    fn is_error(&self) -> bool;

    /// Contextual arguments attached through [`Logger::with`].
    fn implied_args(&self) -> Vec<LogValue>;

    fn name(&self) -> &str;

    /// Derive a logger that appends `args` to every message.
    fn with(&self, args: &[LogValue]) -> Arc<dyn Logger>;

    /// Derive a logger whose name has `name` appended as a sub-scope.
    fn named(&self, name: &str) -> Arc<dyn Logger>;

    /// Derive a logger whose name is replaced by `name`.
    fn reset_named(&self, name: &str) -> Arc<dyn Logger>;

    fn set_level(&self, level: Level);

    /// A plain writer that forwards written lines into this logger, if supported.
    fn standard_writer(&self) -> Option<Box<dyn io::Write + Send>>;
}
