//! Logging CLI arguments.

use clap::Args;
use serde::{Deserialize, Serialize};

/// Logging configuration.
#[derive(Debug, Args, Clone, Default, Serialize, Deserialize)]
#[command(next_help_heading = "Logging")]
#[serde(default)]
pub(crate) struct LogArgs {
    /// Silence all output except errors.
    #[arg(short, long)]
    pub(crate) quiet: bool,

    /// Verbose mode (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    #[serde(skip)]
    pub(crate) verbosity: u8,

    /// Log filter directive (e.g., "raftlib=debug,libp2p=info").
    #[arg(long = "log.filter", value_name = "DIRECTIVE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) filter: Option<String>,

    /// Use JSON format for log output.
    #[arg(long = "log.json")]
    pub(crate) json: bool,
}
