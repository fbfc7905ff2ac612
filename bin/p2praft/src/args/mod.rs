//! Command line and config file arguments.

mod log;
mod network;

pub(crate) use log::LogArgs;
pub(crate) use network::NetworkArgs;
