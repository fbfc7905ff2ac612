//! Network transport contract for Raft.
//!
//! A Raft node talks to its peers through a [`NetworkTransport`], which is
//! generic over three pluggable capabilities:
//!
//! - [`StreamLayer`]: dials and accepts raw, ordered byte streams.
//! - [`ServerAddressProvider`]: turns a [`ServerId`] into a dialable [`ServerAddress`].
//! - [`Logger`]: a leveled, named, key/value logger.
//!
//! The transport never interprets the bytes it carries; RPC encoding belongs to
//! the consensus engine sitting on top of it.

mod address;
mod error;
mod log;
mod stream;
mod transport;

pub use address::{ResolveError, ServerAddress, ServerAddressProvider, ServerId};
pub use error::NetworkTransportError;
pub use log::{Level, LogValue, Logger};
pub use stream::StreamLayer;
pub use transport::{NetworkTransport, NetworkTransportConfig};
