//! Raft RPC transport over libp2p.
//!
//! Raft servers are addressed by their libp2p [`PeerId`](libp2p::PeerId): a
//! server's address is the text form of its peer id, and every RPC runs on its
//! own multiplexed stream negotiated under [`RAFT_PROTOCOL`].
//!
//! - [`StreamEndpoint`]: listen, accept, dial and close over peer streams.
//! - [`PeerAddressResolver`]: server id to address, as a passthrough.
//! - [`LogBridge`]: routes the transport's leveled logging into `tracing`.
//! - [`new_transport`]: wires the three into a [`NetworkTransport`].

use libp2p::StreamProtocol;

mod endpoint;
mod error;
mod factory;
mod log;
mod resolver;

pub use endpoint::{Connection, StreamEndpoint};
pub use error::EndpointError;
pub use factory::new_transport;
pub use log::LogBridge;
pub use resolver::PeerAddressResolver;

pub use p2praft_raft_net::{NetworkTransport, ServerAddress, ServerId};

/// Protocol name all Raft RPC streams are negotiated under.
///
/// Peers only interoperate when they agree on this value.
pub const RAFT_PROTOCOL: StreamProtocol = StreamProtocol::new("/raft/1.0.0/rpc");
