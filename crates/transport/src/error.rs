use std::time::Duration;

use libp2p::{PeerId, StreamProtocol, identity::ParseError};
use p2praft_net_host::OpenStreamError;
use p2praft_raft_net::ServerAddress;

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("Failed to bind listener for {protocol}: {reason}")]
    BindFailed {
        protocol: StreamProtocol,
        reason: String,
    },
    #[error("Stream endpoint not initialized")]
    NotInitialized,
    #[error("Invalid address {address}: {source}")]
    InvalidAddress {
        address: ServerAddress,
        #[source]
        source: ParseError,
    },
    #[error("Dial to {peer_id} timed out after {timeout:?}")]
    Timeout { peer_id: PeerId, timeout: Duration },
    #[error("Peer {peer_id} unreachable: {source}")]
    Unreachable {
        peer_id: PeerId,
        #[source]
        source: OpenStreamError,
    },
    #[error("Listener closed")]
    ListenerClosed,
    #[error("Failed to close listener: {0}")]
    CloseFailed(String),
}
