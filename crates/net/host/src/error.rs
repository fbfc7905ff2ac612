use libp2p::{Multiaddr, PeerId};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Transport error: {0}")]
    Transport(#[from] libp2p::noise::Error),
    #[error("DNS transport error: {0}")]
    Dns(#[from] std::io::Error),
    #[error("Behaviour error: {0}")]
    Behaviour(String),
    #[error("Failed to listen on {addr}: {reason}")]
    Listen { addr: Multiaddr, reason: String },
    #[error("Listeners did not bind within the listen timeout")]
    ListenTimeout,
    #[error("Failed to dial {peer_id}: {reason}")]
    Dial { peer_id: PeerId, reason: String },
    #[error("Host stopped")]
    Stopped,
}
