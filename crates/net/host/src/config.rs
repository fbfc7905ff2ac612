use std::time::Duration;

use libp2p::Multiaddr;
use serde::{Deserialize, Serialize};

/// Default time an idle connection is kept open.
const DEFAULT_IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Default time to wait for listeners to report their addresses.
const DEFAULT_LISTEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a [`crate::HostHandle`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Addresses to listen on. Empty means dial-only.
    pub listen_addrs: Vec<Multiaddr>,

    /// Connection idle timeout.
    pub idle_connection_timeout: Duration,

    /// How long startup waits for every listener to bind.
    pub listen_timeout: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            listen_addrs: vec![Multiaddr::empty()
                .with(libp2p::multiaddr::Protocol::Ip4([0, 0, 0, 0].into()))
                .with(libp2p::multiaddr::Protocol::Tcp(0))],
            idle_connection_timeout: DEFAULT_IDLE_CONNECTION_TIMEOUT,
            listen_timeout: DEFAULT_LISTEN_TIMEOUT,
        }
    }
}

impl HostConfig {
    /// Config listening on an ephemeral loopback port.
    pub fn local() -> Self {
        Self {
            listen_addrs: vec![Multiaddr::empty()
                .with(libp2p::multiaddr::Protocol::Ip4([127, 0, 0, 1].into()))
                .with(libp2p::multiaddr::Protocol::Tcp(0))],
            ..Default::default()
        }
    }
}
