use std::time::Duration;

use clap::Args;
use libp2p::{Multiaddr, PeerId, multiaddr::Protocol};
use p2praft_net_host::HostConfig;
use serde::{Deserialize, Serialize};

const DEFAULT_DIAL_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Parameters for configuring the network
#[derive(Debug, Clone, Args, PartialEq, Eq, Serialize, Deserialize)]
#[command(next_help_heading = "Networking")]
#[serde(default)]
pub(crate) struct NetworkArgs {
    /// Comma separated multiaddrs to listen on.
    #[arg(long = "listen", value_delimiter = ',', default_value = "/ip4/0.0.0.0/tcp/0")]
    pub(crate) listen_addrs: Vec<Multiaddr>,

    /// Comma separated peers to connect to on startup.
    ///
    /// --peers /ip4/127.0.0.1/tcp/4001/p2p/PeerID
    #[arg(long, value_delimiter = ',')]
    pub(crate) peers: Vec<Multiaddr>,

    /// Give up on an outbound stream after this many milliseconds.
    #[arg(long = "dial-timeout", value_name = "MS", default_value_t = DEFAULT_DIAL_TIMEOUT_MS)]
    pub(crate) dial_timeout_ms: u64,

    /// Close connections idle for this many seconds.
    #[arg(long = "idle-timeout", value_name = "SECS", default_value_t = DEFAULT_IDLE_TIMEOUT_SECS)]
    pub(crate) idle_timeout_secs: u64,
}

impl Default for NetworkArgs {
    fn default() -> Self {
        Self {
            listen_addrs: HostConfig::default().listen_addrs,
            peers: Vec::new(),
            dial_timeout_ms: DEFAULT_DIAL_TIMEOUT_MS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

impl NetworkArgs {
    pub(crate) fn host_config(&self) -> HostConfig {
        HostConfig {
            listen_addrs: self.listen_addrs.clone(),
            idle_connection_timeout: Duration::from_secs(self.idle_timeout_secs),
            ..Default::default()
        }
    }

    pub(crate) fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    /// Configured peers that carry a `/p2p/<peer id>` suffix.
    pub(crate) fn peer_addrs(&self) -> impl Iterator<Item = (PeerId, &Multiaddr)> {
        self.peers.iter().filter_map(|addr| match addr.iter().last() {
            Some(Protocol::P2p(peer_id)) => Some((peer_id, addr)),
            _ => None,
        })
    }
}
