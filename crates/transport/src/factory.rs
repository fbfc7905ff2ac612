use std::{sync::Arc, time::Duration};

use p2praft_net_host::HostHandle;
use p2praft_raft_net::{NetworkTransport, NetworkTransportConfig};

use crate::{EndpointError, LogBridge, PeerAddressResolver, RAFT_PROTOCOL, StreamEndpoint};

/// Build a Raft [`NetworkTransport`] running over `host`.
///
/// Dials give up after `timeout`. Must be called from within a tokio runtime.
pub fn new_transport(
    host: HostHandle,
    timeout: Duration,
) -> Result<NetworkTransport<StreamEndpoint>, EndpointError> {
    let stream = StreamEndpoint::new(host, RAFT_PROTOCOL)?;

    // Every dial opens a new stream over the peer's existing libp2p
    // connection, which is cheap. The expensive connection is already reused
    // by the swarm, so streams are never pooled.
    let config = NetworkTransportConfig {
        server_address_provider: Some(Arc::new(PeerAddressResolver)),
        logger: Arc::new(LogBridge::default()),
        stream,
        max_pool: 0,
        timeout,
    };

    Ok(NetworkTransport::with_config(config))
}
