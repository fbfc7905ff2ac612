use std::time::Duration;

use assert_matches::assert_matches;
use libp2p::{Multiaddr, PeerId, identity::Keypair};
use p2praft_net_host::{HostConfig, HostError, HostHandle};

async fn local_host() -> HostHandle {
    HostHandle::spawn(Keypair::generate_ed25519(), HostConfig::local())
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn spawn_reports_listen_addresses() {
    let host = local_host().await;

    assert!(host.is_running());
    let addrs = host.listen_addrs();
    assert_eq!(addrs.len(), 1);
    assert!(addrs[0].to_string().starts_with("/ip4/127.0.0.1/tcp/"));
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_establishes_connection() {
    let a = local_host().await;
    let b = local_host().await;

    let addr = b.listen_addrs()[0].clone();
    tokio::time::timeout(Duration::from_secs(5), a.connect(b.peer_id(), addr))
        .await
        .unwrap()
        .unwrap();

    // Already connected, resolves immediately.
    let addr = b.listen_addrs()[0].clone();
    a.connect(b.peer_id(), addr).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_to_closed_port_fails() {
    let a = local_host().await;
    let unused: Multiaddr = "/ip4/127.0.0.1/tcp/1".parse().unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        a.connect(PeerId::random(), unused),
    )
    .await
    .unwrap();
    assert_matches!(result, Err(HostError::Dial { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_stops_every_clone() {
    let host = local_host().await;
    let clone = host.clone();

    host.shutdown().await.unwrap();

    assert!(!host.is_running());
    assert!(!clone.is_running());
    assert_matches!(clone.shutdown().await, Err(HostError::Stopped));
    assert_matches!(
        clone.add_peer_address(PeerId::random(), Multiaddr::empty()),
        Err(HostError::Stopped)
    );
}
