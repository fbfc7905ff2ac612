use std::{sync::Arc, time::Duration};

use assert_matches::assert_matches;
use futures::{AsyncReadExt, AsyncWriteExt};
use libp2p::{PeerId, StreamProtocol, identity::Keypair, multiaddr::Protocol};
use p2praft_net_host::{HostConfig, HostHandle};
use p2praft_transport::{
    EndpointError, RAFT_PROTOCOL, ServerAddress, ServerId, StreamEndpoint, new_transport,
};
use tokio::net::TcpListener;

const TEST_PROTOCOL: StreamProtocol = StreamProtocol::new("/p2praft/test/1.0.0");

async fn local_host() -> HostHandle {
    HostHandle::spawn(Keypair::generate_ed25519(), HostConfig::local())
        .await
        .unwrap()
}

/// Two hosts with `a` connected to `b`.
async fn connected_pair() -> (HostHandle, HostHandle) {
    let a = local_host().await;
    let b = local_host().await;
    let addr = b.listen_addrs()[0].clone();
    tokio::time::timeout(Duration::from_secs(5), a.connect(b.peer_id(), addr))
        .await
        .unwrap()
        .unwrap();
    (a, b)
}

fn address_of(host: &HostHandle) -> ServerAddress {
    ServerAddress::new(host.peer_id().to_string())
}

#[tokio::test(flavor = "multi_thread")]
async fn dial_and_accept_exchange_bytes() {
    let (a, b) = connected_pair().await;
    let dialer = StreamEndpoint::new(a.clone(), TEST_PROTOCOL).unwrap();
    let listener = Arc::new(StreamEndpoint::new(b.clone(), TEST_PROTOCOL).unwrap());

    let accept = tokio::spawn({
        let listener = listener.clone();
        async move {
            let mut conn = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            conn.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"ping");
            conn.write_all(b"pong").await.unwrap();
            conn.flush().await.unwrap();
            conn.remote_peer_id()
        }
    });

    let mut conn = dialer
        .dial(&address_of(&b), Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(conn.remote_peer_id(), b.peer_id());
    assert_eq!(conn.protocol(), &TEST_PROTOCOL);

    conn.write_all(b"ping").await.unwrap();
    conn.flush().await.unwrap();
    let mut buf = [0u8; 4];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"pong");

    let remote = tokio::time::timeout(Duration::from_secs(5), accept)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(remote, a.peer_id());
}

#[tokio::test(flavor = "multi_thread")]
async fn local_addr_is_peer_address() {
    let host = local_host().await;
    let endpoint = StreamEndpoint::new(host.clone(), TEST_PROTOCOL).unwrap();

    let addr = endpoint.local_addr();
    assert_eq!(addr.iter().count(), 1);
    assert_matches!(addr.iter().next(), Some(Protocol::P2p(peer)) if peer == host.peer_id());
}

#[tokio::test(flavor = "multi_thread")]
async fn dial_rejects_undecodable_address() {
    let host = local_host().await;
    let endpoint = StreamEndpoint::new(host, TEST_PROTOCOL).unwrap();

    let result = endpoint
        .dial(&ServerAddress::new("not-a-peer-id"), Duration::from_secs(1))
        .await;
    assert_matches!(result, Err(EndpointError::InvalidAddress { address, .. }) => {
        assert_eq!(address.as_str(), "not-a-peer-id");
    });
}

#[tokio::test(flavor = "multi_thread")]
async fn dial_times_out_on_silent_peer() {
    let host = local_host().await;
    let endpoint = StreamEndpoint::new(host.clone(), TEST_PROTOCOL).unwrap();

    // Accepts TCP at the kernel level but never speaks the handshake.
    let blackhole = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = blackhole.local_addr().unwrap().port();
    let peer = PeerId::random();
    host.add_peer_address(peer, format!("/ip4/127.0.0.1/tcp/{port}").parse().unwrap())
        .unwrap();

    let timeout = Duration::from_millis(500);
    let started = tokio::time::Instant::now();
    let result = endpoint
        .dial(&ServerAddress::new(peer.to_string()), timeout)
        .await;

    let elapsed = started.elapsed();
    assert_matches!(result, Err(EndpointError::Timeout { peer_id, .. }) if peer_id == peer);
    assert!(elapsed >= timeout, "returned early after {elapsed:?}");
    assert!(elapsed < timeout + Duration::from_millis(100), "overran: {elapsed:?}");
    drop(blackhole);
}

#[tokio::test(flavor = "multi_thread")]
async fn dial_unknown_peer_fails() {
    let host = local_host().await;
    let endpoint = StreamEndpoint::new(host, TEST_PROTOCOL).unwrap();

    let result = endpoint
        .dial(
            &ServerAddress::new(PeerId::random().to_string()),
            Duration::from_secs(1),
        )
        .await;
    assert_matches!(
        result,
        Err(EndpointError::Unreachable { .. } | EndpointError::Timeout { .. })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn close_fails_pending_and_future_accepts() {
    let host = local_host().await;
    let endpoint = Arc::new(StreamEndpoint::new(host, TEST_PROTOCOL).unwrap());

    let pending: Vec<_> = (0..4)
        .map(|_| {
            let endpoint = endpoint.clone();
            tokio::spawn(async move { endpoint.accept().await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(50)).await;

    endpoint.close().await.unwrap();
    assert!(endpoint.is_closed());

    for accept in pending {
        let result = tokio::time::timeout(Duration::from_secs(1), accept)
            .await
            .unwrap()
            .unwrap();
        assert_matches!(result, Err(EndpointError::ListenerClosed));
    }
    assert_matches!(endpoint.accept().await, Err(EndpointError::ListenerClosed));

    assert_matches!(endpoint.close().await, Err(EndpointError::CloseFailed(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn protocol_binds_once_per_host() {
    let host = local_host().await;
    let first = StreamEndpoint::new(host.clone(), TEST_PROTOCOL).unwrap();

    assert_matches!(
        StreamEndpoint::new(host.clone(), TEST_PROTOCOL),
        Err(EndpointError::BindFailed { protocol, .. }) if protocol == TEST_PROTOCOL
    );

    first.close().await.unwrap();
    StreamEndpoint::new(host, TEST_PROTOCOL).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn stopped_host_is_unusable() {
    let host = local_host().await;
    let endpoint = StreamEndpoint::new(host.clone(), TEST_PROTOCOL).unwrap();
    let peer = PeerId::random().to_string();

    host.shutdown().await.unwrap();

    assert_matches!(
        endpoint
            .dial(&ServerAddress::new(peer), Duration::from_secs(1))
            .await,
        Err(EndpointError::NotInitialized)
    );
    assert_matches!(
        StreamEndpoint::new(host, RAFT_PROTOCOL),
        Err(EndpointError::BindFailed { .. })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn transport_carries_rpc_between_hosts() {
    let (a, b) = connected_pair().await;
    let client = new_transport(a.clone(), Duration::from_secs(2)).unwrap();
    let server = new_transport(b.clone(), Duration::from_secs(2)).unwrap();

    assert_eq!(client.max_pool(), 0);
    let mut incoming = server.take_incoming().unwrap();
    assert!(server.take_incoming().is_none());

    let id = ServerId::new(b.peer_id().to_string());
    // The configured address is ignored in favor of the resolved peer id.
    let mut conn = client
        .connect(&id, &ServerAddress::new("stale"))
        .await
        .unwrap();
    conn.write_all(b"append").await.unwrap();
    conn.flush().await.unwrap();

    let mut inbound = tokio::time::timeout(Duration::from_secs(5), incoming.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(inbound.remote_peer_id(), a.peer_id());
    let mut buf = [0u8; 6];
    inbound.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"append");

    client.close().await.unwrap();
    server.close().await.unwrap();
    assert!(server.is_shutdown());
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_listener_receives_no_streams() {
    let (a, b) = connected_pair().await;
    let dialer = StreamEndpoint::new(a, TEST_PROTOCOL).unwrap();
    let listener = StreamEndpoint::new(b.clone(), TEST_PROTOCOL).unwrap();

    listener.close().await.unwrap();

    let dial = dialer
        .dial(&address_of(&b), Duration::from_millis(500))
        .await;
    assert_matches!(
        dial,
        Err(EndpointError::Unreachable { .. } | EndpointError::Timeout { .. })
    );
    assert_matches!(
        tokio::time::timeout(Duration::from_secs(1), listener.accept())
            .await
            .unwrap(),
        Err(EndpointError::ListenerClosed)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn dropping_transport_releases_protocol() {
    let host = local_host().await;
    let transport = new_transport(host.clone(), Duration::from_secs(1)).unwrap();

    drop(transport);

    // The accept loop lets go of the listener asynchronously.
    let rebound = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match StreamEndpoint::new(host.clone(), RAFT_PROTOCOL) {
                Ok(endpoint) => break endpoint,
                Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(rebound.protocol(), &RAFT_PROTOCOL);
}
