//! Listen, accept and dial over peer-addressed libp2p streams.

use std::{
    io,
    pin::Pin,
    str::FromStr,
    task::{Context, Poll},
    time::Duration,
};

use async_trait::async_trait;
use futures::{AsyncRead, AsyncWrite, StreamExt};
use libp2p::{Multiaddr, PeerId, Stream, StreamProtocol, multiaddr::Protocol};
use p2praft_net_host::{HostHandle, IncomingStreams};
use p2praft_raft_net::{ServerAddress, StreamLayer};
use tokio::sync::{Mutex, watch};
use tracing::{debug, trace};

use crate::EndpointError;

/// A single RPC stream to or from a remote peer.
pub struct Connection {
    inner: Stream,
    remote: PeerId,
    protocol: StreamProtocol,
}

impl Connection {
    fn new(inner: Stream, remote: PeerId, protocol: StreamProtocol) -> Self {
        Self {
            inner,
            remote,
            protocol,
        }
    }

    pub fn remote_peer_id(&self) -> PeerId {
        self.remote
    }

    pub fn protocol(&self) -> &StreamProtocol {
        &self.protocol
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("remote", &self.remote)
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_close(cx)
    }
}

/// Stream layer bound to one protocol on one host.
///
/// Creating the endpoint registers the protocol with the host; only one
/// endpoint per host and protocol can exist at a time. The registration is
/// released by [`StreamEndpoint::close`] or when the endpoint is dropped.
pub struct StreamEndpoint {
    host: HostHandle,
    protocol: StreamProtocol,
    /// `None` once closed.
    incoming: Mutex<Option<IncomingStreams>>,
    closed: watch::Sender<bool>,
}

impl StreamEndpoint {
    /// Register `protocol` on `host` and start listening for inbound streams.
    pub fn new(host: HostHandle, protocol: StreamProtocol) -> Result<Self, EndpointError> {
        if !host.is_running() {
            return Err(EndpointError::BindFailed {
                protocol,
                reason: "host is not running".to_string(),
            });
        }

        let incoming = host
            .stream_control()
            .accept(protocol.clone())
            .map_err(|e| EndpointError::BindFailed {
                protocol: protocol.clone(),
                reason: e.to_string(),
            })?;

        debug!(peer_id = %host.peer_id(), %protocol, "Stream endpoint listening");

        Ok(Self {
            host,
            protocol,
            incoming: Mutex::new(Some(incoming)),
            closed: watch::Sender::new(false),
        })
    }

    pub fn protocol(&self) -> &StreamProtocol {
        &self.protocol
    }

    /// Open a stream to the peer whose id is encoded in `address`.
    ///
    /// The address is validated before anything touches the network. The
    /// attempt is abandoned once `timeout` elapses.
    pub async fn dial(
        &self,
        address: &ServerAddress,
        timeout: Duration,
    ) -> Result<Connection, EndpointError> {
        let peer_id =
            PeerId::from_str(address.as_str()).map_err(|source| EndpointError::InvalidAddress {
                address: address.clone(),
                source,
            })?;

        if !self.host.is_running() {
            return Err(EndpointError::NotInitialized);
        }

        trace!(%peer_id, ?timeout, "Dialing");
        let mut control = self.host.stream_control();
        let stream = tokio::time::timeout(timeout, control.open_stream(peer_id, self.protocol.clone()))
            .await
            .map_err(|_| EndpointError::Timeout { peer_id, timeout })?
            .map_err(|source| EndpointError::Unreachable { peer_id, source })?;

        Ok(Connection::new(stream, peer_id, self.protocol.clone()))
    }

    /// Wait for the next inbound stream.
    ///
    /// Fails with [`EndpointError::ListenerClosed`] once the endpoint is closed,
    /// including for calls already waiting when the close happens.
    pub async fn accept(&self) -> Result<Connection, EndpointError> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(EndpointError::ListenerClosed);
        }

        let next = async {
            let mut incoming = self.incoming.lock().await;
            match incoming.as_mut() {
                Some(streams) => streams.next().await,
                None => None,
            }
        };

        tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => Err(EndpointError::ListenerClosed),
            next = next => match next {
                // A stream that raced with close is dropped, not delivered.
                Some((peer_id, stream)) if !*self.closed.borrow() => {
                    trace!(%peer_id, "Accepted stream");
                    Ok(Connection::new(stream, peer_id, self.protocol.clone()))
                }
                _ => Err(EndpointError::ListenerClosed),
            },
        }
    }

    /// Host-level address of this endpoint: `/p2p/<local peer id>`.
    pub fn local_addr(&self) -> Multiaddr {
        Multiaddr::empty().with(Protocol::P2p(self.host.peer_id()))
    }

    /// Unregister the protocol and fail all pending and future accepts.
    ///
    /// Closing twice returns [`EndpointError::CloseFailed`] and changes nothing.
    pub async fn close(&self) -> Result<(), EndpointError> {
        if self.closed.send_replace(true) {
            return Err(EndpointError::CloseFailed(
                "listener already closed".to_string(),
            ));
        }

        // Pending accepts release the lock as soon as they see the close signal.
        self.incoming.lock().await.take();
        debug!(protocol = %self.protocol, "Stream endpoint closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[async_trait]
impl StreamLayer for StreamEndpoint {
    type Conn = Connection;
    type Error = EndpointError;
    type Addr = Multiaddr;

    async fn dial(
        &self,
        address: &ServerAddress,
        timeout: Duration,
    ) -> Result<Self::Conn, Self::Error> {
        StreamEndpoint::dial(self, address, timeout).await
    }

    async fn accept(&self) -> Result<Self::Conn, Self::Error> {
        StreamEndpoint::accept(self).await
    }

    async fn close(&self) -> Result<(), Self::Error> {
        StreamEndpoint::close(self).await
    }

    fn addr(&self) -> Self::Addr {
        self.local_addr()
    }

    fn is_listener_closed(err: &Self::Error) -> bool {
        matches!(err, EndpointError::ListenerClosed)
    }
}
