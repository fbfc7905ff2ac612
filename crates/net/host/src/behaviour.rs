//! Swarm behaviours composed by the host.

use std::{
    collections::HashMap,
    convert::Infallible,
    task::{Context, Poll},
};

use libp2p::{
    Multiaddr, PeerId,
    core::{Endpoint, transport::PortUse},
    swarm::{
        ConnectionDenied, ConnectionId, FromSwarm, NetworkBehaviour, THandler, THandlerInEvent,
        THandlerOutEvent, ToSwarm, dummy,
    },
};

/// Combined network behaviour for the host.
#[derive(NetworkBehaviour)]
pub struct HostBehaviour {
    /// Raw per-protocol streams.
    pub stream: libp2p_stream::Behaviour,

    /// Known addresses of remote peers.
    pub addresses: AddressBook,
}

impl HostBehaviour {
    pub fn new() -> Self {
        Self {
            stream: libp2p_stream::Behaviour::new(),
            addresses: AddressBook::default(),
        }
    }
}

impl Default for HostBehaviour {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory peer address book.
///
/// Supplies addresses when the swarm dials a peer by [`PeerId`] alone, which is
/// how streams to peers without an established connection get routed.
#[derive(Debug, Default)]
pub struct AddressBook {
    peers: HashMap<PeerId, Vec<Multiaddr>>,
}

impl AddressBook {
    /// Record an address for `peer`. Returns `false` if it was already known.
    pub fn add(&mut self, peer: PeerId, addr: Multiaddr) -> bool {
        let addrs = self.peers.entry(peer).or_default();
        if addrs.contains(&addr) {
            return false;
        }
        addrs.push(addr);
        true
    }

    pub fn get(&self, peer: &PeerId) -> &[Multiaddr] {
        self.peers.get(peer).map(Vec::as_slice).unwrap_or_default()
    }
}

impl NetworkBehaviour for AddressBook {
    type ConnectionHandler = dummy::ConnectionHandler;
    type ToSwarm = Infallible;

    fn handle_pending_outbound_connection(
        &mut self,
        _: ConnectionId,
        maybe_peer: Option<PeerId>,
        _: &[Multiaddr],
        _: Endpoint,
    ) -> Result<Vec<Multiaddr>, ConnectionDenied> {
        Ok(maybe_peer
            .map(|peer| self.get(&peer).to_vec())
            .unwrap_or_default())
    }

    fn handle_established_inbound_connection(
        &mut self,
        _: ConnectionId,
        _: PeerId,
        _: &Multiaddr,
        _: &Multiaddr,
    ) -> Result<THandler<Self>, ConnectionDenied> {
        Ok(dummy::ConnectionHandler)
    }

    fn handle_established_outbound_connection(
        &mut self,
        _: ConnectionId,
        _: PeerId,
        _: &Multiaddr,
        _: Endpoint,
        _: PortUse,
    ) -> Result<THandler<Self>, ConnectionDenied> {
        Ok(dummy::ConnectionHandler)
    }

    fn on_swarm_event(&mut self, event: FromSwarm) {
        if let FromSwarm::NewExternalAddrOfPeer(new) = event {
            self.add(new.peer_id, new.addr.clone());
        }
    }

    fn on_connection_handler_event(
        &mut self,
        _: PeerId,
        _: ConnectionId,
        event: THandlerOutEvent<Self>,
    ) {
        match event {}
    }

    fn poll(&mut self, _: &mut Context<'_>) -> Poll<ToSwarm<Self::ToSwarm, THandlerInEvent<Self>>> {
        Poll::Pending
    }
}
