//! Host service actor (runs the swarm in its own tokio task).

use std::{collections::HashMap, ops::ControlFlow};

use futures::StreamExt;
use libp2p::{
    Multiaddr, PeerId, Swarm,
    swarm::{
        SwarmEvent,
        dial_opts::{DialOpts, PeerCondition},
    },
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{HostBehaviour, HostError, behaviour::HostBehaviourEvent, handle::ListenAddrs};

/// Commands from the handle to the service.
pub(crate) enum HostCommand {
    /// Remember an address for a peer without dialing it.
    AddPeerAddress { peer_id: PeerId, addr: Multiaddr },
    /// Connect to a peer at the given address.
    Connect {
        peer_id: PeerId,
        addr: Multiaddr,
        response_tx: oneshot::Sender<Result<(), HostError>>,
    },
    /// Stop the swarm and close all connections.
    Shutdown { response_tx: oneshot::Sender<()> },
}

/// Drives the swarm and processes commands from handles.
pub(crate) struct HostService {
    swarm: Swarm<HostBehaviour>,
    command_rx: mpsc::UnboundedReceiver<HostCommand>,
    listen_addrs: ListenAddrs,
    /// Connect requests waiting for a connection to be established.
    pending_connects: HashMap<PeerId, Vec<oneshot::Sender<Result<(), HostError>>>>,
}

impl HostService {
    pub(crate) fn new(
        swarm: Swarm<HostBehaviour>,
        command_rx: mpsc::UnboundedReceiver<HostCommand>,
        listen_addrs: ListenAddrs,
    ) -> Self {
        Self {
            swarm,
            command_rx,
            listen_addrs,
            pending_connects: HashMap::new(),
        }
    }

    /// Run the service event loop.
    ///
    /// This method runs until a shutdown command arrives or all handles are dropped.
    pub(crate) async fn run(mut self) {
        let local_peer_id = *self.swarm.local_peer_id();
        info!(%local_peer_id, "Starting host event loop");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    if self.handle_command(cmd).is_break() {
                        break;
                    }
                }
                event = self.swarm.select_next_some() => self.handle_swarm_event(event),
            }
        }

        debug!(%local_peer_id, "Host event loop stopped");
    }

    fn handle_command(&mut self, cmd: HostCommand) -> ControlFlow<()> {
        match cmd {
            HostCommand::AddPeerAddress { peer_id, addr } => {
                if self.swarm.behaviour_mut().addresses.add(peer_id, addr.clone()) {
                    debug!(%peer_id, %addr, "Added peer address");
                }
            }
            HostCommand::Connect {
                peer_id,
                addr,
                response_tx,
            } => {
                self.swarm
                    .behaviour_mut()
                    .addresses
                    .add(peer_id, addr.clone());

                if self.swarm.is_connected(&peer_id) {
                    let _ = response_tx.send(Ok(()));
                    return ControlFlow::Continue(());
                }

                let opts = DialOpts::peer_id(peer_id)
                    .condition(PeerCondition::Disconnected)
                    .addresses(vec![addr])
                    .build();
                match self.swarm.dial(opts) {
                    Ok(()) => {
                        debug!(%peer_id, "Dial initiated");
                        self.pending_connects
                            .entry(peer_id)
                            .or_default()
                            .push(response_tx);
                    }
                    Err(e) => {
                        let _ = response_tx.send(Err(HostError::Dial {
                            peer_id,
                            reason: e.to_string(),
                        }));
                    }
                }
            }
            HostCommand::Shutdown { response_tx } => {
                self.fail_pending(|| HostError::Stopped);
                let _ = response_tx.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_swarm_event(&mut self, event: SwarmEvent<HostBehaviourEvent>) {
        match event {
            SwarmEvent::NewListenAddr { address, .. } => {
                info!(%address, "New listen address");
                let mut addrs = self.listen_addrs.write();
                if !addrs.contains(&address) {
                    addrs.push(address);
                }
            }
            SwarmEvent::ExpiredListenAddr { address, .. } => {
                debug!(%address, "Expired listen address");
                self.listen_addrs.write().retain(|a| a != &address);
            }
            SwarmEvent::ConnectionEstablished {
                peer_id,
                endpoint,
                num_established,
                ..
            } => {
                info!(
                    %peer_id,
                    endpoint = %endpoint.get_remote_address(),
                    num_established,
                    "Connection established"
                );
                for tx in self.pending_connects.remove(&peer_id).unwrap_or_default() {
                    let _ = tx.send(Ok(()));
                }
            }
            SwarmEvent::ConnectionClosed {
                peer_id,
                cause,
                num_established,
                ..
            } => {
                debug!(%peer_id, num_established, cause = ?cause, "Connection closed");
            }
            SwarmEvent::OutgoingConnectionError { peer_id, error, .. } => {
                let Some(peer_id) = peer_id else {
                    warn!(%error, "Outgoing connection error (unknown peer)");
                    return;
                };
                warn!(%peer_id, %error, "Outgoing connection error");
                let reason = error.to_string();
                for tx in self.pending_connects.remove(&peer_id).unwrap_or_default() {
                    let _ = tx.send(Err(HostError::Dial {
                        peer_id,
                        reason: reason.clone(),
                    }));
                }
            }
            SwarmEvent::IncomingConnectionError { error, send_back_addr, .. } => {
                debug!(%send_back_addr, %error, "Incoming connection error");
            }
            _ => {}
        }
    }

    fn fail_pending(&mut self, err: impl Fn() -> HostError) {
        for (_, senders) in self.pending_connects.drain() {
            for tx in senders {
                let _ = tx.send(Err(err()));
            }
        }
    }
}
