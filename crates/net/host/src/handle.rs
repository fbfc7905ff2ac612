//! Cloneable handle for interacting with a running host.

use std::{collections::HashSet, sync::Arc};

use futures::StreamExt;
use libp2p::{
    Multiaddr, PeerId, SwarmBuilder, identity::Keypair, noise, swarm::SwarmEvent, tcp, yamux,
};
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::{
    Control, HostBehaviour, HostConfig, HostError,
    service::{HostCommand, HostService},
};

pub(crate) type ListenAddrs = Arc<RwLock<Vec<Multiaddr>>>;

/// Cloneable handle to a host whose swarm runs in a background task.
///
/// The handle stays valid after the host stops; [`HostHandle::is_running`]
/// reports whether the swarm task is still alive.
#[derive(Clone)]
pub struct HostHandle {
    peer_id: PeerId,
    control: Control,
    command_tx: mpsc::UnboundedSender<HostCommand>,
    listen_addrs: ListenAddrs,
}

impl std::fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostHandle")
            .field("peer_id", &self.peer_id)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl HostHandle {
    /// Build the swarm, bind every listen address and start the host task.
    ///
    /// Returns once all listeners have reported an address, so
    /// [`HostHandle::listen_addrs`] is populated on return.
    pub async fn spawn(keypair: Keypair, config: HostConfig) -> Result<Self, HostError> {
        let mut swarm = SwarmBuilder::with_existing_identity(keypair)
            .with_tokio()
            .with_tcp(
                tcp::Config::default(),
                noise::Config::new,
                yamux::Config::default,
            )?
            .with_dns()?
            .with_behaviour(|_| Ok(HostBehaviour::new()))
            .map_err(|e| HostError::Behaviour(e.to_string()))?
            .with_swarm_config(|cfg| {
                cfg.with_idle_connection_timeout(config.idle_connection_timeout)
            })
            .build();

        let peer_id = *swarm.local_peer_id();
        info!(%peer_id, "Local peer ID");

        let mut waiting = HashSet::new();
        for addr in &config.listen_addrs {
            let id = swarm.listen_on(addr.clone()).map_err(|e| HostError::Listen {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;
            waiting.insert(id);
        }

        let listen_addrs: ListenAddrs = Arc::default();
        let bind = async {
            while !waiting.is_empty() {
                match swarm.select_next_some().await {
                    SwarmEvent::NewListenAddr {
                        listener_id,
                        address,
                    } => {
                        info!(%address, "Listening on address");
                        listen_addrs.write().push(address);
                        waiting.remove(&listener_id);
                    }
                    SwarmEvent::ListenerClosed {
                        addresses, reason, ..
                    } => {
                        return Err(HostError::Listen {
                            addr: addresses.into_iter().next().unwrap_or_else(Multiaddr::empty),
                            reason: format!("{reason:?}"),
                        });
                    }
                    SwarmEvent::ListenerError { error, .. } => {
                        debug!(%error, "Listener error during startup");
                    }
                    _ => {}
                }
            }
            Ok(())
        };
        tokio::time::timeout(config.listen_timeout, bind)
            .await
            .map_err(|_| HostError::ListenTimeout)??;

        let control = swarm.behaviour().stream.new_control();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let service = HostService::new(swarm, command_rx, listen_addrs.clone());
        tokio::spawn(service.run());

        Ok(Self {
            peer_id,
            control,
            command_tx,
            listen_addrs,
        })
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Addresses the host currently listens on.
    pub fn listen_addrs(&self) -> Vec<Multiaddr> {
        self.listen_addrs.read().clone()
    }

    /// A fresh stream control for opening and accepting protocol streams.
    pub fn stream_control(&self) -> Control {
        self.control.clone()
    }

    /// Whether the swarm task is still running.
    pub fn is_running(&self) -> bool {
        !self.command_tx.is_closed()
    }

    /// Remember `addr` for `peer_id` so later dials by peer id can reach it.
    pub fn add_peer_address(&self, peer_id: PeerId, addr: Multiaddr) -> Result<(), HostError> {
        self.command_tx
            .send(HostCommand::AddPeerAddress { peer_id, addr })
            .map_err(|_| HostError::Stopped)
    }

    /// Connect to `peer_id` at `addr`, waiting until the connection is up.
    pub async fn connect(&self, peer_id: PeerId, addr: Multiaddr) -> Result<(), HostError> {
        let (tx, rx) = oneshot::channel();

        self.command_tx
            .send(HostCommand::Connect {
                peer_id,
                addr,
                response_tx: tx,
            })
            .map_err(|_| HostError::Stopped)?;

        rx.await.map_err(|_| HostError::Stopped)?
    }

    /// Stop the swarm. Every clone of this handle observes the shutdown.
    pub async fn shutdown(&self) -> Result<(), HostError> {
        let (tx, rx) = oneshot::channel();

        self.command_tx
            .send(HostCommand::Shutdown { response_tx: tx })
            .map_err(|_| HostError::Stopped)?;

        rx.await.map_err(|_| HostError::Stopped)?;
        // The service drops its receiver on exit; wait for that so
        // `is_running` is accurate once this returns.
        self.command_tx.closed().await;
        Ok(())
    }
}
