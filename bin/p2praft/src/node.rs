//! Runs a host with the Raft transport and answers inbound streams with an echo.

use std::time::Instant;

use eyre::{Result, eyre};
use futures::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, io::BufReader};
use libp2p::PeerId;
use p2praft_net_host::HostHandle;
use p2praft_transport::{Connection, ServerAddress, ServerId, new_transport};
use tracing::{debug, info, warn};

use crate::cli::Cli;

/// Longest line read from a stream.
const MAX_LINE: u64 = 4096;

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let host = HostHandle::spawn(cli.keypair()?, cli.network.host_config()).await?;
    info!(peer_id = %host.peer_id(), addrs = ?host.listen_addrs(), "Host started");

    let transport = new_transport(host.clone(), cli.network.dial_timeout())?;
    info!(
        local_addr = %transport.local_addr(),
        dial_timeout = ?transport.timeout(),
        "Raft transport ready"
    );
    let mut incoming = transport
        .take_incoming()
        .ok_or_else(|| eyre!("inbound connections already taken"))?;

    for (peer_id, addr) in cli.network.peer_addrs() {
        match host.connect(peer_id, addr.clone()).await {
            Ok(()) => info!(%peer_id, %addr, "Connected to peer"),
            Err(e) => warn!(%peer_id, %addr, error = %e, "Failed to connect to peer"),
        }
    }

    if let Some(peer_id) = cli.ping {
        let id = ServerId::new(peer_id.to_string());
        let target = ServerAddress::new(peer_id.to_string());
        match transport.connect(&id, &target).await {
            Ok(conn) => {
                if let Err(e) = ping(conn, peer_id).await {
                    warn!(%peer_id, error = %e, "Ping failed");
                }
            }
            Err(e) => warn!(%peer_id, error = %e, "Failed to open stream"),
        }
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            conn = incoming.recv() => match conn {
                Some(conn) => {
                    tokio::spawn(async move {
                        let peer_id = conn.remote_peer_id();
                        if let Err(e) = echo(conn).await {
                            debug!(%peer_id, error = %e, "Echo failed");
                        }
                    });
                }
                None => break,
            },
        }
    }

    transport.close().await?;
    host.shutdown().await?;
    Ok(())
}

async fn ping(conn: Connection, peer_id: PeerId) -> std::io::Result<()> {
    let started = Instant::now();
    let mut reader = BufReader::new(conn);
    reader.get_mut().write_all(b"ping\n").await?;
    reader.get_mut().flush().await?;

    let mut line = String::new();
    (&mut reader).take(MAX_LINE).read_line(&mut line).await?;
    info!(%peer_id, reply = line.trim_end(), rtt = ?started.elapsed(), "Ping answered");
    Ok(())
}

async fn echo(conn: Connection) -> std::io::Result<()> {
    let peer_id = conn.remote_peer_id();
    let mut reader = BufReader::new(conn);

    let mut line = String::new();
    (&mut reader).take(MAX_LINE).read_line(&mut line).await?;
    info!(%peer_id, line = line.trim_end(), "Inbound stream");

    reader.get_mut().write_all(line.as_bytes()).await?;
    reader.get_mut().close().await
}
