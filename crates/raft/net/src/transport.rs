//! Generic network transport over a [`StreamLayer`].

use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use crate::{
    Logger, NetworkTransportError, ServerAddress, ServerAddressProvider, ServerId, StreamLayer,
};

/// Delay before retrying after the first failed accept.
const BASE_ACCEPT_DELAY: Duration = Duration::from_millis(5);

/// Upper bound for the accept retry delay.
const MAX_ACCEPT_DELAY: Duration = Duration::from_secs(1);

/// Inbound connections buffered before the accept loop waits for the consumer.
const INCOMING_BUFFER: usize = 16;

/// Everything a [`NetworkTransport`] is built from.
pub struct NetworkTransportConfig<S> {
    /// Overrides the addresses stored in the cluster configuration when set.
    pub server_address_provider: Option<Arc<dyn ServerAddressProvider>>,
    pub logger: Arc<dyn Logger>,
    pub stream: S,
    /// Idle outbound connections kept per target. Zero disables pooling.
    pub max_pool: usize,
    /// Dial timeout.
    pub timeout: Duration,
}

struct Inner<S: StreamLayer> {
    stream: S,
    provider: Option<Arc<dyn ServerAddressProvider>>,
    logger: Arc<dyn Logger>,
    max_pool: usize,
    timeout: Duration,
    pool: Mutex<HashMap<ServerAddress, Vec<S::Conn>>>,
    shutdown: watch::Sender<bool>,
}

/// Connection-oriented transport for Raft RPCs.
///
/// Outbound connections are dialed through the stream layer, optionally
/// pooled. Inbound connections are accepted by a background task and handed
/// out through [`NetworkTransport::take_incoming`].
pub struct NetworkTransport<S: StreamLayer> {
    inner: Arc<Inner<S>>,
    incoming: Mutex<Option<mpsc::Receiver<S::Conn>>>,
}

impl<S: StreamLayer> NetworkTransport<S> {
    /// Build a transport and start accepting inbound connections.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_config(config: NetworkTransportConfig<S>) -> Self {
        let (shutdown, _) = watch::channel(false);
        let inner = Arc::new(Inner {
            stream: config.stream,
            provider: config.server_address_provider,
            logger: config.logger,
            max_pool: config.max_pool,
            timeout: config.timeout,
            pool: Mutex::new(HashMap::new()),
            shutdown,
        });

        let (tx, rx) = mpsc::channel(INCOMING_BUFFER);
        tokio::spawn(accept_loop(inner.clone(), tx));

        Self {
            inner,
            incoming: Mutex::new(Some(rx)),
        }
    }

    /// Address of the underlying stream layer.
    pub fn local_addr(&self) -> S::Addr {
        self.inner.stream.addr()
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    pub fn max_pool(&self) -> usize {
        self.inner.max_pool
    }

    /// Receiver of inbound connections. Returns `None` after the first call.
    pub fn take_incoming(&self) -> Option<mpsc::Receiver<S::Conn>> {
        self.incoming.lock().take()
    }

    pub fn is_shutdown(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Get a connection to server `id`, reusing a pooled one when possible.
    ///
    /// `target` is the address from the cluster configuration; it is only used
    /// when no provider is configured or the provider fails.
    pub async fn connect(
        &self,
        id: &ServerId,
        target: &ServerAddress,
    ) -> Result<S::Conn, NetworkTransportError<S::Error>> {
        if self.is_shutdown() {
            return Err(NetworkTransportError::Shutdown);
        }

        let address = self.resolve(id, target);
        if let Some(conn) = self.take_pooled(&address) {
            return Ok(conn);
        }

        self.inner
            .stream
            .dial(&address, self.inner.timeout)
            .await
            .map_err(NetworkTransportError::Dial)
    }

    /// Hand a connection back once an RPC on it is complete.
    ///
    /// The connection is kept only while the pool for `target` has room;
    /// otherwise it is dropped.
    pub fn release(&self, target: &ServerAddress, conn: S::Conn) {
        if self.inner.max_pool == 0 || self.is_shutdown() {
            return;
        }

        let mut pool = self.inner.pool.lock();
        let conns = pool.entry(target.clone()).or_default();
        if conns.len() < self.inner.max_pool {
            conns.push(conn);
        }
    }

    /// Stop accepting, close the stream layer and drop pooled connections.
    ///
    /// Inbound connections still buffered for a receiver that was never taken
    /// are dropped. Closing an already closed transport is a no-op.
    pub async fn close(&self) -> Result<(), NetworkTransportError<S::Error>> {
        if self.inner.shutdown.send_replace(true) {
            return Ok(());
        }

        self.incoming.lock().take();
        self.inner.pool.lock().clear();
        self.inner
            .stream
            .close()
            .await
            .map_err(NetworkTransportError::Close)
    }

    fn resolve(&self, id: &ServerId, target: &ServerAddress) -> ServerAddress {
        let Some(provider) = &self.inner.provider else {
            return target.clone();
        };

        match provider.server_addr(id) {
            Ok(address) => address,
            Err(err) => {
                self.inner.logger.warn(
                    "unable to get address for server, using fallback address",
                    &[
                        "id".into(),
                        id.into(),
                        "fallback".into(),
                        target.into(),
                        "error".into(),
                        err.to_string().into(),
                    ],
                );
                target.clone()
            }
        }
    }

    fn take_pooled(&self, address: &ServerAddress) -> Option<S::Conn> {
        if self.inner.max_pool == 0 {
            return None;
        }
        self.inner.pool.lock().get_mut(address)?.pop()
    }
}

impl<S: StreamLayer> Drop for NetworkTransport<S> {
    fn drop(&mut self) {
        // Stops the accept loop, which releases its share of the stream layer.
        self.inner.shutdown.send_replace(true);
    }
}

async fn accept_loop<S: StreamLayer>(inner: Arc<Inner<S>>, tx: mpsc::Sender<S::Conn>) {
    let mut shutdown = inner.shutdown.subscribe();
    let mut delay = Duration::ZERO;

    loop {
        let result = tokio::select! {
            _ = shutdown.wait_for(|closed| *closed) => return,
            result = inner.stream.accept() => result,
        };

        match result {
            Ok(conn) => {
                delay = Duration::ZERO;
                inner.logger.debug(
                    "accepted connection",
                    &[
                        "local-address".into(),
                        inner.stream.addr().to_string().into(),
                    ],
                );
                tokio::select! {
                    biased;
                    // The connection is dropped rather than delivered after shutdown.
                    _ = shutdown.wait_for(|closed| *closed) => return,
                    sent = tx.send(conn) => if sent.is_err() {
                        return;
                    },
                }
            }
            Err(err) if S::is_listener_closed(&err) => {
                inner
                    .logger
                    .debug("listener closed, stopping accept loop", &[]);
                return;
            }
            Err(err) => {
                if *inner.shutdown.borrow() {
                    return;
                }

                delay = if delay.is_zero() {
                    BASE_ACCEPT_DELAY
                } else {
                    (delay * 2).min(MAX_ACCEPT_DELAY)
                };
                inner.logger.error(
                    "failed to accept connection",
                    &["error".into(), err.to_string().into()],
                );

                tokio::select! {
                    _ = shutdown.wait_for(|closed| *closed) => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}
