use std::{fmt, time::Duration};

use async_trait::async_trait;

use crate::ServerAddress;

/// Low-level stream abstraction a [`crate::NetworkTransport`] runs on.
///
/// Implementations must be cancel-safe: the transport may drop an in-flight
/// `accept` or `dial` future at any await point.
#[async_trait]
pub trait StreamLayer: Send + Sync + 'static {
    /// A bidirectional, ordered byte stream.
    type Conn: Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;
    type Addr: fmt::Display + Clone + Send + Sync;

    /// Open an outgoing connection, giving up after `timeout`.
    async fn dial(&self, address: &ServerAddress, timeout: Duration)
    -> Result<Self::Conn, Self::Error>;

    /// Wait for the next inbound connection.
    async fn accept(&self) -> Result<Self::Conn, Self::Error>;

    /// Stop listening. Pending and future `accept` calls fail.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Address the layer is listening on.
    fn addr(&self) -> Self::Addr;

    /// Whether `err` means the listener is gone for good.
    fn is_listener_closed(err: &Self::Error) -> bool;
}
