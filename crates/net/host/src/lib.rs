//! A small libp2p host for stream-oriented protocols.
//!
//! The host owns a [`libp2p::Swarm`] running in its own tokio task and hands
//! out a cloneable [`HostHandle`]. Protocols open and accept raw streams
//! through the handle's [`Control`]; the swarm takes care of
//! dialing, security and multiplexing.
//!
//! # Transport Stack
//!
//! ```text
//! DNS
//!   └── TCP
//!         └── Noise (encryption)
//!               └── Yamux (multiplexing)
//! ```

mod behaviour;
mod config;
mod error;
mod handle;
mod service;

pub use behaviour::{AddressBook, HostBehaviour, HostBehaviourEvent};
pub use config::HostConfig;
pub use error::HostError;
pub use handle::HostHandle;

/// Re-exported so callers can name stream types without depending on libp2p-stream.
pub use libp2p_stream::{Control, IncomingStreams, OpenStreamError};
