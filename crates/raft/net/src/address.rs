//! Server identifiers, addresses and address resolution.

use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Logical identifier of a Raft server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(String);

/// Address used to reach a Raft server through a [`crate::StreamLayer`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerAddress(String);

macro_rules! string_newtype {
    ($ty:ident) => {
        impl $ty {
            /// Create from anything string-like.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $ty {
            type Err = Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $ty {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_newtype!(ServerId);
string_newtype!(ServerAddress);

/// Failure to resolve a [`ServerId`] to an address.
#[derive(Debug, thiserror::Error)]
#[error("no address for server {id}: {reason}")]
pub struct ResolveError {
    pub id: ServerId,
    pub reason: String,
}

/// Resolves server identifiers to dialable addresses.
///
/// When a transport has a provider, the address it returns takes precedence
/// over the address stored in the cluster configuration.
pub trait ServerAddressProvider: Send + Sync + 'static {
    fn server_addr(&self, id: &ServerId) -> Result<ServerAddress, ResolveError>;
}
