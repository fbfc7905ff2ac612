use p2praft_raft_net::{ResolveError, ServerAddress, ServerAddressProvider, ServerId};

/// Resolves a server id to an address by returning it unchanged.
///
/// Server ids are peer ids in text form. Finding a route to the peer is left
/// to libp2p when the stream is opened, so nothing is looked up or cached here.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerAddressResolver;

impl ServerAddressProvider for PeerAddressResolver {
    fn server_addr(&self, id: &ServerId) -> Result<ServerAddress, ResolveError> {
        Ok(ServerAddress::new(id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use libp2p::{PeerId, identity::Keypair};
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_resolution_is_identity() {
        let id = ServerId::new("not-even-a-peer-id");
        let addr = PeerAddressResolver.server_addr(&id).unwrap();
        assert_eq!(addr.as_str(), id.as_str());
    }

    proptest! {
        #[test]
        fn resolved_address_decodes_to_peer(seed in any::<[u8; 32]>()) {
            let keypair = Keypair::ed25519_from_bytes(seed).unwrap();
            let peer_id = keypair.public().to_peer_id();

            let addr = PeerAddressResolver
                .server_addr(&ServerId::new(peer_id.to_string()))
                .unwrap();

            prop_assert_eq!(PeerId::from_str(addr.as_str()).unwrap(), peer_id);
        }
    }
}
