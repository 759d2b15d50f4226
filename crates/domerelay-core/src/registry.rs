//! Connection registry.
//!
//! Tracks the single upstream link, the live peers keyed by identity and the
//! player ids handed out to them. The registry is owned by one task and is
//! never shared, so it needs no locking.

use std::collections::{BTreeMap, HashMap};

use domerelay_wire::PlayerId;
use tracing::{debug, trace};

use crate::error::RegistryError;
use crate::types::PeerIdentity;

/// One live peer connection.
#[derive(Debug)]
pub struct PeerRecord<H> {
    pub identity: PeerIdentity,
    pub player: Option<PlayerId>,
    pub handle: H,
}

/// Registry of live connections, generic over the connection handle.
#[derive(Debug)]
pub struct Registry<H> {
    upstream: Option<H>,
    peers: BTreeMap<PeerIdentity, PeerRecord<H>>,
    players: HashMap<PlayerId, PeerIdentity>,
    next_player: u32,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Registry<H> {
    pub fn new() -> Self {
        Self {
            upstream: None,
            peers: BTreeMap::new(),
            players: HashMap::new(),
            next_player: 0,
        }
    }

    /// Bind the upstream link. Only one may be bound at a time.
    pub fn bind_upstream(&mut self, handle: H) -> Result<(), RegistryError> {
        if self.upstream.is_some() {
            return Err(RegistryError::AlreadyBound);
        }
        self.upstream = Some(handle);
        Ok(())
    }

    /// Clear the upstream link. Idempotent.
    pub fn unbind_upstream(&mut self) -> Option<H> {
        self.upstream.take()
    }

    pub fn upstream(&self) -> Option<&H> {
        self.upstream.as_ref()
    }

    pub fn is_upstream_bound(&self) -> bool {
        self.upstream.is_some()
    }

    /// Register a new peer connection under `identity`.
    pub fn accept_peer(
        &mut self,
        identity: PeerIdentity,
        handle: H,
    ) -> Result<(), RegistryError> {
        if self.peers.contains_key(&identity) {
            return Err(RegistryError::DuplicateIdentity(identity));
        }
        trace!(%identity, "peer registered");
        self.peers.insert(
            identity.clone(),
            PeerRecord {
                identity,
                player: None,
                handle,
            },
        );
        Ok(())
    }

    /// Assign a player id to a peer.
    ///
    /// Idempotent: a peer that already holds an id keeps it. Fresh ids are
    /// never reused for the lifetime of the registry.
    pub fn assign_id(&mut self, identity: &PeerIdentity) -> Result<PlayerId, RegistryError> {
        let record = self
            .peers
            .get_mut(identity)
            .ok_or_else(|| RegistryError::UnknownPeer(identity.clone()))?;

        if let Some(player) = record.player {
            debug!(%identity, %player, "peer re-announced; keeping id");
            return Ok(player);
        }

        let player = PlayerId(self.next_player);
        self.next_player = self
            .next_player
            .checked_add(1)
            .ok_or(RegistryError::IdsExhausted)?;
        record.player = Some(player);
        self.players.insert(player, identity.clone());
        debug!(%identity, %player, "player id assigned");
        Ok(player)
    }

    pub fn lookup_id(&self, identity: &PeerIdentity) -> Option<PlayerId> {
        self.peers.get(identity).and_then(|record| record.player)
    }

    /// Remove a peer. Returns the player id it held, if any.
    pub fn remove_peer(&mut self, identity: &PeerIdentity) -> Option<PlayerId> {
        let record = self.peers.remove(identity)?;
        if let Some(player) = record.player {
            self.players.remove(&player);
        }
        trace!(%identity, player = ?record.player, "peer removed");
        record.player
    }

    pub fn peer(&self, identity: &PeerIdentity) -> Option<&PeerRecord<H>> {
        self.peers.get(identity)
    }

    /// The live peer holding `player`, if any.
    pub fn peer_for_player(&self, player: PlayerId) -> Option<&PeerRecord<H>> {
        self.players
            .get(&player)
            .and_then(|identity| self.peers.get(identity))
    }

    /// Visit every live peer, announced or not, in identity order.
    pub fn for_each_peer(&self, mut f: impl FnMut(&PeerRecord<H>)) {
        for record in self.peers.values() {
            f(record);
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}
