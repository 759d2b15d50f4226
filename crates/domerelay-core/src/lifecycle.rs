//! Connection lifecycle coordination.
//!
//! The [`Coordinator`] owns the registry and turns connection events into
//! registry updates and outbound frames. It runs on a single task; every
//! event is processed to completion before the next one starts.

use domerelay_wire::{decode_frame, PeerMessage, UpstreamMessage};
use tracing::{debug, info, warn};

use crate::error::{RelayError, Result};
use crate::registry::Registry;
use crate::router::{self, Dispatch, Target};
use crate::types::{ConnectionId, PeerIdentity};

/// Outbound side of one live connection.
///
/// Implementations must not block: frames are queued and written by the
/// connection's own task.
pub trait ConnectionHandle {
    fn connection_id(&self) -> ConnectionId;

    /// Queue one text frame.
    fn send_frame(&self, frame: String) -> Result<()>;

    /// Ask the connection to close with `reason`.
    fn close(&self, reason: &str);
}

/// Whether the upstream link is currently bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpstreamState {
    Unbound,
    Bound,
}

pub struct Coordinator<H> {
    registry: Registry<H>,
    max_frame_len: usize,
}

impl<H: ConnectionHandle + Clone> Coordinator<H> {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            registry: Registry::new(),
            max_frame_len,
        }
    }

    pub fn registry(&self) -> &Registry<H> {
        &self.registry
    }

    pub fn upstream_state(&self) -> UpstreamState {
        if self.registry.is_upstream_bound() {
            UpstreamState::Bound
        } else {
            UpstreamState::Unbound
        }
    }

    /// A connection qualified for the upstream role.
    ///
    /// While another upstream is bound the newcomer is closed and the bound
    /// link is left untouched.
    pub fn upstream_opened(&mut self, handle: H) -> Result<()> {
        let connection = handle.connection_id();
        match self.registry.bind_upstream(handle.clone()) {
            Ok(()) => {
                info!(%connection, "upstream link bound");
                Ok(())
            }
            Err(err) => {
                warn!(%connection, "refusing upstream connection: link already bound");
                handle.close("upstream already bound");
                Err(err.into())
            }
        }
    }

    /// The connection `connection` closed after qualifying as upstream.
    pub fn upstream_closed(&mut self, connection: ConnectionId) {
        if !self.is_bound_upstream(connection) {
            debug!(%connection, "ignoring close of refused upstream connection");
            return;
        }
        self.registry.unbind_upstream();
        info!(%connection, peers = self.registry.peer_count(), "upstream link unbound");
    }

    /// A new peer connection was accepted at the transport level.
    pub fn peer_opened(&mut self, identity: PeerIdentity, handle: H) -> Result<()> {
        let connection = handle.connection_id();
        if let Err(err) = self.registry.accept_peer(identity.clone(), handle.clone()) {
            warn!(%identity, %connection, "refusing duplicate peer connection");
            handle.close("duplicate connection");
            return Err(err.into());
        }
        info!(%identity, %connection, peers = self.registry.peer_count(), "peer connected");
        let dispatches = router::peer_arrived(&self.registry, &identity);
        self.deliver(dispatches);
        Ok(())
    }

    /// The peer connection `connection` closed.
    ///
    /// Closes of connections that never made it into the registry (refused
    /// duplicates) are ignored, so they cannot evict the live peer.
    pub fn peer_closed(&mut self, identity: &PeerIdentity, connection: ConnectionId) {
        if !self.is_live_peer(identity, connection) {
            debug!(%identity, %connection, "ignoring close of unregistered peer connection");
            return;
        }
        let player = self.registry.remove_peer(identity);
        info!(
            %identity,
            %connection,
            player = ?player,
            peers = self.registry.peer_count(),
            "peer disconnected"
        );
        match router::peer_departed(&self.registry, player) {
            Ok(dispatches) => self.deliver(dispatches),
            Err(err) => note_drop("departure", &err),
        }
    }

    /// One text frame arrived from a peer.
    pub fn peer_frame(&mut self, identity: &PeerIdentity, connection: ConnectionId, line: &str) {
        if !self.is_live_peer(identity, connection) {
            debug!(%identity, %connection, "dropping frame from unregistered peer connection");
            return;
        }
        let message = match decode_frame::<PeerMessage>(line, self.max_frame_len) {
            Ok(message) => message,
            Err(err) => {
                warn!(%identity, error = %err, "dropping malformed peer frame");
                return;
            }
        };
        match router::route_from_peer(&mut self.registry, identity, message) {
            Ok(dispatches) => self.deliver(dispatches),
            Err(err) => note_drop("peer frame", &err),
        }
    }

    /// One text frame arrived from the upstream link.
    pub fn upstream_frame(&mut self, connection: ConnectionId, line: &str) {
        if !self.is_bound_upstream(connection) {
            debug!(%connection, "dropping frame from refused upstream connection");
            return;
        }
        let message = match decode_frame::<UpstreamMessage>(line, self.max_frame_len) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "dropping malformed upstream frame");
                return;
            }
        };
        match router::route_from_upstream(&self.registry, message) {
            Ok(dispatches) => self.deliver(dispatches),
            Err(err) => note_drop("upstream frame", &err),
        }
    }

    fn is_bound_upstream(&self, connection: ConnectionId) -> bool {
        self.registry
            .upstream()
            .is_some_and(|handle| handle.connection_id() == connection)
    }

    fn is_live_peer(&self, identity: &PeerIdentity, connection: ConnectionId) -> bool {
        self.registry
            .peer(identity)
            .is_some_and(|record| record.handle.connection_id() == connection)
    }

    /// Send dispatches in order. A failed send closes only the connection it
    /// was meant for; its close event does the cleanup.
    fn deliver(&self, dispatches: Vec<Dispatch>) {
        for Dispatch { target, frame } in dispatches {
            let handle = match &target {
                Target::Upstream => self.registry.upstream(),
                Target::Peer(identity) => self.registry.peer(identity).map(|record| &record.handle),
            };
            let Some(handle) = handle else {
                debug!(?target, "dispatch target went away");
                continue;
            };
            if let Err(err) = handle.send_frame(frame) {
                warn!(?target, error = %err, "send failed; closing connection");
                handle.close("send failed");
            }
        }
    }
}

fn note_drop(what: &str, err: &RelayError) {
    match err {
        RelayError::NoUpstream | RelayError::UnroutableTarget(_) => {
            debug!(error = %err, "dropping {what}")
        }
        _ => warn!(error = %err, "dropping {what}"),
    }
}
