use std::path::PathBuf;

use domerelay_wire::PlayerId;

use crate::types::{ConnectionId, PeerIdentity};

/// Errors raised by the connection registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// An upstream link is already bound.
    #[error("upstream link already bound")]
    AlreadyBound,

    /// A live connection with this identity already exists.
    #[error("peer {0} is already connected")]
    DuplicateIdentity(PeerIdentity),

    /// No live peer has this identity.
    #[error("unknown peer {0}")]
    UnknownPeer(PeerIdentity),

    /// The player id space is used up.
    #[error("player ids exhausted")]
    IdsExhausted,
}

/// Reasons an upgrade request is refused the upstream role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeError {
    /// The upstream path was requested without a token.
    #[error("upstream token required")]
    MissingToken,

    /// The upstream path was requested with the wrong token.
    #[error("upstream token rejected")]
    InvalidToken,
}

/// Errors that can occur in relay operations.
///
/// Every variant is connection-scoped: the affected frame is dropped or the
/// affected connection is closed, never the relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] domerelay_transport::TransportError),

    /// An inbound frame could not be decoded.
    #[error("malformed frame: {0}")]
    Wire(#[from] domerelay_wire::WireError),

    /// Registry refused an operation.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Peer traffic arrived while no upstream link is bound.
    #[error("no upstream link bound")]
    NoUpstream,

    /// An upstream message names a player with no live peer.
    #[error("no live peer for player {0}")]
    UnroutableTarget(PlayerId),

    /// A peer sent control input before announcing its name.
    #[error("peer {0} has not announced itself")]
    Unannounced(PeerIdentity),

    /// The connection's outbound queue is gone.
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid.
    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, RelayError>;
