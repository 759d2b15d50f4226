use std::net::SocketAddr;

use tokio_tungstenite::tungstenite;

/// Errors that can occur in relay transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to connect to the specified relay URL.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        source: tungstenite::Error,
    },

    /// Failed to accept an incoming TCP connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// The WebSocket upgrade with a remote party failed.
    #[error("websocket handshake with {remote} failed: {source}")]
    Handshake {
        remote: SocketAddr,
        source: tungstenite::Error,
    },

    /// The upgrade request was refused by the request inspector.
    #[error("upgrade request from {remote} refused with status {status}")]
    Refused { remote: SocketAddr, status: u16 },

    /// A request header could not be built.
    #[error("invalid request header: {0}")]
    InvalidHeader(String),

    /// An error occurred on an established WebSocket stream.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote side shut the connection down.
    #[error("connection shut down by remote")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
