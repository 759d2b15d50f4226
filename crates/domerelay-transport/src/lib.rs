//! WebSocket-over-TCP transport for the domerelay controller relay.
//!
//! Provides the lowest layer of the relay:
//! - A TCP listener whose accepted connections are upgraded to WebSocket
//!   after a caller-supplied inspector has looked at the upgrade request
//! - A client connector (used by tooling and tests) with optional bearer token
//! - Helpers that reduce raw WebSocket messages to text frames
//!
//! Everything above this crate works on text frames only.

pub mod client;
pub mod error;
pub mod listener;
pub mod stream;

pub use client::{connect, ClientStream};
pub use error::{Result, TransportError};
pub use listener::{PendingConnection, ServerStream, WsListener};
pub use stream::{classify, policy_close, text, Inbound};
pub use tokio_tungstenite::tungstenite::Message;

/// Re-export of the request/response types seen by upgrade inspectors.
pub mod http {
    pub use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
    pub use tokio_tungstenite::tungstenite::http::{header, HeaderValue, StatusCode};
}
