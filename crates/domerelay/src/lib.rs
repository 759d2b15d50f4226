//! WebSocket relay between one authoritative game process and its peers.
//!
//! domerelay sits between a game (the upstream) and any number of phone
//! controllers or viewers (peers), assigning each announced peer a player id
//! and routing the line-oriented text protocol between them.
//!
//! # Crate Structure
//!
//! - [`transport`]: WebSocket listener and client connector
//! - [`wire`]: frame grammar and direction-typed messages
//! - [`relay`]: registry, routing, lifecycle and the relay server (behind `relay` feature)

/// Re-export transport types.
pub mod transport {
    pub use domerelay_transport::*;
}

/// Re-export wire types.
pub mod wire {
    pub use domerelay_wire::*;
}

/// Re-export relay types (requires `relay` feature).
#[cfg(feature = "relay")]
pub mod relay {
    pub use domerelay_core::*;
}
