//! Relay core for domerelay.
//!
//! Sits between one authoritative upstream (the game process) and any number
//! of peers (controllers and viewers):
//! - [`Registry`]: the upstream link, live peers and their player ids
//! - [`router`]: pure routing policy from decoded messages to outbound frames
//! - [`Coordinator`]: applies connection events to the registry in order
//! - [`handshake`]: decides at upgrade time whether a connection is the upstream
//! - [`start_relay`]: binds the listener and runs everything on tokio tasks
//!
//! # Example
//!
//! ```no_run
//! use domerelay_core::{start_relay, RelayConfig};
//!
//! # async fn run() -> domerelay_core::Result<()> {
//! let config = RelayConfig {
//!     upstream_token: Some("change-me".to_string()),
//!     ..RelayConfig::default()
//! };
//! let (relay, addr) = start_relay(config).await?;
//! println!("relay listening on {addr}");
//! relay.wait().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handshake;
pub mod lifecycle;
pub mod outbox;
pub mod registry;
pub mod router;
pub mod server;
pub mod types;

pub use config::{RelayConfig, DEFAULT_PORT};
pub use domerelay_wire::PlayerId;
pub use error::{HandshakeError, RegistryError, RelayError, Result};
pub use handshake::{HandshakeConfig, Role};
pub use lifecycle::{ConnectionHandle, Coordinator, UpstreamState};
pub use outbox::{Outbox, Outgoing};
pub use registry::{PeerRecord, Registry};
pub use router::{Dispatch, Target};
pub use server::{start_relay, RelayEvent, RelayHandle};
pub use types::{ConnectionId, IdentityScope, PeerIdentity};
