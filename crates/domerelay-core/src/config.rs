use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use domerelay_wire::MAX_FRAME_LEN;
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};
use crate::handshake::{HandshakeConfig, DEFAULT_UPSTREAM_PATH, DEFAULT_UPSTREAM_SUBPROTOCOL};
use crate::types::IdentityScope;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8081;

/// Relay configuration.
///
/// Read from a JSON file with camelCase keys; unknown keys are ignored so
/// existing deployment files keep loading.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayConfig {
    pub server_port: u16,
    pub bind_address: IpAddr,
    /// Legacy upstream selection by remote address.
    pub game_address: Option<IpAddr>,
    /// Shared secret for the upstream role. Never logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_token: Option<String>,
    pub upstream_path: String,
    pub upstream_subprotocol: Option<String>,
    pub peer_identity: IdentityScope,
    pub max_frame_len: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_PORT,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            game_address: None,
            upstream_token: None,
            upstream_path: DEFAULT_UPSTREAM_PATH.to_string(),
            upstream_subprotocol: Some(DEFAULT_UPSTREAM_SUBPROTOCOL.to_string()),
            peer_identity: IdentityScope::default(),
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

impl RelayConfig {
    /// Load a configuration file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RelayError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| RelayError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.server_port)
    }

    pub fn handshake(&self) -> HandshakeConfig {
        HandshakeConfig {
            upstream_token: self.upstream_token.clone(),
            upstream_address: self.game_address,
            upstream_path: self.upstream_path.clone(),
            upstream_subprotocol: self.upstream_subprotocol.clone(),
        }
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("RelayConfig");
        dbg.field("server_port", &self.server_port)
            .field("bind_address", &self.bind_address)
            .field("game_address", &self.game_address);
        if let Some(token) = &self.upstream_token {
            dbg.field(
                "upstream_token",
                &format_args!("<redacted:{} bytes>", token.len()),
            );
        } else {
            dbg.field("upstream_token", &Option::<String>::None);
        }
        dbg.field("upstream_path", &self.upstream_path)
            .field("upstream_subprotocol", &self.upstream_subprotocol)
            .field("peer_identity", &self.peer_identity)
            .field("max_frame_len", &self.max_frame_len)
            .finish()
    }
}
