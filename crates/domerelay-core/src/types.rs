use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Network identity of a peer, derived from its remote address.
///
/// At most one live connection per identity is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerIdentity(String);

impl PeerIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    /// Derive the identity of a remote address under `scope`.
    pub fn from_addr(addr: SocketAddr, scope: IdentityScope) -> Self {
        match scope {
            IdentityScope::Ip => Self(addr.ip().to_canonical().to_string()),
            IdentityScope::Socket => Self(addr.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How much of a remote address makes up a peer's identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityScope {
    /// IP address only: one connection per device.
    #[default]
    Ip,
    /// IP address and port: one connection per socket.
    Socket,
}

impl FromStr for IdentityScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ip" => Ok(IdentityScope::Ip),
            "socket" => Ok(IdentityScope::Socket),
            other => Err(format!(
                "unknown identity scope '{other}' (expected 'ip' or 'socket')"
            )),
        }
    }
}

/// Process-unique id of one accepted connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_scope_ignores_port() {
        let a: SocketAddr = "10.0.0.5:50000".parse().unwrap();
        let b: SocketAddr = "10.0.0.5:50001".parse().unwrap();
        assert_eq!(
            PeerIdentity::from_addr(a, IdentityScope::Ip),
            PeerIdentity::from_addr(b, IdentityScope::Ip)
        );
        assert_ne!(
            PeerIdentity::from_addr(a, IdentityScope::Socket),
            PeerIdentity::from_addr(b, IdentityScope::Socket)
        );
    }

    #[test]
    fn ip_scope_unmaps_ipv4_mapped_addresses() {
        let mapped: SocketAddr = "[::ffff:192.168.1.9]:4000".parse().unwrap();
        assert_eq!(
            PeerIdentity::from_addr(mapped, IdentityScope::Ip).as_str(),
            "192.168.1.9"
        );
    }

    #[test]
    fn scope_parses_case_insensitively() {
        assert_eq!("IP".parse::<IdentityScope>().unwrap(), IdentityScope::Ip);
        assert_eq!(
            "socket".parse::<IdentityScope>().unwrap(),
            IdentityScope::Socket
        );
        assert!("port".parse::<IdentityScope>().is_err());
    }
}
