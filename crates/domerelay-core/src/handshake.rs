//! Role classification at WebSocket upgrade time.
//!
//! Every accepted connection is either the upstream link or a peer. With an
//! upstream token configured, the upstream must request the upstream path
//! and present the token; without one, the remote address decides.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use domerelay_transport::http::{header, ErrorResponse, HeaderValue, Request, Response, StatusCode};
use tracing::{debug, warn};

use crate::error::HandshakeError;

/// Default path the upstream requests when token auth is enabled.
pub const DEFAULT_UPSTREAM_PATH: &str = "/upstream";

/// Subprotocol the upstream offers.
pub const DEFAULT_UPSTREAM_SUBPROTOCOL: &str = "example-protocol";

const MAX_TOKEN_LEN: usize = 4096;

/// Role of an accepted connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Upstream,
    Peer,
}

/// Configuration for role classification.
#[derive(Clone)]
pub struct HandshakeConfig {
    /// Shared secret the upstream must present.
    /// Never logged; redacted in debug output.
    pub upstream_token: Option<String>,
    /// Remote address that makes a connection the upstream when no token is set.
    pub upstream_address: Option<IpAddr>,
    /// Request path reserved for the upstream when a token is set.
    pub upstream_path: String,
    /// Subprotocol echoed back to the upstream, if it offered it.
    pub upstream_subprotocol: Option<String>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            upstream_token: None,
            upstream_address: None,
            upstream_path: DEFAULT_UPSTREAM_PATH.to_string(),
            upstream_subprotocol: Some(DEFAULT_UPSTREAM_SUBPROTOCOL.to_string()),
        }
    }
}

impl fmt::Debug for HandshakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("HandshakeConfig");
        if let Some(token) = &self.upstream_token {
            dbg.field(
                "upstream_token",
                &format_args!("<redacted:{} bytes>", token.len()),
            );
        } else {
            dbg.field("upstream_token", &Option::<String>::None);
        }
        dbg.field("upstream_address", &self.upstream_address)
            .field("upstream_path", &self.upstream_path)
            .field("upstream_subprotocol", &self.upstream_subprotocol)
            .finish()
    }
}

/// Decide the role of an upgrade request.
pub fn resolve_role(
    request: &Request,
    remote: SocketAddr,
    config: &HandshakeConfig,
) -> Result<Role, HandshakeError> {
    let Some(expected) = config.upstream_token.as_deref() else {
        let is_upstream = config
            .upstream_address
            .is_some_and(|addr| addr.to_canonical() == remote.ip().to_canonical());
        return Ok(if is_upstream { Role::Upstream } else { Role::Peer });
    };

    if request.uri().path() != config.upstream_path {
        return Ok(Role::Peer);
    }
    match presented_token(request) {
        None => Err(HandshakeError::MissingToken),
        Some(token) if token.len() <= MAX_TOKEN_LEN && tokens_match(token, expected) => {
            Ok(Role::Upstream)
        }
        Some(_) => Err(HandshakeError::InvalidToken),
    }
}

/// Upgrade inspector: resolve the role and shape the response.
///
/// A refused upstream gets `401 Unauthorized`. An accepted upstream gets the
/// configured subprotocol echoed when it offered it.
pub fn classify(
    request: &Request,
    response: &mut Response,
    remote: SocketAddr,
    config: &HandshakeConfig,
) -> Result<Role, ErrorResponse> {
    let role = resolve_role(request, remote, config).map_err(|err| {
        warn!(%remote, reason = %err, "refusing upstream upgrade");
        refusal(StatusCode::UNAUTHORIZED, &err)
    })?;

    if role == Role::Upstream {
        if let Some(protocol) = config.upstream_subprotocol.as_deref() {
            if offers_subprotocol(request, protocol) {
                if let Ok(value) = HeaderValue::from_str(protocol) {
                    response
                        .headers_mut()
                        .insert(header::SEC_WEBSOCKET_PROTOCOL, value);
                }
            }
        }
    }
    debug!(%remote, ?role, path = request.uri().path(), "classified connection");
    Ok(role)
}

fn refusal(status: StatusCode, err: &HandshakeError) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(err.to_string()));
    *response.status_mut() = status;
    response
}

/// Token from `Authorization: Bearer <t>` or, failing that, `?token=<t>`.
fn presented_token(request: &Request) -> Option<&str> {
    let from_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    if let Some(token) = from_header.filter(|t| !t.is_empty()) {
        return Some(token);
    }
    request
        .uri()
        .query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "token")
        .map(|(_, value)| value)
        .filter(|t| !t.is_empty())
}

fn offers_subprotocol(request: &Request, protocol: &str) -> bool {
    request
        .headers()
        .get_all(header::SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|offered| offered.trim() == protocol)
}

/// Length-independent comparison over the full input.
fn tokens_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> Request {
        Request::builder().uri(uri).body(()).unwrap()
    }

    fn remote(ip: &str) -> SocketAddr {
        SocketAddr::new(ip.parse().unwrap(), 40000)
    }

    fn with_token(token: &str) -> HandshakeConfig {
        HandshakeConfig {
            upstream_token: Some(token.to_string()),
            ..HandshakeConfig::default()
        }
    }

    #[test]
    fn legacy_mode_matches_remote_address() {
        let config = HandshakeConfig {
            upstream_address: Some("10.0.0.1".parse().unwrap()),
            ..HandshakeConfig::default()
        };
        let req = request("/");
        assert_eq!(
            resolve_role(&req, remote("10.0.0.1"), &config),
            Ok(Role::Upstream)
        );
        assert_eq!(
            resolve_role(&req, remote("::ffff:10.0.0.1"), &config),
            Ok(Role::Upstream)
        );
        assert_eq!(resolve_role(&req, remote("10.0.0.2"), &config), Ok(Role::Peer));
    }

    #[test]
    fn no_address_and_no_token_makes_everyone_a_peer() {
        let config = HandshakeConfig::default();
        assert_eq!(
            resolve_role(&request("/upstream"), remote("127.0.0.1"), &config),
            Ok(Role::Peer)
        );
    }

    #[test]
    fn bearer_header_grants_upstream() {
        let config = with_token("s3cret");
        let req = Request::builder()
            .uri("/upstream")
            .header("Authorization", "Bearer s3cret")
            .body(())
            .unwrap();
        assert_eq!(
            resolve_role(&req, remote("192.168.1.4"), &config),
            Ok(Role::Upstream)
        );
    }

    #[test]
    fn query_token_grants_upstream() {
        let config = with_token("s3cret");
        let req = request("/upstream?v=1&token=s3cret");
        assert_eq!(
            resolve_role(&req, remote("192.168.1.4"), &config),
            Ok(Role::Upstream)
        );
    }

    #[test]
    fn wrong_or_missing_token_is_refused() {
        let config = with_token("s3cret");
        assert_eq!(
            resolve_role(&request("/upstream?token=nope"), remote("1.2.3.4"), &config),
            Err(HandshakeError::InvalidToken)
        );
        assert_eq!(
            resolve_role(&request("/upstream"), remote("1.2.3.4"), &config),
            Err(HandshakeError::MissingToken)
        );
    }

    #[test]
    fn token_mode_ignores_remote_address() {
        let config = HandshakeConfig {
            upstream_token: Some("s3cret".to_string()),
            upstream_address: Some("127.0.0.1".parse().unwrap()),
            ..HandshakeConfig::default()
        };
        assert_eq!(
            resolve_role(&request("/"), remote("127.0.0.1"), &config),
            Ok(Role::Peer)
        );
    }

    #[test]
    fn classify_refuses_with_401() {
        let config = with_token("s3cret");
        let mut response = Response::new(());
        let err = classify(
            &request("/upstream?token=bad"),
            &mut response,
            remote("1.2.3.4"),
            &config,
        )
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn classify_echoes_offered_subprotocol_to_upstream() {
        let config = with_token("s3cret");
        let req = Request::builder()
            .uri("/upstream?token=s3cret")
            .header("Sec-WebSocket-Protocol", "chat, example-protocol")
            .body(())
            .unwrap();
        let mut response = Response::new(());
        let role = classify(&req, &mut response, remote("1.2.3.4"), &config).unwrap();
        assert_eq!(role, Role::Upstream);
        assert_eq!(
            response.headers().get(header::SEC_WEBSOCKET_PROTOCOL).unwrap(),
            "example-protocol"
        );
    }

    #[test]
    fn peers_get_no_subprotocol() {
        let config = with_token("s3cret");
        let req = Request::builder()
            .uri("/")
            .header("Sec-WebSocket-Protocol", "example-protocol")
            .body(())
            .unwrap();
        let mut response = Response::new(());
        assert_eq!(
            classify(&req, &mut response, remote("1.2.3.4"), &config).unwrap(),
            Role::Peer
        );
        assert!(response.headers().get(header::SEC_WEBSOCKET_PROTOCOL).is_none());
    }

    #[test]
    fn token_comparison() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", "abcd"));
        assert!(!tokens_match("", "a"));
    }

    #[test]
    fn debug_output_redacts_token() {
        let rendered = format!("{:?}", with_token("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted:12 bytes>"));
    }
}
