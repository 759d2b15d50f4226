use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Server side of an upgraded relay connection.
pub type ServerStream = WebSocketStream<TcpStream>;

/// WebSocket listener.
///
/// Accepts TCP connections and hands them out as [`PendingConnection`]s so
/// the caller can inspect the upgrade request (path, headers, remote address)
/// before committing to the WebSocket handshake.
pub struct WsListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl WsListener {
    /// Bind and listen on a TCP address. Port 0 lets the OS pick a free port.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        info!(%local_addr, "listening for websocket connections");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept the next TCP connection. The WebSocket upgrade has not happened yet.
    pub async fn accept(&self) -> Result<PendingConnection> {
        let (stream, remote) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;
        stream.set_nodelay(true)?;
        debug!(%remote, "accepted tcp connection");
        Ok(PendingConnection { stream, remote })
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "websocket"
    }
}

/// An accepted TCP connection awaiting its WebSocket upgrade.
pub struct PendingConnection {
    stream: TcpStream,
    remote: SocketAddr,
}

impl PendingConnection {
    /// Remote address of the connecting party.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// Complete the WebSocket upgrade.
    ///
    /// `inspect` sees the upgrade request and may add headers to the
    /// response. Returning `Err` refuses the upgrade with that HTTP response;
    /// returning `Ok(value)` completes it and hands `value` back with the stream.
    pub async fn upgrade<T, F>(self, inspect: F) -> Result<(ServerStream, T)>
    where
        F: FnOnce(&Request, &mut Response) -> std::result::Result<T, ErrorResponse> + Unpin,
    {
        let remote = self.remote;
        let mut outcome: Option<T> = None;

        let callback = |request: &Request,
                        mut response: Response|
         -> std::result::Result<Response, ErrorResponse> {
            outcome = Some(inspect(request, &mut response)?);
            Ok(response)
        };

        let stream = match accept_hdr_async(self.stream, callback).await {
            Ok(stream) => stream,
            Err(tungstenite::Error::Http(response)) => {
                return Err(TransportError::Refused {
                    remote,
                    status: response.status().as_u16(),
                });
            }
            Err(source) => return Err(TransportError::Handshake { remote, source }),
        };

        let value = outcome.ok_or(TransportError::Refused {
            remote,
            status: 500,
        })?;
        debug!(%remote, "websocket upgrade complete");
        Ok((stream, value))
    }
}

impl std::fmt::Debug for PendingConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingConnection")
            .field("remote", &self.remote)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::http::StatusCode;
    use tokio_tungstenite::tungstenite::Message;

    use super::*;
    use crate::client::connect;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().expect("loopback address should parse")
    }

    #[tokio::test]
    async fn upgrade_hands_back_inspected_path() {
        let listener = WsListener::bind(loopback()).await.unwrap();
        let url = format!("ws://{}/upstream", listener.local_addr());

        let server = tokio::spawn(async move {
            let pending = listener.accept().await.unwrap();
            let (mut stream, path) = pending
                .upgrade(|request: &Request, _response: &mut Response| {
                    Ok(request.uri().path().to_string())
                })
                .await
                .unwrap();
            let msg = stream.next().await.unwrap().unwrap();
            (path, msg)
        });

        let mut client = connect(&url, None).await.unwrap();
        client.send(Message::text("ping")).await.unwrap();

        let (path, msg) = server.await.unwrap();
        assert_eq!(path, "/upstream");
        assert_eq!(msg, Message::text("ping"));
    }

    #[tokio::test]
    async fn refused_upgrade_reports_status() {
        let listener = WsListener::bind(loopback()).await.unwrap();
        let url = format!("ws://{}/", listener.local_addr());

        let server = tokio::spawn(async move {
            let pending = listener.accept().await.unwrap();
            pending
                .upgrade(|_request: &Request, _response: &mut Response| {
                    let mut refusal = ErrorResponse::new(Some("nope".to_string()));
                    *refusal.status_mut() = StatusCode::UNAUTHORIZED;
                    Err::<(), _>(refusal)
                })
                .await
        });

        let client = connect(&url, None).await;
        assert!(client.is_err());

        let result = server.await.unwrap();
        assert!(matches!(
            result,
            Err(TransportError::Refused { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn bind_reports_local_addr() {
        let listener = WsListener::bind(loopback()).await.unwrap();
        assert_ne!(listener.local_addr().port(), 0);
        assert_eq!(listener.transport_name(), "websocket");
    }
}
