use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{Result, TransportError};

/// Client side of a relay connection.
pub type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connect to a relay at `url` (e.g. `ws://127.0.0.1:8081/upstream`).
///
/// When `bearer` is set it is sent as `Authorization: Bearer <token>`; the
/// token itself is never logged.
pub async fn connect(url: &str, bearer: Option<&str>) -> Result<ClientStream> {
    let mut request = url
        .into_client_request()
        .map_err(|source| TransportError::Connect {
            url: url.to_string(),
            source,
        })?;

    if let Some(token) = bearer {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|err| TransportError::InvalidHeader(err.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let (stream, _response) =
        connect_async(request)
            .await
            .map_err(|source| TransportError::Connect {
                url: url.to_string(),
                source,
            })?;
    debug!(url, authenticated = bearer.is_some(), "connected to relay");
    Ok(stream)
}
