use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// A raw WebSocket message reduced to what the relay cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A UTF-8 text frame.
    Text(String),
    /// The remote side sent a close frame.
    Close,
    /// Binary, ping, pong or raw frames. Control frames are answered by
    /// the WebSocket layer itself.
    Skip,
}

/// Reduce a received WebSocket message to an [`Inbound`] event.
pub fn classify(message: Message) -> Inbound {
    match message {
        Message::Text(text) => Inbound::Text(text.as_str().to_owned()),
        Message::Close(_) => Inbound::Close,
        Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
            Inbound::Skip
        }
    }
}

/// Build an outbound text frame.
pub fn text(frame: impl Into<String>) -> Message {
    Message::text(frame.into())
}

/// Build a policy-violation close frame used when a connection is refused
/// after the upgrade has already completed.
pub fn policy_close(reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::Policy,
        reason: reason.to_owned().into(),
    }))
}
