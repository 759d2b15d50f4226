use tokio::sync::mpsc;

use crate::error::{RelayError, Result};
use crate::lifecycle::ConnectionHandle;
use crate::types::ConnectionId;

/// Work queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Frame(String),
    Close(String),
}

/// Channel-backed [`ConnectionHandle`].
///
/// The queue is unbounded; a slow reader only delays its own writer task.
#[derive(Debug, Clone)]
pub struct Outbox {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outgoing>,
}

impl Outbox {
    pub fn channel(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id, tx }, rx)
    }
}

impl ConnectionHandle for Outbox {
    fn connection_id(&self) -> ConnectionId {
        self.id
    }

    fn send_frame(&self, frame: String) -> Result<()> {
        self.tx
            .send(Outgoing::Frame(frame))
            .map_err(|_| RelayError::ConnectionClosed(self.id))
    }

    fn close(&self, reason: &str) {
        // Writer already gone means the connection is already closing.
        let _ = self.tx.send(Outgoing::Close(reason.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_frames_in_order() {
        let (outbox, mut rx) = Outbox::channel(ConnectionId(4));
        outbox.send_frame("a".to_string()).unwrap();
        outbox.close("bye");
        assert_eq!(rx.try_recv().unwrap(), Outgoing::Frame("a".to_string()));
        assert_eq!(rx.try_recv().unwrap(), Outgoing::Close("bye".to_string()));
    }

    #[test]
    fn send_after_writer_exit_fails() {
        let (outbox, rx) = Outbox::channel(ConnectionId(9));
        drop(rx);
        assert!(matches!(
            outbox.send_frame("x".to_string()),
            Err(RelayError::ConnectionClosed(ConnectionId(9)))
        ));
        outbox.close("ignored");
    }
}
