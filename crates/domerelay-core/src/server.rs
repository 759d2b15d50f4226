//! Relay server: accept loop, per-connection tasks and the dispatcher.
//!
//! Each accepted connection gets a reader task and a writer task. Readers
//! turn WebSocket traffic into [`RelayEvent`]s on one channel; a single
//! dispatcher task owns the [`Coordinator`] and applies events in arrival
//! order. Writers drain the connection's [`Outbox`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use domerelay_transport::{
    classify, policy_close, text, Inbound, Message, PendingConnection, ServerStream, WsListener,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::RelayConfig;
use crate::error::Result;
use crate::handshake::{self, HandshakeConfig, Role};
use crate::lifecycle::Coordinator;
use crate::outbox::{Outbox, Outgoing};
use crate::types::{ConnectionId, IdentityScope, PeerIdentity};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);
const WRITER_GRACE: Duration = Duration::from_secs(1);
const UPGRADE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection events, applied one at a time by the dispatcher.
#[derive(Debug)]
pub enum RelayEvent {
    UpstreamOpened {
        handle: Outbox,
    },
    UpstreamFrame {
        connection: ConnectionId,
        frame: String,
    },
    UpstreamClosed {
        connection: ConnectionId,
    },
    PeerOpened {
        identity: PeerIdentity,
        handle: Outbox,
    },
    PeerFrame {
        identity: PeerIdentity,
        connection: ConnectionId,
        frame: String,
    },
    PeerClosed {
        identity: PeerIdentity,
        connection: ConnectionId,
    },
}

/// Handle to a running relay.
#[derive(Debug)]
pub struct RelayHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl RelayHandle {
    /// Token that stops the relay when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop accepting, close every connection and wait for the relay to exit.
    pub async fn stop(self) {
        self.shutdown.cancel();
        let _ = self.task.await;
    }

    /// Wait for the relay to exit without stopping it.
    pub async fn wait(self) {
        let _ = self.task.await;
    }
}

/// Bind the listener and start the relay on background tasks.
///
/// Returns once the listener is bound; the returned address carries the
/// actual port when `server_port` is 0.
pub async fn start_relay(config: RelayConfig) -> Result<(RelayHandle, SocketAddr)> {
    let listener = WsListener::bind(config.listen_addr()).await?;
    let local_addr = listener.local_addr();
    let shutdown = CancellationToken::new();

    info!(
        %local_addr,
        transport = listener.transport_name(),
        token_auth = config.upstream_token.is_some(),
        game_address = ?config.game_address,
        peer_identity = ?config.peer_identity,
        "relay started"
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let coordinator = Coordinator::new(config.max_frame_len);
    let dispatcher = tokio::spawn(run_dispatcher(coordinator, events_rx, shutdown.clone()));

    let settings = Arc::new(ConnectionSettings {
        handshake: config.handshake(),
        identity_scope: config.peer_identity,
    });
    let task = tokio::spawn(accept_loop(
        listener,
        settings,
        events_tx,
        shutdown.clone(),
        dispatcher,
    ));

    Ok((RelayHandle { shutdown, task }, local_addr))
}

#[derive(Debug)]
struct ConnectionSettings {
    handshake: HandshakeConfig,
    identity_scope: IdentityScope,
}

async fn accept_loop(
    listener: WsListener,
    settings: Arc<ConnectionSettings>,
    events: mpsc::UnboundedSender<RelayEvent>,
    shutdown: CancellationToken,
    dispatcher: JoinHandle<()>,
) {
    let mut next_connection = 0u64;
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok(pending) => {
                let connection = ConnectionId(next_connection);
                next_connection += 1;
                let span = info_span!("connection", %connection, remote = %pending.remote_addr());
                tokio::spawn(
                    serve_connection(
                        pending,
                        connection,
                        Arc::clone(&settings),
                        events.clone(),
                        shutdown.child_token(),
                    )
                    .instrument(span),
                );
            }
            Err(err) => {
                warn!(error = %err, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }

    drop(events);
    let _ = dispatcher.await;
    info!("relay stopped");
}

async fn run_dispatcher(
    mut coordinator: Coordinator<Outbox>,
    mut events: mpsc::UnboundedReceiver<RelayEvent>,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        apply(&mut coordinator, event);
    }
    debug!(peers = coordinator.registry().peer_count(), "dispatcher exiting");
}

/// Apply one event. Refusals are already logged by the coordinator.
fn apply(coordinator: &mut Coordinator<Outbox>, event: RelayEvent) {
    match event {
        RelayEvent::UpstreamOpened { handle } => {
            let _ = coordinator.upstream_opened(handle);
        }
        RelayEvent::UpstreamFrame { connection, frame } => {
            coordinator.upstream_frame(connection, &frame);
        }
        RelayEvent::UpstreamClosed { connection } => coordinator.upstream_closed(connection),
        RelayEvent::PeerOpened { identity, handle } => {
            let _ = coordinator.peer_opened(identity, handle);
        }
        RelayEvent::PeerFrame {
            identity,
            connection,
            frame,
        } => coordinator.peer_frame(&identity, connection, &frame),
        RelayEvent::PeerClosed {
            identity,
            connection,
        } => coordinator.peer_closed(&identity, connection),
    }
}

async fn serve_connection(
    pending: PendingConnection,
    connection: ConnectionId,
    settings: Arc<ConnectionSettings>,
    events: mpsc::UnboundedSender<RelayEvent>,
    closing: CancellationToken,
) {
    let remote = pending.remote_addr();
    let inspect_settings = Arc::clone(&settings);
    let upgrade = pending.upgrade(move |request, response| {
        handshake::classify(request, response, remote, &inspect_settings.handshake)
    });
    let upgraded = tokio::select! {
        _ = closing.cancelled() => return,
        upgraded = tokio::time::timeout(UPGRADE_TIMEOUT, upgrade) => match upgraded {
            Ok(upgraded) => upgraded,
            Err(_) => {
                debug!("upgrade timed out");
                return;
            }
        },
    };
    let (stream, role) = match upgraded {
        Ok(upgraded) => upgraded,
        Err(err) => {
            debug!(error = %err, "upgrade failed");
            return;
        }
    };

    let (outbox, outgoing) = Outbox::channel(connection);
    let (sink, source) = stream.split();
    let writer = tokio::spawn(write_loop(sink, outgoing, closing.clone()).in_current_span());

    let identity = PeerIdentity::from_addr(remote, settings.identity_scope);
    let opened = match role {
        Role::Upstream => RelayEvent::UpstreamOpened { handle: outbox },
        Role::Peer => RelayEvent::PeerOpened {
            identity: identity.clone(),
            handle: outbox,
        },
    };
    if events.send(opened).is_err() {
        writer.abort();
        return;
    }
    debug!(?role, %identity, "connection opened");

    read_loop(source, role, &identity, connection, &events, &closing).await;

    let closed = match role {
        Role::Upstream => RelayEvent::UpstreamClosed { connection },
        Role::Peer => RelayEvent::PeerClosed {
            identity,
            connection,
        },
    };
    let _ = events.send(closed);
    closing.cancel();

    // The writer ends once the dispatcher drops this connection's outbox.
    let abort = writer.abort_handle();
    if tokio::time::timeout(WRITER_GRACE, writer).await.is_err() {
        abort.abort();
    }
    debug!(?role, "connection closed");
}

async fn read_loop(
    mut source: SplitStream<ServerStream>,
    role: Role,
    identity: &PeerIdentity,
    connection: ConnectionId,
    events: &mpsc::UnboundedSender<RelayEvent>,
    closing: &CancellationToken,
) {
    loop {
        let next = tokio::select! {
            _ = closing.cancelled() => break,
            next = source.next() => next,
        };
        let frame = match next {
            Some(Ok(message)) => match classify(message) {
                Inbound::Text(frame) => frame,
                Inbound::Close => break,
                Inbound::Skip => continue,
            },
            Some(Err(err)) => {
                debug!(error = %err, "read failed");
                break;
            }
            None => break,
        };
        let event = match role {
            Role::Upstream => RelayEvent::UpstreamFrame { connection, frame },
            Role::Peer => RelayEvent::PeerFrame {
                identity: identity.clone(),
                connection,
                frame,
            },
        };
        if events.send(event).is_err() {
            break;
        }
    }
}

/// Drain the outbox into the socket until it is closed or asked to close.
///
/// Cancels `closing` on exit so the reader stops too.
async fn write_loop(
    mut sink: SplitSink<ServerStream, Message>,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    closing: CancellationToken,
) {
    while let Some(item) = outgoing.recv().await {
        match item {
            Outgoing::Frame(frame) => {
                if let Err(err) = sink.send(text(frame)).await {
                    debug!(error = %err, "write failed");
                    break;
                }
            }
            Outgoing::Close(reason) => {
                debug!(%reason, "closing connection");
                let _ = sink.send(policy_close(&reason)).await;
                break;
            }
        }
    }
    let _ = sink.close().await;
    closing.cancel();
}
