use std::time::Duration;

use domerelay_transport::{classify, connect, text, ClientStream, Inbound, TransportError};
use domerelay_wire::{decode_frame, tag, PeerMessage, UpstreamMessage, MAX_FRAME_LEN};
use futures_util::{SinkExt, StreamExt};
use tracing::debug;

use crate::cmd::{SendArgs, SendRole};
use crate::exit::{
    transport_error, wire_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT, TRANSPORT_ERROR,
    USAGE,
};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_timeout(&args.wait_timeout)?;
    check_frame(&args.frame, args.role)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))?;
    runtime.block_on(exchange(args, wait_timeout, format))
}

/// Reject frames the relay would drop, before opening a connection.
fn check_frame(frame: &str, role: SendRole) -> CliResult<()> {
    let checked = match role {
        SendRole::Peer => decode_frame::<PeerMessage>(frame, MAX_FRAME_LEN).map(drop),
        SendRole::Upstream => decode_frame::<UpstreamMessage>(frame, MAX_FRAME_LEN).map(drop),
    };
    checked.map_err(|err| wire_error("invalid frame", err))
}

async fn exchange(args: SendArgs, wait_timeout: Duration, format: OutputFormat) -> CliResult<i32> {
    let mut stream = connect(&args.url, args.token.as_deref())
        .await
        .map_err(|err| transport_error("connect failed", err))?;

    // A peer is registered once the relay has welcomed it.
    if args.role == SendRole::Peer {
        let welcome = within(wait_timeout, next_frame(&mut stream)).await?;
        if welcome != tag::WELCOME {
            return Err(CliError::new(
                TRANSPORT_ERROR,
                format!("unexpected first frame from relay: {welcome}"),
            ));
        }
    }

    let leading = args.frame.chars().next().unwrap_or_default();
    debug!(
        role = ?args.role,
        tag = tag::tag_name(leading),
        targeted = tag::is_targeted(leading),
        broadcast = tag::is_broadcast(leading),
        "sending frame"
    );
    stream
        .send(text(args.frame))
        .await
        .map_err(|err| transport_error("send failed", err.into()))?;

    if args.wait {
        let reply = within(wait_timeout, next_frame(&mut stream)).await?;
        print_frame(&reply, format);
    }

    let _ = stream.close(None).await;
    Ok(SUCCESS)
}

async fn within<T>(
    limit: Duration,
    fut: impl std::future::Future<Output = CliResult<T>>,
) -> CliResult<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| CliError::new(TIMEOUT, format!("no frame within {limit:?}")))?
}

/// Next text frame; a close from the relay is an error.
async fn next_frame(stream: &mut ClientStream) -> CliResult<String> {
    while let Some(message) = stream.next().await {
        let message = message.map_err(|err| transport_error("receive failed", err.into()))?;
        match classify(message) {
            Inbound::Text(frame) => return Ok(frame),
            Inbound::Close => break,
            Inbound::Skip => continue,
        }
    }
    Err(transport_error("receive failed", TransportError::Shutdown))
}

fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}
