use std::io::IsTerminal;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use domerelay_wire::tag;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    event: &'static str,
    tag: &'static str,
    frame: &'a str,
    size: usize,
    timestamp: String,
}

#[derive(Serialize)]
struct ListeningOutput<'a> {
    event: &'static str,
    address: String,
    token_auth: bool,
    peer_identity: &'a str,
}

/// Print one received frame.
pub fn print_frame(frame: &str, format: OutputFormat) {
    let kind = frame_kind(frame);
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                event: "frame",
                tag: kind,
                frame,
                size: frame.len(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TAG", "SIZE", "FRAME"])
                .add_row(vec![kind.to_string(), frame.len().to_string(), frame.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("tag={kind} size={} frame={frame}", frame.len());
        }
        OutputFormat::Raw => println!("{frame}"),
    }
}

/// Announce the bound address, so scripts using port 0 can find the relay.
pub fn print_listening(
    addr: SocketAddr,
    token_auth: bool,
    peer_identity: &str,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = ListeningOutput {
                event: "listening",
                address: addr.to_string(),
                token_auth,
                peer_identity,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDRESS", "TOKEN AUTH", "PEER IDENTITY"])
                .add_row(vec![
                    addr.to_string(),
                    token_auth.to_string(),
                    peer_identity.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("listening on ws://{addr} (token_auth={token_auth}, peer_identity={peer_identity})");
        }
        OutputFormat::Raw => println!("{addr}"),
    }
}

/// Name of the frame's kind: a tag name or the literal it matches.
pub fn frame_kind(frame: &str) -> &'static str {
    match frame {
        tag::PING => "PING",
        tag::PONG => "PONG",
        tag::GAME_CONNECT => "GAME_CONNECT",
        tag::GAME_CONNECTED => "GAME_CONNECTED",
        tag::WELCOME => "WELCOME",
        _ if frame.starts_with(tag::PEER_CONNECTED_PREFIX) => "PEER_CONNECTED",
        _ => {
            let mut chars = frame.chars();
            match (chars.next(), chars.next()) {
                (Some(tag), None | Some(' ')) => tag::tag_name(tag),
                _ => "UNKNOWN",
            }
        }
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_frames() {
        assert_eq!(frame_kind("pong"), "PONG");
        assert_eq!(frame_kind("P 12"), "SCORE");
        assert_eq!(frame_kind("Remote connection from: 10.0.0.1"), "PEER_CONNECTED");
        assert_eq!(frame_kind("Connected"), "WELCOME");
        assert_eq!(frame_kind("hello"), "UNKNOWN");
        assert_eq!(frame_kind("U"), "BROADCAST");
    }
}
