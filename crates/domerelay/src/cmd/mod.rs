use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use domerelay_core::IdentityScope;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay until interrupted.
    Serve(ServeArgs),
    /// Send a single frame to a relay.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// JSON configuration file (serverPort, gameAddress, ...).
    #[arg(long, value_name = "FILE", env = "DOMERELAY_CONFIG")]
    pub config: Option<PathBuf>,
    /// Listen port. 0 picks a free port.
    #[arg(long, env = "DOMERELAY_PORT")]
    pub port: Option<u16>,
    /// Listen address.
    #[arg(long, value_name = "ADDR", env = "DOMERELAY_BIND")]
    pub bind: Option<IpAddr>,
    /// Remote address of the game process (used when no token is set).
    #[arg(long, value_name = "ADDR", env = "DOMERELAY_GAME_ADDRESS")]
    pub game_address: Option<IpAddr>,
    /// Shared secret the game process must present on the upstream path.
    #[arg(long, value_name = "TOKEN", env = "DOMERELAY_UPSTREAM_TOKEN", hide_env_values = true)]
    pub upstream_token: Option<String>,
    /// What makes two peers the same: `ip` or `socket`.
    #[arg(long, value_name = "SCOPE", env = "DOMERELAY_PEER_IDENTITY")]
    pub peer_identity: Option<IdentityScope>,
}

/// Which side of the relay `send` speaks as.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SendRole {
    #[default]
    Peer,
    Upstream,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Relay URL (e.g. ws://127.0.0.1:8081/ or ws://127.0.0.1:8081/upstream).
    pub url: String,
    /// Frame text to send.
    #[arg(long)]
    pub frame: String,
    /// Grammar the frame is checked against before sending.
    #[arg(long, value_enum, default_value = "peer")]
    pub role: SendRole,
    /// Bearer token for the upstream path.
    #[arg(long, env = "DOMERELAY_UPSTREAM_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Wait for one frame in reply and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for a reply when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
