//! Relay messages, one enum per direction.
//!
//! - [`PeerMessage`]: a controller or viewer to the relay.
//! - [`UpstreamMessage`]: the authoritative game process to the relay.
//! - [`UpstreamCommand`]: the relay to the authoritative game process.
//! - [`PeerCommand`]: the relay to a controller or viewer.

use std::fmt;

use crate::codec::{trim_line_end, with_tail, Fields, WireMessage};
use crate::error::{Result, WireError};
use crate::tag;
use crate::types::{DisplayName, Number, PlayerId};

/// Which of a player's two colours an assignment refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorSlot {
    /// Tag `A`.
    Primary,
    /// Tag `B`.
    Secondary,
}

impl ColorSlot {
    pub fn tag(self) -> char {
        match self {
            ColorSlot::Primary => tag::COLOR_PRIMARY,
            ColorSlot::Secondary => tag::COLOR_SECONDARY,
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            tag::COLOR_PRIMARY => Some(ColorSlot::Primary),
            tag::COLOR_SECONDARY => Some(ColorSlot::Secondary),
            _ => None,
        }
    }
}

/// Three normalized colour channels, each in `[0, 1]`, kept as written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rgb {
    r: Number,
    g: Number,
    b: Number,
}

impl Rgb {
    pub fn new(r: f64, g: f64, b: f64) -> Result<Self> {
        let channel = |value: f64| {
            if (0.0..=1.0).contains(&value) {
                Number::try_from(value)
            } else {
                Err(WireError::InvalidValue(format!(
                    "colour channel out of range [0, 1]: {value}"
                )))
            }
        };
        Ok(Self {
            r: channel(r)?,
            g: channel(g)?,
            b: channel(b)?,
        })
    }

    fn read(fields: &mut Fields<'_>) -> Result<Self> {
        Ok(Self {
            r: fields.unit("red channel")?,
            g: fields.unit("green channel")?,
            b: fields.unit("blue channel")?,
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.r, self.g, self.b)
    }
}

/// Frames a peer sends to the relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerMessage {
    /// `ping`
    Ping,
    /// `game_connect`
    GameConnect,
    /// `N <name>`: announce a display name; triggers id assignment.
    Announce { name: DisplayName },
    /// `C <value>`: control/orientation input.
    Control { value: Number },
}

impl WireMessage for PeerMessage {
    fn encode(&self) -> String {
        match self {
            PeerMessage::Ping => tag::PING.to_string(),
            PeerMessage::GameConnect => tag::GAME_CONNECT.to_string(),
            PeerMessage::Announce { name } => format!("{} {name}", tag::NAME),
            PeerMessage::Control { value } => format!("{} {value}", tag::CONTROL),
        }
    }

    fn decode(line: &str) -> Result<Self> {
        match trim_line_end(line) {
            tag::PING => return Ok(PeerMessage::Ping),
            tag::GAME_CONNECT => return Ok(PeerMessage::GameConnect),
            _ => {}
        }

        let mut fields = Fields::open(line)?;
        match fields.tag() {
            tag::NAME => Ok(PeerMessage::Announce {
                name: fields.name()?,
            }),
            tag::CONTROL => {
                let value = fields.number("control value")?;
                fields.finish()?;
                Ok(PeerMessage::Control { value })
            }
            _ => Err(fields.unknown()),
        }
    }
}

/// Frames the authoritative process sends to the relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpstreamMessage {
    /// `ping`
    Ping,
    /// `game_connect`
    GameConnect,
    /// `A|B <r> <g> <b> <player>`: colour assignment for one player.
    Color {
        slot: ColorSlot,
        rgb: Rgb,
        player: PlayerId,
    },
    /// `P <player> <points>`: score for one player.
    Score { player: PlayerId, points: Number },
    /// `T <time>`: game time, for every peer.
    Time { value: Number },
    /// `U <payload>`: opaque payload, for every peer.
    Broadcast { payload: String },
}

impl WireMessage for UpstreamMessage {
    fn encode(&self) -> String {
        match self {
            UpstreamMessage::Ping => tag::PING.to_string(),
            UpstreamMessage::GameConnect => tag::GAME_CONNECT.to_string(),
            UpstreamMessage::Color { slot, rgb, player } => {
                format!("{} {rgb} {player}", slot.tag())
            }
            UpstreamMessage::Score { player, points } => {
                format!("{} {player} {points}", tag::SCORE)
            }
            UpstreamMessage::Time { value } => format!("{} {value}", tag::TIME),
            UpstreamMessage::Broadcast { payload } => {
                with_tail(tag::BROADCAST.to_string(), payload)
            }
        }
    }

    fn decode(line: &str) -> Result<Self> {
        match trim_line_end(line) {
            tag::PING => return Ok(UpstreamMessage::Ping),
            tag::GAME_CONNECT => return Ok(UpstreamMessage::GameConnect),
            _ => {}
        }

        let mut fields = Fields::open(line)?;
        if let Some(slot) = ColorSlot::from_tag(fields.tag()) {
            let rgb = Rgb::read(&mut fields)?;
            let player = fields.player()?;
            fields.finish()?;
            return Ok(UpstreamMessage::Color { slot, rgb, player });
        }

        match fields.tag() {
            tag::SCORE => {
                let player = fields.player()?;
                let points = fields.number("points")?;
                fields.finish()?;
                Ok(UpstreamMessage::Score { player, points })
            }
            tag::TIME => {
                let value = fields.number("time")?;
                fields.finish()?;
                Ok(UpstreamMessage::Time { value })
            }
            tag::BROADCAST => Ok(UpstreamMessage::Broadcast {
                payload: fields.verbatim(),
            }),
            _ => Err(fields.unknown()),
        }
    }
}

/// Frames the relay sends to the authoritative process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpstreamCommand {
    /// `pong`
    Pong,
    /// `Game connection established`
    GameConnected,
    /// `Remote connection from: <identity>`
    PeerConnected { identity: String },
    /// `N <player> <name>`
    Named { player: PlayerId, name: DisplayName },
    /// `C <player> <value>`
    Steer { player: PlayerId, value: Number },
    /// `I <player>`: the player may now be sent its colours.
    Ready { player: PlayerId },
    /// `D <player>`: the player's connection closed.
    Departed { player: PlayerId },
}

impl WireMessage for UpstreamCommand {
    fn encode(&self) -> String {
        match self {
            UpstreamCommand::Pong => tag::PONG.to_string(),
            UpstreamCommand::GameConnected => tag::GAME_CONNECTED.to_string(),
            UpstreamCommand::PeerConnected { identity } => {
                format!("{}{identity}", tag::PEER_CONNECTED_PREFIX)
            }
            UpstreamCommand::Named { player, name } => format!("{} {player} {name}", tag::NAME),
            UpstreamCommand::Steer { player, value } => {
                format!("{} {player} {value}", tag::CONTROL)
            }
            UpstreamCommand::Ready { player } => format!("{} {player}", tag::READY),
            UpstreamCommand::Departed { player } => format!("{} {player}", tag::DEPARTED),
        }
    }

    fn decode(line: &str) -> Result<Self> {
        match trim_line_end(line) {
            tag::PONG => return Ok(UpstreamCommand::Pong),
            tag::GAME_CONNECTED => return Ok(UpstreamCommand::GameConnected),
            _ => {}
        }
        if let Some(identity) = line.strip_prefix(tag::PEER_CONNECTED_PREFIX) {
            return Ok(UpstreamCommand::PeerConnected {
                identity: identity.to_string(),
            });
        }

        let mut fields = Fields::open(line)?;
        match fields.tag() {
            tag::NAME => {
                let player = fields.player()?;
                Ok(UpstreamCommand::Named {
                    player,
                    name: fields.name()?,
                })
            }
            tag::CONTROL => {
                let player = fields.player()?;
                let value = fields.number("control value")?;
                fields.finish()?;
                Ok(UpstreamCommand::Steer { player, value })
            }
            tag::READY => {
                let player = fields.player()?;
                fields.finish()?;
                Ok(UpstreamCommand::Ready { player })
            }
            tag::DEPARTED => {
                let player = fields.player()?;
                fields.finish()?;
                Ok(UpstreamCommand::Departed { player })
            }
            _ => Err(fields.unknown()),
        }
    }
}

/// Frames the relay sends to a peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerCommand {
    /// `pong`
    Pong,
    /// `Game connection established`
    GameConnected,
    /// `Connected`: the relay accepted this connection.
    Welcome,
    /// `A|B <r> <g> <b>`: this peer's colour.
    Color { slot: ColorSlot, rgb: Rgb },
    /// `P <points>`: this peer's score.
    Score { points: Number },
    /// `T <time>`
    Time { value: Number },
    /// `U <payload>`
    Broadcast { payload: String },
}

impl WireMessage for PeerCommand {
    fn encode(&self) -> String {
        match self {
            PeerCommand::Pong => tag::PONG.to_string(),
            PeerCommand::GameConnected => tag::GAME_CONNECTED.to_string(),
            PeerCommand::Welcome => tag::WELCOME.to_string(),
            PeerCommand::Color { slot, rgb } => format!("{} {rgb}", slot.tag()),
            PeerCommand::Score { points } => format!("{} {points}", tag::SCORE),
            PeerCommand::Time { value } => format!("{} {value}", tag::TIME),
            PeerCommand::Broadcast { payload } => with_tail(tag::BROADCAST.to_string(), payload),
        }
    }

    fn decode(line: &str) -> Result<Self> {
        match trim_line_end(line) {
            tag::PONG => return Ok(PeerCommand::Pong),
            tag::GAME_CONNECTED => return Ok(PeerCommand::GameConnected),
            tag::WELCOME => return Ok(PeerCommand::Welcome),
            _ => {}
        }

        let mut fields = Fields::open(line)?;
        if let Some(slot) = ColorSlot::from_tag(fields.tag()) {
            let rgb = Rgb::read(&mut fields)?;
            fields.finish()?;
            return Ok(PeerCommand::Color { slot, rgb });
        }

        match fields.tag() {
            tag::SCORE => {
                let points = fields.number("points")?;
                fields.finish()?;
                Ok(PeerCommand::Score { points })
            }
            tag::TIME => {
                let value = fields.number("time")?;
                fields.finish()?;
                Ok(PeerCommand::Time { value })
            }
            tag::BROADCAST => Ok(PeerCommand::Broadcast {
                payload: fields.verbatim(),
            }),
            _ => Err(fields.unknown()),
        }
    }
}
