//! Tagged text-frame codec for the domerelay controller relay.
//!
//! Every relay frame is one WebSocket text message. A frame is either a
//! literal keyword (`ping`, `game_connect`, ...) or a one-character tag
//! followed by space-separated fields:
//!
//! ```text
//! A 0.25 0.5 1 7      colour assignment for player 7 (upstream -> relay)
//! P 7 12              player 7 has 12 points      (upstream -> relay)
//! N Ada Lovelace      peer announces its name     (peer -> relay)
//! C 0.75              peer control value          (peer -> relay)
//! ```
//!
//! Free-text fields are always last and run to the end of the line. Numeric
//! fields must be finite numbers but travel as the [`Number`] token the
//! sender wrote, so the relay never rounds or reformats them.
//!
//! Messages are split by direction ([`PeerMessage`], [`UpstreamMessage`],
//! [`UpstreamCommand`], [`PeerCommand`]) so each grammar is unambiguous and
//! `decode(encode(m)) == m` holds for each of them.

pub mod codec;
pub mod error;
pub mod message;
pub mod tag;
pub mod types;

pub use codec::{decode_frame, WireMessage, MAX_FRAME_LEN, MAX_NAME_CHARS};
pub use error::{Result, WireError};
pub use message::{ColorSlot, PeerCommand, PeerMessage, Rgb, UpstreamCommand, UpstreamMessage};
pub use types::{DisplayName, Number, PlayerId};
