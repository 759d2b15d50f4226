//! Frame tags and literal keywords.
//!
//! Tags are single characters; literals are whole-frame keywords that carry
//! no fields.

/// Peer announces its display name; relay forwards it upstream with the id.
pub const NAME: char = 'N';

/// Peer control/orientation value; relay forwards it upstream with the id.
pub const CONTROL: char = 'C';

/// Primary colour assignment for one player.
pub const COLOR_PRIMARY: char = 'A';

/// Secondary colour assignment for one player.
pub const COLOR_SECONDARY: char = 'B';

/// Score update for one player.
pub const SCORE: char = 'P';

/// Game time, broadcast to every peer.
pub const TIME: char = 'T';

/// Opaque payload, broadcast to every peer unmodified.
pub const BROADCAST: char = 'U';

/// Relay notice: a player left.
pub const DEPARTED: char = 'D';

/// Relay notice: a player is ready to receive its colours.
pub const READY: char = 'I';

/// Liveness probe.
pub const PING: &str = "ping";

/// Liveness probe answer.
pub const PONG: &str = "pong";

/// Authoritative side asks the relay to confirm the link.
pub const GAME_CONNECT: &str = "game_connect";

/// Relay confirmation of [`GAME_CONNECT`].
pub const GAME_CONNECTED: &str = "Game connection established";

/// Sent to a peer right after its connection is accepted.
pub const WELCOME: &str = "Connected";

/// Prefix of the upstream notice sent when a peer connects.
pub const PEER_CONNECTED_PREFIX: &str = "Remote connection from: ";

/// Returns a human-readable name for a tag.
pub fn tag_name(tag: char) -> &'static str {
    match tag {
        NAME => "NAME",
        CONTROL => "CONTROL",
        COLOR_PRIMARY => "COLOR_PRIMARY",
        COLOR_SECONDARY => "COLOR_SECONDARY",
        SCORE => "SCORE",
        TIME => "TIME",
        BROADCAST => "BROADCAST",
        DEPARTED => "DEPARTED",
        READY => "READY",
        _ => "UNKNOWN",
    }
}

/// Returns true if frames with this tag are addressed to a single player.
pub fn is_targeted(tag: char) -> bool {
    matches!(tag, COLOR_PRIMARY | COLOR_SECONDARY | SCORE)
}

/// Returns true if frames with this tag fan out to every peer.
pub fn is_broadcast(tag: char) -> bool {
    matches!(tag, TIME | BROADCAST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_known_tags() {
        assert_eq!(tag_name('A'), "COLOR_PRIMARY");
        assert_eq!(tag_name('D'), "DEPARTED");
        assert_eq!(tag_name('x'), "UNKNOWN");
    }

    #[test]
    fn targeted_and_broadcast_are_disjoint() {
        for tag in ['N', 'C', 'A', 'B', 'P', 'T', 'U', 'D', 'I'] {
            assert!(!(is_targeted(tag) && is_broadcast(tag)), "{tag}");
        }
        assert!(is_targeted('P'));
        assert!(is_broadcast('U'));
        assert!(!is_broadcast('N'));
    }
}
