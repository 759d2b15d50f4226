//! Routing policy.
//!
//! Every function here is pure over the registry: it decides which frames go
//! where and returns them as an ordered list of [`Dispatch`]es. Sending is
//! the coordinator's job. An `Err` means the inbound message is dropped for
//! the stated reason; nothing is sent back to its sender.

use domerelay_wire::{PeerCommand, PeerMessage, PlayerId, UpstreamCommand, UpstreamMessage, WireMessage};

use crate::error::{RelayError, Result};
use crate::registry::Registry;
use crate::types::PeerIdentity;

/// Where an outbound frame goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Upstream,
    Peer(PeerIdentity),
}

/// One outbound frame and its destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dispatch {
    pub target: Target,
    pub frame: String,
}

impl Dispatch {
    pub fn upstream(command: &UpstreamCommand) -> Self {
        Self {
            target: Target::Upstream,
            frame: command.encode(),
        }
    }

    pub fn peer(identity: &PeerIdentity, command: &PeerCommand) -> Self {
        Self {
            target: Target::Peer(identity.clone()),
            frame: command.encode(),
        }
    }
}

/// Frames produced when a peer has just been accepted.
///
/// The peer is always welcomed; the upstream hears about it only if bound.
pub fn peer_arrived<H>(registry: &Registry<H>, identity: &PeerIdentity) -> Vec<Dispatch> {
    let mut out = vec![Dispatch::peer(identity, &PeerCommand::Welcome)];
    if registry.is_upstream_bound() {
        out.push(Dispatch::upstream(&UpstreamCommand::PeerConnected {
            identity: identity.to_string(),
        }));
    }
    out
}

/// Frames produced when a peer holding `player` has gone away.
pub fn peer_departed<H>(registry: &Registry<H>, player: Option<PlayerId>) -> Result<Vec<Dispatch>> {
    let Some(player) = player else {
        return Ok(Vec::new());
    };
    if !registry.is_upstream_bound() {
        return Err(RelayError::NoUpstream);
    }
    Ok(vec![Dispatch::upstream(&UpstreamCommand::Departed { player })])
}

/// Route one decoded message from the peer `from`.
///
/// Announcing assigns a player id, so this takes the registry mutably. An
/// announce with no upstream bound is dropped before any id is assigned.
pub fn route_from_peer<H>(
    registry: &mut Registry<H>,
    from: &PeerIdentity,
    message: PeerMessage,
) -> Result<Vec<Dispatch>> {
    match message {
        PeerMessage::Ping => Ok(vec![Dispatch::peer(from, &PeerCommand::Pong)]),
        PeerMessage::GameConnect => Ok(vec![Dispatch::peer(from, &PeerCommand::GameConnected)]),
        PeerMessage::Announce { name } => {
            if !registry.is_upstream_bound() {
                return Err(RelayError::NoUpstream);
            }
            let player = registry.assign_id(from)?;
            Ok(vec![
                Dispatch::upstream(&UpstreamCommand::Named { player, name }),
                Dispatch::upstream(&UpstreamCommand::Ready { player }),
            ])
        }
        PeerMessage::Control { value } => {
            if !registry.is_upstream_bound() {
                return Err(RelayError::NoUpstream);
            }
            let player = registry
                .lookup_id(from)
                .ok_or_else(|| RelayError::Unannounced(from.clone()))?;
            Ok(vec![Dispatch::upstream(&UpstreamCommand::Steer {
                player,
                value,
            })])
        }
    }
}

/// Route one decoded message from the upstream link.
pub fn route_from_upstream<H>(
    registry: &Registry<H>,
    message: UpstreamMessage,
) -> Result<Vec<Dispatch>> {
    match message {
        UpstreamMessage::Ping => Ok(vec![Dispatch::upstream(&UpstreamCommand::Pong)]),
        UpstreamMessage::GameConnect => {
            Ok(vec![Dispatch::upstream(&UpstreamCommand::GameConnected)])
        }
        UpstreamMessage::Color { slot, rgb, player } => {
            let identity = target_of(registry, player)?;
            Ok(vec![Dispatch::peer(identity, &PeerCommand::Color { slot, rgb })])
        }
        UpstreamMessage::Score { player, points } => {
            let identity = target_of(registry, player)?;
            Ok(vec![Dispatch::peer(identity, &PeerCommand::Score { points })])
        }
        UpstreamMessage::Time { value } => Ok(fan_out(registry, &PeerCommand::Time { value })),
        UpstreamMessage::Broadcast { payload } => {
            Ok(fan_out(registry, &PeerCommand::Broadcast { payload }))
        }
    }
}

fn target_of<H>(registry: &Registry<H>, player: PlayerId) -> Result<&PeerIdentity> {
    registry
        .peer_for_player(player)
        .map(|record| &record.identity)
        .ok_or(RelayError::UnroutableTarget(player))
}

fn fan_out<H>(registry: &Registry<H>, command: &PeerCommand) -> Vec<Dispatch> {
    let frame = command.encode();
    let mut out = Vec::with_capacity(registry.peer_count());
    registry.for_each_peer(|record| {
        out.push(Dispatch {
            target: Target::Peer(record.identity.clone()),
            frame: frame.clone(),
        });
    });
    out
}

#[cfg(test)]
mod tests {
    use domerelay_wire::{ColorSlot, DisplayName, Number, Rgb};

    use super::*;

    fn id(s: &str) -> PeerIdentity {
        PeerIdentity::new(s)
    }

    fn num(token: &str) -> Number {
        token.parse().unwrap()
    }

    fn announce(name: &str) -> PeerMessage {
        PeerMessage::Announce {
            name: DisplayName::new(name).unwrap(),
        }
    }

    fn frames(dispatches: &[Dispatch]) -> Vec<(&Target, &str)> {
        dispatches
            .iter()
            .map(|d| (&d.target, d.frame.as_str()))
            .collect()
    }

    fn bound_with_peers(peers: &[&str]) -> Registry<()> {
        let mut registry = Registry::new();
        registry.bind_upstream(()).unwrap();
        for peer in peers {
            registry.accept_peer(id(peer), ()).unwrap();
        }
        registry
    }

    #[test]
    fn arrival_welcomes_and_notifies_upstream() {
        let registry = bound_with_peers(&["10.0.0.7"]);
        let out = peer_arrived(&registry, &id("10.0.0.7"));
        assert_eq!(
            frames(&out),
            vec![
                (&Target::Peer(id("10.0.0.7")), "Connected"),
                (&Target::Upstream, "Remote connection from: 10.0.0.7"),
            ]
        );
    }

    #[test]
    fn arrival_without_upstream_only_welcomes() {
        let mut registry: Registry<()> = Registry::new();
        registry.accept_peer(id("a"), ()).unwrap();
        let out = peer_arrived(&registry, &id("a"));
        assert_eq!(frames(&out), vec![(&Target::Peer(id("a")), "Connected")]);
    }

    #[test]
    fn announce_assigns_id_then_names_then_ready() {
        let mut registry = bound_with_peers(&["a"]);
        let out = route_from_peer(&mut registry, &id("a"), announce("Ada")).unwrap();
        assert_eq!(
            frames(&out),
            vec![(&Target::Upstream, "N 0 Ada"), (&Target::Upstream, "I 0")]
        );
        assert_eq!(registry.lookup_id(&id("a")), Some(PlayerId(0)));
    }

    #[test]
    fn announce_without_upstream_assigns_nothing() {
        let mut registry: Registry<()> = Registry::new();
        registry.accept_peer(id("a"), ()).unwrap();
        let err = route_from_peer(&mut registry, &id("a"), announce("Ada")).unwrap_err();
        assert!(matches!(err, RelayError::NoUpstream));
        assert_eq!(registry.lookup_id(&id("a")), None);
    }

    #[test]
    fn control_carries_assigned_id() {
        let mut registry = bound_with_peers(&["a", "b"]);
        registry.assign_id(&id("a")).unwrap();
        registry.assign_id(&id("b")).unwrap();
        let control = PeerMessage::Control { value: num("0.25") };
        let out = route_from_peer(&mut registry, &id("b"), control).unwrap();
        assert_eq!(frames(&out), vec![(&Target::Upstream, "C 1 0.25")]);
    }

    #[test]
    fn control_before_announce_is_dropped() {
        let mut registry = bound_with_peers(&["a"]);
        let control = PeerMessage::Control { value: num("0.5") };
        let err = route_from_peer(&mut registry, &id("a"), control).unwrap_err();
        assert!(matches!(err, RelayError::Unannounced(peer) if peer == id("a")));
    }

    #[test]
    fn ping_is_answered_to_sender_only() {
        let mut registry = bound_with_peers(&["a", "b"]);
        let out = route_from_peer(&mut registry, &id("b"), PeerMessage::Ping).unwrap();
        assert_eq!(frames(&out), vec![(&Target::Peer(id("b")), "pong")]);

        let out = route_from_upstream(&registry, UpstreamMessage::GameConnect).unwrap();
        assert_eq!(
            frames(&out),
            vec![(&Target::Upstream, "Game connection established")]
        );
    }

    #[test]
    fn score_reaches_only_its_player() {
        let mut registry = bound_with_peers(&["a", "b"]);
        registry.assign_id(&id("a")).unwrap();
        registry.assign_id(&id("b")).unwrap();
        let out = route_from_upstream(
            &registry,
            UpstreamMessage::Score {
                player: PlayerId(1),
                points: Number::integer(12),
            },
        )
        .unwrap();
        assert_eq!(frames(&out), vec![(&Target::Peer(id("b")), "P 12")]);
    }

    #[test]
    fn colour_drops_player_id() {
        let mut registry = bound_with_peers(&["a"]);
        registry.assign_id(&id("a")).unwrap();
        let out = route_from_upstream(
            &registry,
            UpstreamMessage::Color {
                slot: ColorSlot::Secondary,
                rgb: Rgb::new(1.0, 0.5, 0.0).unwrap(),
                player: PlayerId(0),
            },
        )
        .unwrap();
        assert_eq!(frames(&out), vec![(&Target::Peer(id("a")), "B 1 0.5 0")]);
    }

    #[test]
    fn targeted_message_for_unknown_player_is_unroutable() {
        let registry = bound_with_peers(&["a"]);
        let err = route_from_upstream(
            &registry,
            UpstreamMessage::Score {
                player: PlayerId(9),
                points: Number::integer(1),
            },
        )
        .unwrap_err();
        assert!(matches!(err, RelayError::UnroutableTarget(PlayerId(9))));
    }

    #[test]
    fn broadcast_reaches_every_peer_including_unannounced() {
        let mut registry = bound_with_peers(&["a", "b", "c"]);
        registry.assign_id(&id("b")).unwrap();
        let out = route_from_upstream(
            &registry,
            UpstreamMessage::Broadcast {
                payload: "x  y".to_string(),
            },
        )
        .unwrap();
        assert_eq!(
            frames(&out),
            vec![
                (&Target::Peer(id("a")), "U x  y"),
                (&Target::Peer(id("b")), "U x  y"),
                (&Target::Peer(id("c")), "U x  y"),
            ]
        );
    }

    #[test]
    fn broadcast_with_no_peers_is_a_no_op() {
        let registry = bound_with_peers(&[]);
        let time = UpstreamMessage::Time { value: num("3.5") };
        let out = route_from_upstream(&registry, time).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn numeric_payloads_pass_through_unchanged() {
        let mut registry = bound_with_peers(&["a"]);
        registry.assign_id(&id("a")).unwrap();

        let control = PeerMessage::decode("C 0.123456789012").unwrap();
        let out = route_from_peer(&mut registry, &id("a"), control).unwrap();
        assert_eq!(frames(&out), vec![(&Target::Upstream, "C 0 0.123456789012")]);

        for (inbound, outbound) in [
            ("T 123456789", "T 123456789"),
            ("P 0 -5", "P -5"),
            ("P 0 1e3", "P 1e3"),
            ("U hello\r\n", "U hello\r\n"),
        ] {
            let message = UpstreamMessage::decode(inbound).unwrap();
            let out = route_from_upstream(&registry, message).unwrap();
            assert_eq!(frames(&out), vec![(&Target::Peer(id("a")), outbound)], "{inbound:?}");
        }
    }

    #[test]
    fn departure_is_reported_only_for_announced_peers() {
        let registry = bound_with_peers(&[]);
        assert!(peer_departed(&registry, None).unwrap().is_empty());
        let out = peer_departed(&registry, Some(PlayerId(4))).unwrap();
        assert_eq!(frames(&out), vec![(&Target::Upstream, "D 4")]);

        let unbound: Registry<()> = Registry::new();
        assert!(matches!(
            peer_departed(&unbound, Some(PlayerId(4))),
            Err(RelayError::NoUpstream)
        ));
    }
}
