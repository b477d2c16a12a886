//! Decodes inbound frames and dispatches them by message kind.

use crate::combat::resolve_attack;
use crate::entity::EntityRef;
use crate::game::{GameState, Outcome};
use log::debug;
use shared::{ClientPacket, PlayerId};

/// Decodes a text frame and routes it. Malformed frames are dropped.
pub fn route_text(state: &mut GameState, sender: &PlayerId, text: &str, now: u64) -> Outcome {
    match ClientPacket::decode(text) {
        Ok(packet) => route(state, sender, packet, now),
        Err(e) => {
            debug!("Dropping malformed message from {}: {}", sender, e);
            Outcome::none()
        }
    }
}

/// Applies a decoded message on behalf of `sender`.
///
/// `sender` is the identity bound to the connection; any `id` the client put
/// in the message is advisory only.
pub fn route(state: &mut GameState, sender: &PlayerId, packet: ClientPacket, now: u64) -> Outcome {
    match packet {
        ClientPacket::Move { id, x, y } => {
            note_claimed_id(sender, id.as_ref());
            if !all_finite(&[x, y]) {
                debug!("Dropping move with out-of-range coordinates from {}", sender);
                return Outcome::none();
            }
            if state.world.move_player(sender, x, y) {
                Outcome::broadcast(state.snapshot())
            } else {
                debug!("Ignoring move from absent player {}", sender);
                Outcome::none()
            }
        }
        ClientPacket::Attack { id, target, x, y } => {
            note_claimed_id(sender, id.as_ref());
            if !all_finite(&[x, y].map(|v| v.unwrap_or(0.0))) {
                debug!("Dropping attack with out-of-range coordinates from {}", sender);
                return Outcome::none();
            }
            let at = x.zip(y);
            let target = EntityRef::parse(&target);
            match resolve_attack(state, sender, &target, at, now) {
                Some(resolution) => resolution.into_outcome(state),
                None => Outcome::none(),
            }
        }
        ClientPacket::Unknown => {
            debug!("Ignoring unrecognized message kind from {}", sender);
            Outcome::none()
        }
    }
}

/// Numbers beyond `f32` range decode as infinities, which cannot be re-encoded.
fn all_finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

fn note_claimed_id(sender: &PlayerId, claimed: Option<&PlayerId>) {
    if let Some(claimed) = claimed.filter(|claimed| *claimed != sender) {
        debug!("Player {} sent a message claiming id {}", sender, claimed);
    }
}
