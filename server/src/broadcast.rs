//! Fan-out of server packets to every open connection.
//!
//! A connection whose outbound queue is closed is treated as disconnected:
//! it is removed from the registry, its player leaves the world, and the
//! resulting membership snapshot is broadcast in turn.

use crate::client_manager::{ClientManager, ConnectionId};
use crate::game::GameState;
use log::{error, warn};
use shared::ServerPacket;
use std::collections::VecDeque;

/// Serializes a packet, logging instead of failing.
pub fn encode(packet: &ServerPacket) -> Option<String> {
    match packet.encode() {
        Ok(text) => Some(text),
        Err(e) => {
            error!("Failed to serialize {} packet: {}", packet.kind(), e);
            None
        }
    }
}

/// Writes one packet to every connection and returns those that refused it.
pub fn fan_out(clients: &ClientManager, packet: &ServerPacket) -> Vec<ConnectionId> {
    let Some(text) = encode(packet) else {
        return Vec::new();
    };

    clients
        .clients()
        .filter(|client| !client.send(&text))
        .map(|client| client.connection_id)
        .collect()
}

/// Queues a packet for a single connection.
pub fn send_to(clients: &ClientManager, connection_id: ConnectionId, packet: &ServerPacket) -> bool {
    match encode(packet) {
        Some(text) => clients.send_to(connection_id, &text),
        None => false,
    }
}

/// Broadcasts packets in order, tearing down connections that fail and
/// announcing their departure until a round completes without failures.
pub fn broadcast_all(
    clients: &mut ClientManager,
    game: &mut GameState,
    packets: impl IntoIterator<Item = ServerPacket>,
) {
    let mut queue: VecDeque<ServerPacket> = packets.into_iter().collect();

    while let Some(packet) = queue.pop_front() {
        for connection_id in fan_out(clients, &packet) {
            warn!(
                "Dropping connection {} after failed {} write",
                connection_id,
                packet.kind()
            );
            if let Some(update) = clients.disconnect(game, connection_id) {
                queue.push_back(update);
            }
        }
    }
}
