//! Connection registry for the session server
//!
//! This module ties each live WebSocket session to exactly one player identity:
//! - Identity issuance (random tokens, never reused during the process lifetime)
//! - Join/leave lifecycle against the world state
//! - Capacity enforcement
//! - Per-connection outbound queues used by the broadcast engine
//!
//! The registry is owned by the server event loop and never shared.

use crate::game::GameState;
use crate::utils::random_player_id;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{PlayerId, ServerPacket};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Identifies one transport session. Assigned by the accept loop.
pub type ConnectionId = u64;

/// Frames a connection may have queued before it counts as stalled.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Outbound queue drained by a connection's writer task.
pub type ClientSender = mpsc::Sender<String>;

/// Creates the bounded outbound queue for one connection.
pub fn outbound_queue() -> (ClientSender, mpsc::Receiver<String>) {
    mpsc::channel(OUTBOUND_QUEUE_CAPACITY)
}

/// A live connection and the identity bound to it
#[derive(Debug)]
pub struct Client {
    pub connection_id: ConnectionId,
    pub player_id: PlayerId,
    pub addr: SocketAddr,
    pub connected_at: Instant,
    sender: ClientSender,
}

impl Client {
    pub fn new(
        connection_id: ConnectionId,
        player_id: PlayerId,
        addr: SocketAddr,
        sender: ClientSender,
    ) -> Self {
        Self {
            connection_id,
            player_id,
            addr,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Queues a text frame. Fails once the writer task has gone away or
    /// the peer has stopped draining its queue.
    pub fn send(&self, text: &str) -> bool {
        match self.sender.try_send(text.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Outbound queue for connection {} is full", self.connection_id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Maps live connections to player identities
pub struct ClientManager {
    /// Connected clients indexed by their connection
    clients: HashMap<ConnectionId, Client>,
    /// Every identity handed out so far
    issued: HashSet<PlayerId>,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
    rng: StdRng,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self::with_rng(max_clients, StdRng::from_entropy())
    }

    pub fn with_rng(max_clients: usize, rng: StdRng) -> Self {
        Self {
            clients: HashMap::new(),
            issued: HashSet::new(),
            max_clients,
            rng,
        }
    }

    /// Registers a new connection and spawns its player.
    ///
    /// Returns the welcome packet for the joining client, or `None` when the
    /// server is at capacity. A refused client is sent a rejection and its
    /// queue is dropped, which closes the connection.
    pub fn connect(
        &mut self,
        game: &mut GameState,
        connection_id: ConnectionId,
        addr: SocketAddr,
        sender: ClientSender,
    ) -> Option<ServerPacket> {
        if self.clients.len() >= self.max_clients {
            warn!("Rejecting connection from {}: server full", addr);
            let rejection = ServerPacket::Rejected {
                reason: "Server full".to_string(),
            };
            if let Ok(text) = rejection.encode() {
                let _ = sender.try_send(text);
            }
            return None;
        }

        let player_id = self.issue_id();
        let welcome = game.add_player(player_id.clone());

        info!(
            "Client {} connected from {} as {}",
            connection_id, addr, player_id
        );
        self.clients.insert(
            connection_id,
            Client::new(connection_id, player_id, addr, sender),
        );

        Some(welcome)
    }

    /// Removes a connection and its player.
    ///
    /// Returns the membership snapshot to broadcast, or `None` if the
    /// connection was already gone.
    pub fn disconnect(
        &mut self,
        game: &mut GameState,
        connection_id: ConnectionId,
    ) -> Option<ServerPacket> {
        let client = self.clients.remove(&connection_id)?;
        game.remove_player(&client.player_id);

        info!(
            "Client {} ({}) disconnected after {:.1}s",
            connection_id,
            client.player_id,
            client.connected_at.elapsed().as_secs_f32()
        );
        Some(game.snapshot())
    }

    /// Identity bound to a connection
    pub fn player_of(&self, connection_id: ConnectionId) -> Option<&PlayerId> {
        self.clients
            .get(&connection_id)
            .map(|client| &client.player_id)
    }

    /// Queues a frame for one connection. Returns false if it could not be queued.
    pub fn send_to(&self, connection_id: ConnectionId, text: &str) -> bool {
        self.clients
            .get(&connection_id)
            .map(|client| client.send(text))
            .unwrap_or(false)
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn issue_id(&mut self) -> PlayerId {
        loop {
            let candidate = random_player_id(&mut self.rng);
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
