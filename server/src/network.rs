//! Server network layer handling WebSocket sessions and the event loop

use crate::broadcast::{broadcast_all, send_to};
use crate::client_manager::{outbound_queue, ClientManager, ClientSender, ConnectionId};
use crate::config::ServerConfig;
use crate::game::{GameState, Outcome};
use crate::router::route_text;
use crate::scheduler::{Tick, TickScheduler};
use crate::utils::get_timestamp;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::ServerPacket;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;

/// Messages sent from network and timer tasks to the event loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        connection_id: ConnectionId,
        addr: SocketAddr,
        sender: ClientSender,
    },
    TextReceived {
        connection_id: ConnectionId,
        text: String,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
    RespawnDue {
        epoch: u64,
    },
    Shutdown,
}

/// Stops a running server from outside the event loop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.server_tx.send(ServerMessage::Shutdown);
    }
}

/// Main server owning all session state.
///
/// Every mutation happens on the task running [`Server::run`]; network and
/// timer tasks only ever talk to it through `ServerMessage`s.
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    clients: ClientManager,
    game: GameState,
    config: ServerConfig,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    /// Flipped once the event loop exits so the acceptor stops taking connections
    stopped_tx: watch::Sender<bool>,
}

impl Server {
    /// Binds the listening socket. Failing to bind is fatal to startup.
    pub async fn bind(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let listener = TcpListener::bind(config.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (stopped_tx, _) = watch::channel(false);

        Ok(Server {
            listener: Some(listener),
            local_addr,
            clients: ClientManager::new(config.max_players),
            game: GameState::new(config.game.clone()),
            config,
            server_tx,
            server_rx,
            stopped_tx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    /// Spawns task that accepts TCP connections and hands each to its own session task.
    /// The listener is dropped as soon as the event loop stops.
    fn spawn_acceptor(&self, listener: TcpListener) {
        let server_tx = self.server_tx.clone();
        let mut stopped_rx = self.stopped_tx.subscribe();

        tokio::spawn(async move {
            let mut next_connection_id: ConnectionId = 1;

            loop {
                tokio::select! {
                    _ = stopped_rx.changed() => {
                        debug!("Acceptor stopping");
                        break;
                    }

                    accepted = listener.accept() => match accepted {
                        Ok((stream, addr)) => {
                            let connection_id = next_connection_id;
                            next_connection_id += 1;
                            debug!("Accepted TCP connection {} from {}", connection_id, addr);
                            tokio::spawn(run_session(stream, addr, connection_id, server_tx.clone()));
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    },
                }
            }
        });
    }

    /// Spawns task that reports back once the respawn delay has elapsed
    fn schedule_respawn(&self, epoch: u64) {
        let server_tx = self.server_tx.clone();
        let delay = self.config.game.respawn_delay;
        debug!("Monster respawn for epoch {} in {:?}", epoch, delay);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = server_tx.send(ServerMessage::RespawnDue { epoch });
        });
    }

    fn broadcast(&mut self, packets: Vec<ServerPacket>) {
        broadcast_all(&mut self.clients, &mut self.game, packets);
    }

    fn apply(&mut self, outcome: Outcome) {
        if let Some(epoch) = outcome.respawn {
            self.schedule_respawn(epoch);
        }
        self.broadcast(outcome.broadcasts);
    }

    fn handle_connect(&mut self, connection_id: ConnectionId, addr: SocketAddr, sender: ClientSender) {
        let Some(welcome) = self
            .clients
            .connect(&mut self.game, connection_id, addr, sender)
        else {
            return;
        };

        send_to(&self.clients, connection_id, &welcome);
        send_to(&self.clients, connection_id, &self.game.monster_position());
        let snapshot = self.game.snapshot();
        self.broadcast(vec![snapshot]);
    }

    fn handle_disconnect(&mut self, connection_id: ConnectionId) {
        if let Some(update) = self.clients.disconnect(&mut self.game, connection_id) {
            self.broadcast(vec![update]);
        }
    }

    fn handle_text(&mut self, connection_id: ConnectionId, text: &str) {
        let Some(sender) = self.clients.player_of(connection_id).cloned() else {
            debug!("Ignoring message from unregistered connection {}", connection_id);
            return;
        };

        let outcome = route_text(&mut self.game, &sender, text, get_timestamp());
        self.apply(outcome);
    }

    fn handle_tick(&mut self, tick: Tick) {
        let packet = match tick {
            Tick::MonsterDrift => self.game.drift_monster(),
            Tick::EffectSweep => self.game.sweep_effects(get_timestamp()),
        };
        self.broadcast(vec![packet]);
    }

    fn handle_respawn(&mut self, epoch: u64) {
        if let Some(packet) = self.game.respawn_monster(epoch) {
            self.broadcast(vec![packet]);
        }
    }

    /// Main server loop. Runs until shut down.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = self.listener.take().ok_or("server is already running")?;
        self.spawn_acceptor(listener);

        let mut scheduler = TickScheduler::new(
            self.config.game.drift_interval,
            self.config.game.sweep_interval,
        );

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::Connected { connection_id, addr, sender }) => {
                            self.handle_connect(connection_id, addr, sender);
                        }
                        Some(ServerMessage::TextReceived { connection_id, text }) => {
                            self.handle_text(connection_id, &text);
                        }
                        Some(ServerMessage::Disconnected { connection_id }) => {
                            self.handle_disconnect(connection_id);
                        }
                        Some(ServerMessage::RespawnDue { epoch }) => {
                            self.handle_respawn(epoch);
                        }
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                }

                tick = scheduler.next() => {
                    self.handle_tick(tick);
                }
            }
        }

        self.stopped_tx.send_replace(true);
        Ok(())
    }
}

/// Drives one WebSocket session: handshake, writer task, and reader loop
async fn run_session(
    stream: TcpStream,
    addr: SocketAddr,
    connection_id: ConnectionId,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    let (mut ws_writer, mut ws_reader) = ws_stream.split();

    let (write_tx, mut write_rx) = outbound_queue();
    if server_tx
        .send(ServerMessage::Connected {
            connection_id,
            addr,
            sender: write_tx,
        })
        .is_err()
    {
        return;
    }

    // Writer task: forwards queued frames until the event loop drops the queue
    let writer_handle = tokio::spawn(async move {
        while let Some(text) = write_rx.recv().await {
            if let Err(e) = ws_writer.send(Message::Text(text)).await {
                debug!("Write to connection {} failed: {}", connection_id, e);
                return;
            }
        }
        let _ = ws_writer.close().await;
    });

    while let Some(frame) = ws_reader.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if server_tx
                    .send(ServerMessage::TextReceived {
                        connection_id,
                        text,
                    })
                    .is_err()
                {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Read from connection {} failed: {}", connection_id, e);
                break;
            }
        }
    }

    let _ = server_tx.send(ServerMessage::Disconnected { connection_id });
    writer_handle.abort();
}
