//! Integration tests for the arena session server
//!
//! These tests run a real server on an ephemeral port and drive it through
//! WebSocket clients, validating the full path from socket to broadcast.

use futures_util::{SinkExt, StreamExt};
use server::config::{GameConfig, ServerConfig};
use server::network::{Server, ShutdownHandle};
use shared::{ClientPacket, EffectKind, PlayerId, PlayerView, ServerPacket, MONSTER_TARGET};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Game settings with loops slow enough to stay out of the way
fn quiet_game() -> GameConfig {
    GameConfig {
        drift_interval: Duration::from_secs(60),
        sweep_interval: Duration::from_secs(60),
        ..GameConfig::default()
    }
}

async fn start_server(game: GameConfig, max_players: usize) -> (SocketAddr, ShutdownHandle) {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_players,
        game,
    };
    let mut server = Server::bind(config).await.expect("Failed to bind server");
    let addr = server.local_addr();
    let handle = server.shutdown_handle();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    (addr, handle)
}

async fn connect(addr: SocketAddr) -> Socket {
    let (socket, _) = connect_async(format!("ws://{}", addr))
        .await
        .expect("Failed to connect");
    socket
}

/// Connects and consumes the join sequence, returning the issued identity
async fn join(addr: SocketAddr) -> (Socket, PlayerId) {
    let mut socket = connect(addr).await;
    let id = match next_packet(&mut socket).await {
        ServerPacket::Welcome { id, .. } => id,
        other => panic!("Expected welcome, got {:?}", other),
    };
    recv_kind(&mut socket, "monsterPosition").await;
    recv_kind(&mut socket, "update").await;
    (socket, id)
}

async fn next_packet(socket: &mut Socket) -> ServerPacket {
    loop {
        let frame = timeout(RECV_TIMEOUT, socket.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Connection closed")
            .expect("Read failed");
        if let Message::Text(text) = frame {
            return ServerPacket::decode(&text).expect("Server sent undecodable frame");
        }
    }
}

/// Reads until a packet of the given kind arrives
async fn recv_kind(socket: &mut Socket, kind: &str) -> ServerPacket {
    loop {
        let packet = next_packet(socket).await;
        if packet.kind() == kind {
            return packet;
        }
    }
}

/// Reads until an update arrives that satisfies the predicate
async fn recv_update_where<F>(socket: &mut Socket, predicate: F) -> BTreeMap<PlayerId, PlayerView>
where
    F: Fn(&BTreeMap<PlayerId, PlayerView>) -> bool,
{
    loop {
        if let ServerPacket::Update { players } = recv_kind(socket, "update").await {
            if predicate(&players) {
                return players;
            }
        }
    }
}

async fn send(socket: &mut Socket, packet: ClientPacket) {
    let text = packet.encode().expect("Failed to encode");
    socket.send(Message::Text(text)).await.expect("Send failed");
}

async fn send_raw(socket: &mut Socket, text: &str) {
    socket
        .send(Message::Text(text.to_string()))
        .await
        .expect("Send failed");
}

fn attack(target: &str) -> ClientPacket {
    ClientPacket::Attack {
        id: None,
        target: target.to_string(),
        x: None,
        y: None,
    }
}

fn move_to(x: f32, y: f32) -> ClientPacket {
    ClientPacket::Move { id: None, x, y }
}

/// SESSION LIFECYCLE TESTS
mod session_tests {
    use super::*;

    #[tokio::test]
    async fn welcome_spawns_player_at_full_health() {
        let (addr, handle) = start_server(quiet_game(), 8).await;
        let mut socket = connect(addr).await;

        match next_packet(&mut socket).await {
            ServerPacket::Welcome { id, x, y, hp } => {
                assert_eq!(id.as_str().len(), 8);
                assert_eq!((x, y), (400.0, 300.0));
                assert_eq!(hp, 100);
            }
            other => panic!("Expected welcome, got {:?}", other),
        }

        match next_packet(&mut socket).await {
            ServerPacket::MonsterPosition { x, y, hp } => {
                assert!((0.0..=800.0).contains(&x));
                assert!((0.0..=600.0).contains(&y));
                assert_eq!(hp, 100);
            }
            other => panic!("Expected monster position, got {:?}", other),
        }

        handle.shutdown();
    }

    #[tokio::test]
    async fn move_is_broadcast_to_other_players() {
        let (addr, handle) = start_server(quiet_game(), 8).await;
        let (mut alice, _) = join(addr).await;
        let (mut bob, bob_id) = join(addr).await;

        let players = recv_update_where(&mut alice, |players| players.contains_key(&bob_id)).await;
        assert_eq!(players.len(), 2);

        send(&mut bob, move_to(10.0, 20.0)).await;

        let players = recv_update_where(&mut alice, |players| {
            players.get(&bob_id).map(|p| (p.x, p.y)) == Some((10.0, 20.0))
        })
        .await;
        assert_eq!(players[&bob_id].hp, 100);

        handle.shutdown();
    }

    #[tokio::test]
    async fn dropped_connection_is_announced() {
        let (addr, handle) = start_server(quiet_game(), 8).await;
        let (mut alice, alice_id) = join(addr).await;
        let (mut bob, bob_id) = join(addr).await;
        recv_update_where(&mut alice, |players| players.contains_key(&bob_id)).await;

        bob.close(None).await.expect("Close failed");

        let players = recv_update_where(&mut alice, |players| !players.contains_key(&bob_id)).await;
        assert!(players.contains_key(&alice_id));
        assert_eq!(players.len(), 1);

        handle.shutdown();
    }

    #[tokio::test]
    async fn server_full_rejects_connection() {
        let (addr, handle) = start_server(quiet_game(), 1).await;
        let (_alice, _) = join(addr).await;
        let mut bob = connect(addr).await;

        assert_eq!(
            next_packet(&mut bob).await,
            ServerPacket::Rejected {
                reason: "Server full".to_string()
            }
        );

        handle.shutdown();
    }

    #[tokio::test]
    async fn malformed_and_unknown_messages_are_ignored() {
        let (addr, handle) = start_server(quiet_game(), 8).await;
        let (mut socket, id) = join(addr).await;

        send_raw(&mut socket, "definitely not json").await;
        send_raw(&mut socket, r#"{"type":"dance","style":"waltz"}"#).await;
        send_raw(&mut socket, r#"{"type":"move","x":"left"}"#).await;
        send(&mut socket, move_to(5.0, 6.0)).await;

        // The first reply is the update from the valid move
        match next_packet(&mut socket).await {
            ServerPacket::Update { players } => {
                assert_eq!((players[&id].x, players[&id].y), (5.0, 6.0));
            }
            other => panic!("Expected update, got {:?}", other),
        }

        handle.shutdown();
    }

    #[tokio::test]
    async fn claimed_id_cannot_move_another_player() {
        let (addr, handle) = start_server(quiet_game(), 8).await;
        let (mut alice, alice_id) = join(addr).await;
        let (mut bob, bob_id) = join(addr).await;
        recv_update_where(&mut alice, |players| players.contains_key(&bob_id)).await;

        send(
            &mut bob,
            ClientPacket::Move {
                id: Some(alice_id.clone()),
                x: 1.0,
                y: 1.0,
            },
        )
        .await;

        let players = recv_update_where(&mut alice, |players| {
            players.get(&bob_id).map(|p| (p.x, p.y)) == Some((1.0, 1.0))
        })
        .await;
        assert_eq!((players[&alice_id].x, players[&alice_id].y), (400.0, 300.0));

        handle.shutdown();
    }
}

/// COMBAT TESTS
mod combat_tests {
    use super::*;

    #[tokio::test]
    async fn monster_is_defeated_after_ten_attacks() {
        let (addr, handle) = start_server(quiet_game(), 8).await;
        let (mut socket, _) = join(addr).await;

        for expected in (0..10).rev().map(|n| n * 10) {
            send(&mut socket, attack(MONSTER_TARGET)).await;
            assert_eq!(
                next_packet(&mut socket).await,
                ServerPacket::UpdateMonsterHp { hp: expected }
            );
            assert_eq!(next_packet(&mut socket).await.kind(), "effect");
        }
        assert_eq!(next_packet(&mut socket).await, ServerPacket::MonsterDead {});

        // Further attacks on the depleted monster change nothing
        send(&mut socket, attack(MONSTER_TARGET)).await;
        send(&mut socket, move_to(1.0, 1.0)).await;
        assert_eq!(next_packet(&mut socket).await.kind(), "update");

        handle.shutdown();
    }

    #[tokio::test]
    async fn effect_uses_supplied_coordinates() {
        let (addr, handle) = start_server(quiet_game(), 8).await;
        let (mut socket, _) = join(addr).await;

        send(
            &mut socket,
            ClientPacket::Attack {
                id: None,
                target: MONSTER_TARGET.to_string(),
                x: Some(12.0),
                y: Some(34.0),
            },
        )
        .await;

        match recv_kind(&mut socket, "effect").await {
            ServerPacket::Effect { effect } => {
                assert_eq!(effect.kind, EffectKind::Attack);
                assert_eq!((effect.x, effect.y), (12.0, 34.0));
                assert!(effect.timestamp > 0);
            }
            other => panic!("Expected effect, got {:?}", other),
        }

        handle.shutdown();
    }

    #[tokio::test]
    async fn player_killed_by_attacks() {
        let game = GameConfig {
            max_hp: 20,
            ..quiet_game()
        };
        let (addr, handle) = start_server(game, 8).await;
        let (mut alice, _) = join(addr).await;
        let (mut bob, bob_id) = join(addr).await;
        recv_update_where(&mut alice, |players| players.contains_key(&bob_id)).await;

        send(&mut alice, attack(bob_id.as_str())).await;
        assert_eq!(
            recv_kind(&mut alice, "updatePlayerHP").await,
            ServerPacket::UpdatePlayerHp {
                id: bob_id.clone(),
                hp: 10
            }
        );

        send(&mut alice, attack(bob_id.as_str())).await;
        assert_eq!(
            recv_kind(&mut alice, "updatePlayerHP").await,
            ServerPacket::UpdatePlayerHp {
                id: bob_id.clone(),
                hp: 0
            }
        );
        assert_eq!(next_packet(&mut alice).await.kind(), "effect");
        assert_eq!(
            next_packet(&mut alice).await,
            ServerPacket::PlayerDead { id: bob_id.clone() }
        );
        match next_packet(&mut alice).await {
            ServerPacket::Update { players } => assert!(!players.contains_key(&bob_id)),
            other => panic!("Expected update, got {:?}", other),
        }

        // The dead player's connection still hears about the world
        assert_eq!(
            recv_kind(&mut bob, "playerDead").await,
            ServerPacket::PlayerDead { id: bob_id.clone() }
        );

        handle.shutdown();
    }

    #[tokio::test]
    async fn attack_on_unknown_target_is_ignored() {
        let (addr, handle) = start_server(quiet_game(), 8).await;
        let (mut socket, _) = join(addr).await;

        send(&mut socket, attack("nobody42")).await;
        send(&mut socket, move_to(2.0, 2.0)).await;
        assert_eq!(next_packet(&mut socket).await.kind(), "update");

        handle.shutdown();
    }
}

/// AUTONOMOUS LOOP TESTS
mod loop_tests {
    use super::*;

    #[tokio::test]
    async fn monster_respawns_after_delay() {
        let game = GameConfig {
            max_hp: 10,
            respawn_delay: Duration::from_millis(200),
            ..quiet_game()
        };
        let (addr, handle) = start_server(game, 8).await;
        let (mut socket, _) = join(addr).await;

        send(&mut socket, attack(MONSTER_TARGET)).await;
        recv_kind(&mut socket, "monsterDead").await;

        match recv_kind(&mut socket, "monsterPosition").await {
            ServerPacket::MonsterPosition { x, y, hp } => {
                assert_eq!(hp, 10);
                assert!((0.0..=800.0).contains(&x));
                assert!((0.0..=600.0).contains(&y));
            }
            other => panic!("Expected monster position, got {:?}", other),
        }

        // Attacks land again after the respawn
        send(&mut socket, attack(MONSTER_TARGET)).await;
        assert_eq!(
            recv_kind(&mut socket, "updateMonsterHP").await,
            ServerPacket::UpdateMonsterHp { hp: 0 }
        );

        handle.shutdown();
    }

    #[tokio::test]
    async fn monster_drifts_within_bounds() {
        let game = GameConfig {
            drift_interval: Duration::from_millis(20),
            ..quiet_game()
        };
        let (addr, handle) = start_server(game, 8).await;
        let mut socket = connect(addr).await;

        for _ in 0..5 {
            match recv_kind(&mut socket, "monsterPosition").await {
                ServerPacket::MonsterPosition { x, y, hp } => {
                    assert!((0.0..=800.0).contains(&x));
                    assert!((0.0..=600.0).contains(&y));
                    assert_eq!(hp, 100);
                }
                other => panic!("Expected monster position, got {:?}", other),
            }
        }

        handle.shutdown();
    }

    #[tokio::test]
    async fn effects_expire_from_sweep() {
        let game = GameConfig {
            sweep_interval: Duration::from_millis(50),
            effect_ttl: Duration::from_millis(300),
            ..quiet_game()
        };
        let (addr, handle) = start_server(game, 8).await;
        let (mut socket, _) = join(addr).await;

        send(&mut socket, attack(MONSTER_TARGET)).await;
        recv_kind(&mut socket, "effect").await;

        let mut saw_active = false;
        loop {
            match recv_kind(&mut socket, "effects").await {
                ServerPacket::Effects { effects } if !effects.is_empty() => {
                    assert_eq!(effects.len(), 1);
                    saw_active = true;
                }
                ServerPacket::Effects { .. } if saw_active => break,
                _ => {}
            }
        }

        handle.shutdown();
    }
}
