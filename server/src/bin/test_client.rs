use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use shared::{ClientPacket, PlayerId, ServerPacket, MONSTER_TARGET};
use std::time::Duration;
use tokio::time::{interval, sleep};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Scripted bot: joins, walks in a circle and swings at the monster
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the server
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:3000")]
    server: String,

    /// Number of move/attack rounds to play
    #[arg(short, long, default_value_t = 10)]
    rounds: u32,

    /// Delay between rounds in milliseconds
    #[arg(short, long, default_value_t = 500)]
    interval_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!("Connecting to {}", args.server);
    let (ws_stream, _) = connect_async(args.server.as_str()).await?;
    let (mut writer, mut reader) = ws_stream.split();

    // Wait for our identity before doing anything else
    let (id, mut x, mut y) = loop {
        match reader.next().await {
            Some(Ok(Message::Text(text))) => match ServerPacket::decode(&text) {
                Ok(ServerPacket::Welcome { id, x, y, hp }) => {
                    info!("Joined as {} at ({}, {}) with {} hp", id, x, y, hp);
                    break (id, x, y);
                }
                Ok(ServerPacket::Rejected { reason }) => {
                    warn!("Server refused connection: {}", reason);
                    return Ok(());
                }
                Ok(other) => info!("Before welcome: {:?}", other),
                Err(e) => warn!("Undecodable frame: {}", e),
            },
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
            None => return Err("server closed the connection".into()),
        }
    };

    let mut ticker = interval(Duration::from_millis(args.interval_ms));
    for round in 0..args.rounds {
        ticker.tick().await;

        let angle = round as f32 / 4.0;
        x += angle.cos() * 10.0;
        y += angle.sin() * 10.0;
        send(&mut writer, &move_packet(&id, x, y)).await?;
        send(&mut writer, &attack_packet(&id)).await?;

        // Print whatever arrived in the meantime
        while let Ok(Some(frame)) = tokio::time::timeout(Duration::from_millis(20), reader.next()).await {
            match frame {
                Ok(Message::Text(text)) => report(&text),
                Ok(_) => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    info!("Bot finished, disconnecting");
    writer.send(Message::Close(None)).await?;
    sleep(Duration::from_millis(100)).await;
    Ok(())
}

fn move_packet(id: &PlayerId, x: f32, y: f32) -> ClientPacket {
    ClientPacket::Move {
        id: Some(id.clone()),
        x,
        y,
    }
}

fn attack_packet(id: &PlayerId) -> ClientPacket {
    ClientPacket::Attack {
        id: Some(id.clone()),
        target: MONSTER_TARGET.to_string(),
        x: None,
        y: None,
    }
}

async fn send<S>(writer: &mut S, packet: &ClientPacket) -> Result<(), Box<dyn std::error::Error>>
where
    S: SinkExt<Message> + Unpin,
    S::Error: std::error::Error + 'static,
{
    writer.send(Message::Text(packet.encode()?)).await?;
    Ok(())
}

fn report(text: &str) {
    match ServerPacket::decode(text) {
        Ok(ServerPacket::Update { players }) => info!("{} players online", players.len()),
        Ok(ServerPacket::UpdateMonsterHp { hp }) => info!("Monster hp: {}", hp),
        Ok(ServerPacket::MonsterDead {}) => info!("Monster defeated!"),
        Ok(ServerPacket::MonsterPosition { x, y, hp }) => {
            info!("Monster at ({:.0}, {:.0}) with {} hp", x, y, hp)
        }
        Ok(ServerPacket::Effects { effects }) => info!("{} active effects", effects.len()),
        Ok(other) => info!("{}", other.kind()),
        Err(e) => warn!("Undecodable frame: {}", e),
    }
}
