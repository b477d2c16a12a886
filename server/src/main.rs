use clap::Parser;
use log::{error, info};
use server::config::{GameConfig, ServerConfig};
use server::network::Server;
use std::time::Duration;

/// Command line arguments; every flag can also be set through the environment
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Maximum number of concurrent players
    #[arg(long, env = "MAX_PLAYERS", default_value_t = 64,
          value_parser = clap::value_parser!(u64).range(1..))]
    max_players: u64,

    /// Monster drift period in milliseconds
    #[arg(long, env = "DRIFT_INTERVAL_MS", default_value_t = 1000,
          value_parser = clap::value_parser!(u64).range(1..))]
    drift_interval_ms: u64,

    /// Effect sweep period in milliseconds
    #[arg(long, env = "SWEEP_INTERVAL_MS", default_value_t = 1000,
          value_parser = clap::value_parser!(u64).range(1..))]
    sweep_interval_ms: u64,

    /// Lifetime of combat effects in milliseconds
    #[arg(long, env = "EFFECT_TTL_MS", default_value_t = 1000)]
    effect_ttl_ms: u64,

    /// Delay before a defeated monster respawns, in milliseconds
    #[arg(long, env = "RESPAWN_DELAY_MS", default_value_t = 5000)]
    respawn_delay_ms: u64,

    /// Health removed by each attack
    #[arg(long, env = "ATTACK_DAMAGE", default_value_t = 10)]
    attack_damage: u32,

    /// Maximum (and starting) health of every entity
    #[arg(long, env = "MAX_HP", default_value_t = shared::MAX_HP,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_hp: u32,

    /// Largest per-axis monster offset per drift tick
    #[arg(long, env = "MONSTER_DRIFT", default_value_t = 20.0)]
    monster_drift: f32,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            max_players: self.max_players as usize,
            game: GameConfig {
                drift_interval: Duration::from_millis(self.drift_interval_ms),
                sweep_interval: Duration::from_millis(self.sweep_interval_ms),
                effect_ttl: Duration::from_millis(self.effect_ttl_ms),
                respawn_delay: Duration::from_millis(self.respawn_delay_ms),
                attack_damage: self.attack_damage,
                max_hp: self.max_hp,
                monster_drift: self.monster_drift,
                ..GameConfig::default()
            },
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    info!(
        "Starting server: drift every {:?}, sweep every {:?}, effect ttl {:?}, respawn after {:?}",
        config.game.drift_interval,
        config.game.sweep_interval,
        config.game.effect_ttl,
        config.game.respawn_delay
    );

    let mut server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {}", e);
            return Err(e);
        }
    };

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server loop failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
