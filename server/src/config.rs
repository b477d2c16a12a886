//! Server and simulation settings.
//!
//! The binary builds these from command-line flags and environment variables;
//! tests construct them directly through `Default` and struct update syntax.

use shared::{MAX_HP, SPAWN_X, SPAWN_Y, WORLD_HEIGHT, WORLD_WIDTH};
use std::time::Duration;

/// Settings that shape the simulated world and its timers.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Period of the monster drift loop
    pub drift_interval: Duration,
    /// Period of the effect sweep loop
    pub sweep_interval: Duration,
    /// Age after which an effect is discarded
    pub effect_ttl: Duration,
    /// Delay between monster depletion and respawn
    pub respawn_delay: Duration,
    /// Health removed by a single attack
    pub attack_damage: u32,
    /// Upper bound of every entity's health
    pub max_hp: u32,
    /// Largest per-axis offset applied to the monster on each drift tick
    pub monster_drift: f32,
    pub world_width: f32,
    pub world_height: f32,
    pub spawn: (f32, f32),
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            drift_interval: Duration::from_millis(1000),
            sweep_interval: Duration::from_millis(1000),
            effect_ttl: Duration::from_millis(1000),
            respawn_delay: Duration::from_millis(5000),
            attack_damage: 10,
            max_hp: MAX_HP,
            monster_drift: 20.0,
            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,
            spawn: (SPAWN_X, SPAWN_Y),
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.drift_interval.is_zero() || self.sweep_interval.is_zero() {
            return Err("tick intervals must be at least 1ms".to_string());
        }
        if self.max_hp == 0 {
            return Err("max hp must be at least 1".to_string());
        }
        if !(self.world_width > 0.0 && self.world_height > 0.0) {
            return Err("world bounds must be positive".to_string());
        }
        if !self.monster_drift.is_finite() || self.monster_drift < 0.0 {
            return Err("monster drift must be a non-negative number".to_string());
        }
        Ok(())
    }

    pub fn effect_ttl_ms(&self) -> u64 {
        self.effect_ttl.as_millis().min(u64::MAX as u128) as u64
    }
}

/// Network-facing settings plus the simulation settings they host.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum number of concurrently connected clients
    pub max_players: usize,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_players: 64,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_players == 0 {
            return Err("max players must be at least 1".to_string());
        }
        self.game.validate()
    }
}
