//! # Arena Session Server Library
//!
//! This library provides the authoritative server for a small real-time
//! multiplayer arena. Players connect over WebSockets, walk around, and attack
//! a single roaming monster or each other. The server owns the only true copy
//! of the world and keeps every client converged on it by rebroadcasting
//! state after each change and on a steady cadence.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! Player positions and health, the monster, and short-lived combat effects
//! live in one owned aggregate ([`game::GameState`]). Clients send intents
//! (`move`, `attack`) and render whatever the server broadcasts back.
//!
//! ### Session Lifecycle
//! Each connection is bound to exactly one randomly issued player identity:
//! - Joining spawns a player at full health and replies with `welcome`
//! - Leaving removes the player and announces the new membership
//! - Connections that stop accepting writes are torn down the same way
//!
//! ### Combat
//! Attacks apply a fixed amount of damage with health clamped to
//! `[0, max_hp]`. A player at zero health is removed from the world. The
//! monster is depleted instead and respawns at a fresh position after a delay.
//!
//! ### Autonomous Loops
//! Two independent periodic loops drift the monster and sweep expired
//! effects, each followed by a broadcast.
//!
//! ## Architecture Design
//!
//! ### Single Event Loop
//! All state mutation happens on the task running [`network::Server::run`].
//! Session tasks, the accept loop and respawn timers communicate with it
//! exclusively through messages, so no locks guard the world, the effect log
//! or the connection registry.
//!
//! ### WebSocket Transport
//! Every client message and server notice is a single JSON text frame tagged
//! by a `type` field. Unknown message kinds are ignored for forward
//! compatibility; malformed frames are dropped without reply.
//!
//! ## Module Organization
//!
//! - `config`: server and simulation settings
//! - `world`: player and monster records
//! - `effects`: combat effects with time-based expiry
//! - `client_manager`: connection registry and identity issuance
//! - `router`: inbound message decoding and dispatch
//! - `combat`: damage application, death and depletion
//! - `scheduler`: the drift and sweep loops
//! - `broadcast`: fan-out with connection-level fault handling
//! - `network`: WebSocket sessions and the event loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::bind(ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod client_manager;
pub mod combat;
pub mod config;
pub mod effects;
pub mod entity;
pub mod game;
pub mod network;
pub mod router;
pub mod scheduler;
pub mod utils;
pub mod world;
