//! # Arena Server Library
//!
//! This library provides the authoritative server for the arena tag game. It
//! owns the one true [`shared::Field`], applies the control bytes clients
//! send, advances the simulation at a fixed rate and streams full snapshots
//! back to every client.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Every hit, collision, tag and respawn is decided here. Clients only
//! extrapolate between snapshots and are overwritten by the next one.
//!
//! ### Client Management
//! Handles the lifecycle of client addresses:
//! - A first datagram from an unknown address creates a player
//! - Every datagram refreshes the sender's time to live
//! - Silent clients are dropped and the player table is compacted
//!
//! ### Bots
//! The lowest player indices are driven by an autopilot that chases its
//! target, so a lone client still has someone to hunt.
//!
//! ## Architecture Design
//!
//! ### Single Owner Event Loop
//! The field is owned by one loop. Datagrams reach it over a channel from a
//! receiver task and outgoing datagrams leave through a sender task, so a
//! control byte is always applied between ticks and never during one.
//!
//! ### UDP-Based Communication
//! Snapshots are full restatements of the game, so a lost datagram is
//! healed by the next one and no acknowledgements are needed.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Address to player index mapping and tick-based timeouts.
//!
//! ### Network Module (`network`)
//! Socket tasks, the tick loop and snapshot broadcasting.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         addr: "0.0.0.0:8080".to_string(),
//!         ..ServerConfig::default()
//!     };
//!     let mut server = Server::new(config).await?;
//!
//!     // Runs until the process is stopped:
//!     // - answers handshake probes with the caller's index and a snapshot
//!     // - steers players from control bytes
//!     // - ticks the field and broadcasts every few ticks
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod network;
