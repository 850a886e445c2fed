//! # Arena Client Library
//!
//! Client side of the arena tag game. The client keeps a replica of the
//! server's [`shared::Field`], predicts its own player between snapshots and
//! sends one control byte per tick.
//!
//! ## Connection Lifecycle
//!
//! 1. A single probe byte asks the server for a player slot
//! 2. The reply carries the client's player index and a full snapshot
//! 3. Every later snapshot overwrites the replica
//! 4. After a second of silence the client stalls prediction and probes
//!    again until the server answers
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The replica, its connection state and prediction.
//!
//! ### Input Module (`input`)
//! Input sources and control byte pacing. The headless client ships with
//! the same autopilot the server uses for its bots.
//!
//! ### Network Module (`network`)
//! The UDP session loop: receive, predict, send, probe.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::input::Autopilot;
//! use client::network::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("127.0.0.1:8080".parse()?);
//!     let mut client = Client::new(config, Autopilot::new()).await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
