//! # Room-Group Tracker
//!
//! This library follows a live game session from the outside and decides which
//! spatial-audio group each player belongs to. It consumes the decoded packet
//! stream of a protocol-session transport, keeps a roster of players, and emits
//! facts (host, map, poses, settings, group transitions) to an output sink.
//!
//! ## Architecture Overview
//!
//! Data flows one way: transport packets enter the lifecycle controller, which
//! hands game-data messages to the router; the router mutates the player
//! registry and asks the room-group policy for transitions; everything the
//! consumer needs leaves through the sink.
//!
//! ### Session Lifecycle (`lifecycle`)
//! Connects, joins visibly, waits for every player to spawn (racing a
//! timeout), then reconnects invisibly and routes packets in steady state.
//! Round ends and host reassignment trigger another invisible rejoin with a
//! fresh roster.
//!
//! ### Game-Data Router (`router`, `rpc`)
//! Classifies spawn, RPC and state-sync messages. Movement updates become
//! poses, ship-systems updates are checked for a communications sabotage, and
//! meeting and exile effects are deferred by a fixed delay.
//!
//! ### Player Registry (`registry`)
//! One record per player, reachable through any of its client id, player id,
//! control net id or transform net id.
//!
//! ### Room-Group Policy (`policy`)
//! Pure mapping from game events to group transitions. It never tracks who is
//! in which group; the consumer applies transitions idempotently.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use tracker::config::EngineConfig;
//! use tracker::lifecycle::SessionController;
//!
//! let (sink_tx, mut sink_rx) = tokio::sync::mpsc::unbounded_channel();
//! let config = EngineConfig::new("203.0.113.5", "ABCDEF");
//! let mut controller = SessionController::new(config, transport, sink_tx);
//!
//! tokio::spawn(async move {
//!     while let Some(event) = sink_rx.recv().await {
//!         audio.apply(event);
//!     }
//! });
//!
//! controller.run().await?;
//! ```
//!
//! The transport owns connection retries. A failed controller reports one
//! `SinkEvent::Error` and is then discarded by its owner.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod policy;
pub mod registry;
pub mod replay;
pub mod router;
mod rpc;
pub mod sink;
pub mod transport;
