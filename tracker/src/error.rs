//! Error taxonomy for the session lifecycle

use std::time::Duration;
use thiserror::Error;

/// Failure to open a connection to the game server.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("server unreachable: {0}")]
    Unreachable(String),
    #[error("server is full")]
    ServerFull,
}

/// Failure to enter a game once connected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("game {0} not found")]
    GameNotFound(String),
    #[error("game is full")]
    GameFull,
    #[error("game has already started")]
    GameStarted,
    #[error("join rejected: {0}")]
    Rejected(String),
}

/// Fatal conditions reported by
/// [`SessionController::run`](crate::lifecycle::SessionController::run).
///
/// None of these are retried here; the owner of the controller decides whether
/// to build a new one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("connect failed: {0}")]
    Connect(#[from] ConnectError),
    #[error("join failed: {0}")]
    Join(#[from] JoinError),
    #[error("only {observed} of {expected} players spawned within {waited:?}")]
    SpawnTimeout {
        waited: Duration,
        observed: usize,
        expected: usize,
    },
    #[error("session closed before all players spawned")]
    SessionClosed,
}
