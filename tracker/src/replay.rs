//! Recorded-session playback through the tracker
//!
//! A recording is a bincode file holding the transport's roster snapshot and
//! the decoded packets of one session in arrival order. Replaying it drives
//! the same controller code a live transport would.

use crate::error::{ConnectError, JoinError};
use crate::transport::{GameSnapshot, JoinOptions, SessionTransport};
use log::debug;
use serde::{Deserialize, Serialize};
use shared::Packet;
use std::collections::VecDeque;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub snapshot: GameSnapshot,
    pub packets: Vec<Packet>,
}

impl Recording {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(&bytes)?)
    }
}

/// Transport that accepts every connect and join and yields recorded packets.
#[derive(Debug)]
pub struct ReplayTransport {
    snapshot: GameSnapshot,
    packets: VecDeque<Packet>,
    connects: usize,
}

impl ReplayTransport {
    pub fn new(recording: Recording) -> Self {
        Self {
            snapshot: recording.snapshot,
            packets: recording.packets.into(),
            connects: 0,
        }
    }

    pub fn connects(&self) -> usize {
        self.connects
    }

    pub fn remaining(&self) -> usize {
        self.packets.len()
    }
}

impl SessionTransport for ReplayTransport {
    async fn connect(&mut self, host: &str, port: u16, _token: &str) -> Result<(), ConnectError> {
        self.connects += 1;
        debug!("Replay connect #{} to {}:{}", self.connects, host, port);
        Ok(())
    }

    async fn join(&mut self, code: &str, options: JoinOptions) -> Result<(), JoinError> {
        debug!("Replay join {} (spawn: {})", code, options.do_spawn);
        Ok(())
    }

    async fn disconnect(&mut self) {}

    fn snapshot(&self) -> GameSnapshot {
        self.snapshot.clone()
    }

    async fn next_packet(&mut self) -> Option<Packet> {
        self.packets.pop_front()
    }
}
