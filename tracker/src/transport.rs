//! Interface to the protocol-session collaborator that owns the connection
//!
//! Implementations handle framing, encryption and server selection. The
//! tracker only sequences connect/join/disconnect calls and consumes the
//! decoded packet stream.

use crate::error::{ConnectError, JoinError};
use serde::{Deserialize, Serialize};
use shared::{MapId, Packet};
use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOptions {
    /// When false the local client joins without a player object, invisible to others.
    pub do_spawn: bool,
}

/// A remote client as known to the transport's own roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteClient {
    pub id: u32,
    pub name: String,
    pub control_net_id: Option<u32>,
    pub player_id: Option<u8>,
    pub transform_net_id: Option<u32>,
}

/// The transport's view of the joined game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub local_client_id: u32,
    pub host_id: u32,
    pub map: MapId,
    pub clients: Vec<RemoteClient>,
}

impl GameSnapshot {
    pub fn client(&self, id: u32) -> Option<&RemoteClient> {
        self.clients.iter().find(|client| client.id == id)
    }

    pub fn host_name(&self) -> Option<&str> {
        self.client(self.host_id)
            .map(|client| client.name.as_str())
            .filter(|name| !name.is_empty())
    }
}

pub trait SessionTransport {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        token: &str,
    ) -> impl Future<Output = Result<(), ConnectError>> + Send;

    /// Resolves once the server acknowledges the join.
    fn join(
        &mut self,
        code: &str,
        options: JoinOptions,
    ) -> impl Future<Output = Result<(), JoinError>> + Send;

    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;

    fn snapshot(&self) -> GameSnapshot;

    /// Next decoded packet, or `None` once the session is closed.
    ///
    /// Must be cancel-safe: the controller drops this future whenever a
    /// deferred action becomes due.
    fn next_packet(&mut self) -> impl Future<Output = Option<Packet>> + Send;
}
