//! Dispatch of game-data messages to the registry, the room-group policy and the sink
//!
//! References to network ids or players the router has not seen are ignored:
//! spawn and data messages race each other, so partial knowledge is normal.
//! Undecodable buffers are logged and the single update is dropped.

use crate::policy::{self, PolicySignal};
use crate::registry::{PlayerRecord, PlayerRegistry};
use crate::sink::{OutputSink, SinkEvent};
use crate::transport::RemoteClient;
use log::{debug, info, warn};
use shared::codec::{
    decode_comms_sabotage, decode_pose, decode_systems_mask, DecodeError, Reader,
};
use shared::{GameDataMessage, MapId, Pose, SpawnComponent, SpawnType, COMMS_SYSTEM_BIT};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// The current map and the network id of its systems object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipSystemsState {
    /// `None` until the ship status object spawns.
    pub net_id: Option<u32>,
    pub map: MapId,
}

impl Default for ShipSystemsState {
    fn default() -> Self {
        Self {
            net_id: None,
            map: MapId::Skeld,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredKind {
    /// Meeting started: every player is shown at the origin.
    SnapAllToOrigin,
    /// Vote result: the exiled player spectates.
    Exile { player_id: u8 },
}

/// An effect scheduled to run after the action delay.
///
/// Carries the registry epoch it was scheduled in and is dropped if the
/// registry has been reset since.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredAction {
    pub epoch: u64,
    pub kind: DeferredKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("player spawn has {0} components, expected 3")]
    MissingComponents(usize),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Identifiers carried by a player spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSpawn {
    pub owner_id: u32,
    pub player_id: u8,
    pub control_net_id: u32,
    pub transform_net_id: u32,
}

/// Reads a player spawn's control, physics and transform components.
///
/// The control payload starts with an "is new" flag before the player ordinal.
pub fn parse_player_spawn(
    owner_id: u32,
    components: &[SpawnComponent],
) -> Result<PlayerSpawn, SpawnError> {
    let [control, _physics, transform, ..] = components else {
        return Err(SpawnError::MissingComponents(components.len()));
    };

    let mut reader = Reader::new(&control.data);
    let _is_new = reader.read_bool()?;
    let player_id = reader.read_u8()?;

    Ok(PlayerSpawn {
        owner_id,
        player_id,
        control_net_id: control.net_id,
        transform_net_id: transform.net_id,
    })
}

pub(crate) fn display_name(record: &PlayerRecord) -> Option<String> {
    if record.name.is_empty() {
        None
    } else {
        Some(record.name.clone())
    }
}

pub(crate) fn apply_signal<S: OutputSink>(sink: &mut S, signal: PolicySignal) {
    for event in policy::decide(signal) {
        sink.emit(event);
    }
}

/// Owns the per-session roster and ship state and applies game-data messages to them.
pub struct GameDataRouter {
    pub(crate) registry: PlayerRegistry,
    pub(crate) systems: ShipSystemsState,
    spawns_live: bool,
    epoch: u64,
    action_delay: Duration,
    deferred_tx: mpsc::UnboundedSender<DeferredAction>,
}

impl GameDataRouter {
    /// Returns the router and the channel its deferred actions arrive on once due.
    pub fn new(action_delay: Duration) -> (Self, mpsc::UnboundedReceiver<DeferredAction>) {
        let (deferred_tx, deferred_rx) = mpsc::unbounded_channel();
        let router = Self {
            registry: PlayerRegistry::new(),
            systems: ShipSystemsState::default(),
            spawns_live: false,
            epoch: 0,
            action_delay,
            deferred_tx,
        };
        (router, deferred_rx)
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn systems(&self) -> ShipSystemsState {
        self.systems
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn set_map(&mut self, map: MapId) {
        self.systems.map = map;
    }

    /// Player spawns only upsert the registry once initial loading is over.
    pub fn set_spawns_live(&mut self, live: bool) {
        self.spawns_live = live;
    }

    pub fn bulk_load(&mut self, clients: &[RemoteClient]) {
        self.registry.bulk_load(clients);
    }

    /// Clears the roster and ship state; pending deferred actions become stale.
    pub fn reset(&mut self) {
        self.registry.reset_all();
        self.systems.net_id = None;
        self.spawns_live = false;
        self.epoch += 1;
        debug!("Router reset, epoch {}", self.epoch);
    }

    pub fn route<S: OutputSink>(&mut self, message: &GameDataMessage, sink: &mut S) {
        match message {
            GameDataMessage::Spawn {
                spawn_type,
                owner_id,
                components,
            } => self.handle_spawn(*spawn_type, *owner_id, components),
            GameDataMessage::Rpc { net_id, rpc } => self.handle_rpc(*net_id, rpc, sink),
            GameDataMessage::Data { net_id, data } => self.handle_data(*net_id, data, sink),
        }
    }

    fn handle_spawn(
        &mut self,
        spawn_type: SpawnType,
        owner_id: u32,
        components: &[SpawnComponent],
    ) {
        match spawn_type {
            SpawnType::Player => {
                if !self.spawns_live {
                    debug!("Ignoring player spawn for client {} during initial load", owner_id);
                    return;
                }
                match parse_player_spawn(owner_id, components) {
                    Ok(spawn) => self.registry.upsert_by_spawn(
                        spawn.control_net_id,
                        spawn.transform_net_id,
                        spawn.owner_id,
                        spawn.player_id,
                    ),
                    Err(e) => warn!("Skipping player spawn for client {}: {}", owner_id, e),
                }
            }
            SpawnType::ShipStatus
            | SpawnType::HeadQuarters
            | SpawnType::PlanetMap
            | SpawnType::AprilShipStatus => match components.first() {
                Some(component) => {
                    info!(
                        "Ship systems spawned as {:?} with net id {}",
                        spawn_type, component.net_id
                    );
                    self.systems.net_id = Some(component.net_id);
                }
                None => warn!("Ship status spawn without components"),
            },
            SpawnType::MeetingHud
            | SpawnType::LobbyBehaviour
            | SpawnType::GameData
            | SpawnType::Other(_) => {}
        }
    }

    fn handle_data<S: OutputSink>(&mut self, net_id: u32, data: &[u8], sink: &mut S) {
        if let Some(record) = self.registry.find_by_transform_net_id(net_id) {
            let Some(name) = display_name(record) else {
                return;
            };
            match decode_pose(data) {
                Ok(pose) => sink.emit(SinkEvent::PlayerPose { name, pose }),
                Err(e) => warn!("Dropping movement update for {}: {}", name, e),
            }
            return;
        }

        if self.systems.net_id == Some(net_id) {
            match self.decode_sabotage(data) {
                Ok(Some(sabotaged)) => {
                    debug!("Comms sabotaged: {}", sabotaged);
                    apply_signal(sink, PolicySignal::CommsSabotaged(sabotaged));
                }
                Ok(None) => {}
                Err(e) => warn!("Dropping ship systems update: {}", e),
            }
        }
    }

    /// `None` when the update does not touch communications.
    fn decode_sabotage(&self, data: &[u8]) -> Result<Option<bool>, DecodeError> {
        let (mask, offset) = decode_systems_mask(data)?;
        if mask & (1 << COMMS_SYSTEM_BIT) == 0 {
            return Ok(None);
        }
        decode_comms_sabotage(&data[offset..], self.systems.map).map(Some)
    }

    pub(crate) fn schedule(&self, kind: DeferredKind) {
        let action = DeferredAction {
            epoch: self.epoch,
            kind,
        };
        let tx = self.deferred_tx.clone();
        let delay = self.action_delay;

        tokio::spawn(async move {
            sleep(delay).await;
            if tx.send(action).is_err() {
                debug!("Controller gone, dropping {:?}", action);
            }
        });
    }

    /// Applies a due deferred action if the state it was scheduled against still exists.
    pub fn fire<S: OutputSink>(&mut self, action: DeferredAction, sink: &mut S) {
        if action.epoch != self.epoch {
            debug!("Dropping stale {:?}", action);
            return;
        }

        match action.kind {
            DeferredKind::SnapAllToOrigin => sink.emit(SinkEvent::AllPlayersPose(Pose::ORIGIN)),
            DeferredKind::Exile { player_id } => {
                match self.registry.find_by_player_id(player_id).and_then(display_name) {
                    Some(name) => apply_signal(sink, PolicySignal::PlayerEliminated(name)),
                    None => debug!("Exiled player {} is no longer known", player_id),
                }
            }
        }
    }
}
