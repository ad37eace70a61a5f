//! Protocol records shared between the session tracker and its transport.
//!
//! The transport decodes packets off the wire into these typed records before
//! handing them to the tracker. Only the state-sync buffers (`Data` messages,
//! spawn component payloads and `SnapTo` positions) stay as raw bytes; they are
//! interpreted by [`codec`] because their layout depends on tracker state.

use serde::{Deserialize, Serialize};

pub mod codec;

/// Player ordinal reserved for "no player" (e.g. a skipped vote).
pub const NO_PLAYER: u8 = 0xFF;

/// Bit index of the communications system in a ship-systems dirty mask.
pub const COMMS_SYSTEM_BIT: u32 = 14;

/// A packet delivered by the transport: one or more payloads in arrival order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Packet {
    pub payloads: Vec<Payload>,
}

impl Packet {
    pub fn new(payloads: Vec<Payload>) -> Self {
        Self { payloads }
    }

    pub fn single(payload: Payload) -> Self {
        Self {
            payloads: vec![payload],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Payload {
    /// Another client joined the game we are in.
    JoinGame {
        client_id: u32,
        host_id: u32,
    },
    StartGame,
    EndGame {
        reason: u8,
    },
    /// A client left; `host_id` is the host after the removal.
    RemovePlayer {
        client_id: u32,
        host_id: u32,
    },
    GameData {
        messages: Vec<GameDataMessage>,
    },
    GameDataTo {
        recipient: u32,
        messages: Vec<GameDataMessage>,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum GameDataMessage {
    Spawn {
        spawn_type: SpawnType,
        owner_id: u32,
        components: Vec<SpawnComponent>,
    },
    Rpc {
        net_id: u32,
        rpc: Rpc,
    },
    Data {
        net_id: u32,
        data: Vec<u8>,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpawnComponent {
    pub net_id: u32,
    pub data: Vec<u8>,
}

/// Prefab kinds carried by a spawn message.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpawnType {
    ShipStatus,
    MeetingHud,
    LobbyBehaviour,
    GameData,
    Player,
    HeadQuarters,
    PlanetMap,
    AprilShipStatus,
    Other(u8),
}

impl SpawnType {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0 => SpawnType::ShipStatus,
            1 => SpawnType::MeetingHud,
            2 => SpawnType::LobbyBehaviour,
            3 => SpawnType::GameData,
            4 => SpawnType::Player,
            5 => SpawnType::HeadQuarters,
            6 => SpawnType::PlanetMap,
            7 => SpawnType::AprilShipStatus,
            other => SpawnType::Other(other),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            SpawnType::ShipStatus => 0,
            SpawnType::MeetingHud => 1,
            SpawnType::LobbyBehaviour => 2,
            SpawnType::GameData => 3,
            SpawnType::Player => 4,
            SpawnType::HeadQuarters => 5,
            SpawnType::PlanetMap => 6,
            SpawnType::AprilShipStatus => 7,
            SpawnType::Other(tag) => tag,
        }
    }
}

/// Remote actions invoked on a replicated object.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Rpc {
    SyncSettings { options: GameOptions },
    SetName { name: String },
    MurderPlayer { victim_net_id: u32 },
    StartMeeting { reporter_id: u8 },
    /// Raw position bytes, two fixed-point `u16` values.
    SnapTo { position: Vec<u8> },
    VotingComplete { exiled_player_id: u8, tie: bool },
    UpdateGameData { players: Vec<PlayerInfo> },
    Unknown { tag: u8 },
}

/// Kind of an [`Rpc`], with its wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcKind {
    SyncSettings,
    SetName,
    MurderPlayer,
    StartMeeting,
    SnapTo,
    VotingComplete,
    UpdateGameData,
}

impl RpcKind {
    pub const ALL: [RpcKind; 7] = [
        RpcKind::SyncSettings,
        RpcKind::SetName,
        RpcKind::MurderPlayer,
        RpcKind::StartMeeting,
        RpcKind::SnapTo,
        RpcKind::VotingComplete,
        RpcKind::UpdateGameData,
    ];

    pub fn tag(self) -> u8 {
        match self {
            RpcKind::SyncSettings => 2,
            RpcKind::SetName => 6,
            RpcKind::MurderPlayer => 12,
            RpcKind::StartMeeting => 14,
            RpcKind::SnapTo => 21,
            RpcKind::VotingComplete => 23,
            RpcKind::UpdateGameData => 30,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl Rpc {
    /// `None` for RPCs the tracker does not understand.
    pub fn kind(&self) -> Option<RpcKind> {
        match self {
            Rpc::SyncSettings { .. } => Some(RpcKind::SyncSettings),
            Rpc::SetName { .. } => Some(RpcKind::SetName),
            Rpc::MurderPlayer { .. } => Some(RpcKind::MurderPlayer),
            Rpc::StartMeeting { .. } => Some(RpcKind::StartMeeting),
            Rpc::SnapTo { .. } => Some(RpcKind::SnapTo),
            Rpc::VotingComplete { .. } => Some(RpcKind::VotingComplete),
            Rpc::UpdateGameData { .. } => Some(RpcKind::UpdateGameData),
            Rpc::Unknown { .. } => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapId {
    Skeld,
    MiraHq,
    Polus,
}

impl MapId {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(MapId::Skeld),
            1 => Some(MapId::MiraHq),
            2 => Some(MapId::Polus),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MapId::Skeld => "The Skeld",
            MapId::MiraHq => "MIRA HQ",
            MapId::Polus => "Polus",
        }
    }
}

/// Lobby settings as broadcast by the host.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameOptions {
    pub map: MapId,
    pub max_players: u8,
    pub impostor_count: u8,
    pub player_speed: f32,
    pub crewmate_vision: f32,
    pub impostor_vision: f32,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            map: MapId::Skeld,
            max_players: 10,
            impostor_count: 1,
            player_speed: 1.0,
            crewmate_vision: 1.0,
            impostor_vision: 1.5,
        }
    }
}

/// One roster entry of a bulk game-data update.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerInfo {
    pub player_id: u8,
    pub name: String,
}

/// A decoded world position.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
}

impl Pose {
    pub const ORIGIN: Pose = Pose { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}
