//! Facts emitted by the tracker and the sink interface that receives them
//!
//! The tracker never records which group a player is in. It emits transition
//! intents and leaves idempotent application to the consumer.

use log::error;
use shared::{MapId, Pose};
use tokio::sync::mpsc;

/// Spatial-audio partition a player belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomGroup {
    Main,
    Muted,
    Spectator,
}

/// Settings relayed from the host's options sync.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettingsUpdate {
    pub crewmate_vision: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    MapChanged(MapId),
    HostChanged(String),
    PlayerPose { name: String, pose: Pose },
    AllPlayersPose(Pose),
    SettingsUpdated(SettingsUpdate),
    PlayerJoinedGroup { name: String, group: RoomGroup },
    AllPlayersJoinedGroup(RoomGroup),
    /// Everyone currently in `from` moves to `to`.
    PlayersMovedBetweenGroups { from: RoomGroup, to: RoomGroup },
    Error(String),
}

/// Consumer of emitted facts.
pub trait OutputSink {
    fn emit(&mut self, event: SinkEvent);
}

impl OutputSink for Vec<SinkEvent> {
    fn emit(&mut self, event: SinkEvent) {
        self.push(event);
    }
}

impl OutputSink for mpsc::UnboundedSender<SinkEvent> {
    fn emit(&mut self, event: SinkEvent) {
        if let Err(e) = self.send(event) {
            error!("Sink receiver dropped, discarding {:?}", e.0);
        }
    }
}
