//! Room-group decisions for game phase changes and sabotage

use crate::sink::{RoomGroup, SinkEvent};

/// A fact that may move players between room groups.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicySignal {
    GameStarted,
    GameEnded,
    CommsSabotaged(bool),
    /// A player was voted out or killed.
    PlayerEliminated(String),
}

/// Maps a signal to the group transitions the consumer should apply.
pub fn decide(signal: PolicySignal) -> Vec<SinkEvent> {
    match signal {
        PolicySignal::GameStarted => vec![SinkEvent::AllPlayersJoinedGroup(RoomGroup::Main)],
        PolicySignal::GameEnded => vec![SinkEvent::AllPlayersJoinedGroup(RoomGroup::Spectator)],
        PolicySignal::CommsSabotaged(true) => vec![SinkEvent::PlayersMovedBetweenGroups {
            from: RoomGroup::Main,
            to: RoomGroup::Muted,
        }],
        PolicySignal::CommsSabotaged(false) => vec![SinkEvent::PlayersMovedBetweenGroups {
            from: RoomGroup::Muted,
            to: RoomGroup::Main,
        }],
        PolicySignal::PlayerEliminated(name) => vec![SinkEvent::PlayerJoinedGroup {
            name,
            group: RoomGroup::Spectator,
        }],
    }
}
