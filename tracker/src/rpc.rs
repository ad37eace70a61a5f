//! Remote-action handling for the game-data router

use crate::policy::PolicySignal;
use crate::router::{apply_signal, display_name, DeferredKind, GameDataRouter};
use crate::sink::{OutputSink, SettingsUpdate, SinkEvent};
use log::{debug, info, warn};
use shared::codec::decode_position;
use shared::{Rpc, NO_PLAYER};

impl GameDataRouter {
    /// Applies an RPC invoked on the object `net_id`.
    pub(crate) fn handle_rpc<S: OutputSink>(&mut self, net_id: u32, rpc: &Rpc, sink: &mut S) {
        match rpc {
            Rpc::SyncSettings { options } => {
                sink.emit(SinkEvent::SettingsUpdated(SettingsUpdate {
                    crewmate_vision: options.crewmate_vision,
                }));
                if options.map != self.systems.map {
                    info!("Map changed to {}", options.map.name());
                    self.systems.map = options.map;
                    sink.emit(SinkEvent::MapChanged(options.map));
                }
            }
            Rpc::StartMeeting { .. } => self.schedule(DeferredKind::SnapAllToOrigin),
            Rpc::VotingComplete {
                exiled_player_id, ..
            } => {
                if *exiled_player_id != NO_PLAYER {
                    self.schedule(DeferredKind::Exile {
                        player_id: *exiled_player_id,
                    });
                }
            }
            Rpc::MurderPlayer { victim_net_id } => {
                match self
                    .registry
                    .find_by_control_net_id(*victim_net_id)
                    .and_then(display_name)
                {
                    Some(name) => apply_signal(sink, PolicySignal::PlayerEliminated(name)),
                    None => debug!("Murder of unknown player object {}", victim_net_id),
                }
            }
            Rpc::SetName { name } => self.registry.upsert_by_name(net_id, name),
            Rpc::UpdateGameData { players } => {
                for player in players {
                    self.registry.upsert_by_player_id(player.player_id, &player.name);
                }
            }
            Rpc::SnapTo { position } => {
                let Some(name) = self
                    .registry
                    .find_by_transform_net_id(net_id)
                    .and_then(display_name)
                else {
                    return;
                };
                match decode_position(position) {
                    Ok(pose) => sink.emit(SinkEvent::PlayerPose { name, pose }),
                    Err(e) => warn!("Dropping teleport for {}: {}", name, e),
                }
            }
            Rpc::Unknown { tag } => debug!("Ignoring rpc {} on {}", tag, net_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::router::tests::{live_router, player_spawn};
    use crate::router::{DeferredAction, DeferredKind};
    use crate::sink::{RoomGroup, SettingsUpdate, SinkEvent};
    use assert_approx_eq::assert_approx_eq;
    use shared::{GameDataMessage, GameOptions, MapId, PlayerInfo, Pose, Rpc, NO_PLAYER};
    use std::time::Duration;

    fn rpc(net_id: u32, rpc: Rpc) -> GameDataMessage {
        GameDataMessage::Rpc { net_id, rpc }
    }

    #[tokio::test]
    async fn test_sync_settings() {
        let (mut router, _rx) = live_router();
        let mut sink = Vec::new();

        let options = GameOptions {
            crewmate_vision: 0.75,
            ..GameOptions::default()
        };
        router.route(&rpc(1, Rpc::SyncSettings { options }), &mut sink);

        assert_eq!(
            sink,
            vec![SinkEvent::SettingsUpdated(SettingsUpdate {
                crewmate_vision: 0.75
            })]
        );
    }

    #[tokio::test]
    async fn test_sync_settings_map_change() {
        let (mut router, _rx) = live_router();
        let mut sink = Vec::new();

        let options = GameOptions {
            map: MapId::MiraHq,
            ..GameOptions::default()
        };
        router.route(&rpc(1, Rpc::SyncSettings { options }), &mut sink);

        assert_eq!(router.systems().map, MapId::MiraHq);
        assert_eq!(sink.last(), Some(&SinkEvent::MapChanged(MapId::MiraHq)));
    }

    #[tokio::test]
    async fn test_set_name_then_murder() {
        let (mut router, _rx) = live_router();
        let mut sink = Vec::new();

        router.route(&player_spawn(3, 0, 10, 12), &mut sink);
        router.route(
            &rpc(
                10,
                Rpc::SetName {
                    name: "Orange".to_string(),
                },
            ),
            &mut sink,
        );
        router.route(&rpc(20, Rpc::MurderPlayer { victim_net_id: 10 }), &mut sink);

        assert_eq!(router.registry().len(), 1);
        assert_eq!(
            sink,
            vec![SinkEvent::PlayerJoinedGroup {
                name: "Orange".to_string(),
                group: RoomGroup::Spectator
            }]
        );
    }

    #[tokio::test]
    async fn test_murder_of_unknown_player_is_ignored() {
        let (mut router, _rx) = live_router();
        let mut sink = Vec::new();

        router.route(&rpc(20, Rpc::MurderPlayer { victim_net_id: 77 }), &mut sink);

        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_update_game_data_names_spawned_players() {
        let (mut router, _rx) = live_router();
        let mut sink = Vec::new();

        router.route(&player_spawn(3, 0, 10, 12), &mut sink);
        router.route(
            &rpc(
                5,
                Rpc::UpdateGameData {
                    players: vec![
                        PlayerInfo {
                            player_id: 0,
                            name: "Black".to_string(),
                        },
                        PlayerInfo {
                            player_id: 1,
                            name: "White".to_string(),
                        },
                    ],
                },
            ),
            &mut sink,
        );

        assert_eq!(router.registry().len(), 2);
        assert_eq!(
            router.registry().find_by_control_net_id(10).unwrap().name,
            "Black"
        );
        assert_eq!(router.registry().find_by_player_id(1).unwrap().name, "White");
    }

    #[tokio::test]
    async fn test_snap_to_emits_pose() {
        let (mut router, _rx) = live_router();
        let mut sink = Vec::new();

        router.route(&player_spawn(3, 0, 10, 12), &mut sink);
        router.route(
            &rpc(
                10,
                Rpc::SetName {
                    name: "Brown".to_string(),
                },
            ),
            &mut sink,
        );
        router.route(
            &rpc(
                12,
                Rpc::SnapTo {
                    position: vec![0x00, 0x00, 0xFF, 0xFF],
                },
            ),
            &mut sink,
        );

        let Some(SinkEvent::PlayerPose { name, pose }) = sink.first() else {
            panic!("Expected a pose, got {:?}", sink);
        };
        assert_eq!(name, "Brown");
        assert_approx_eq!(pose.x, -40.0, 1e-4);
        assert_approx_eq!(pose.y, 40.0, 1e-4);
    }

    #[tokio::test]
    async fn test_unknown_rpc_is_ignored() {
        let (mut router, _rx) = live_router();
        let mut sink = Vec::new();

        router.route(&rpc(10, Rpc::Unknown { tag: 99 }), &mut sink);

        assert!(sink.is_empty());
        assert!(router.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_meeting_snaps_after_delay() {
        let (mut router, mut rx) = live_router();
        let mut sink = Vec::new();

        router.route(&rpc(10, Rpc::StartMeeting { reporter_id: 0 }), &mut sink);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(rx.try_recv().is_err());

        let action = rx.recv().await.unwrap();
        assert_eq!(action.kind, DeferredKind::SnapAllToOrigin);

        router.fire(action, &mut sink);
        assert_eq!(sink, vec![SinkEvent::AllPlayersPose(Pose::ORIGIN)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exile_after_delay() {
        let (mut router, mut rx) = live_router();
        let mut sink = Vec::new();

        router.route(&player_spawn(3, 2, 10, 12), &mut sink);
        router.route(
            &rpc(
                10,
                Rpc::SetName {
                    name: "Purple".to_string(),
                },
            ),
            &mut sink,
        );
        router.route(
            &rpc(
                40,
                Rpc::VotingComplete {
                    exiled_player_id: 2,
                    tie: false,
                },
            ),
            &mut sink,
        );
        assert!(sink.is_empty());

        let action = rx.recv().await.unwrap();
        router.fire(action, &mut sink);

        assert_eq!(
            sink,
            vec![SinkEvent::PlayerJoinedGroup {
                name: "Purple".to_string(),
                group: RoomGroup::Spectator
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipped_vote_schedules_nothing() {
        let (mut router, mut rx) = live_router();
        let mut sink = Vec::new();

        router.route(
            &rpc(
                40,
                Rpc::VotingComplete {
                    exiled_player_id: NO_PLAYER,
                    tie: true,
                },
            ),
            &mut sink,
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_action_after_reset_is_noop() {
        let (mut router, _rx) = live_router();
        let mut sink = Vec::new();
        router.route(&player_spawn(3, 2, 10, 12), &mut sink);
        router.registry.upsert_by_name(10, "Gray");

        let action = DeferredAction {
            epoch: router.epoch(),
            kind: DeferredKind::Exile { player_id: 2 },
        };
        router.reset();
        router.fire(action, &mut sink);
        router.fire(
            DeferredAction {
                epoch: 0,
                kind: DeferredKind::SnapAllToOrigin,
            },
            &mut sink,
        );

        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_exile_of_removed_player_is_noop() {
        let (mut router, _rx) = live_router();
        let mut sink = Vec::new();
        router.route(&player_spawn(3, 2, 10, 12), &mut sink);
        router.registry.upsert_by_name(10, "Gray");
        router.registry.remove(3);

        router.fire(
            DeferredAction {
                epoch: router.epoch(),
                kind: DeferredKind::Exile { player_id: 2 },
            },
            &mut sink,
        );

        assert!(sink.is_empty());
    }
}
