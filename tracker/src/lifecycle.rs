//! Session lifecycle: connect, visible join, spawn wait, invisible rejoin and steady-state routing
//!
//! ```text
//! Disconnected -> Connecting -> JoiningVisible -> AwaitingSpawn --timeout--> Failed
//!                                                      |
//!                                        all players spawned
//!                                                      v
//!                    +--------------------------> Rejoining --> Active
//!                    |                                             |
//!                    +---- game ended / local client removed ------+
//! ```
//!
//! The visible join exists only to observe every player's spawn. Once the
//! roster is loaded the controller drops the connection and rejoins without a
//! player object, so the tracker never appears in the game. A round ending or
//! the host moving to the tracker's own client repeats the invisible rejoin.
//!
//! Inbound packets are handled one at a time. While a rejoin is in flight the
//! packet stream is not polled, so nothing is routed against a half-reset
//! session.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::policy::PolicySignal;
use crate::registry::PlayerRegistry;
use crate::router::{apply_signal, display_name, DeferredAction, GameDataRouter};
use crate::sink::{OutputSink, SinkEvent};
use crate::transport::{JoinOptions, SessionTransport};
use log::{debug, error, info, trace};
use shared::{GameDataMessage, Packet, Payload, SpawnType};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    JoiningVisible,
    AwaitingSpawn,
    Active,
    Ending,
    Rejoining,
    /// A fatal error was reported; the controller ignores further input.
    Failed,
}

/// Why the controller left steady state for an invisible rejoin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejoinReason {
    RoundEnded,
    HostReassigned,
}

/// Outcome of handling one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Rejoin(RejoinReason),
}

pub struct SessionController<T, S> {
    config: EngineConfig,
    transport: T,
    sink: S,
    phase: SessionPhase,
    local_client_id: Option<u32>,
    router: GameDataRouter,
    deferred_rx: mpsc::UnboundedReceiver<DeferredAction>,
}

impl<T: SessionTransport, S: OutputSink> SessionController<T, S> {
    pub fn new(config: EngineConfig, transport: T, sink: S) -> Self {
        let (router, deferred_rx) = GameDataRouter::new(config.action_delay);
        Self {
            config,
            transport,
            sink,
            phase: SessionPhase::Disconnected,
            local_client_id: None,
            router,
            deferred_rx,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn registry(&self) -> &PlayerRegistry {
        self.router.registry()
    }

    pub fn router(&self) -> &GameDataRouter {
        &self.router
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn local_client_id(&self) -> Option<u32> {
        self.local_client_id
    }

    /// Runs the session until the packet stream closes or a fatal error occurs.
    ///
    /// Fatal errors are emitted to the sink before being returned.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        if let Err(e) = self.start().await {
            return Err(self.fail(e));
        }

        loop {
            tokio::select! {
                packet = self.transport.next_packet() => {
                    let Some(packet) = packet else {
                        info!("Session closed");
                        self.phase = SessionPhase::Disconnected;
                        return Ok(());
                    };
                    if let Control::Rejoin(reason) = self.handle_packet(packet) {
                        if let Err(e) = self.rejoin(reason).await {
                            return Err(self.fail(e));
                        }
                    }
                }
                Some(action) = self.deferred_rx.recv() => {
                    self.router.fire(action, &mut self.sink);
                }
            }
        }
    }

    async fn start(&mut self) -> Result<(), EngineError> {
        self.phase = SessionPhase::Connecting;
        info!("Connecting to {}:{}", self.config.host, self.config.port);
        self.transport
            .connect(&self.config.host, self.config.port, &self.config.token)
            .await?;

        self.phase = SessionPhase::JoiningVisible;
        info!("Joining {}", self.config.code);
        self.transport
            .join(&self.config.code, JoinOptions { do_spawn: true })
            .await?;

        self.phase = SessionPhase::AwaitingSpawn;
        let snapshot = self.transport.snapshot();
        self.local_client_id = Some(snapshot.local_client_id);
        let expected: HashSet<u32> = snapshot.clients.iter().map(|client| client.id).collect();
        info!(
            "Joined as client {}, waiting for {} spawns",
            snapshot.local_client_id,
            expected.len()
        );

        let mut observed = HashSet::new();
        let waited = self.config.spawn_timeout;
        let outcome = timeout(
            waited,
            Self::await_spawns(&mut self.transport, &expected, &mut observed),
        )
        .await;
        match outcome {
            Ok(result) => result?,
            Err(_) => {
                return Err(EngineError::SpawnTimeout {
                    waited,
                    observed: observed.intersection(&expected).count(),
                    expected: expected.len(),
                })
            }
        }

        self.activate().await
    }

    /// Consumes packets until every expected client's player object has spawned.
    async fn await_spawns(
        transport: &mut T,
        expected: &HashSet<u32>,
        observed: &mut HashSet<u32>,
    ) -> Result<(), EngineError> {
        while !expected.is_subset(observed) {
            let packet = transport.next_packet().await.ok_or(EngineError::SessionClosed)?;
            for message in game_data_messages(&packet) {
                if let GameDataMessage::Spawn {
                    spawn_type: SpawnType::Player,
                    owner_id,
                    ..
                } = message
                {
                    trace!("Observed player spawn for client {}", owner_id);
                    observed.insert(*owner_id);
                }
            }
        }
        Ok(())
    }

    /// Loads the roster seen by the visible join, announces map and host, then goes invisible.
    async fn activate(&mut self) -> Result<(), EngineError> {
        let snapshot = self.transport.snapshot();
        self.router.bulk_load(&snapshot.clients);
        self.router.set_map(snapshot.map);
        self.sink.emit(SinkEvent::MapChanged(snapshot.map));
        if let Some(host) = snapshot.host_name() {
            self.sink.emit(SinkEvent::HostChanged(host.to_string()));
        }

        self.phase = SessionPhase::Rejoining;
        self.transport.disconnect().await;
        self.reconnect_invisible().await?;

        self.router.set_spawns_live(true);
        self.phase = SessionPhase::Active;
        info!("Session active with {} players", self.router.registry().len());
        Ok(())
    }

    async fn reconnect_invisible(&mut self) -> Result<(), EngineError> {
        self.transport
            .connect(&self.config.host, self.config.port, &self.config.token)
            .await?;
        self.transport
            .join(&self.config.code, JoinOptions { do_spawn: false })
            .await?;
        self.local_client_id = Some(self.transport.snapshot().local_client_id);
        Ok(())
    }

    async fn rejoin(&mut self, reason: RejoinReason) -> Result<(), EngineError> {
        info!("Rejoining invisibly: {:?}", reason);
        self.phase = SessionPhase::Rejoining;
        self.router.reset();
        self.transport.disconnect().await;
        self.reconnect_invisible().await?;

        if reason == RejoinReason::HostReassigned {
            if let Some(host) = self.transport.snapshot().host_name() {
                self.sink.emit(SinkEvent::HostChanged(host.to_string()));
            }
        }

        self.router.set_spawns_live(true);
        self.phase = SessionPhase::Active;
        Ok(())
    }

    fn fail(&mut self, e: EngineError) -> EngineError {
        error!("Session failed: {}", e);
        self.phase = SessionPhase::Failed;
        self.router.set_spawns_live(false);
        self.sink.emit(SinkEvent::Error(e.to_string()));
        e
    }

    /// Applies one packet in steady state. Outside `Active` packets are dropped.
    ///
    /// Payloads after one that requires a rejoin are discarded with the old session.
    pub fn handle_packet(&mut self, packet: Packet) -> Control {
        if self.phase != SessionPhase::Active {
            debug!("Dropping packet in phase {:?}", self.phase);
            return Control::Continue;
        }

        for payload in &packet.payloads {
            if let Control::Rejoin(reason) = self.handle_payload(payload) {
                return Control::Rejoin(reason);
            }
        }
        Control::Continue
    }

    fn handle_payload(&mut self, payload: &Payload) -> Control {
        match payload {
            Payload::JoinGame { client_id, host_id } => {
                if Some(*client_id) != self.local_client_id {
                    self.announce_host(*host_id);
                }
                Control::Continue
            }
            Payload::StartGame => {
                info!("Game started");
                apply_signal(&mut self.sink, PolicySignal::GameStarted);
                Control::Continue
            }
            Payload::EndGame { reason } => {
                info!("Game ended ({})", reason);
                self.phase = SessionPhase::Ending;
                apply_signal(&mut self.sink, PolicySignal::GameEnded);
                Control::Rejoin(RejoinReason::RoundEnded)
            }
            Payload::RemovePlayer { client_id, host_id } => {
                self.router.registry.remove(*client_id);
                let local = self.local_client_id;
                if Some(*client_id) == local {
                    info!("Local client {} was removed, rejoining", client_id);
                    return Control::Rejoin(RejoinReason::HostReassigned);
                }
                if Some(*host_id) == local {
                    info!("Host moved to local client {}, rejoining", host_id);
                    return Control::Rejoin(RejoinReason::HostReassigned);
                }
                self.announce_host(*host_id);
                Control::Continue
            }
            Payload::GameData { messages } | Payload::GameDataTo { messages, .. } => {
                for message in messages {
                    self.router.route(message, &mut self.sink);
                }
                Control::Continue
            }
        }
    }

    fn announce_host(&mut self, host_id: u32) {
        match self
            .router
            .registry()
            .find_by_client_id(host_id)
            .and_then(display_name)
        {
            Some(name) => self.sink.emit(SinkEvent::HostChanged(name)),
            None => debug!("Host {} not in roster yet", host_id),
        }
    }
}

fn game_data_messages(packet: &Packet) -> impl Iterator<Item = &GameDataMessage> {
    packet.payloads.iter().flat_map(|payload| {
        let messages: &[GameDataMessage] = match payload {
            Payload::GameData { messages } | Payload::GameDataTo { messages, .. } => messages,
            Payload::JoinGame { .. }
            | Payload::StartGame
            | Payload::EndGame { .. }
            | Payload::RemovePlayer { .. } => &[],
        };
        messages
    })
}
