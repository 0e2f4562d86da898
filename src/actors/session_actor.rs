use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::GameConfig;
use crate::game::combat::Verdict;
use crate::game::combat_loop::run_combat;
use crate::game::creature::{CreatureId, CreatureInstance};
use crate::game::economy::{PlayResult, Purchase};
use crate::game::events::{EventBroadcaster, SessionEvent};
use crate::game::opponent::{fetch_opponent, OpponentGenerator};
use crate::game::session::{GameSession, Phase, SessionSnapshot};
use crate::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CommandOutcome {
    Purchased(Purchase),
    Played(PlayResult),
    DiscoverySelected { creature: CreatureId },
    Sold { refund: u32 },
    Refreshed,
    Upgraded { tier: u8 },
    FreezeToggled { frozen: bool },
    CombatStarting { epoch: u64 },
    Restarted,
}

type Reply = oneshot::Sender<AppResult<CommandOutcome>>;

#[derive(Debug)]
pub enum SessionCommand {
    Buy { offer_id: CreatureId, reply: Reply },
    Play { creature_id: CreatureId, reply: Reply },
    SelectDiscovery { creature_id: CreatureId, reply: Reply },
    Sell { creature_id: CreatureId, reply: Reply },
    Refresh { reply: Reply },
    Upgrade { reply: Reply },
    ToggleFreeze { reply: Reply },
    StartCombat { reply: Reply },
    Restart { reply: Reply },
    Snapshot { reply: oneshot::Sender<SessionSnapshot> },
    Shutdown,
}

impl SessionCommand {
    fn name(&self) -> &'static str {
        match self {
            SessionCommand::Buy { .. } => "Buy",
            SessionCommand::Play { .. } => "Play",
            SessionCommand::SelectDiscovery { .. } => "SelectDiscovery",
            SessionCommand::Sell { .. } => "Sell",
            SessionCommand::Refresh { .. } => "Refresh",
            SessionCommand::Upgrade { .. } => "Upgrade",
            SessionCommand::ToggleFreeze { .. } => "ToggleFreeze",
            SessionCommand::StartCombat { .. } => "StartCombat",
            SessionCommand::Restart { .. } => "Restart",
            SessionCommand::Snapshot { .. } => "Snapshot",
            SessionCommand::Shutdown => "Shutdown",
        }
    }
}

/// Messages from the background combat task back to the actor.
#[derive(Debug)]
enum CombatMessage {
    OpponentReady {
        epoch: u64,
        board: Vec<CreatureInstance>,
    },
    Finished {
        epoch: u64,
        verdict: Verdict,
    },
}

/// Sole owner of one `GameSession`. Commands are applied one at a time;
/// opponent loading and combat run in a single background task that a
/// restart can abort.
pub struct SessionActor<G: OpponentGenerator> {
    session: GameSession,
    generator: Arc<G>,
    events: EventBroadcaster,
    combat_sender: mpsc::UnboundedSender<CombatMessage>,
    in_flight: Option<JoinHandle<()>>,
}

impl<G: OpponentGenerator> SessionActor<G> {
    pub fn spawn(
        config: GameConfig,
        generator: G,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        Self::spawn_with_session(GameSession::new(config), generator)
    }

    pub fn spawn_with_session(
        session: GameSession,
        generator: G,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        let (cmd_sender, cmd_receiver) = mpsc::unbounded_channel();
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        let (combat_sender, combat_receiver) = mpsc::unbounded_channel();

        let actor = Self {
            session,
            generator: Arc::new(generator),
            events: EventBroadcaster::new(event_sender),
            combat_sender,
            in_flight: None,
        };
        tokio::spawn(actor.run(cmd_receiver, combat_receiver));

        (SessionHandle::new(cmd_sender), event_receiver)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        mut combat_messages: mpsc::UnboundedReceiver<CombatMessage>,
    ) {
        info!("🎮 Session actor started");
        self.events
            .phase_changed(self.session.phase, self.session.turn);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(command) => self.handle_command(command),
                    }
                }
                Some(message) = combat_messages.recv() => {
                    self.handle_combat_message(message);
                }
            }
        }

        self.abort_in_flight();
        info!("🎮 Session actor stopped");
    }

    fn handle_command(&mut self, command: SessionCommand) {
        let name = command.name();
        debug!("🎮 Handling {}", name);

        let (result, reply) = match command {
            SessionCommand::Buy { offer_id, reply } => (
                self.session.buy(offer_id).map(CommandOutcome::Purchased),
                reply,
            ),
            SessionCommand::Play { creature_id, reply } => {
                let result = self.session.play(creature_id).map(CommandOutcome::Played);
                if matches!(&result, Ok(CommandOutcome::Played(played)) if played.discovery_offered)
                {
                    self.events
                        .phase_changed(self.session.phase, self.session.turn);
                }
                (result, reply)
            }
            SessionCommand::SelectDiscovery { creature_id, reply } => {
                let result = self
                    .session
                    .select_discovery(creature_id)
                    .map(|creature| CommandOutcome::DiscoverySelected { creature });
                if result.is_ok() {
                    self.events
                        .phase_changed(self.session.phase, self.session.turn);
                }
                (result, reply)
            }
            SessionCommand::Sell { creature_id, reply } => (
                self.session
                    .sell(creature_id)
                    .map(|refund| CommandOutcome::Sold { refund }),
                reply,
            ),
            SessionCommand::Refresh { reply } => (
                self.session.refresh().map(|_| CommandOutcome::Refreshed),
                reply,
            ),
            SessionCommand::Upgrade { reply } => (
                self.session
                    .upgrade_tavern()
                    .map(|tier| CommandOutcome::Upgraded { tier }),
                reply,
            ),
            SessionCommand::ToggleFreeze { reply } => (
                self.session
                    .toggle_freeze()
                    .map(|frozen| CommandOutcome::FreezeToggled { frozen }),
                reply,
            ),
            SessionCommand::StartCombat { reply } => (self.start_combat(), reply),
            SessionCommand::Restart { reply } => {
                self.abort_in_flight();
                self.session.restart();
                self.events
                    .phase_changed(self.session.phase, self.session.turn);
                (Ok(CommandOutcome::Restarted), reply)
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
                return;
            }
            SessionCommand::Shutdown => return,
        };

        if let Err(error) = &result {
            if error.should_log() {
                error!("🎮 {} failed: {}", name, error);
            } else {
                debug!("🎮 {} rejected: {}", name, error);
            }
            self.events.command_rejected(name, error);
        }
        let _ = reply.send(result);
    }

    fn start_combat(&mut self) -> AppResult<CommandOutcome> {
        if self.in_flight.is_some() {
            return Err(AppError::CombatInProgress);
        }
        let request = self.session.begin_combat()?;
        self.events.emit(SessionEvent::OpponentLoading {
            turn: request.turn,
            tier: request.tier,
        });

        let generator = Arc::clone(&self.generator);
        let sender = self.combat_sender.clone();
        let policy = self.session.config().fetch.clone();
        let capacity = self.session.config().board_capacity;
        self.in_flight = Some(tokio::spawn(async move {
            let board =
                fetch_opponent(generator.as_ref(), request.turn, request.tier, &policy, capacity)
                    .await;
            let _ = sender.send(CombatMessage::OpponentReady {
                epoch: request.epoch,
                board,
            });
        }));

        Ok(CommandOutcome::CombatStarting {
            epoch: request.epoch,
        })
    }

    fn handle_combat_message(&mut self, message: CombatMessage) {
        match message {
            CombatMessage::OpponentReady { epoch, board } => {
                let combat = match self.session.install_opponent(epoch, board) {
                    Ok(combat) => combat,
                    Err(error) => {
                        debug!("🎮 Ignoring opponent: {}", error);
                        return;
                    }
                };
                self.events.phase_changed(Phase::Combat, self.session.turn);

                let mut rng = StdRng::from_rng(self.session.rng_mut());
                let pacing = self.session.config().pacing.clone();
                let events = self.events.clone();
                let sender = self.combat_sender.clone();
                self.in_flight = Some(tokio::spawn(async move {
                    let verdict = run_combat(combat, &mut rng, &pacing, &events).await;
                    let _ = sender.send(CombatMessage::Finished { epoch, verdict });
                }));
            }
            CombatMessage::Finished { epoch, verdict } => {
                match self.session.resolve_combat(epoch, verdict) {
                    Ok(summary) => {
                        self.in_flight = None;
                        let phase = summary.next_phase;
                        self.events.emit(SessionEvent::CombatEnded { summary });
                        self.events.phase_changed(phase, self.session.turn);
                    }
                    Err(error) => debug!("🎮 Ignoring combat result: {}", error),
                }
            }
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
            info!("🛑 Aborted in-flight combat");
        }
    }
}

/// Cheap, cloneable front door to a running `SessionActor`.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    fn new(sender: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { sender }
    }

    async fn request<F>(&self, build: F) -> AppResult<CommandOutcome>
    where
        F: FnOnce(Reply) -> SessionCommand,
    {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(build(reply))
            .map_err(|_| AppError::SessionClosed)?;
        response.await.map_err(|_| AppError::SessionClosed)?
    }

    pub async fn buy(&self, offer_id: CreatureId) -> AppResult<CommandOutcome> {
        self.request(|reply| SessionCommand::Buy { offer_id, reply })
            .await
    }

    pub async fn play(&self, creature_id: CreatureId) -> AppResult<CommandOutcome> {
        self.request(|reply| SessionCommand::Play { creature_id, reply })
            .await
    }

    pub async fn select_discovery(&self, creature_id: CreatureId) -> AppResult<CommandOutcome> {
        self.request(|reply| SessionCommand::SelectDiscovery { creature_id, reply })
            .await
    }

    pub async fn sell(&self, creature_id: CreatureId) -> AppResult<CommandOutcome> {
        self.request(|reply| SessionCommand::Sell { creature_id, reply })
            .await
    }

    pub async fn refresh(&self) -> AppResult<CommandOutcome> {
        self.request(|reply| SessionCommand::Refresh { reply }).await
    }

    pub async fn upgrade_tavern(&self) -> AppResult<CommandOutcome> {
        self.request(|reply| SessionCommand::Upgrade { reply }).await
    }

    pub async fn toggle_freeze(&self) -> AppResult<CommandOutcome> {
        self.request(|reply| SessionCommand::ToggleFreeze { reply })
            .await
    }

    pub async fn start_combat(&self) -> AppResult<CommandOutcome> {
        self.request(|reply| SessionCommand::StartCombat { reply })
            .await
    }

    pub async fn restart(&self) -> AppResult<CommandOutcome> {
        self.request(|reply| SessionCommand::Restart { reply }).await
    }

    pub async fn snapshot(&self) -> AppResult<SessionSnapshot> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(SessionCommand::Snapshot { reply })
            .map_err(|_| AppError::SessionClosed)?;
        response.await.map_err(|_| AppError::SessionClosed)
    }

    pub fn shutdown(&self) {
        let _ = self.sender.send(SessionCommand::Shutdown);
    }
}
