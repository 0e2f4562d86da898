use serde::Serialize;
use tokio::sync::mpsc;

use crate::game::combat::{BoardSnapshot, Side};
use crate::game::creature::{CreatureId, CreatureView};
use crate::game::session::{CombatSummary, Phase};
use crate::{AppError, AppResult};

/// Everything the presentation layer is told about a session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum SessionEvent {
    PhaseChanged {
        phase: Phase,
        turn: u32,
    },
    OpponentLoading {
        turn: u32,
        tier: u8,
    },
    CombatStarted {
        first_attacker: Side,
        player: Vec<CreatureView>,
        enemy: Vec<CreatureView>,
    },
    AttackDeclared {
        side: Side,
        attacker: CreatureId,
        target: CreatureId,
    },
    AttackResolved {
        attacker: CreatureId,
        target: CreatureId,
        cleaved: Vec<CreatureId>,
        snapshot: BoardSnapshot,
    },
    DeathsMarked {
        creatures: Vec<CreatureId>,
    },
    BoardsSettled {
        snapshot: BoardSnapshot,
    },
    CombatEnded {
        summary: CombatSummary,
    },
    CommandRejected {
        command: String,
        reason: String,
    },
}

impl SessionEvent {
    pub fn to_json(&self) -> AppResult<String> {
        serde_json::to_string(self).map_err(|error| AppError::Internal {
            message: format!("Failed to serialize event: {}", error),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventBroadcaster {
    sender: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl EventBroadcaster {
    pub fn new(sender: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Broadcaster that drops everything; for headless runs.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, event: SessionEvent) {
        if let Some(sender) = &self.sender {
            // A closed receiver just means nobody is watching.
            let _ = sender.send(event);
        }
    }

    pub fn phase_changed(&self, phase: Phase, turn: u32) {
        self.emit(SessionEvent::PhaseChanged { phase, turn });
    }

    pub fn command_rejected(&self, command: &str, error: &AppError) {
        self.emit(SessionEvent::CommandRejected {
            command: command.to_string(),
            reason: error.user_friendly_message(),
        });
    }
}
