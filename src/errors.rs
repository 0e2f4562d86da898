use serde::Serialize;
use thiserror::Error;

use crate::game::session::Phase;

#[derive(Debug, Clone, Error, Serialize, PartialEq)]
pub enum AppError {
    // Phase / flow
    #[error("Command not allowed during {actual:?} (requires {expected:?})")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("Opponent roster is still loading")]
    OpponentLoading,

    #[error("A combat is already in progress")]
    CombatInProgress,

    #[error("Cannot start combat with an empty board")]
    EmptyBoardStart,

    #[error("Game is over")]
    GameEnded,

    // Resources
    #[error("Not enough gold: need {needed}, have {available}")]
    InsufficientGold { needed: u32, available: u32 },

    #[error("Hand is full (max: {capacity})")]
    HandFull { capacity: usize },

    #[error("Board is full (max: {capacity})")]
    BoardFull { capacity: usize },

    #[error("Tavern is already at max tier {max_tier}")]
    TavernMaxTier { max_tier: u8 },

    // Lookups
    #[error("Offer '{offer_id}' not found in shop")]
    OfferNotFound { offer_id: String },

    #[error("Creature '{creature_id}' not in hand")]
    CreatureNotInHand { creature_id: String },

    #[error("Creature '{creature_id}' not on board")]
    CreatureNotOnBoard { creature_id: String },

    #[error("Discovery option '{creature_id}' not offered")]
    DiscoveryOptionNotFound { creature_id: String },

    #[error("Unknown creature template '{template_id}'")]
    UnknownTemplate { template_id: String },

    // Opponent source
    #[error("Opponent generator unavailable: {reason}")]
    GeneratorUnavailable { reason: String },

    // Loading / validation
    #[error("Invalid catalog: {reason}")]
    InvalidCatalog { reason: String },

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    // Runtime
    #[error("Combat result for epoch {epoch} is stale")]
    StaleCombat { epoch: u64 },

    #[error("Session actor is no longer running")]
    SessionClosed,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    RejectedCommand,
    ValidationError,
    Recovered,
    InternalError,
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::WrongPhase { .. }
            | AppError::OpponentLoading
            | AppError::CombatInProgress
            | AppError::GameEnded
            | AppError::InsufficientGold { .. }
            | AppError::HandFull { .. }
            | AppError::BoardFull { .. }
            | AppError::TavernMaxTier { .. }
            | AppError::OfferNotFound { .. }
            | AppError::CreatureNotInHand { .. }
            | AppError::CreatureNotOnBoard { .. }
            | AppError::DiscoveryOptionNotFound { .. } => ErrorCategory::RejectedCommand,

            AppError::EmptyBoardStart
            | AppError::UnknownTemplate { .. }
            | AppError::InvalidCatalog { .. }
            | AppError::InvalidConfig { .. } => ErrorCategory::ValidationError,

            AppError::GeneratorUnavailable { .. } => ErrorCategory::Recovered,

            AppError::StaleCombat { .. } | AppError::SessionClosed | AppError::Internal { .. } => {
                ErrorCategory::InternalError
            }
        }
    }

    pub fn should_log(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::InternalError | ErrorCategory::Recovered
        )
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            AppError::WrongPhase { .. } => "WrongPhase",
            AppError::OpponentLoading => "OpponentLoading",
            AppError::CombatInProgress => "CombatInProgress",
            AppError::EmptyBoardStart => "EmptyBoardStart",
            AppError::GameEnded => "GameEnded",
            AppError::InsufficientGold { .. } => "InsufficientGold",
            AppError::HandFull { .. } => "HandFull",
            AppError::BoardFull { .. } => "BoardFull",
            AppError::TavernMaxTier { .. } => "TavernMaxTier",
            AppError::OfferNotFound { .. } => "OfferNotFound",
            AppError::CreatureNotInHand { .. } => "CreatureNotInHand",
            AppError::CreatureNotOnBoard { .. } => "CreatureNotOnBoard",
            AppError::DiscoveryOptionNotFound { .. } => "DiscoveryOptionNotFound",
            AppError::UnknownTemplate { .. } => "UnknownTemplate",
            AppError::GeneratorUnavailable { .. } => "GeneratorUnavailable",
            AppError::InvalidCatalog { .. } => "InvalidCatalog",
            AppError::InvalidConfig { .. } => "InvalidConfig",
            AppError::StaleCombat { .. } => "StaleCombat",
            AppError::SessionClosed => "SessionClosed",
            AppError::Internal { .. } => "Internal",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::InsufficientGold { needed, .. } => {
                format!("You need {} gold for that", needed)
            }
            AppError::HandFull { .. } => "Your hand is full".to_string(),
            AppError::BoardFull { .. } => "Your board is full".to_string(),
            AppError::EmptyBoardStart => {
                "You need at least one creature on the board to fight".to_string()
            }
            AppError::WrongPhase { .. } | AppError::OpponentLoading => {
                "You can't do that right now".to_string()
            }
            _ => self.to_string(),
        }
    }
}

pub mod validation {
    use super::AppError;

    pub fn validate_tier(tier: u8, max_tier: u8) -> Result<(), AppError> {
        if tier == 0 || tier > max_tier {
            return Err(AppError::InvalidCatalog {
                reason: format!("tier {} outside 1..={}", tier, max_tier),
            });
        }
        Ok(())
    }

    pub fn validate_capacity(name: &str, capacity: usize) -> Result<(), AppError> {
        if capacity == 0 {
            return Err(AppError::InvalidConfig {
                reason: format!("{} capacity cannot be zero", name),
            });
        }
        Ok(())
    }
}
