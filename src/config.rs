use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use crate::errors::validation::validate_capacity;
use crate::{AppError, AppResult};

/// Delays between the visible sub-phases of a combat step. Purely
/// presentational; zero everywhere gives the same outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CombatPacing {
    pub attack_ms: u64,
    pub impact_ms: u64,
    pub death_ms: u64,
    pub settle_ms: u64,
}

impl Default for CombatPacing {
    fn default() -> Self {
        Self {
            attack_ms: 400,
            impact_ms: 600,
            death_ms: 700,
            settle_ms: 300,
        }
    }
}

impl CombatPacing {
    pub fn headless() -> Self {
        Self {
            attack_ms: 0,
            impact_ms: 0,
            death_ms: 0,
            settle_ms: 0,
        }
    }

    pub fn attack(&self) -> Duration {
        Duration::from_millis(self.attack_ms)
    }

    pub fn impact(&self) -> Duration {
        Duration::from_millis(self.impact_ms)
    }

    pub fn death(&self) -> Duration {
        Duration::from_millis(self.death_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchPolicy {
    pub attempts: u32,
    pub backoff_ms: u64,
    pub timeout_ms: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff_ms: 250,
            timeout_ms: 5_000,
        }
    }
}

impl FetchPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub starting_health: i32,
    pub starting_gold: u32,
    pub gold_cap: u32,
    pub board_capacity: usize,
    pub hand_capacity: usize,
    pub refresh_cost: u32,
    pub upgrade_cost: u32,
    pub max_tier: u8,
    pub sell_refund: u32,
    pub victory_turn: u32,
    pub discovery_options: usize,
    pub base_offer_size: usize,
    pub combat_step_limit: u32,
    pub pacing: CombatPacing,
    pub fetch: FetchPolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_health: 30,
            starting_gold: 3,
            gold_cap: 10,
            board_capacity: 7,
            hand_capacity: 5,
            refresh_cost: 1,
            upgrade_cost: 5,
            max_tier: 6,
            sell_refund: 1,
            victory_turn: 15,
            discovery_options: 3,
            base_offer_size: 3,
            combat_step_limit: 500,
            pacing: CombatPacing::default(),
            fetch: FetchPolicy::default(),
        }
    }
}

impl GameConfig {
    /// Default rules with every combat pause set to zero.
    pub fn headless() -> Self {
        Self {
            pacing: CombatPacing::headless(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let config: GameConfig =
            serde_json::from_str(json).map_err(|error| AppError::InvalidConfig {
                reason: error.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|error| AppError::InvalidConfig {
            reason: format!("{}: {}", path.display(), error),
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_capacity("board", self.board_capacity)?;
        validate_capacity("hand", self.hand_capacity)?;
        if self.max_tier == 0 || self.max_tier > 6 {
            return Err(AppError::InvalidConfig {
                reason: format!("max_tier must be within 1..=6, got {}", self.max_tier),
            });
        }
        if self.starting_health <= 0 {
            return Err(AppError::InvalidConfig {
                reason: "starting_health must be positive".to_string(),
            });
        }
        if self.discovery_options == 0 {
            return Err(AppError::InvalidConfig {
                reason: "discovery_options cannot be zero".to_string(),
            });
        }
        if self.combat_step_limit == 0 {
            return Err(AppError::InvalidConfig {
                reason: "combat_step_limit cannot be zero".to_string(),
            });
        }
        Ok(())
    }

    /// Shop size at the given tavern tier: `base + floor(tier / 2)`.
    pub fn offer_size(&self, tier: u8) -> usize {
        self.base_offer_size + (tier / 2) as usize
    }

    /// Gold granted at the start of `turn`.
    pub fn gold_for_turn(&self, turn: u32) -> u32 {
        (self.starting_gold + turn).min(self.gold_cap)
    }
}
