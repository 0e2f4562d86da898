use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::game::catalog::{catalog, Catalog};
use crate::game::combat::{CombatSession, Verdict};
use crate::game::creature::{CreatureInstance, CreatureView};
use crate::game::player::PlayerState;
use crate::game::shop::{roll_shop, Shop};
use crate::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Phase {
    Shop,
    Discovery,
    Combat,
    GameOver,
    Victory,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::GameOver | Phase::Victory)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Outcome {
    PlayerWon,
    EnemyWon,
}

/// Handed out by `begin_combat`; everything the opponent source needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatRequest {
    pub epoch: u64,
    pub turn: u32,
    pub tier: u8,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CombatSummary {
    pub turn: u32,
    pub verdict: Verdict,
    pub damage_taken: i32,
    pub health_after: i32,
    pub next_phase: Phase,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub turn: u32,
    pub phase: Phase,
    pub health: i32,
    pub max_health: i32,
    pub gold: u32,
    pub max_gold: u32,
    pub tier: u8,
    pub board: Vec<CreatureView>,
    pub hand: Vec<CreatureView>,
    pub shop: Vec<CreatureView>,
    pub shop_frozen: bool,
    pub discovery_options: Vec<CreatureView>,
    pub opponent_board: Vec<CreatureView>,
    pub loading_opponent: bool,
    pub outcome: Option<Outcome>,
    pub last_combat: Option<CombatSummary>,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    pub turn: u32,
    pub phase: Phase,
    pub player: PlayerState,
    pub opponent_board: Vec<CreatureInstance>,
    pub shop: Shop,
    pub discovery_options: Vec<CreatureInstance>,
    pub outcome: Option<Outcome>,
    pub loading_opponent: bool,
    pub combat_epoch: u64,
    pub last_combat: Option<CombatSummary>,
    pre_combat_board: Option<Vec<CreatureInstance>>,
    pub(crate) config: GameConfig,
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) rng: StdRng,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Self {
        Self::with_catalog(config, Arc::new(catalog().clone()), StdRng::from_os_rng())
    }

    /// Reproducible session: every shop roll and combat draw follows `seed`.
    pub fn with_seed(config: GameConfig, seed: u64) -> Self {
        Self::with_catalog(
            config,
            Arc::new(catalog().clone()),
            StdRng::seed_from_u64(seed),
        )
    }

    pub fn with_catalog(config: GameConfig, catalog: Arc<Catalog>, mut rng: StdRng) -> Self {
        let player = PlayerState::new(&config);
        let offers = roll_shop(&catalog, config.offer_size(player.tier), player.tier, &mut rng);
        Self {
            turn: 1,
            phase: Phase::Shop,
            player,
            opponent_board: Vec::new(),
            shop: Shop::new(offers),
            discovery_options: Vec::new(),
            outcome: None,
            loading_opponent: false,
            combat_epoch: 0,
            last_combat: None,
            pre_combat_board: None,
            config,
            catalog,
            rng,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Guard shared by every economy command.
    pub(crate) fn ensure_phase(&self, expected: Phase) -> AppResult<()> {
        if self.phase.is_terminal() {
            return Err(AppError::GameEnded);
        }
        if self.loading_opponent {
            return Err(AppError::OpponentLoading);
        }
        if self.phase != expected {
            return Err(AppError::WrongPhase {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }

    pub fn begin_combat(&mut self) -> AppResult<CombatRequest> {
        if self.loading_opponent || self.phase == Phase::Combat {
            return Err(AppError::CombatInProgress);
        }
        self.ensure_phase(Phase::Shop)?;
        if self.player.board.is_empty() {
            return Err(AppError::EmptyBoardStart);
        }

        self.loading_opponent = true;
        self.combat_epoch += 1;
        info!(
            "⚔️ Turn {}: requesting opponent (tier {}, epoch {})",
            self.turn, self.player.tier, self.combat_epoch
        );
        Ok(CombatRequest {
            epoch: self.combat_epoch,
            turn: self.turn,
            tier: self.player.tier,
        })
    }

    pub fn install_opponent(
        &mut self,
        epoch: u64,
        opponent: Vec<CreatureInstance>,
    ) -> AppResult<CombatSession> {
        if epoch != self.combat_epoch || !self.loading_opponent {
            return Err(AppError::StaleCombat { epoch });
        }

        let mut opponent = opponent;
        opponent.truncate(self.config.board_capacity);

        self.loading_opponent = false;
        self.phase = Phase::Combat;
        self.opponent_board = opponent;
        let board_snapshot = self.player.board.as_slice().to_vec();
        self.pre_combat_board = Some(board_snapshot.clone());

        debug!(
            "🛡️ Combat {} installed: {} vs {} creatures",
            epoch,
            board_snapshot.len(),
            self.opponent_board.len()
        );

        Ok(CombatSession::new(
            board_snapshot,
            self.opponent_board.clone(),
            Arc::clone(&self.catalog),
            &self.config,
            &mut self.rng,
        ))
    }

    pub fn resolve_combat(&mut self, epoch: u64, verdict: Verdict) -> AppResult<CombatSummary> {
        if epoch != self.combat_epoch || self.phase != Phase::Combat {
            return Err(AppError::StaleCombat { epoch });
        }

        let damage = match verdict {
            Verdict::EnemyWins => self.loss_damage(),
            Verdict::PlayerWins | Verdict::Draw => 0,
        };
        let died = self.player.take_damage(damage);

        let next_phase = if died {
            self.outcome = Some(Outcome::EnemyWon);
            Phase::GameOver
        } else if self.turn >= self.config.victory_turn {
            self.outcome = Some(Outcome::PlayerWon);
            Phase::Victory
        } else {
            Phase::Shop
        };

        let summary = CombatSummary {
            turn: self.turn,
            verdict,
            damage_taken: damage,
            health_after: self.player.health,
            next_phase,
        };

        self.turn += 1;
        self.phase = next_phase;
        self.player
            .reset_gold(self.config.gold_for_turn(self.turn));

        let restored: Vec<CreatureInstance> = self
            .pre_combat_board
            .take()
            .unwrap_or_default()
            .iter()
            .map(CreatureInstance::restored)
            .collect();
        self.player.board.replace_all(restored);

        if self.shop.frozen {
            // Frozen offers survive exactly one automatic refresh.
            self.shop.frozen = false;
        } else {
            let offers = roll_shop(
                &self.catalog,
                self.config.offer_size(self.player.tier),
                self.player.tier,
                &mut self.rng,
            );
            self.shop.restock(offers);
        }
        self.opponent_board.clear();
        self.last_combat = Some(summary.clone());

        info!(
            "🏁 Turn {} combat: {:?}, took {} damage, health {} -> {:?}",
            summary.turn, verdict, damage, self.player.health, next_phase
        );
        Ok(summary)
    }

    /// Sum of the opponent's tiers plus the turn-scaled tavern bonus.
    pub fn loss_damage(&self) -> i32 {
        let board_tiers: i32 = self
            .opponent_board
            .iter()
            .map(|creature| creature.tier() as i32)
            .sum();
        let tavern = (self.turn / 3 + 1).min(6) as i32;
        board_tiers + tavern
    }

    /// Runs a full combat synchronously against `opponent` using the
    /// session's own rng. No pacing, no events.
    pub fn run_local_combat(&mut self, opponent: Vec<CreatureInstance>) -> AppResult<CombatSummary> {
        let request = self.begin_combat()?;
        let mut combat = self.install_opponent(request.epoch, opponent)?;
        let verdict = combat.run_to_end(&mut self.rng);
        self.resolve_combat(request.epoch, verdict)
    }

    /// Fresh game with the same rules. The epoch keeps counting so results
    /// from an aborted combat are recognised as stale.
    pub fn restart(&mut self) {
        let epoch = self.combat_epoch + 1;
        let rng = StdRng::from_rng(&mut self.rng);
        let mut fresh = Self::with_catalog(self.config.clone(), Arc::clone(&self.catalog), rng);
        fresh.combat_epoch = epoch;
        *self = fresh;
        info!("🔄 Session restarted");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            turn: self.turn,
            phase: self.phase,
            health: self.player.health,
            max_health: self.player.max_health,
            gold: self.player.gold,
            max_gold: self.player.max_gold,
            tier: self.player.tier,
            board: self.player.board.views(),
            hand: self.player.hand.views(),
            shop: self.shop.offers.iter().map(CreatureInstance::view).collect(),
            shop_frozen: self.shop.frozen,
            discovery_options: self
                .discovery_options
                .iter()
                .map(CreatureInstance::view)
                .collect(),
            opponent_board: self.opponent_board.iter().map(CreatureInstance::view).collect(),
            loading_opponent: self.loading_opponent,
            outcome: self.outcome,
            last_combat: self.last_combat.clone(),
        }
    }
}
