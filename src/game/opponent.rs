use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::config::FetchPolicy;
use crate::game::catalog::Catalog;
use crate::game::creature::{CreatureInstance, CreatureTemplate, Keywords, Rarity};
use crate::{AppError, AppResult};

/// Source of the board the player fights each turn. Implementations may be
/// slow or fail; `fetch_opponent` covers both.
pub trait OpponentGenerator: Send + Sync + 'static {
    fn generate(
        &self,
        turn: u32,
        tier: u8,
    ) -> impl Future<Output = AppResult<Vec<CreatureInstance>>> + Send;
}

/// Local synthesis used whenever the real generator is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    pub fn board_size(turn: u32) -> usize {
        if turn <= 1 {
            1
        } else {
            (2 + turn / 3).min(7) as usize
        }
    }

    pub fn synthesize<R: Rng + ?Sized>(turn: u32, rng: &mut R) -> Vec<CreatureInstance> {
        let tier = turn.div_ceil(3).clamp(1, 6) as u8;
        (0..Self::board_size(turn))
            .map(|slot| {
                let scale = (turn as f64 * 0.8 + rng.random_range(-1.0..1.0)).max(1.0);
                let taunt = rng.random::<f64>() > 0.8;
                let divine_shield = rng.random::<f64>() > 0.85;
                let template = CreatureTemplate {
                    id: format!("void_construct_{}", slot + 1),
                    name: format!("Void Construct {}", slot + 1),
                    attack: scale.floor() as i32,
                    health: (scale * 1.5).floor() as i32,
                    tier,
                    cost: 0,
                    rarity: Rarity::Common,
                    description: if divine_shield {
                        "Divine Shield.".to_string()
                    } else {
                        String::new()
                    },
                    keywords: Keywords {
                        taunt,
                        divine_shield,
                        ..Keywords::default()
                    },
                    tags: Vec::new(),
                    effects: Vec::new(),
                };
                CreatureInstance::instantiate(&Arc::new(template))
            })
            .collect()
    }
}

impl OpponentGenerator for FallbackGenerator {
    fn generate(
        &self,
        turn: u32,
        _tier: u8,
    ) -> impl Future<Output = AppResult<Vec<CreatureInstance>>> + Send {
        let board = Self::synthesize(turn, &mut rand::rng());
        async move { Ok(board) }
    }
}

/// Builds a plausible opponent from the creature catalog, following a
/// human-like progression curve (one creature on turn 1, filling up later).
#[derive(Debug, Clone)]
pub struct CatalogGenerator {
    catalog: Arc<Catalog>,
}

impl CatalogGenerator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn estimated_tier(turn: u32) -> u8 {
        (turn / 3 + 1).min(6) as u8
    }

    pub fn board_size(turn: u32) -> usize {
        let size = match turn {
            0 | 1 => 1,
            2 => 2,
            _ => 2 + turn / 2,
        };
        size.min(7) as usize
    }

    pub fn build<R: Rng + ?Sized>(&self, turn: u32, rng: &mut R) -> Vec<CreatureInstance> {
        let pool = self.catalog.shop_pool(Self::estimated_tier(turn));
        (0..Self::board_size(turn))
            .filter_map(|_| pool.choose(rng))
            .map(CreatureInstance::instantiate)
            .collect()
    }
}

impl OpponentGenerator for CatalogGenerator {
    fn generate(
        &self,
        turn: u32,
        _tier: u8,
    ) -> impl Future<Output = AppResult<Vec<CreatureInstance>>> + Send {
        let board = self.build(turn, &mut rand::rng());
        async move {
            if board.is_empty() {
                return Err(AppError::GeneratorUnavailable {
                    reason: "catalog has no creatures for this turn".to_string(),
                });
            }
            Ok(board)
        }
    }
}

impl<G: OpponentGenerator> OpponentGenerator for Arc<G> {
    fn generate(
        &self,
        turn: u32,
        tier: u8,
    ) -> impl Future<Output = AppResult<Vec<CreatureInstance>>> + Send {
        self.as_ref().generate(turn, tier)
    }
}

/// Asks `generator` for an opponent under `policy`, substituting a
/// synthesized board after the last failed attempt. Never fails.
pub async fn fetch_opponent<G: OpponentGenerator + ?Sized>(
    generator: &G,
    turn: u32,
    tier: u8,
    policy: &FetchPolicy,
    board_capacity: usize,
) -> Vec<CreatureInstance> {
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        let error = match timeout(policy.timeout(), generator.generate(turn, tier)).await {
            Ok(Ok(mut board)) if !board.is_empty() => {
                board.truncate(board_capacity);
                return board;
            }
            Ok(Ok(_)) => AppError::GeneratorUnavailable {
                reason: "empty roster".to_string(),
            },
            Ok(Err(error)) => error,
            Err(_) => AppError::GeneratorUnavailable {
                reason: format!("timed out after {:?}", policy.timeout()),
            },
        };
        warn!(
            "🚨 Opponent generator failed (attempt {}/{}): {}",
            attempt, attempts, error
        );
        if attempt < attempts {
            sleep(policy.backoff()).await;
        }
    }

    info!("🤖 Using synthesized opponent for turn {}", turn);
    let mut rng = StdRng::from_os_rng();
    let mut board = FallbackGenerator::synthesize(turn, &mut rng);
    board.truncate(board_capacity);
    board
}
