use rand::seq::IndexedRandom;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::game::creature::{CreatureId, CreatureInstance, Effect};
use crate::game::session::{GameSession, Phase};
use crate::game::shop::{roll_discovery, roll_shop};
use crate::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Purchase {
    Added {
        creature: CreatureId,
    },
    /// Third copy completed: two owned copies consumed, one golden in hand.
    Tripled {
        golden: CreatureId,
        consumed: Vec<CreatureId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayResult {
    pub creature: CreatureId,
    pub discovery_offered: bool,
}

impl GameSession {
    pub fn buy(&mut self, offer_id: CreatureId) -> AppResult<Purchase> {
        self.ensure_phase(Phase::Shop)?;

        let cost = self
            .shop
            .offer(offer_id)
            .map(|offer| offer.template.cost)
            .ok_or_else(|| AppError::OfferNotFound {
                offer_id: offer_id.to_string(),
            })?;
        if !self.player.can_afford(cost) {
            return Err(AppError::InsufficientGold {
                needed: cost,
                available: self.player.gold,
            });
        }
        if self.player.hand.is_full() {
            return Err(AppError::HandFull {
                capacity: self.player.hand.capacity(),
            });
        }

        let purchased = self
            .shop
            .take_offer(offer_id)
            .ok_or_else(|| AppError::OfferNotFound {
                offer_id: offer_id.to_string(),
            })?;
        self.player.spend_gold(cost);

        let name = purchased.name().to_string();
        if self.player.copies_owned(&name) >= 2 {
            // Hand copies count first, then board, two in total.
            let mut consumed = self.player.hand.remove_copies(&name, 2);
            if consumed.len() < 2 {
                let missing = 2 - consumed.len();
                consumed.extend(self.player.board.remove_copies(&name, missing));
            }

            let template = self
                .catalog
                .find_by_name(&name)
                .unwrap_or_else(|| Arc::clone(&purchased.template));
            let golden = CreatureInstance::merge_to_golden(&template);
            let golden_id = golden.id;
            self.player
                .hand
                .push(golden)
                .map_err(|_| AppError::HandFull {
                    capacity: self.player.hand.capacity(),
                })?;

            info!("✨ Tripled {} into a golden copy", name);
            return Ok(Purchase::Tripled {
                golden: golden_id,
                consumed: consumed.iter().map(|creature| creature.id).collect(),
            });
        }

        let creature = purchased.id;
        self.player
            .hand
            .push(purchased)
            .map_err(|_| AppError::HandFull {
                capacity: self.player.hand.capacity(),
            })?;
        debug!("🛒 Bought {} for {} gold", name, cost);
        Ok(Purchase::Added { creature })
    }

    pub fn play(&mut self, creature_id: CreatureId) -> AppResult<PlayResult> {
        self.ensure_phase(Phase::Shop)?;
        if self.player.board.is_full() {
            return Err(AppError::BoardFull {
                capacity: self.player.board.capacity(),
            });
        }

        let creature = self
            .player
            .hand
            .remove(creature_id)
            .map_err(|_| AppError::CreatureNotInHand {
                creature_id: creature_id.to_string(),
            })?;
        let golden = creature.golden;
        let template = Arc::clone(&creature.template);
        self.player
            .board
            .push(creature)
            .map_err(|_| AppError::BoardFull {
                capacity: self.player.board.capacity(),
            })?;

        for effect in &template.effects {
            self.resolve_battlecry(creature_id, effect);
        }

        let mut discovery_offered = false;
        if golden {
            let reward_tier = (self.player.tier + 1).min(self.config.max_tier);
            let options = roll_discovery(
                &self.catalog,
                self.config.discovery_options,
                reward_tier,
                self.config.max_tier,
                &mut self.rng,
            );
            if !options.is_empty() {
                info!("🎁 Triple reward: discover a tier {} creature", reward_tier);
                self.discovery_options = options;
                self.phase = Phase::Discovery;
                discovery_offered = true;
            }
        }

        Ok(PlayResult {
            creature: creature_id,
            discovery_offered,
        })
    }

    fn resolve_battlecry(&mut self, played: CreatureId, effect: &Effect) {
        match effect {
            Effect::BattlecryBuffFriendlyRandom { value, targets } => {
                let others: Vec<CreatureId> = self
                    .player
                    .board
                    .iter()
                    .filter(|creature| creature.id != played)
                    .map(|creature| creature.id)
                    .collect();
                let chosen: Vec<CreatureId> = others
                    .choose_multiple(&mut self.rng, *targets as usize)
                    .copied()
                    .collect();
                for id in chosen {
                    if let Some(target) = self.player.board.get_mut(id) {
                        target.buff(*value, *value);
                        debug!("💪 {} gets +{}/+{}", target.name(), value, value);
                    }
                }
            }
            Effect::BattlecrySummon { token, count } => {
                let Some(template) = self.catalog.token(token) else {
                    return;
                };
                for _ in 0..*count {
                    if self
                        .player
                        .board
                        .push(CreatureInstance::instantiate(&template))
                        .is_err()
                    {
                        break;
                    }
                }
            }
            Effect::BattlecryBuffSelf { value } => {
                if let Some(creature) = self.player.board.get_mut(played) {
                    creature.buff(*value, *value);
                }
            }
            Effect::BattlecryBuffByTag { tag, value } => {
                for creature in self.player.board.iter_mut() {
                    if creature.id != played && creature.template.has_tag(tag) {
                        creature.buff(*value, *value);
                    }
                }
            }
            Effect::DeathrattleSummon { .. }
            | Effect::DeathrattleDamageRandomEnemy { .. }
            | Effect::DeathrattleBuffByTag { .. }
            | Effect::PassiveBuffSelf { .. } => {}
        }
    }

    pub fn select_discovery(&mut self, option_id: CreatureId) -> AppResult<CreatureId> {
        self.ensure_phase(Phase::Discovery)?;

        let position = self
            .discovery_options
            .iter()
            .position(|option| option.id == option_id)
            .ok_or_else(|| AppError::DiscoveryOptionNotFound {
                creature_id: option_id.to_string(),
            })?;
        if self.player.hand.is_full() {
            return Err(AppError::HandFull {
                capacity: self.player.hand.capacity(),
            });
        }

        let chosen = self.discovery_options.swap_remove(position);
        self.player
            .hand
            .push(chosen)
            .map_err(|_| AppError::HandFull {
                capacity: self.player.hand.capacity(),
            })?;
        self.discovery_options.clear();
        self.phase = Phase::Shop;
        Ok(option_id)
    }

    /// Flat refund regardless of golden status.
    pub fn sell(&mut self, creature_id: CreatureId) -> AppResult<u32> {
        self.ensure_phase(Phase::Shop)?;
        let sold = self
            .player
            .board
            .remove(creature_id)
            .map_err(|_| AppError::CreatureNotOnBoard {
                creature_id: creature_id.to_string(),
            })?;
        let refund = self.config.sell_refund;
        self.player.gain_gold(refund);
        debug!("💰 Sold {} for {} gold", sold.name(), refund);
        Ok(refund)
    }

    pub fn refresh(&mut self) -> AppResult<()> {
        self.ensure_phase(Phase::Shop)?;
        let cost = self.config.refresh_cost;
        if !self.player.spend_gold(cost) {
            return Err(AppError::InsufficientGold {
                needed: cost,
                available: self.player.gold,
            });
        }
        let offers = roll_shop(
            &self.catalog,
            self.config.offer_size(self.player.tier),
            self.player.tier,
            &mut self.rng,
        );
        self.shop.restock(offers);
        Ok(())
    }

    pub fn upgrade_tavern(&mut self) -> AppResult<u8> {
        self.ensure_phase(Phase::Shop)?;
        let cost = self.config.upgrade_cost;
        if !self.player.can_afford(cost) {
            return Err(AppError::InsufficientGold {
                needed: cost,
                available: self.player.gold,
            });
        }
        if self.player.tier >= self.config.max_tier {
            return Err(AppError::TavernMaxTier {
                max_tier: self.config.max_tier,
            });
        }
        self.player.spend_gold(cost);
        self.player.tier += 1;
        info!("🏰 Tavern upgraded to tier {}", self.player.tier);
        Ok(self.player.tier)
    }

    pub fn toggle_freeze(&mut self) -> AppResult<bool> {
        self.ensure_phase(Phase::Shop)?;
        Ok(self.shop.toggle_freeze())
    }
}
