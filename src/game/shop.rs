use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

use crate::game::catalog::Catalog;
use crate::game::creature::{CreatureId, CreatureInstance, CreatureTemplate};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Shop {
    pub offers: Vec<CreatureInstance>,
    pub frozen: bool,
}

impl Shop {
    pub fn new(offers: Vec<CreatureInstance>) -> Self {
        Self {
            offers,
            frozen: false,
        }
    }

    pub fn take_offer(&mut self, offer_id: CreatureId) -> Option<CreatureInstance> {
        let position = self.offers.iter().position(|offer| offer.id == offer_id)?;
        Some(self.offers.remove(position))
    }

    pub fn offer(&self, offer_id: CreatureId) -> Option<&CreatureInstance> {
        self.offers.iter().find(|offer| offer.id == offer_id)
    }

    pub fn restock(&mut self, offers: Vec<CreatureInstance>) {
        self.offers = offers;
        self.frozen = false;
    }

    pub fn toggle_freeze(&mut self) -> bool {
        self.frozen = !self.frozen;
        self.frozen
    }
}

fn draw<R: Rng + ?Sized>(
    pool: &[Arc<CreatureTemplate>],
    count: usize,
    rng: &mut R,
) -> Vec<CreatureInstance> {
    let mut drawn = Vec::with_capacity(count);
    for _ in 0..count {
        if let Some(template) = pool.choose(rng) {
            drawn.push(CreatureInstance::instantiate(template));
        } else {
            break;
        }
    }
    drawn
}

/// `count` independent uniform draws, with replacement, from every template
/// with tier <= `max_tier`.
pub fn roll_shop<R: Rng + ?Sized>(
    catalog: &Catalog,
    count: usize,
    max_tier: u8,
    rng: &mut R,
) -> Vec<CreatureInstance> {
    draw(&catalog.shop_pool(max_tier), count, rng)
}

/// Triple-reward candidates from exactly `tier`, falling back to
/// `min(max_tier, tier)` and then the whole pool when a tier is empty.
pub fn roll_discovery<R: Rng + ?Sized>(
    catalog: &Catalog,
    count: usize,
    tier: u8,
    max_tier: u8,
    rng: &mut R,
) -> Vec<CreatureInstance> {
    let mut pool = catalog.tier_pool(tier);
    if pool.is_empty() {
        pool = catalog.tier_pool(tier.min(max_tier));
    }
    if pool.is_empty() {
        pool = catalog.pool().to_vec();
    }
    draw(&pool, count, rng)
}
