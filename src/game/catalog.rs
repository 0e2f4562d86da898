use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::errors::validation::validate_tier;
use crate::game::creature::CreatureTemplate;
use crate::{AppError, AppResult};

const EMBEDDED_CATALOG: &str = include_str!("../data/creatures.json");
const MAX_TIER: u8 = 6;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    pool: Vec<CreatureTemplate>,
    #[serde(default)]
    tokens: Vec<CreatureTemplate>,
}

/// Shop pool plus the summon-only token table.
#[derive(Debug, Clone)]
pub struct Catalog {
    pool: Vec<Arc<CreatureTemplate>>,
    tokens: HashMap<String, Arc<CreatureTemplate>>,
}

impl Catalog {
    pub fn from_json(json: &str) -> AppResult<Self> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|error| AppError::InvalidCatalog {
                reason: error.to_string(),
            })?;
        Self::from_templates(file.pool, file.tokens)
    }

    pub fn from_templates(
        pool: Vec<CreatureTemplate>,
        tokens: Vec<CreatureTemplate>,
    ) -> AppResult<Self> {
        if pool.is_empty() {
            return Err(AppError::InvalidCatalog {
                reason: "creature pool is empty".to_string(),
            });
        }

        let tokens: HashMap<String, Arc<CreatureTemplate>> = tokens
            .into_iter()
            .map(|token| (token.id.clone(), Arc::new(token)))
            .collect();

        let pool: Vec<Arc<CreatureTemplate>> = pool.into_iter().map(Arc::new).collect();

        for template in pool.iter().chain(tokens.values()) {
            validate_tier(template.tier, MAX_TIER)?;
            for effect in &template.effects {
                if let Some(token_id) = effect.summon_token() {
                    if !tokens.contains_key(token_id) {
                        return Err(AppError::InvalidCatalog {
                            reason: format!(
                                "'{}' summons unknown token '{}'",
                                template.id, token_id
                            ),
                        });
                    }
                }
            }
        }

        Ok(Self { pool, tokens })
    }

    pub fn embedded() -> AppResult<Self> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    pub fn pool(&self) -> &[Arc<CreatureTemplate>] {
        &self.pool
    }

    pub fn template(&self, template_id: &str) -> AppResult<Arc<CreatureTemplate>> {
        self.pool
            .iter()
            .chain(self.tokens.values())
            .find(|template| template.id == template_id)
            .cloned()
            .ok_or_else(|| AppError::UnknownTemplate {
                template_id: template_id.to_string(),
            })
    }

    pub fn token(&self, token_id: &str) -> Option<Arc<CreatureTemplate>> {
        self.tokens.get(token_id).cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<CreatureTemplate>> {
        self.pool.iter().find(|template| template.name == name).cloned()
    }

    /// Everything purchasable at or below `max_tier`.
    pub fn shop_pool(&self, max_tier: u8) -> Vec<Arc<CreatureTemplate>> {
        self.pool
            .iter()
            .filter(|template| template.tier <= max_tier)
            .cloned()
            .collect()
    }

    pub fn tier_pool(&self, tier: u8) -> Vec<Arc<CreatureTemplate>> {
        self.pool
            .iter()
            .filter(|template| template.tier == tier)
            .cloned()
            .collect()
    }
}

static CATALOG: Lazy<Catalog> =
    Lazy::new(|| Catalog::embedded().expect("Embedded creature catalog is invalid"));

pub fn catalog() -> &'static Catalog {
    &CATALOG
}

pub fn initialize_catalog() {
    let catalog = &*CATALOG;
    info!(
        "🃏 Creature catalog initialized: {} creatures, {} tokens",
        catalog.pool.len(),
        catalog.tokens.len()
    );
}
