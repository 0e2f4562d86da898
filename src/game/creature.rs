use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreatureId(Uuid);

impl CreatureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

}

impl Default for CreatureId {
    fn default() -> Self {
        Self::new()
    }
}

/// Log form. Events and snapshots carry the full id.
impl fmt::Display for CreatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        write!(f, "#{}", &simple[..6])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn for_tier(tier: u8) -> Self {
        match tier {
            0..=2 => Rarity::Common,
            3..=4 => Rarity::Rare,
            _ => Rarity::Legendary,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keywords {
    pub taunt: bool,
    pub divine_shield: bool,
    pub cleave: bool,
    pub poisonous: bool,
    pub reborn: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    OnPlay,
    OnDeath,
    Passive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectTrigger {
    Summon,
    BuffFriendlyRandom,
    DamageRandomEnemy,
    BuffSelf,
    BuffByTag,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect")]
pub enum Effect {
    BattlecryBuffFriendlyRandom {
        value: i32,
        #[serde(default = "one")]
        targets: u32,
    },
    BattlecrySummon {
        token: String,
        #[serde(default = "one")]
        count: u32,
    },
    BattlecryBuffSelf {
        value: i32,
    },
    BattlecryBuffByTag {
        tag: String,
        value: i32,
    },
    DeathrattleSummon {
        token: String,
        #[serde(default = "one")]
        count: u32,
    },
    DeathrattleDamageRandomEnemy {
        value: i32,
        #[serde(default = "one")]
        targets: u32,
    },
    DeathrattleBuffByTag {
        tag: String,
        value: i32,
    },
    PassiveBuffSelf {
        value: i32,
    },
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::BattlecryBuffFriendlyRandom { .. }
            | Effect::BattlecrySummon { .. }
            | Effect::BattlecryBuffSelf { .. }
            | Effect::BattlecryBuffByTag { .. } => EffectKind::OnPlay,
            Effect::DeathrattleSummon { .. }
            | Effect::DeathrattleDamageRandomEnemy { .. }
            | Effect::DeathrattleBuffByTag { .. } => EffectKind::OnDeath,
            Effect::PassiveBuffSelf { .. } => EffectKind::Passive,
        }
    }

    pub fn trigger(&self) -> EffectTrigger {
        match self {
            Effect::BattlecrySummon { .. } | Effect::DeathrattleSummon { .. } => {
                EffectTrigger::Summon
            }
            Effect::BattlecryBuffFriendlyRandom { .. } => EffectTrigger::BuffFriendlyRandom,
            Effect::DeathrattleDamageRandomEnemy { .. } => EffectTrigger::DamageRandomEnemy,
            Effect::BattlecryBuffSelf { .. } | Effect::PassiveBuffSelf { .. } => {
                EffectTrigger::BuffSelf
            }
            Effect::BattlecryBuffByTag { .. } | Effect::DeathrattleBuffByTag { .. } => {
                EffectTrigger::BuffByTag
            }
        }
    }

    /// Token referenced by a summon effect, if any.
    pub fn summon_token(&self) -> Option<&str> {
        match self {
            Effect::BattlecrySummon { token, .. } | Effect::DeathrattleSummon { token, .. } => {
                Some(token)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureTemplate {
    pub id: String,
    pub name: String,
    pub attack: i32,
    pub health: i32,
    pub tier: u8,
    #[serde(default)]
    pub cost: u32,
    pub rarity: Rarity,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Keywords,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub effects: Vec<Effect>,
}

impl CreatureTemplate {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|own| own == tag)
    }

    pub fn effects_of(&self, kind: EffectKind) -> impl Iterator<Item = &Effect> {
        self.effects.iter().filter(move |effect| effect.kind() == kind)
    }

    fn passive_bonus(&self) -> i32 {
        self.effects
            .iter()
            .map(|effect| match effect {
                Effect::PassiveBuffSelf { value } => *value,
                _ => 0,
            })
            .sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatureInstance {
    pub id: CreatureId,
    pub template: Arc<CreatureTemplate>,
    pub attack: i32,
    pub health: i32,
    pub max_health: i32,
    pub golden: bool,
    // Per-battle transient state
    pub dying: bool,
    pub last_damage_taken: i32,
    pub shield_consumed: bool,
    pub reborn_consumed: bool,
}

impl CreatureInstance {
    pub fn instantiate(template: &Arc<CreatureTemplate>) -> Self {
        let bonus = template.passive_bonus();
        Self::with_stats(
            template,
            template.attack + bonus,
            template.health + bonus,
            false,
        )
    }

    /// Golden copy: exactly double the template's base stats.
    pub fn merge_to_golden(template: &Arc<CreatureTemplate>) -> Self {
        Self::with_stats(template, template.attack * 2, template.health * 2, true)
    }

    fn with_stats(template: &Arc<CreatureTemplate>, attack: i32, health: i32, golden: bool) -> Self {
        Self {
            id: CreatureId::new(),
            template: Arc::clone(template),
            attack,
            health,
            max_health: health,
            golden,
            dying: false,
            last_damage_taken: 0,
            shield_consumed: false,
            reborn_consumed: false,
        }
    }

    /// The creature that comes back from a reborn death: base attack, one health.
    pub fn reborn_copy(&self) -> Self {
        let attack = if self.golden {
            self.template.attack * 2
        } else {
            self.template.attack
        };
        let mut copy = Self::with_stats(&self.template, attack, 1, self.golden);
        copy.reborn_consumed = true;
        copy
    }

    /// Pre-combat state for the next shop phase: healed, flags cleared,
    /// template keywords re-armed.
    pub fn restored(&self) -> Self {
        Self {
            health: self.max_health,
            dying: false,
            last_damage_taken: 0,
            shield_consumed: false,
            reborn_consumed: false,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn tier(&self) -> u8 {
        self.template.tier
    }

    pub fn keywords(&self) -> &Keywords {
        &self.template.keywords
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn has_taunt(&self) -> bool {
        self.template.keywords.taunt
    }

    pub fn has_divine_shield(&self) -> bool {
        self.template.keywords.divine_shield && !self.shield_consumed
    }

    pub fn can_reborn(&self) -> bool {
        self.template.keywords.reborn && !self.reborn_consumed
    }

    pub fn buff(&mut self, attack: i32, health: i32) {
        self.attack += attack;
        self.health += health;
        self.max_health += health;
    }

    /// Applies one hit. An active divine shield absorbs the whole hit and is
    /// consumed, even by a 0-attack hit. Returns the damage that actually landed.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        if self.has_divine_shield() {
            self.shield_consumed = true;
            self.last_damage_taken = 0;
            return 0;
        }
        if amount <= 0 {
            self.last_damage_taken = 0;
            return 0;
        }
        self.health -= amount;
        self.last_damage_taken = amount;
        amount
    }

    pub fn view(&self) -> CreatureView {
        CreatureView {
            id: self.id,
            template_id: self.template.id.clone(),
            name: self.template.name.clone(),
            attack: self.attack,
            health: self.health,
            max_health: self.max_health,
            tier: self.template.tier,
            golden: self.golden,
            taunt: self.has_taunt(),
            divine_shield: self.has_divine_shield(),
            dying: self.dying,
            last_damage_taken: self.last_damage_taken,
        }
    }
}

/// Flat snapshot of an instance for the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatureView {
    pub id: CreatureId,
    pub template_id: String,
    pub name: String,
    pub attack: i32,
    pub health: i32,
    pub max_health: i32,
    pub tier: u8,
    pub golden: bool,
    pub taunt: bool,
    pub divine_shield: bool,
    pub dying: bool,
    pub last_damage_taken: i32,
}
