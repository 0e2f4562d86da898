use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::GameConfig;
use crate::game::catalog::Catalog;
use crate::game::creature::{CreatureId, CreatureInstance, CreatureView, Effect};
use crate::game::roster::Roster;

const SETTLE_PASS_LIMIT: usize = 16;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }

    fn wins(self) -> Verdict {
        match self {
            Side::Player => Verdict::PlayerWins,
            Side::Enemy => Verdict::EnemyWins,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Verdict {
    PlayerWins,
    EnemyWins,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatState {
    Running,
    Finished(Verdict),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BoardSnapshot {
    pub player: Vec<CreatureView>,
    pub enemy: Vec<CreatureView>,
}

/// One resolved exchange, in the order it happened.
#[derive(Debug, Clone, Serialize)]
pub struct AttackRecord {
    pub side: Side,
    pub attacker: CreatureId,
    pub target: CreatureId,
    pub damage_to_target: i32,
    pub damage_to_attacker: i32,
    pub cleaved: Vec<CreatureId>,
    pub deaths: Vec<CreatureId>,
    pub summoned: Vec<CreatureId>,
    pub attacker_survived: bool,
    /// Boards after damage, dying creatures still in place.
    pub impact: BoardSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub enum StepReport {
    Attack(AttackRecord),
    Finished(Verdict),
}

/// Scratch state of one fight. Owns its own copies of both boards; nothing
/// here touches the persisted player roster.
#[derive(Debug, Clone)]
pub struct CombatSession {
    player: Roster,
    enemy: Roster,
    player_cursor: usize,
    enemy_cursor: usize,
    active: Side,
    first_attacker: Side,
    state: CombatState,
    steps: u32,
    step_limit: u32,
    catalog: Arc<Catalog>,
}

impl CombatSession {
    pub fn new<R: Rng + ?Sized>(
        player: Vec<CreatureInstance>,
        enemy: Vec<CreatureInstance>,
        catalog: Arc<Catalog>,
        config: &GameConfig,
        rng: &mut R,
    ) -> Self {
        let first = if rng.random_bool(0.5) {
            Side::Player
        } else {
            Side::Enemy
        };
        Self::with_first_attacker(player, enemy, catalog, config, first)
    }

    pub fn with_first_attacker(
        player: Vec<CreatureInstance>,
        enemy: Vec<CreatureInstance>,
        catalog: Arc<Catalog>,
        config: &GameConfig,
        first: Side,
    ) -> Self {
        Self {
            player: Roster::from_creatures(player, config.board_capacity),
            enemy: Roster::from_creatures(enemy, config.board_capacity),
            player_cursor: 0,
            enemy_cursor: 0,
            active: first,
            first_attacker: first,
            state: CombatState::Running,
            steps: 0,
            step_limit: config.combat_step_limit,
            catalog,
        }
    }

    pub fn player(&self) -> &Roster {
        &self.player
    }

    pub fn enemy(&self) -> &Roster {
        &self.enemy
    }

    pub fn roster(&self, side: Side) -> &Roster {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    fn roster_mut(&mut self, side: Side) -> &mut Roster {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }

    pub fn cursor(&self, side: Side) -> usize {
        match side {
            Side::Player => self.player_cursor,
            Side::Enemy => self.enemy_cursor,
        }
    }

    fn advance_cursor(&mut self, side: Side) {
        match side {
            Side::Player => self.player_cursor += 1,
            Side::Enemy => self.enemy_cursor += 1,
        }
    }

    pub fn active_side(&self) -> Side {
        self.active
    }

    pub fn first_attacker(&self) -> Side {
        self.first_attacker
    }

    pub fn state(&self) -> CombatState {
        self.state
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self.state {
            CombatState::Finished(verdict) => Some(verdict),
            CombatState::Running => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.verdict().is_some()
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            player: self.player.views(),
            enemy: self.enemy.views(),
        }
    }

    pub fn run_to_end<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Verdict {
        loop {
            if let StepReport::Finished(verdict) = self.step(rng) {
                return verdict;
            }
        }
    }

    /// A side with no living creature counts as empty.
    fn terminal_verdict(&self) -> Option<Verdict> {
        let player_alive = self.player.living_count() > 0;
        let enemy_alive = self.enemy.living_count() > 0;
        match (player_alive, enemy_alive) {
            (true, true) => None,
            (true, false) => Some(Verdict::PlayerWins),
            (false, true) => Some(Verdict::EnemyWins),
            (false, false) => Some(Verdict::Draw),
        }
    }

    fn finish(&mut self, verdict: Verdict) -> StepReport {
        self.state = CombatState::Finished(verdict);
        debug!("🏁 Combat finished after {} steps: {:?}", self.steps, verdict);
        StepReport::Finished(verdict)
    }

    /// Wrap-around cursor; dead occupants are skipped by advancing the
    /// cursor without handing the turn over.
    fn select_attacker(&mut self, side: Side) -> Option<usize> {
        let len = self.roster(side).len();
        for _ in 0..len {
            let index = self.cursor(side) % len;
            if self.roster(side).at(index).is_some_and(CreatureInstance::is_alive) {
                return Some(index);
            }
            self.advance_cursor(side);
        }
        None
    }

    fn select_target<R: Rng + ?Sized>(&self, defending: Side, rng: &mut R) -> Option<usize> {
        let roster = self.roster(defending);
        let living: Vec<usize> = roster
            .iter()
            .enumerate()
            .filter(|(_, creature)| creature.is_alive())
            .map(|(index, _)| index)
            .collect();
        let taunts: Vec<usize> = living
            .iter()
            .copied()
            .filter(|&index| roster.at(index).is_some_and(CreatureInstance::has_taunt))
            .collect();
        let candidates = if taunts.is_empty() { living } else { taunts };
        candidates.choose(rng).copied()
    }

    /// One hit with divine shield and poisonous applied. Returns damage landed.
    fn hit(&mut self, side: Side, index: usize, amount: i32, poisonous: bool) -> i32 {
        let Some(creature) = self.roster_mut(side).at_mut(index) else {
            return 0;
        };
        let landed = creature.take_damage(amount);
        if landed > 0 && poisonous && creature.health > 0 {
            creature.health = 0;
        }
        landed
    }

    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> StepReport {
        if let CombatState::Finished(verdict) = self.state {
            return StepReport::Finished(verdict);
        }

        let mut deaths = Vec::new();
        let mut summoned = Vec::new();
        self.settle_lingering(rng, &mut deaths, &mut summoned);

        if let Some(verdict) = self.terminal_verdict() {
            return self.finish(verdict);
        }
        if self.steps >= self.step_limit {
            warn!("⏱️ Combat hit the {} step limit, calling a draw", self.step_limit);
            return self.finish(Verdict::Draw);
        }

        let side = self.active;
        let defending = side.opponent();

        let Some(attacker_index) = self.select_attacker(side) else {
            let verdict = self.terminal_verdict().unwrap_or(Verdict::Draw);
            return self.finish(verdict);
        };
        let Some(target_index) = self.select_target(defending, rng) else {
            return self.finish(side.wins());
        };

        // Both attack values are captured before either side is hurt.
        let Some(attacker) = self.roster(side).at(attacker_index).cloned() else {
            return self.finish(Verdict::Draw);
        };
        let Some(target) = self.roster(defending).at(target_index).cloned() else {
            return self.finish(side.wins());
        };
        let attacker_keywords = *attacker.keywords();
        let target_keywords = *target.keywords();

        debug!(
            "🗡️ {:?} {} ({}/{}) attacks {} ({}/{})",
            side,
            attacker.name(),
            attacker.attack,
            attacker.health,
            target.name(),
            target.attack,
            target.health
        );

        let damage_to_target = self.hit(
            defending,
            target_index,
            attacker.attack,
            attacker_keywords.poisonous,
        );
        let damage_to_attacker = self.hit(
            side,
            attacker_index,
            target.attack,
            target_keywords.poisonous,
        );

        let mut cleaved = Vec::new();
        if attacker_keywords.cleave {
            let neighbours = [target_index.checked_sub(1), Some(target_index + 1)];
            for index in neighbours.into_iter().flatten() {
                let alive_neighbour = self
                    .roster(defending)
                    .at(index)
                    .filter(|creature| creature.is_alive())
                    .map(|creature| creature.id);
                if let Some(id) = alive_neighbour {
                    self.hit(defending, index, attacker.attack, attacker_keywords.poisonous);
                    cleaved.push(id);
                }
            }
        }

        for roster in [&mut self.player, &mut self.enemy] {
            for creature in roster.iter_mut() {
                if !creature.is_alive() {
                    creature.dying = true;
                }
            }
        }
        let impact = self.snapshot();

        self.sweep(Side::Player, rng, &mut deaths, &mut summoned);
        self.sweep(Side::Enemy, rng, &mut deaths, &mut summoned);

        let attacker_survived = self
            .roster(side)
            .get(attacker.id)
            .is_some_and(CreatureInstance::is_alive);
        if attacker_survived {
            self.advance_cursor(side);
        }
        self.active = defending;
        self.steps += 1;

        StepReport::Attack(AttackRecord {
            side,
            attacker: attacker.id,
            target: target.id,
            damage_to_target,
            damage_to_attacker,
            cleaved,
            deaths,
            summoned,
            attacker_survived,
            impact,
        })
    }

    fn holds_dead(&self, side: Side) -> bool {
        self.roster(side).living_count() < self.roster(side).len()
    }

    /// Sweeps creatures killed by deathrattle damage after their own side was
    /// swept. Runs before the verdict check so their deathrattles and reborn
    /// still count.
    fn settle_lingering<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        deaths: &mut Vec<CreatureId>,
        summoned: &mut Vec<CreatureId>,
    ) {
        for _ in 0..SETTLE_PASS_LIMIT {
            if !self.holds_dead(Side::Player) && !self.holds_dead(Side::Enemy) {
                return;
            }
            self.sweep(Side::Player, rng, deaths, summoned);
            self.sweep(Side::Enemy, rng, deaths, summoned);
        }
        warn!("💀 Deathrattle chain still unsettled after {} passes", SETTLE_PASS_LIMIT);
    }

    /// Removes the side's dead, firing deathrattles and reborn in roster
    /// order. Summons take the dead creature's slot and never push the side
    /// past capacity. Deaths this causes on an already swept side are picked
    /// up by `settle_lingering` at the start of the next step.
    fn sweep<R: Rng + ?Sized>(
        &mut self,
        side: Side,
        rng: &mut R,
        deaths: &mut Vec<CreatureId>,
        summoned: &mut Vec<CreatureId>,
    ) {
        if self.roster(side).iter().all(CreatureInstance::is_alive) {
            return;
        }

        let capacity = self.roster(side).capacity();
        let slots = std::mem::replace(self.roster_mut(side), Roster::new(capacity)).into_creatures();
        let survivors = slots.iter().filter(|creature| creature.is_alive()).count();
        let mut room = capacity.saturating_sub(survivors);
        let mut next: Vec<CreatureInstance> = Vec::with_capacity(capacity);
        let mut tag_buffs: Vec<(String, i32)> = Vec::new();

        for creature in slots {
            if creature.is_alive() {
                next.push(creature);
                continue;
            }
            deaths.push(creature.id);
            debug!("💀 {:?} {} dies", side, creature.name());

            for effect in &creature.template.effects {
                match effect {
                    Effect::DeathrattleSummon { token, count } => {
                        let Some(template) = self.catalog.token(token) else {
                            warn!("Unknown deathrattle token '{}'", token);
                            continue;
                        };
                        for _ in 0..*count {
                            if room == 0 {
                                break;
                            }
                            let spawn = CreatureInstance::instantiate(&template);
                            summoned.push(spawn.id);
                            next.push(spawn);
                            room -= 1;
                        }
                    }
                    Effect::DeathrattleDamageRandomEnemy { value, targets } => {
                        let opposing = self.roster_mut(side.opponent());
                        let living: Vec<usize> = opposing
                            .iter()
                            .enumerate()
                            .filter(|(_, creature)| creature.is_alive())
                            .map(|(index, _)| index)
                            .collect();
                        let chosen: Vec<usize> = living
                            .choose_multiple(rng, *targets as usize)
                            .copied()
                            .collect();
                        for index in chosen {
                            if let Some(victim) = opposing.at_mut(index) {
                                victim.health -= value;
                                victim.last_damage_taken = *value;
                                if !victim.is_alive() {
                                    victim.dying = true;
                                }
                            }
                        }
                    }
                    Effect::DeathrattleBuffByTag { tag, value } => {
                        tag_buffs.push((tag.clone(), *value));
                    }
                    Effect::BattlecryBuffFriendlyRandom { .. }
                    | Effect::BattlecrySummon { .. }
                    | Effect::BattlecryBuffSelf { .. }
                    | Effect::BattlecryBuffByTag { .. }
                    | Effect::PassiveBuffSelf { .. } => {}
                }
            }

            if creature.can_reborn() && room > 0 {
                let copy = creature.reborn_copy();
                summoned.push(copy.id);
                next.push(copy);
                room -= 1;
            }
        }

        for (tag, value) in tag_buffs {
            for creature in next.iter_mut() {
                if creature.is_alive() && creature.template.has_tag(&tag) {
                    creature.buff(value, value);
                }
            }
        }

        self.roster_mut(side).replace_all(next);
    }
}
