use serde::Serialize;

use crate::config::GameConfig;
use crate::game::roster::Roster;

#[derive(Debug, Clone, Serialize)]
pub struct PlayerState {
    pub health: i32,
    pub max_health: i32,
    pub gold: u32,
    pub max_gold: u32,
    pub tier: u8,
    pub board: Roster,
    pub hand: Roster,
}

impl PlayerState {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            health: config.starting_health,
            max_health: config.starting_health,
            gold: config.starting_gold,
            max_gold: config.starting_gold,
            tier: 1,
            board: Roster::new(config.board_capacity),
            hand: Roster::new(config.hand_capacity),
        }
    }

    /// Applies combat damage, flooring health at zero. Returns true when the
    /// player is dead.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.health = (self.health - amount.max(0)).max(0);
        self.health == 0
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        self.gold >= cost
    }

    pub fn spend_gold(&mut self, amount: u32) -> bool {
        if self.gold >= amount {
            self.gold -= amount;
            true
        } else {
            false
        }
    }

    pub fn gain_gold(&mut self, amount: u32) {
        self.gold += amount;
    }

    pub fn reset_gold(&mut self, amount: u32) {
        self.gold = amount;
        self.max_gold = amount;
    }

    /// Hand and board copies of a non-golden creature.
    pub fn copies_owned(&self, name: &str) -> usize {
        self.hand.count_copies(name) + self.board.count_copies(name)
    }

    pub fn creature_count(&self) -> usize {
        self.hand.len() + self.board.len()
    }
}
