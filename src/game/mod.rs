pub mod catalog;
pub mod combat;
pub mod combat_loop;
pub mod creature;
pub mod economy;
pub mod events;
pub mod opponent;
pub mod player;
pub mod roster;
pub mod session;
pub mod shop;
