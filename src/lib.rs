pub mod actors;
pub mod config;
pub mod errors;
pub mod game;

#[cfg(test)]
#[path = "tests/all.rs"]
mod tests;

// Re-export commonly used items for convenience
pub use actors::session_actor::{CommandOutcome, SessionActor, SessionHandle};
pub use config::GameConfig;
pub use errors::{AppError, AppResult};
pub use game::catalog::{catalog, initialize_catalog, Catalog};
pub use game::combat::{CombatSession, Side, Verdict};
pub use game::creature::{CreatureId, CreatureInstance, CreatureTemplate};
pub use game::events::SessionEvent;
pub use game::opponent::{CatalogGenerator, FallbackGenerator, OpponentGenerator};
pub use game::session::{GameSession, Phase, SessionSnapshot};
