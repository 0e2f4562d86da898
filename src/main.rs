use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tavern_brawl::game::catalog::{catalog, initialize_catalog};
use tavern_brawl::game::opponent::CatalogGenerator;
use tavern_brawl::{
    AppError, AppResult, CommandOutcome, GameConfig, Phase, SessionActor, SessionEvent,
    SessionHandle,
};

/// Spends the shop phase with a simple greedy strategy: buy what we can
/// afford, play everything that fits, take the first discovery.
async fn play_shop_phase(handle: &SessionHandle, config: &GameConfig) -> AppResult<()> {
    loop {
        let snapshot = handle.snapshot().await?;
        if snapshot.phase == Phase::Discovery {
            if let Some(option) = snapshot.discovery_options.first() {
                handle.select_discovery(option.id).await?;
                continue;
            }
        }
        if snapshot.phase != Phase::Shop {
            return Ok(());
        }

        if let Some(card) = snapshot.hand.first() {
            if snapshot.board.len() < config.board_capacity {
                handle.play(card.id).await?;
                continue;
            }
        }

        let affordable = snapshot.shop.first().filter(|_| {
            snapshot.gold >= 3
                && snapshot.hand.len() < config.hand_capacity
                && snapshot.board.len() < config.board_capacity
        });
        match affordable {
            Some(offer) => match handle.buy(offer.id).await {
                Ok(_) => continue,
                Err(error) => {
                    warn!("🛒 Purchase skipped: {}", error);
                    return Ok(());
                }
            },
            None => return Ok(()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    initialize_catalog();
    let config = match std::env::args().nth(1) {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::headless(),
    };
    config.validate()?;

    info!("🎮 Starting autoplay session...");
    let generator = CatalogGenerator::new(Arc::new(catalog().clone()));
    let (handle, mut events) = SessionActor::spawn(config.clone(), generator);

    loop {
        play_shop_phase(&handle, &config).await?;

        match handle.start_combat().await {
            Ok(CommandOutcome::CombatStarting { epoch }) => {
                info!("⚔️ Combat {} starting", epoch)
            }
            Ok(_) => {}
            Err(AppError::EmptyBoardStart) => {
                warn!("🛑 Nothing to fight with, stopping");
                break;
            }
            Err(error) => return Err(error.into()),
        }

        let mut finished = None;
        while let Some(event) = events.recv().await {
            if let SessionEvent::CombatEnded { summary } = event {
                finished = Some(summary);
                break;
            }
        }
        let Some(summary) = finished else {
            return Err(AppError::SessionClosed.into());
        };
        info!(
            "🏁 Turn {}: {:?}, health {}",
            summary.turn, summary.verdict, summary.health_after
        );
        if summary.next_phase.is_terminal() {
            info!("🎉 Session over: {:?}", summary.next_phase);
            break;
        }
    }

    handle.shutdown();
    Ok(())
}
