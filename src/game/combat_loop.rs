use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::CombatPacing;
use crate::game::combat::{CombatSession, StepReport, Verdict};
use crate::game::events::{EventBroadcaster, SessionEvent};

/// Suspension point between visible sub-phases. Always yields, so an
/// aborted task stops here even with zero pacing.
async fn pause(duration: Duration) {
    if duration.is_zero() {
        tokio::task::yield_now().await;
    } else {
        sleep(duration).await;
    }
}

/// Drives `combat` to a verdict, publishing every step for rendering.
pub async fn run_combat<R: Rng + Send>(
    mut combat: CombatSession,
    rng: &mut R,
    pacing: &CombatPacing,
    events: &EventBroadcaster,
) -> Verdict {
    let opening = combat.snapshot();
    events.emit(SessionEvent::CombatStarted {
        first_attacker: combat.first_attacker(),
        player: opening.player,
        enemy: opening.enemy,
    });

    loop {
        match combat.step(rng) {
            StepReport::Finished(verdict) => return verdict,
            StepReport::Attack(record) => {
                events.emit(SessionEvent::AttackDeclared {
                    side: record.side,
                    attacker: record.attacker,
                    target: record.target,
                });
                pause(pacing.attack()).await;

                events.emit(SessionEvent::AttackResolved {
                    attacker: record.attacker,
                    target: record.target,
                    cleaved: record.cleaved,
                    snapshot: record.impact,
                });
                pause(pacing.impact()).await;

                if !record.deaths.is_empty() {
                    events.emit(SessionEvent::DeathsMarked {
                        creatures: record.deaths,
                    });
                    pause(pacing.death()).await;
                }

                events.emit(SessionEvent::BoardsSettled {
                    snapshot: combat.snapshot(),
                });
                pause(pacing.settle()).await;
            }
        }
    }
}
