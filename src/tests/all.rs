//! Unit tests for the tavern brawl game modules
//! Run with: cargo test

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use crate::config::{FetchPolicy, GameConfig};
use crate::errors::ErrorCategory;
use crate::game::catalog::{catalog, Catalog};
use crate::game::combat::{CombatSession, Side, StepReport, Verdict};
use crate::game::creature::{
    CreatureInstance, CreatureTemplate, Effect, EffectKind, Keywords, Rarity,
};
use crate::game::economy::Purchase;
use crate::game::events::SessionEvent;
use crate::game::opponent::{fetch_opponent, CatalogGenerator, FallbackGenerator};
use crate::game::roster::{Roster, RosterError};
use crate::game::session::{GameSession, Outcome, Phase};
use crate::{AppError, AppResult};

fn template(id: &str, attack: i32, health: i32, tier: u8) -> CreatureTemplate {
    CreatureTemplate {
        id: id.to_string(),
        name: id.to_string(),
        attack,
        health,
        tier,
        cost: 3,
        rarity: Rarity::for_tier(tier),
        description: String::new(),
        keywords: Keywords::default(),
        tags: Vec::new(),
        effects: Vec::new(),
    }
}

fn with_keywords(mut template: CreatureTemplate, keywords: Keywords) -> CreatureTemplate {
    template.keywords = keywords;
    template
}

fn spawn(template: CreatureTemplate) -> CreatureInstance {
    CreatureInstance::instantiate(&Arc::new(template))
}

fn from_catalog(id: &str) -> CreatureInstance {
    CreatureInstance::instantiate(&catalog().template(id).unwrap())
}

fn shared_catalog() -> Arc<Catalog> {
    Arc::new(catalog().clone())
}

fn combat(
    player: Vec<CreatureInstance>,
    enemy: Vec<CreatureInstance>,
    first: Side,
) -> CombatSession {
    CombatSession::with_first_attacker(
        player,
        enemy,
        shared_catalog(),
        &GameConfig::headless(),
        first,
    )
}

fn attack_record(report: StepReport) -> crate::game::combat::AttackRecord {
    match report {
        StepReport::Attack(record) => record,
        StepReport::Finished(verdict) => panic!("combat ended early: {:?}", verdict),
    }
}

/// Session whose shop only ever offers a single 1/2 creature.
fn single_offer_session() -> GameSession {
    let catalog = Catalog::from_templates(vec![template("Tiny Recruit", 1, 2, 1)], vec![]).unwrap();
    GameSession::with_catalog(
        GameConfig::headless(),
        Arc::new(catalog),
        StdRng::seed_from_u64(7),
    )
}

fn seeded_session() -> GameSession {
    GameSession::with_seed(GameConfig::headless(), 42)
}

#[cfg(test)]
mod creature_tests {
    use super::*;

    #[test]
    fn test_instantiate_copies_template_stats() {
        let creature = spawn(template("Grunt", 2, 3, 1));

        assert_eq!(creature.attack, 2);
        assert_eq!(creature.health, 3);
        assert_eq!(creature.max_health, 3);
        assert!(!creature.golden);
        assert!(!creature.dying);
    }

    #[test]
    fn test_passive_bonus_applies_on_instantiate() {
        let mut grunt = template("Grunt", 2, 3, 1);
        grunt.effects.push(Effect::PassiveBuffSelf { value: 1 });

        let creature = spawn(grunt);

        assert_eq!((creature.attack, creature.health), (3, 4));
    }

    #[test]
    fn test_golden_is_exactly_double_base() {
        let mut grunt = template("Grunt", 2, 3, 1);
        grunt.effects.push(Effect::PassiveBuffSelf { value: 1 });

        let golden = CreatureInstance::merge_to_golden(&Arc::new(grunt));

        assert!(golden.golden);
        assert_eq!((golden.attack, golden.health), (4, 6));
    }

    #[test]
    fn test_divine_shield_absorbs_one_hit() {
        let mut creature = spawn(with_keywords(
            template("Shielded", 1, 2, 1),
            Keywords {
                divine_shield: true,
                ..Keywords::default()
            },
        ));

        assert_eq!(creature.take_damage(5), 0);
        assert_eq!(creature.health, 2);
        assert!(!creature.has_divine_shield());

        assert_eq!(creature.take_damage(1), 1);
        assert_eq!(creature.health, 1);
        assert_eq!(creature.last_damage_taken, 1);
    }

    #[test]
    fn test_id_displays_short_prefix() {
        let creature = spawn(template("Grunt", 2, 3, 1));
        let shown = creature.id.to_string();

        assert_eq!(shown.len(), 7);
        assert!(shown.starts_with('#'));
        assert_ne!(shown, spawn(template("Grunt", 2, 3, 1)).id.to_string());
    }

    #[test]
    fn test_zero_damage_still_pops_shield() {
        let mut creature = spawn(with_keywords(
            template("Shielded", 1, 2, 1),
            Keywords {
                divine_shield: true,
                ..Keywords::default()
            },
        ));

        assert_eq!(creature.take_damage(0), 0);
        assert!(!creature.has_divine_shield());
        assert_eq!(creature.health, 2);

        // Unshielded, a 0 hit changes nothing.
        assert_eq!(creature.take_damage(0), 0);
        assert_eq!(creature.health, 2);
    }

    #[test]
    fn test_reborn_copy_has_one_health() {
        let mummy = from_catalog("micro_mummy");
        assert!(mummy.can_reborn());

        let copy = mummy.reborn_copy();

        assert_eq!((copy.attack, copy.health), (1, 1));
        assert!(!copy.can_reborn());
        assert_ne!(copy.id, mummy.id);
    }

    #[test]
    fn test_restored_heals_and_rearms() {
        let mut protector = from_catalog("righteous_protector");
        protector.buff(1, 1);
        protector.take_damage(3);
        protector.take_damage(1);

        let restored = protector.restored();

        assert_eq!(restored.health, restored.max_health);
        assert_eq!(restored.attack, 2);
        assert!(restored.has_divine_shield());
        assert_eq!(restored.id, protector.id);
    }

    #[test]
    fn test_effect_kinds() {
        let voidlord = catalog().template("voidlord").unwrap();

        let deathrattles: Vec<&Effect> = voidlord.effects_of(EffectKind::OnDeath).collect();

        assert_eq!(deathrattles.len(), 1);
        assert_eq!(deathrattles[0].summon_token(), Some("token_voidwalker"));
        assert_eq!(voidlord.effects_of(EffectKind::OnPlay).count(), 0);
    }
}

#[cfg(test)]
mod roster_tests {
    use super::*;

    #[test]
    fn test_push_respects_capacity() {
        let mut roster = Roster::new(2);
        roster.push(spawn(template("A", 1, 1, 1))).unwrap();
        roster.push(spawn(template("B", 1, 1, 1))).unwrap();

        let result = roster.push(spawn(template("C", 1, 1, 1)));

        assert_eq!(result, Err(RosterError::Full));
        assert_eq!(roster.len(), 2);
        assert!(roster.is_full());
    }

    #[test]
    fn test_from_creatures_truncates() {
        let creatures: Vec<CreatureInstance> =
            (0..9).map(|_| spawn(template("A", 1, 1, 1))).collect();

        let roster = Roster::from_creatures(creatures, 7);

        assert_eq!(roster.len(), 7);
    }

    #[test]
    fn test_remove_copies_skips_golden() {
        let grunt = Arc::new(template("Grunt", 1, 1, 1));
        let mut roster = Roster::new(7);
        roster
            .push(CreatureInstance::merge_to_golden(&grunt))
            .unwrap();
        roster.push(CreatureInstance::instantiate(&grunt)).unwrap();
        roster.push(spawn(template("Other", 1, 1, 1))).unwrap();
        roster.push(CreatureInstance::instantiate(&grunt)).unwrap();

        assert_eq!(roster.count_copies("Grunt"), 2);
        let removed = roster.remove_copies("Grunt", 1);

        assert_eq!(removed.len(), 1);
        assert_eq!(roster.len(), 3);
        assert!(roster.at(0).unwrap().golden);
        assert_eq!(roster.at(1).unwrap().name(), "Other");
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut roster = Roster::new(7);
        let stranger = spawn(template("A", 1, 1, 1));

        assert_eq!(roster.remove(stranger.id).unwrap_err(), RosterError::NotFound);
    }
}

#[cfg(test)]
mod catalog_tests {
    use super::*;

    #[test]
    fn test_embedded_catalog_loads() {
        let catalog = Catalog::embedded().unwrap();

        assert_eq!(catalog.pool().len(), 15);
        assert!(catalog.token("token_voidwalker").is_some());
        assert!(catalog.pool().iter().all(|t| (1..=6).contains(&t.tier)));
    }

    #[test]
    fn test_shop_pool_filters_by_tier() {
        let pool = catalog().shop_pool(1);

        assert!(!pool.is_empty());
        assert!(pool.iter().all(|template| template.tier == 1));
        assert!(catalog().shop_pool(6).len() == catalog().pool().len());
    }

    #[test]
    fn test_unknown_template() {
        let result = catalog().template("nonexistent");

        assert!(matches!(result, Err(AppError::UnknownTemplate { .. })));
    }

    #[test]
    fn test_rejects_unknown_token() {
        let mut summoner = template("Summoner", 1, 1, 1);
        summoner.effects.push(Effect::DeathrattleSummon {
            token: "missing".to_string(),
            count: 1,
        });

        let result = Catalog::from_templates(vec![summoner], vec![]);

        assert!(matches!(result, Err(AppError::InvalidCatalog { .. })));
    }

    #[test]
    fn test_rejects_bad_tier_and_empty_pool() {
        assert!(Catalog::from_templates(vec![template("Huge", 1, 1, 7)], vec![]).is_err());
        assert!(Catalog::from_templates(vec![], vec![]).is_err());
        assert!(Catalog::from_json("not json").is_err());
    }
}

#[cfg(test)]
mod economy_tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let session = seeded_session();

        assert_eq!(session.turn, 1);
        assert_eq!(session.phase, Phase::Shop);
        assert_eq!(session.player.health, 30);
        assert_eq!(session.player.gold, 3);
        assert_eq!(session.player.tier, 1);
        assert_eq!(session.shop.offers.len(), 3);
        assert!(session.shop.offers.iter().all(|offer| offer.tier() == 1));
    }

    #[test]
    fn test_buy_moves_offer_to_hand() {
        let mut session = seeded_session();
        let offer = session.shop.offers[0].id;

        let purchase = session.buy(offer).unwrap();

        assert_eq!(purchase, Purchase::Added { creature: offer });
        assert_eq!(session.player.gold, 0);
        assert_eq!(session.player.hand.len(), 1);
        assert_eq!(session.shop.offers.len(), 2);
    }

    #[test]
    fn test_buy_without_gold() {
        let mut session = seeded_session();
        session.player.gold = 2;
        let offer = session.shop.offers[0].id;

        let result = session.buy(offer);

        assert_eq!(
            result,
            Err(AppError::InsufficientGold {
                needed: 3,
                available: 2
            })
        );
        assert_eq!(session.shop.offers.len(), 3);
    }

    #[test]
    fn test_buy_with_full_hand() {
        let mut session = single_offer_session();
        session.player.gold = 10;
        for _ in 0..5 {
            session
                .player
                .hand
                .push(spawn(template("Filler", 1, 1, 1)))
                .unwrap();
        }
        let offer = session.shop.offers[0].id;

        assert_eq!(session.buy(offer), Err(AppError::HandFull { capacity: 5 }));
        assert_eq!(session.player.gold, 10);
    }

    #[test]
    fn test_third_copy_triples_into_golden() {
        let mut session = single_offer_session();
        session.player.gold = 10;
        let offers: Vec<_> = session.shop.offers.iter().map(|offer| offer.id).collect();

        session.buy(offers[0]).unwrap();
        let second = session.buy(offers[1]).unwrap();
        assert!(matches!(second, Purchase::Added { .. }));
        // One copy on the board, one in hand: both count.
        let on_hand = session.player.hand.at(0).unwrap().id;
        session.play(on_hand).unwrap();
        assert_eq!(session.player.creature_count(), 2);

        let purchase = session.buy(offers[2]).unwrap();
        assert_eq!(session.player.creature_count(), 1);

        match purchase {
            Purchase::Tripled { consumed, .. } => assert_eq!(consumed.len(), 2),
            other => panic!("expected a triple, got {:?}", other),
        }
        assert_eq!(session.player.gold, 1);
        assert!(session.player.board.is_empty());
        assert_eq!(session.player.hand.len(), 1);
        let golden = session.player.hand.at(0).unwrap();
        assert!(golden.golden);
        assert_eq!((golden.attack, golden.health), (2, 4));
    }

    #[test]
    fn test_triple_takes_hand_copies_first() {
        let mut session = single_offer_session();
        session.player.gold = 10;
        let recruit = session.catalog().find_by_name("Tiny Recruit").unwrap();
        let hand_ids: Vec<_> = (0..2)
            .map(|_| {
                let copy = CreatureInstance::instantiate(&recruit);
                let id = copy.id;
                session.player.hand.push(copy).unwrap();
                id
            })
            .collect();
        let board_copy = CreatureInstance::instantiate(&recruit);
        let board_id = board_copy.id;
        session.player.board.push(board_copy).unwrap();
        let offer = session.shop.offers[0].id;

        let purchase = session.buy(offer).unwrap();

        match purchase {
            Purchase::Tripled { consumed, .. } => assert_eq!(consumed, hand_ids),
            other => panic!("expected a triple, got {:?}", other),
        }
        assert!(session.player.board.get(board_id).is_some());
        assert_eq!(session.player.hand.len(), 1);
        assert!(session.player.hand.at(0).unwrap().golden);
    }

    #[test]
    fn test_triple_removes_only_two_copies() {
        let mut session = single_offer_session();
        session.player.gold = 10;
        let recruit = session.catalog().find_by_name("Tiny Recruit").unwrap();
        let hand_copy = CreatureInstance::instantiate(&recruit);
        let hand_id = hand_copy.id;
        session.player.hand.push(hand_copy).unwrap();
        let board_ids: Vec<_> = (0..3)
            .map(|_| {
                let copy = CreatureInstance::instantiate(&recruit);
                let id = copy.id;
                session.player.board.push(copy).unwrap();
                id
            })
            .collect();
        let offer = session.shop.offers[0].id;

        let purchase = session.buy(offer).unwrap();

        // Hand copy, then the front board copy.
        match purchase {
            Purchase::Tripled { consumed, .. } => {
                assert_eq!(consumed, vec![hand_id, board_ids[0]])
            }
            other => panic!("expected a triple, got {:?}", other),
        }
        let left: Vec<_> = session.player.board.iter().map(|creature| creature.id).collect();
        assert_eq!(left, board_ids[1..].to_vec());
        assert_eq!(session.player.creature_count(), 3);
    }

    #[test]
    fn test_playing_golden_offers_discovery() {
        let mut session = single_offer_session();
        session.player.gold = 10;
        let offers: Vec<_> = session.shop.offers.iter().map(|offer| offer.id).collect();
        for offer in offers {
            session.buy(offer).unwrap();
        }
        let golden = session.player.hand.at(0).unwrap().id;

        let played = session.play(golden).unwrap();

        assert!(played.discovery_offered);
        assert_eq!(session.phase, Phase::Discovery);
        assert_eq!(session.discovery_options.len(), 3);
        assert_eq!(session.buy(golden), Err(AppError::WrongPhase {
            expected: Phase::Shop,
            actual: Phase::Discovery,
        }));

        let choice = session.discovery_options[1].id;
        session.select_discovery(choice).unwrap();

        assert_eq!(session.phase, Phase::Shop);
        assert!(session.discovery_options.is_empty());
        assert!(session.player.hand.get(choice).is_some());
    }

    #[test]
    fn test_play_onto_full_board() {
        let mut session = seeded_session();
        for _ in 0..7 {
            session
                .player
                .board
                .push(spawn(template("Filler", 1, 1, 1)))
                .unwrap();
        }
        let card = spawn(template("Late", 1, 1, 1));
        let card_id = card.id;
        session.player.hand.push(card).unwrap();

        assert_eq!(session.play(card_id), Err(AppError::BoardFull { capacity: 7 }));
        assert_eq!(session.player.hand.len(), 1);
    }

    #[test]
    fn test_battlecry_summon_and_buff() {
        let mut session = seeded_session();
        let cat = from_catalog("alleycat");
        let cat_id = cat.id;
        session.player.hand.push(cat).unwrap();
        session.play(cat_id).unwrap();

        assert_eq!(session.player.board.len(), 2);
        assert_eq!(session.player.board.at(1).unwrap().name(), "Tabby Cat");

        let recruit = from_catalog("tiny_recruit");
        let recruit_id = recruit.id;
        session.player.hand.push(recruit).unwrap();
        session.play(recruit_id).unwrap();

        let total_attack: i32 = session.player.board.iter().map(|c| c.attack).sum();
        // 1 (cat) + 1 (tabby) + 1 (recruit) + 1 buff
        assert_eq!(total_attack, 4);
        assert_eq!(session.player.board.get(recruit_id).unwrap().attack, 1);
    }

    #[test]
    fn test_battlecry_buff_by_tag() {
        let mut session = seeded_session();
        let mut murloc = template("Murloc Scout", 1, 1, 1);
        murloc.tags.push("Murloc".to_string());
        let scout = spawn(murloc);
        let scout_id = scout.id;
        session.player.board.push(scout).unwrap();
        session
            .player
            .board
            .push(spawn(template("Bystander", 1, 1, 1)))
            .unwrap();
        let king = from_catalog("king_bagurgle");
        let king_id = king.id;
        session.player.hand.push(king).unwrap();

        session.play(king_id).unwrap();

        let scout = session.player.board.get(scout_id).unwrap();
        assert_eq!((scout.attack, scout.health), (3, 3));
        assert_eq!(session.player.board.at(1).unwrap().attack, 1);
        assert_eq!(session.player.board.get(king_id).unwrap().attack, 6);
    }

    #[test]
    fn test_sell_golden_refunds_flat() {
        let mut session = seeded_session();
        let golden = CreatureInstance::merge_to_golden(&catalog().template("voidlord").unwrap());
        let golden_id = golden.id;
        session.player.board.push(golden).unwrap();
        session.player.gold = 0;

        assert_eq!(session.sell(golden_id), Ok(1));
        assert_eq!(session.player.gold, 1);
        assert!(session.player.board.is_empty());
        assert!(matches!(
            session.sell(golden_id),
            Err(AppError::CreatureNotOnBoard { .. })
        ));
    }

    #[test]
    fn test_refresh_costs_one_gold() {
        let mut session = seeded_session();
        session.player.gold = 1;

        session.refresh().unwrap();

        assert_eq!(session.player.gold, 0);
        assert_eq!(session.shop.offers.len(), 3);
        assert!(matches!(
            session.refresh(),
            Err(AppError::InsufficientGold { .. })
        ));
    }

    #[test]
    fn test_upgrade_tavern() {
        let mut session = seeded_session();
        session.player.gold = 4;
        assert!(matches!(
            session.upgrade_tavern(),
            Err(AppError::InsufficientGold { .. })
        ));

        session.player.gold = 5;
        assert_eq!(session.upgrade_tavern(), Ok(2));
        assert_eq!(session.player.gold, 0);

        session.player.tier = 6;
        session.player.gold = 10;
        assert_eq!(
            session.upgrade_tavern(),
            Err(AppError::TavernMaxTier { max_tier: 6 })
        );
        assert_eq!(session.player.gold, 10);
    }

    #[test]
    fn test_refresh_after_upgrade_offers_more() {
        let mut session = seeded_session();
        session.player.tier = 2;
        session.player.gold = 1;

        session.refresh().unwrap();

        assert_eq!(session.shop.offers.len(), 4);
        assert!(session.shop.offers.iter().all(|offer| offer.tier() <= 2));
    }

    #[test]
    fn test_freeze_keeps_offers_through_one_combat() {
        let mut session = seeded_session();
        session
            .player
            .board
            .push(spawn(template("Brute", 10, 10, 1)))
            .unwrap();
        assert_eq!(session.toggle_freeze(), Ok(true));
        let frozen: Vec<_> = session.shop.offers.iter().map(|offer| offer.id).collect();

        session
            .run_local_combat(vec![spawn(template("Weakling", 1, 1, 1))])
            .unwrap();

        let kept: Vec<_> = session.shop.offers.iter().map(|offer| offer.id).collect();
        assert_eq!(kept, frozen);
        assert!(!session.shop.frozen);

        session
            .run_local_combat(vec![spawn(template("Weakling", 1, 1, 1))])
            .unwrap();
        let rerolled: Vec<_> = session.shop.offers.iter().map(|offer| offer.id).collect();
        assert_ne!(rerolled, frozen);
    }
}

#[cfg(test)]
mod combat_tests {
    use super::*;

    #[test]
    fn test_taunt_trade_leaves_enemy_wounded() {
        let taunt = with_keywords(
            template("Guard", 1, 1, 1),
            Keywords {
                taunt: true,
                ..Keywords::default()
            },
        );
        let mut fight = combat(
            vec![spawn(taunt)],
            vec![spawn(template("Brute", 2, 2, 1))],
            Side::Player,
        );
        let mut rng = StdRng::seed_from_u64(1);

        let record = attack_record(fight.step(&mut rng));
        assert_eq!(record.deaths.len(), 1);

        assert_eq!(fight.run_to_end(&mut rng), Verdict::EnemyWins);
        assert_eq!(fight.enemy().at(0).unwrap().health, 1);
        assert!(fight.player().is_empty());
    }

    #[test]
    fn test_attacks_must_target_taunt() {
        let taunt = spawn(with_keywords(
            template("Wall", 1, 5, 1),
            Keywords {
                taunt: true,
                ..Keywords::default()
            },
        ));
        let taunt_id = taunt.id;
        let mut fight = combat(
            vec![spawn(template("Striker", 1, 10, 1))],
            vec![spawn(template("Open", 2, 2, 1)), taunt],
            Side::Player,
        );

        for seed in 0..8 {
            let mut trial = fight.clone();
            let record = attack_record(trial.step(&mut StdRng::seed_from_u64(seed)));
            assert_eq!(record.target, taunt_id);
        }
        let record = attack_record(fight.step(&mut StdRng::seed_from_u64(0)));
        assert_eq!(record.damage_to_target, 1);
    }

    #[test]
    fn test_divine_shield_attacker_survives() {
        let knight = with_keywords(
            template("Knight", 3, 3, 1),
            Keywords {
                divine_shield: true,
                ..Keywords::default()
            },
        );
        let mut fight = combat(
            vec![spawn(knight)],
            vec![spawn(template("Brute", 2, 2, 1))],
            Side::Player,
        );
        let mut rng = StdRng::seed_from_u64(3);

        let record = attack_record(fight.step(&mut rng));

        assert_eq!(record.damage_to_target, 3);
        assert_eq!(record.damage_to_attacker, 0);
        let knight = fight.player().at(0).unwrap();
        assert_eq!(knight.health, 3);
        assert!(!knight.has_divine_shield());
        assert_eq!(fight.run_to_end(&mut rng), Verdict::PlayerWins);
    }

    #[test]
    fn test_cleave_hits_neighbours() {
        let hydra = with_keywords(
            template("Hydra", 2, 10, 4),
            Keywords {
                cleave: true,
                ..Keywords::default()
            },
        );
        let wall = spawn(with_keywords(
            template("Wall", 1, 5, 1),
            Keywords {
                taunt: true,
                ..Keywords::default()
            },
        ));
        let wall_id = wall.id;
        let mut fight = combat(
            vec![spawn(hydra)],
            vec![
                spawn(template("Left", 1, 1, 1)),
                wall,
                spawn(template("Right", 1, 1, 1)),
            ],
            Side::Player,
        );

        let record = attack_record(fight.step(&mut StdRng::seed_from_u64(5)));

        assert_eq!(record.target, wall_id);
        assert_eq!(record.cleaved.len(), 2);
        assert_eq!(record.deaths.len(), 2);
        assert_eq!(fight.enemy().len(), 1);
        assert_eq!(fight.enemy().at(0).unwrap().health, 3);
    }

    #[test]
    fn test_poisonous_kills_any_size() {
        let viper = with_keywords(
            template("Viper", 1, 1, 1),
            Keywords {
                poisonous: true,
                ..Keywords::default()
            },
        );
        let mut fight = combat(
            vec![spawn(viper)],
            vec![spawn(template("Giant", 1, 20, 1))],
            Side::Player,
        );

        assert_eq!(fight.run_to_end(&mut StdRng::seed_from_u64(9)), Verdict::Draw);
    }

    #[test]
    fn test_reborn_returns_in_place() {
        let mut fight = combat(
            vec![from_catalog("micro_mummy")],
            vec![spawn(template("Brute", 5, 5, 1))],
            Side::Player,
        );

        let record = attack_record(fight.step(&mut StdRng::seed_from_u64(2)));

        assert_eq!(record.summoned.len(), 1);
        assert!(!record.attacker_survived);
        let copy = fight.player().at(0).unwrap();
        assert_eq!((copy.attack, copy.health), (1, 1));
        assert!(!copy.can_reborn());
        assert_eq!(fight.enemy().at(0).unwrap().health, 4);
    }

    #[test]
    fn test_deathrattle_summon_takes_slot() {
        let golem = from_catalog("harvest_golem");
        let mut fight = combat(
            vec![spawn(template("Front", 1, 50, 1)), golem],
            vec![spawn(template("Brute", 5, 50, 1))],
            Side::Enemy,
        );
        let mut rng = StdRng::seed_from_u64(11);

        // Enemy keeps swinging until the golem is hit.
        let mut summoned = Vec::new();
        while summoned.is_empty() {
            let record = attack_record(fight.step(&mut rng));
            summoned = record.summoned;
        }

        assert_eq!(fight.player().len(), 2);
        assert_eq!(fight.player().at(1).unwrap().name(), "Damaged Golem");
        assert_eq!(fight.player().at(1).unwrap().id, summoned[0]);
    }

    #[test]
    fn test_voidlord_summons_all_three_when_room() {
        let mut fight = combat(
            vec![from_catalog("voidlord"), spawn(template("Filler", 1, 50, 1))],
            vec![spawn(template("Titan", 20, 100, 6))],
            Side::Enemy,
        );

        let record = attack_record(fight.step(&mut StdRng::seed_from_u64(4)));

        assert_eq!(record.summoned.len(), 3);
        assert_eq!(fight.player().len(), 4);
        assert!(fight.player().at(0).unwrap().has_taunt());
        assert_eq!(fight.player().at(3).unwrap().name(), "Filler");
    }

    #[test]
    fn test_summons_never_exceed_capacity() {
        let mut player = vec![from_catalog("voidlord")];
        player.extend((0..6).map(|_| spawn(template("Filler", 1, 50, 1))));
        let mut fight = combat(
            player,
            vec![spawn(template("Titan", 20, 100, 6))],
            Side::Enemy,
        );

        let record = attack_record(fight.step(&mut StdRng::seed_from_u64(4)));

        assert_eq!(record.summoned.len(), 1);
        assert_eq!(fight.player().len(), 7);
        assert_eq!(fight.player().at(0).unwrap().name(), "Voidwalker");
    }

    #[test]
    fn test_deathrattle_damage_ignores_shield() {
        let guard = with_keywords(
            template("Guard", 3, 4, 1),
            Keywords {
                divine_shield: true,
                ..Keywords::default()
            },
        );
        let mut fight = combat(
            vec![from_catalog("kaboom_bot")],
            vec![spawn(guard)],
            Side::Player,
        );
        let mut rng = StdRng::seed_from_u64(6);

        let record = attack_record(fight.step(&mut rng));

        // Shield eats the attack, the deathrattle goes straight to health.
        assert_eq!(record.damage_to_target, 0);
        assert_eq!(record.deaths.len(), 2);
        assert!(fight.enemy().is_empty());
        assert_eq!(fight.run_to_end(&mut rng), Verdict::Draw);
    }

    #[test]
    fn test_deathrattle_buffs_tagged_allies() {
        let mut tabby = template("Tabby", 1, 1, 1);
        tabby.tags.push("Beast".to_string());
        let tabby = spawn(tabby);
        let tabby_id = tabby.id;
        let mut fight = combat(
            vec![from_catalog("mama_bear"), tabby],
            vec![spawn(with_keywords(
                template("Wall", 10, 50, 1),
                Keywords {
                    taunt: true,
                    ..Keywords::default()
                },
            ))],
            Side::Player,
        );

        attack_record(fight.step(&mut StdRng::seed_from_u64(8)));

        let tabby = fight.player().get(tabby_id).unwrap();
        assert_eq!((tabby.attack, tabby.health), (5, 5));
        assert_eq!(fight.player().len(), 1);
    }

    #[test]
    fn test_cursor_rotates_attackers() {
        let first = spawn(template("First", 1, 10, 1));
        let second = spawn(template("Second", 1, 10, 1));
        let (first_id, second_id) = (first.id, second.id);
        let mut fight = combat(
            vec![first, second],
            vec![spawn(template("Dummy", 0, 100, 1))],
            Side::Player,
        );
        let mut rng = StdRng::seed_from_u64(10);

        let attackers: Vec<_> = (0..6)
            .map(|_| attack_record(fight.step(&mut rng)))
            .filter(|record| record.side == Side::Player)
            .map(|record| record.attacker)
            .collect();

        assert_eq!(attackers, vec![first_id, second_id, first_id]);
    }

    #[test]
    fn test_dead_attacker_keeps_cursor() {
        let frail = spawn(template("Frail", 1, 1, 1));
        let sturdy = spawn(template("Sturdy", 1, 20, 1));
        let (frail_id, sturdy_id) = (frail.id, sturdy.id);
        let mut fight = combat(
            vec![frail, sturdy],
            vec![spawn(template("Wall", 5, 50, 1))],
            Side::Player,
        );
        let mut rng = StdRng::seed_from_u64(12);

        let record = attack_record(fight.step(&mut rng));
        assert_eq!(record.attacker, frail_id);
        assert!(!record.attacker_survived);
        assert_eq!(fight.cursor(Side::Player), 0);

        attack_record(fight.step(&mut rng));
        let record = attack_record(fight.step(&mut rng));
        assert_eq!(record.attacker, sturdy_id);
        assert_eq!(fight.cursor(Side::Player), 1);
    }

    #[test]
    fn test_zero_attack_hit_pops_shield() {
        let knight = with_keywords(
            template("Knight", 1, 5, 1),
            Keywords {
                divine_shield: true,
                ..Keywords::default()
            },
        );
        let mut fight = combat(
            vec![spawn(template("Pacifist", 0, 5, 1))],
            vec![spawn(knight)],
            Side::Player,
        );

        let record = attack_record(fight.step(&mut StdRng::seed_from_u64(13)));

        assert_eq!(record.damage_to_target, 0);
        assert_eq!(record.damage_to_attacker, 1);
        let knight = fight.enemy().at(0).unwrap();
        assert!(!knight.has_divine_shield());
        assert_eq!(knight.health, 5);
    }

    #[test]
    fn test_cascade_death_fires_deathrattle_before_verdict() {
        let golem = from_catalog("harvest_golem");
        let golem_id = golem.id;
        let mut fight = combat(vec![golem], vec![from_catalog("kaboom_bot")], Side::Enemy);
        let mut rng = StdRng::seed_from_u64(14);

        // Kaboom trades into the golem, then its deathrattle finishes it off
        // after the player side was already swept.
        let record = attack_record(fight.step(&mut rng));
        assert_eq!(record.deaths.len(), 1);
        assert!(fight.enemy().is_empty());
        assert!(fight.player().get(golem_id).unwrap().dying);

        assert!(matches!(
            fight.step(&mut rng),
            StepReport::Finished(Verdict::PlayerWins)
        ));
        assert_eq!(fight.player().len(), 1);
        let token = fight.player().at(0).unwrap();
        assert_eq!(token.name(), "Damaged Golem");
        assert!(token.is_alive());
    }

    #[test]
    fn test_stalemate_hits_step_limit() {
        let config = GameConfig {
            combat_step_limit: 10,
            ..GameConfig::headless()
        };
        let mut fight = CombatSession::with_first_attacker(
            vec![spawn(template("Pacifist", 0, 5, 1))],
            vec![spawn(template("Pacifist", 0, 5, 1))],
            shared_catalog(),
            &config,
            Side::Player,
        );

        assert_eq!(fight.run_to_end(&mut StdRng::seed_from_u64(0)), Verdict::Draw);
        assert_eq!(fight.steps(), 10);
        assert!(fight.is_finished());
    }

    #[test]
    fn test_empty_side_loses_immediately() {
        let mut fight = combat(
            vec![spawn(template("Lonely", 1, 1, 1))],
            vec![],
            Side::Enemy,
        );

        assert!(matches!(
            fight.step(&mut StdRng::seed_from_u64(0)),
            StepReport::Finished(Verdict::PlayerWins)
        ));
        assert_eq!(fight.verdict(), Some(Verdict::PlayerWins));
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;

    fn armed_session() -> GameSession {
        let mut session = seeded_session();
        session
            .player
            .board
            .push(spawn(template("Brute", 10, 10, 1)))
            .unwrap();
        session
    }

    #[test]
    fn test_begin_combat_needs_board() {
        let mut session = seeded_session();

        assert_eq!(session.begin_combat(), Err(AppError::EmptyBoardStart));
        assert!(!session.loading_opponent);
    }

    #[test]
    fn test_begin_combat_is_not_reentrant() {
        let mut session = armed_session();

        let request = session.begin_combat().unwrap();

        assert_eq!(request.epoch, 1);
        assert_eq!(session.begin_combat(), Err(AppError::CombatInProgress));
        let offer = session.shop.offers[0].id;
        assert_eq!(session.buy(offer), Err(AppError::OpponentLoading));
    }

    #[test]
    fn test_stale_opponent_is_ignored() {
        let mut session = armed_session();
        let request = session.begin_combat().unwrap();

        let stale = session.install_opponent(request.epoch + 1, vec![]);

        assert_eq!(
            stale.err(),
            Some(AppError::StaleCombat {
                epoch: request.epoch + 1
            })
        );
        assert!(session.loading_opponent);
    }

    #[test]
    fn test_win_costs_nothing_and_advances_turn() {
        let mut session = armed_session();
        session.player.board.at_mut(0).unwrap().take_damage(3);

        let summary = session
            .run_local_combat(vec![spawn(template("Weakling", 1, 1, 1))])
            .unwrap();

        assert_eq!(summary.verdict, Verdict::PlayerWins);
        assert_eq!(summary.damage_taken, 0);
        assert_eq!(summary.next_phase, Phase::Shop);
        assert_eq!(session.turn, 2);
        assert_eq!(session.player.gold, 5);
        assert_eq!(session.player.max_gold, 5);
        assert!(session.opponent_board.is_empty());
        // Board comes back healed.
        let brute = session.player.board.at(0).unwrap();
        assert_eq!(brute.health, brute.max_health);
    }

    #[test]
    fn test_loss_damage_counts_tiers() {
        let mut session = seeded_session();
        session
            .player
            .board
            .push(spawn(template("Weakling", 1, 1, 1)))
            .unwrap();

        let summary = session
            .run_local_combat(vec![
                spawn(template("Ogre", 10, 10, 3)),
                spawn(template("Troll", 10, 10, 2)),
            ])
            .unwrap();

        // 3 + 2 from the board, 1 from turn 1.
        assert_eq!(summary.verdict, Verdict::EnemyWins);
        assert_eq!(summary.damage_taken, 6);
        assert_eq!(session.player.health, 24);
        assert_eq!(session.player.board.len(), 1);
    }

    #[test]
    fn test_lethal_loss_ends_game() {
        let mut session = seeded_session();
        session.player.health = 1;
        session
            .player
            .board
            .push(spawn(template("Weakling", 1, 1, 1)))
            .unwrap();

        let summary = session
            .run_local_combat(vec![spawn(template("Ogre", 10, 10, 1))])
            .unwrap();

        assert_eq!(summary.next_phase, Phase::GameOver);
        assert_eq!(session.player.health, 0);
        assert_eq!(session.outcome, Some(Outcome::EnemyWon));
        let offer = session.shop.offers[0].id;
        assert_eq!(session.buy(offer), Err(AppError::GameEnded));
        assert_eq!(session.begin_combat(), Err(AppError::GameEnded));
    }

    #[test]
    fn test_surviving_turn_fifteen_wins() {
        let mut session = armed_session();
        session.turn = 15;

        let summary = session
            .run_local_combat(vec![spawn(template("Weakling", 1, 1, 1))])
            .unwrap();

        assert_eq!(summary.next_phase, Phase::Victory);
        assert_eq!(session.phase, Phase::Victory);
        assert_eq!(session.outcome, Some(Outcome::PlayerWon));
        assert!(session.phase.is_terminal());
    }

    #[test]
    fn test_restart_resets_and_bumps_epoch() {
        let mut session = armed_session();
        let request = session.begin_combat().unwrap();

        session.restart();

        assert_eq!(session.turn, 1);
        assert_eq!(session.phase, Phase::Shop);
        assert!(session.player.board.is_empty());
        assert!(!session.loading_opponent);
        assert!(session.combat_epoch > request.epoch);
        assert!(session.install_opponent(request.epoch, vec![]).is_err());
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let session = armed_session();

        let snapshot = session.snapshot();

        assert_eq!(snapshot.turn, 1);
        assert_eq!(snapshot.board.len(), 1);
        assert_eq!(snapshot.shop.len(), 3);
        assert!(!snapshot.shop_frozen);
        assert!(snapshot.last_combat.is_none());
    }
}

#[cfg(test)]
mod opponent_tests {
    use super::*;
    use std::future::Future;

    struct BrokenGenerator;

    impl crate::game::opponent::OpponentGenerator for BrokenGenerator {
        fn generate(
            &self,
            _turn: u32,
            _tier: u8,
        ) -> impl Future<Output = AppResult<Vec<CreatureInstance>>> + Send {
            async {
                Err(AppError::GeneratorUnavailable {
                    reason: "offline".to_string(),
                })
            }
        }
    }

    #[test]
    fn test_fallback_board_size_curve() {
        assert_eq!(FallbackGenerator::board_size(1), 1);
        assert_eq!(FallbackGenerator::board_size(3), 3);
        assert_eq!(FallbackGenerator::board_size(30), 7);
    }

    #[test]
    fn test_fallback_stats_are_positive() {
        let mut rng = StdRng::seed_from_u64(99);
        for turn in 1..=15 {
            let board = FallbackGenerator::synthesize(turn, &mut rng);
            assert_eq!(board.len(), FallbackGenerator::board_size(turn));
            assert!(board.iter().all(|c| c.attack >= 1 && c.health >= 1));
            assert!(board.iter().all(|c| (1..=6).contains(&c.tier())));
        }
    }

    #[test]
    fn test_catalog_generator_follows_curve() {
        let generator = CatalogGenerator::new(shared_catalog());
        let mut rng = StdRng::seed_from_u64(5);

        assert_eq!(generator.build(1, &mut rng).len(), 1);
        assert_eq!(generator.build(6, &mut rng).len(), 5);
        assert_eq!(generator.build(20, &mut rng).len(), 7);
        assert!(generator
            .build(2, &mut rng)
            .iter()
            .all(|c| c.tier() <= CatalogGenerator::estimated_tier(2)));
    }

    #[tokio::test]
    async fn test_fetch_falls_back_after_failures() {
        let policy = FetchPolicy {
            attempts: 2,
            backoff_ms: 0,
            timeout_ms: 100,
        };

        let board = fetch_opponent(&BrokenGenerator, 4, 2, &policy, 7).await;

        assert_eq!(board.len(), FallbackGenerator::board_size(4));
        assert!(board[0].name().starts_with("Void Construct"));
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GameConfig::default();

        assert_eq!(config.board_capacity, 7);
        assert_eq!(config.hand_capacity, 5);
        assert_eq!(config.victory_turn, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_offer_size_and_gold_curve() {
        let config = GameConfig::default();

        assert_eq!(config.offer_size(1), 3);
        assert_eq!(config.offer_size(2), 4);
        assert_eq!(config.offer_size(6), 6);
        assert_eq!(config.gold_for_turn(2), 5);
        assert_eq!(config.gold_for_turn(12), 10);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GameConfig::from_json_str(r#"{ "starting_health": 40 }"#).unwrap();

        assert_eq!(config.starting_health, 40);
        assert_eq!(config.board_capacity, 7);
        assert_eq!(config.pacing.attack_ms, 400);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = GameConfig::from_json_str(r#"{ "hand_capacity": 0 }"#);
        assert!(matches!(result, Err(AppError::InvalidConfig { .. })));

        let result = GameConfig::from_json_str(r#"{ "max_tier": 9 }"#);
        assert!(matches!(result, Err(AppError::InvalidConfig { .. })));
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            AppError::HandFull { capacity: 5 }.category(),
            ErrorCategory::RejectedCommand
        );
        assert_eq!(
            AppError::EmptyBoardStart.category(),
            ErrorCategory::ValidationError
        );
        assert!(AppError::SessionClosed.should_log());
        assert!(!AppError::OpponentLoading.should_log());
        assert_eq!(AppError::GameEnded.variant_name(), "GameEnded");
    }

    #[test]
    fn test_friendly_messages() {
        let error = AppError::InsufficientGold {
            needed: 3,
            available: 1,
        };

        assert_eq!(error.user_friendly_message(), "You need 3 gold for that");
        assert_eq!(error.to_string(), "Not enough gold: need 3, have 1");
    }

    #[test]
    fn test_event_serialization() {
        let event = SessionEvent::PhaseChanged {
            phase: Phase::Combat,
            turn: 3,
        };

        let json = event.to_json().unwrap();

        assert!(json.contains(r#""type":"PhaseChanged""#));
        assert!(json.contains(r#""phase":"Combat""#));
    }
}
