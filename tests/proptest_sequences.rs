// Property-based tests: random intent sequences keep the engine inside its
// invariants, and replay is always exact.
use proptest::prelude::*;

use arcana_duel::engine::intent::Intent;
use arcana_duel::engine::state::MatchState;
use arcana_duel::engine::{apply_intent, create_initial_state, replay, MatchConfig};

const CARDS: [&str; 8] = [
    "wands_01",
    "wands_03",
    "wands_04",
    "wands_05",
    "cups_02",
    "cups_04",
    "pentacles_04",
    "major_00",
];

fn config(seed: u64) -> MatchConfig {
    MatchConfig {
        match_id: "prop".to_string(),
        seed: format!("prop-{seed}"),
        players: vec!["p1".to_string(), "p2".to_string()],
        decks: None,
    }
}

/// Decode one op tuple into an intent; most will be rejected by the engine,
/// which is the point.
fn decode(op: (u8, bool, u8, u8)) -> Intent {
    let (selector, second, card_idx, lane) = op;
    let player = if second { "p2" } else { "p1" }.to_string();
    let card = CARDS[card_idx as usize % CARDS.len()].to_string();
    match selector % 8 {
        0 => Intent::Pass { player_id: player },
        1 => Intent::EndTurn { player_id: player },
        2 => Intent::PlayCard {
            player_id: player,
            card_id: card,
            lane: None,
        },
        3 => Intent::PlayCard {
            player_id: player,
            card_id: card,
            lane: Some(lane as usize % 6),
        },
        4 => Intent::Peek { player_id: player },
        5 => Intent::ForceDraw { player_id: player },
        6 => Intent::FlipOrientation {
            player_id: player,
            card_id: card,
        },
        _ => Intent::DeclareAttackers {
            player_id: player,
            attacker_ids: vec![format!("u{}", card_idx % 4)],
        },
    }
}

fn check_invariants(prev: &MatchState, state: &MatchState) -> Result<(), TestCaseError> {
    prop_assert!(state.turn >= prev.turn, "turn went backwards");
    for player in &state.players {
        let pool = &state.resources[player];
        prop_assert!(pool.mana >= 0 && pool.mana <= 10);
        prop_assert!(pool.spell_mana >= 0 && pool.spell_mana <= 3);
        prop_assert!(pool.fate >= 0 && pool.fate <= 5);
        let nexus = &state.nexus[player];
        prop_assert!(nexus.health <= nexus.max_health);
        let board = &state.boards[player];
        prop_assert_eq!(board.len(), 6);
        for unit in board.iter().flatten() {
            prop_assert!(unit.current_health() > 0, "dead unit left on board");
            prop_assert!(unit.attack >= 0);
        }
        // Trial completion is monotonic.
        let before = prev.trials[player].completed_count();
        let after = state.trials[player].completed_count();
        prop_assert!(after >= before, "a completed trial reverted");
    }
    if prev.winner.is_some() {
        prop_assert_eq!(&prev.winner, &state.winner, "winner changed");
    }
    Ok(())
}

proptest! {
    #[test]
    fn random_sequences_hold_invariants(
        seed in 0u64..1000,
        ops in prop::collection::vec((0u8..8, any::<bool>(), 0u8..8, 0u8..8), 0..60)
    ) {
        let mut state = create_initial_state(&config(seed));
        for op in ops {
            let next = apply_intent(&state, &decode(op));
            check_invariants(&state, &next)?;
            state = next;
        }
    }

    #[test]
    fn random_sequences_replay_exactly(
        seed in 0u64..1000,
        ops in prop::collection::vec((0u8..8, any::<bool>(), 0u8..8, 0u8..8), 0..40)
    ) {
        let config = config(seed);
        let intents: Vec<Intent> = ops.into_iter().map(decode).collect();
        let mut live = create_initial_state(&config);
        for intent in &intents {
            live = apply_intent(&live, intent);
        }
        prop_assert_eq!(live, replay(&config, &intents));
    }

    #[test]
    fn rejected_intents_change_nothing(
        seed in 0u64..1000,
        op in (0u8..8, any::<bool>(), 0u8..8, 0u8..8)
    ) {
        // Apply to a fresh match: either the intent applies or the state is
        // byte-identical, never anything in between.
        let state = create_initial_state(&config(seed));
        let intent = decode(op);
        let next = apply_intent(&state, &intent);
        if next != state {
            // An applied intent must come from a real player with priority
            // or an open window.
            prop_assert!(state.players.contains(&intent.player_id().to_string()));
        }
    }
}
