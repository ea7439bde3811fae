// Card effect DSL behavior observed through full matches: orientation
// branches, timed buffs, burst timing and unknown-effect tolerance.
use std::collections::HashMap;

use arcana_duel::engine::intent::Intent;
use arcana_duel::engine::state::{MatchState, Orientation};
use arcana_duel::engine::{apply_intent, create_initial_state, MatchConfig};

fn config_with_decks(p1_deck: &[&str], p2_deck: &[&str]) -> MatchConfig {
    let mut decks = HashMap::new();
    decks.insert(
        "p1".to_string(),
        p1_deck.iter().map(|s| (*s).to_string()).collect(),
    );
    decks.insert(
        "p2".to_string(),
        p2_deck.iter().map(|s| (*s).to_string()).collect(),
    );
    MatchConfig {
        match_id: "effects".to_string(),
        seed: "effects-seed".to_string(),
        players: vec!["p1".to_string(), "p2".to_string()],
        decks: Some(decks),
    }
}

fn must(state: &MatchState, intent: Intent) -> MatchState {
    let next = apply_intent(state, &intent);
    assert_ne!(&next, state, "intent was rejected: {intent:?}");
    next
}

fn play(state: &MatchState, player: &str, card: &str, lane: Option<usize>) -> MatchState {
    must(
        state,
        Intent::PlayCard {
            player_id: player.to_string(),
            card_id: card.to_string(),
            lane,
        },
    )
}

fn pass(state: &MatchState, player: &str) -> MatchState {
    must(
        state,
        Intent::Pass {
            player_id: player.to_string(),
        },
    )
}

fn end_turn(state: &MatchState, player: &str) -> MatchState {
    must(
        state,
        Intent::EndTurn {
            player_id: player.to_string(),
        },
    )
}

#[test]
fn branch_upright_draws_two() {
    let config = config_with_decks(
        &[
            "pentacles_04",
            "wands_01",
            "cups_01",
            "cups_02",
            "swords_01",
            "swords_02",
            "swords_03",
        ],
        &["cups_01", "cups_02", "swords_01", "swords_02"],
    );
    let state = create_initial_state(&config);
    let state = end_turn(&state, "p1");
    let state = end_turn(&state, "p2");
    // Round 2: p2 leads; p1 resolves Turn of Fortune upright.
    let state = end_turn(&state, "p2");
    assert_eq!(state.decks["p1"].len(), 2);
    let state = play(&state, "p1", "pentacles_04", None);
    let state = pass(&state, "p2");
    let state = pass(&state, "p1");
    // draw(2) empties the two-card deck; hand went 5 -> 4 (cast) -> 6.
    assert!(state.decks["p1"].is_empty());
    assert_eq!(state.hands["p1"].len(), 6);
}

#[test]
fn branch_reversed_gains_fate() {
    let config = config_with_decks(
        &["wands_01", "pentacles_04", "cups_01", "cups_02"],
        &["cups_01", "cups_02", "swords_01", "swords_02"],
    );
    let state = create_initial_state(&config);
    // Round 1: open a window with a unit and flip the reading.
    let state = play(&state, "p1", "wands_01", None);
    let state = must(
        &state,
        Intent::FlipOrientation {
            player_id: "p1".to_string(),
            card_id: "pentacles_04".to_string(),
        },
    );
    assert_eq!(state.orientation_of("pentacles_04"), Orientation::Reversed);
    let state = end_turn(&state, "p2");
    let state = end_turn(&state, "p1");
    // Round 2: cast it reversed.
    let state = end_turn(&state, "p2");
    let fate_before = state.resources["p1"].fate;
    let state = play(&state, "p1", "pentacles_04", None);
    let state = pass(&state, "p2");
    let state = pass(&state, "p1");
    assert_eq!(state.resources["p1"].fate, fate_before + 1);
}

#[test]
fn burst_buff_expires_at_turn_end() {
    let config = config_with_decks(
        &["wands_01", "wands_05", "cups_01", "cups_02"],
        &["cups_01", "cups_02", "swords_01", "swords_02"],
    );
    let state = create_initial_state(&config);
    let state = play(&state, "p1", "wands_01", None); // u0, 2/1
    let state = end_turn(&state, "p2");
    let state = end_turn(&state, "p1");
    // Round 2: p2 leads, then p1 casts Ignite on its own lane 0.
    let state = end_turn(&state, "p2");
    let state = play(&state, "p1", "wands_05", Some(0));
    // Burst never yields priority.
    assert_eq!(state.priority, "p1");
    let buffed = state.boards["p1"][0].as_ref().unwrap();
    assert_eq!(buffed.attack, 4);
    assert_eq!(buffed.buffs.len(), 1);

    // The one-round buff expires in the caster's turn-end sweep.
    let state = end_turn(&state, "p1");
    let settled = state.boards["p1"][0].as_ref().unwrap();
    assert_eq!(settled.attack, 2);
    assert!(settled.buffs.is_empty());
}

#[test]
fn unknown_effect_resolves_as_a_no_op() {
    let config = config_with_decks(
        &["major_00", "wands_01", "cups_01", "cups_02"],
        &["cups_01", "cups_02", "swords_01", "swords_02"],
    );
    let state = create_initial_state(&config);
    // The Fool's effect name is undefined; the cast still resolves cleanly.
    let state = play(&state, "p1", "major_00", None);
    let state = pass(&state, "p2");
    let state = pass(&state, "p1");
    assert!(state.spell_stack.is_empty());
    assert!(!state.hands["p1"].iter().any(|c| c == "major_00"));
    assert_eq!(state.discards["p1"].len(), 0);
    assert_eq!(state.play_counts["p1"], 1);
    assert_eq!(state.winner, None);
}
