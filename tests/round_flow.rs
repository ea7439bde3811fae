// Round state machine: phases, priority, pass counting, turn rollover,
// resource ramp and spell-mana banking.
use std::collections::HashMap;

use arcana_duel::engine::intent::Intent;
use arcana_duel::engine::state::{MainStep, MatchState, Phase};
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
        match_id: "round-flow".to_string(),
        seed: "flow-seed".to_string(),
        players: vec!["p1".to_string(), "p2".to_string()],
        decks: Some(decks),
    }
}

fn play(state: &MatchState, player: &str, card: &str) -> MatchState {
    let next = apply_intent(
        state,
        &Intent::PlayCard {
            player_id: player.to_string(),
            card_id: card.to_string(),
            lane: None,
        },
    );
    assert_ne!(&next, state, "{player} failed to play {card}");
    next
}

fn end_turn(state: &MatchState, player: &str) -> MatchState {
    let next = apply_intent(
        state,
        &Intent::EndTurn {
            player_id: player.to_string(),
        },
    );
    assert_ne!(&next, state, "{player} failed to end turn");
    next
}

#[test]
fn opening_state_shape() {
    let state = create_initial_state(&config_with_decks(
        &["wands_01", "wands_02", "cups_01", "cups_02", "swords_01"],
        &["cups_01", "cups_02", "swords_01", "swords_02", "pentacles_01"],
    ));
    assert_eq!(state.turn, 1);
    assert_eq!(state.phase, Phase::Main(MainStep::Idle));
    assert_eq!(state.priority, "p1");
    assert_eq!(state.attack_token.as_deref(), Some("p1"));
    for player in ["p1", "p2"] {
        let pool = &state.resources[player];
        assert_eq!((pool.mana, pool.max_mana, pool.spell_mana), (1, 1, 0));
        assert_eq!(pool.fate, 2);
        assert_eq!(state.nexus[player].health, 20);
        assert_eq!(state.hands[player].len(), 4);
    }
}

#[test]
fn play_end_play_end_reaches_turn_two() {
    let config = config_with_decks(
        &["wands_01", "wands_02", "cups_01", "cups_02"],
        &["wands_01", "cups_01", "cups_02", "swords_01"],
    );
    let state = create_initial_state(&config);

    // p1 plays a unit; priority passes to p2.
    let state = play(&state, "p1", "wands_01");
    assert_eq!(state.priority, "p2");
    let board: Vec<_> = state.boards["p1"].iter().flatten().collect();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].card_id, "wands_01");

    // p2 ends; p1 plays another turn? No — p1's remaining action is ending.
    let state = end_turn(&state, "p2");
    assert_eq!(state.priority, "p1");
    assert_eq!(state.turn, 1);

    let state = end_turn(&state, "p1");
    // Both ended: the round rolls over.
    assert_eq!(state.turn, 2);
    assert_eq!(state.phase, Phase::Main(MainStep::Idle));
    // Attack token alternates to p2, who also takes first priority.
    assert_eq!(state.attack_token.as_deref(), Some("p2"));
    assert_eq!(state.priority, "p2");
    // Mana ramps and refills; fate ticks.
    for player in ["p1", "p2"] {
        let pool = &state.resources[player];
        assert_eq!(pool.max_mana, 2);
        assert_eq!(pool.mana, 2);
        assert_eq!(pool.fate, 3);
    }
}

#[test]
fn summon_and_immediate_end_turn_reach_turn_two() {
    // Each player summons and ends at once, without waiting for priority to
    // come back around: ending is a declaration, not a stack action.
    let mut decks = HashMap::new();
    decks.insert(
        "p1".to_string(),
        vec!["wands_01", "cups_01", "cups_02", "swords_01"]
            .into_iter()
            .map(String::from)
            .collect(),
    );
    decks.insert(
        "p2".to_string(),
        vec!["wands_02", "cups_01", "cups_02", "swords_01"]
            .into_iter()
            .map(String::from)
            .collect(),
    );
    let config = MatchConfig {
        match_id: "opening".to_string(),
        seed: "a1b2c3".to_string(),
        players: vec!["p1".to_string(), "p2".to_string()],
        decks: Some(decks),
    };
    let state = create_initial_state(&config);

    let state = play(&state, "p1", "wands_01");
    assert_eq!(state.priority, "p2");
    let state = end_turn(&state, "p1");
    let state = play(&state, "p2", "wands_02");
    let state = end_turn(&state, "p2");

    assert_eq!(state.turn, 2);
    assert_eq!(state.attack_token.as_deref(), Some("p2"));
    let summoned = |p: &str| {
        state.boards[p]
            .iter()
            .flatten()
            .map(|u| u.card_id.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(summoned("p1"), vec!["wands_01"]);
    assert_eq!(summoned("p2"), vec!["wands_02"]);
}

#[test]
fn ended_players_cannot_act_but_may_still_pass() {
    let config = config_with_decks(
        &["wands_01", "wands_02", "cups_01", "cups_02"],
        &["wands_01", "cups_01", "cups_02", "swords_01"],
    );
    let state = create_initial_state(&config);
    // p1 ends without priority after passing it away with a play.
    let state = play(&state, "p1", "wands_01");
    let state = end_turn(&state, "p1");
    assert_eq!(state.priority, "p2");
    // p2 keeps acting; a second end from p1 stays rejected.
    let state = play(&state, "p2", "wands_01");
    let next = apply_intent(
        &state,
        &Intent::EndTurn {
            player_id: "p1".to_string(),
        },
    );
    assert_eq!(next, state);
    // Having ended does not take away p1's priority passes.
    let passed = apply_intent(
        &state,
        &Intent::Pass {
            player_id: "p1".to_string(),
        },
    );
    assert_ne!(passed, state);
}

#[test]
fn double_pass_ends_the_round() {
    let config = config_with_decks(
        &["wands_01", "wands_02", "cups_01", "cups_02"],
        &["wands_01", "cups_01", "cups_02", "swords_01"],
    );
    let state = create_initial_state(&config);
    let state = apply_intent(
        &state,
        &Intent::Pass {
            player_id: "p1".to_string(),
        },
    );
    assert_eq!(state.turn, 1);
    let state = apply_intent(
        &state,
        &Intent::Pass {
            player_id: "p2".to_string(),
        },
    );
    assert_eq!(state.turn, 2);
    assert_eq!(state.phase, Phase::Main(MainStep::Idle));
}

#[test]
fn unspent_mana_banks_as_spell_mana() {
    let config = config_with_decks(
        &["wands_01", "wands_02", "cups_01", "cups_02"],
        &["wands_01", "cups_01", "cups_02", "swords_01"],
    );
    let state = create_initial_state(&config);
    // Nobody spends round 1; both players bank 1 spell mana.
    let state = end_turn(&state, "p1");
    let state = end_turn(&state, "p2");
    assert_eq!(state.resources["p1"].spell_mana, 1);
    assert_eq!(state.resources["p2"].spell_mana, 1);

    // Banked mana caps at 3 after enough idle rounds.
    let mut state = state;
    for _ in 0..4 {
        let first = state.priority.clone();
        state = end_turn(&state, &first);
        let second = state.priority.clone();
        state = end_turn(&state, &second);
    }
    assert_eq!(state.resources["p1"].spell_mana, 3);
}

#[test]
fn intent_out_of_priority_is_a_no_op() {
    let config = config_with_decks(
        &["wands_01", "wands_02", "cups_01", "cups_02"],
        &["wands_01", "cups_01", "cups_02", "swords_01"],
    );
    let state = create_initial_state(&config);
    // p2 does not hold priority at match start.
    let next = apply_intent(
        &state,
        &Intent::PlayCard {
            player_id: "p2".to_string(),
            card_id: "wands_01".to_string(),
            lane: None,
        },
    );
    assert_eq!(next, state);
    let next = apply_intent(
        &state,
        &Intent::Pass {
            player_id: "p2".to_string(),
        },
    );
    assert_eq!(next, state);
}

#[test]
fn cannot_afford_means_no_op() {
    let config = config_with_decks(
        &["wands_03", "wands_02", "cups_01", "cups_02"],
        &["wands_01", "cups_01", "cups_02", "swords_01"],
    );
    let state = create_initial_state(&config);
    // wands_03 costs 5; round 1 mana is 1.
    let next = apply_intent(
        &state,
        &Intent::PlayCard {
            player_id: "p1".to_string(),
            card_id: "wands_03".to_string(),
            lane: None,
        },
    );
    assert_eq!(next, state);
}

#[test]
fn ended_player_cannot_end_again() {
    let config = config_with_decks(
        &["wands_01", "wands_02", "cups_01", "cups_02"],
        &["wands_01", "cups_01", "cups_02", "swords_01"],
    );
    let state = create_initial_state(&config);
    let state = end_turn(&state, "p1");
    // p2 hands priority straight back without ending.
    let state = apply_intent(
        &state,
        &Intent::Pass {
            player_id: "p2".to_string(),
        },
    );
    // p1 already ended this round.
    let next = apply_intent(
        &state,
        &Intent::EndTurn {
            player_id: "p1".to_string(),
        },
    );
    assert_eq!(next, state);
}

#[test]
fn fast_spell_resolves_lifo_after_two_passes() {
    // p1 casts Sudden Gale (fast, damage_nexus(2)); p2 answers with their
    // own; LIFO resolution applies p2's first. Both hit, so order is only
    // observable through the stack emptying and both nexus totals dropping.
    let config = config_with_decks(
        &["swords_04", "wands_02", "cups_01", "cups_02"],
        &["swords_04", "cups_01", "cups_02", "swords_01"],
    );
    let state = create_initial_state(&config);
    // Ramp to round 3 so both can afford cost 3.
    let mut state = state;
    for _ in 0..2 {
        let first = state.priority.clone();
        state = end_turn(&state, &first);
        let second = state.priority.clone();
        state = end_turn(&state, &second);
    }
    assert_eq!(state.turn, 3);
    assert_eq!(state.priority, "p1");

    let state = play(&state, "p1", "swords_04");
    assert_eq!(state.phase, Phase::Main(MainStep::SpellStack));
    assert_eq!(state.spell_stack.len(), 1);
    assert_eq!(state.priority, "p2");

    let state = play(&state, "p2", "swords_04");
    assert_eq!(state.spell_stack.len(), 2);
    assert_eq!(state.priority, "p1");

    let state = apply_intent(
        &state,
        &Intent::Pass {
            player_id: "p1".to_string(),
        },
    );
    assert_eq!(state.spell_stack.len(), 2, "one pass must not resolve");
    let state = apply_intent(
        &state,
        &Intent::Pass {
            player_id: "p2".to_string(),
        },
    );
    assert!(state.spell_stack.is_empty());
    assert_eq!(state.phase, Phase::Main(MainStep::Idle));
    assert_eq!(state.nexus["p1"].health, 18);
    assert_eq!(state.nexus["p2"].health, 18);
}

#[test]
fn spread_assignment_is_stored_and_replaceable() {
    let config = config_with_decks(
        &["wands_01", "wands_02", "cups_01", "cups_02"],
        &["wands_01", "cups_01", "cups_02", "swords_01"],
    );
    let state = create_initial_state(&config);
    // Spreads are bookkeeping, not priority-gated: p2 may assign at any time.
    let state = apply_intent(
        &state,
        &Intent::AssignSpread {
            player_id: "p2".to_string(),
            past_id: Some("cups_01".to_string()),
            present_id: Some("swords_01".to_string()),
            future_id: None,
        },
    );
    let spread = &state.spreads["p2"];
    assert_eq!(spread.past.as_deref(), Some("cups_01"));
    assert_eq!(spread.present.as_deref(), Some("swords_01"));
    assert_eq!(spread.future, None);

    // Reassigning replaces the whole spread.
    let state = apply_intent(
        &state,
        &Intent::AssignSpread {
            player_id: "p2".to_string(),
            past_id: None,
            present_id: None,
            future_id: Some("wands_01".to_string()),
        },
    );
    assert_eq!(state.spreads["p2"].past, None);
    assert_eq!(state.spreads["p2"].future.as_deref(), Some("wands_01"));

    // Unknown cards are rejected outright.
    let next = apply_intent(
        &state,
        &Intent::AssignSpread {
            player_id: "p2".to_string(),
            past_id: Some("no_such_card".to_string()),
            present_id: None,
            future_id: None,
        },
    );
    assert_eq!(next, state);
}

#[test]
fn slow_card_cannot_answer_a_live_stack() {
    let config = config_with_decks(
        &["swords_04", "wands_02", "cups_01", "cups_02"],
        &["pentacles_04", "cups_01", "cups_02", "swords_01"],
    );
    let mut state = create_initial_state(&config);
    for _ in 0..2 {
        let first = state.priority.clone();
        state = end_turn(&state, &first);
        let second = state.priority.clone();
        state = end_turn(&state, &second);
    }
    let state = play(&state, "p1", "swords_04");
    // pentacles_04 is slow; the stack is live.
    let next = apply_intent(
        &state,
        &Intent::PlayCard {
            player_id: "p2".to_string(),
            card_id: "pentacles_04".to_string(),
            lane: None,
        },
    );
    assert_eq!(next, state);
}
