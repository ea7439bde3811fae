// Trials of Sun, Moon and Judgement, and how they interact with victory
// checks.
use std::collections::HashMap;

use arcana_duel::cards::Suit;
use arcana_duel::engine::intent::Intent;
use arcana_duel::engine::state::{MatchState, Orientation};
use arcana_duel::engine::trials::{evaluate, trials_winner, ActionDescriptor};
use arcana_duel::engine::{apply_intent, check_victory, create_initial_state, MatchConfig};

fn config() -> MatchConfig {
    let mut decks = HashMap::new();
    decks.insert(
        "p1".to_string(),
        vec![
            "wands_01".to_string(),
            "wands_02".to_string(),
            "cups_01".to_string(),
            "cups_02".to_string(),
        ],
    );
    decks.insert(
        "p2".to_string(),
        vec![
            "cups_01".to_string(),
            "cups_02".to_string(),
            "swords_01".to_string(),
            "swords_02".to_string(),
        ],
    );
    MatchConfig {
        match_id: "trials".to_string(),
        seed: "trials-seed".to_string(),
        players: vec!["p1".to_string(), "p2".to_string()],
        decks: Some(decks),
    }
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
fn moon_completes_after_two_rich_turn_ends() {
    // Fate grows 2 -> 3 -> 4 over idle rounds; ending at 3+ twice in a row
    // completes the Moon trial.
    let mut state = create_initial_state(&config());
    // Round 1 ends at fate 2: no streak.
    state = end_turn(&state, "p1");
    state = end_turn(&state, "p2");
    assert_eq!(state.trials["p1"].moon_streak, 0);
    // Round 2 ends at fate 3: streak 1.
    state = end_turn(&state, "p2");
    state = end_turn(&state, "p1");
    assert_eq!(state.trials["p1"].moon_streak, 1);
    assert!(!state.trials["p1"].moon_complete);
    // Round 3 ends at fate 4: streak 2 completes the trial for both players.
    state = end_turn(&state, "p1");
    state = end_turn(&state, "p2");
    assert!(state.trials["p1"].moon_complete);
    assert!(state.trials["p2"].moon_complete);
}

#[test]
fn moon_streak_resets_below_the_fate_floor() {
    let mut state = create_initial_state(&config());
    evaluate(
        &mut state,
        &ActionDescriptor::TurnEnded {
            player: "p1".to_string(),
            fate: 3,
        },
    );
    assert_eq!(state.trials["p1"].moon_streak, 1);
    evaluate(
        &mut state,
        &ActionDescriptor::TurnEnded {
            player: "p1".to_string(),
            fate: 2,
        },
    );
    assert_eq!(state.trials["p1"].moon_streak, 0);
    assert!(!state.trials["p1"].moon_complete);
}

#[test]
fn sun_completes_at_twenty_wands_damage() {
    let mut state = create_initial_state(&config());
    for _ in 0..3 {
        evaluate(
            &mut state,
            &ActionDescriptor::DamageDealt {
                player: "p1".to_string(),
                suit: Suit::Wands,
                amount: 6,
            },
        );
    }
    assert_eq!(state.trials["p1"].sun_damage, 18);
    assert!(!state.trials["p1"].sun_complete);
    // Off-suit damage never counts.
    evaluate(
        &mut state,
        &ActionDescriptor::DamageDealt {
            player: "p1".to_string(),
            suit: Suit::Swords,
            amount: 10,
        },
    );
    assert!(!state.trials["p1"].sun_complete);
    evaluate(
        &mut state,
        &ActionDescriptor::DamageDealt {
            player: "p1".to_string(),
            suit: Suit::Wands,
            amount: 2,
        },
    );
    assert!(state.trials["p1"].sun_complete);
}

#[test]
fn judgement_needs_both_orientations_of_one_card() {
    let mut state = create_initial_state(&config());
    evaluate(
        &mut state,
        &ActionDescriptor::CardPlayed {
            player: "p1".to_string(),
            card_id: "cups_04".to_string(),
            orientation: Orientation::Upright,
        },
    );
    evaluate(
        &mut state,
        &ActionDescriptor::CardPlayed {
            player: "p1".to_string(),
            card_id: "wands_05".to_string(),
            orientation: Orientation::Reversed,
        },
    );
    // Two different cards in two orientations is not enough.
    assert!(!state.trials["p1"].judgement_complete);
    evaluate(
        &mut state,
        &ActionDescriptor::CardPlayed {
            player: "p1".to_string(),
            card_id: "cups_04".to_string(),
            orientation: Orientation::Reversed,
        },
    );
    assert!(state.trials["p1"].judgement_complete);
}

#[test]
fn completed_trials_never_revert() {
    let mut state = create_initial_state(&config());
    for _ in 0..2 {
        evaluate(
            &mut state,
            &ActionDescriptor::TurnEnded {
                player: "p1".to_string(),
                fate: 5,
            },
        );
    }
    assert!(state.trials["p1"].moon_complete);
    // A lean turn resets the streak but not the completion.
    evaluate(
        &mut state,
        &ActionDescriptor::TurnEnded {
            player: "p1".to_string(),
            fate: 0,
        },
    );
    assert_eq!(state.trials["p1"].moon_streak, 0);
    assert!(state.trials["p1"].moon_complete);
}

#[test]
fn three_trials_win_over_any_score_threshold() {
    let mut state = create_initial_state(&config());
    // p1 is far ahead on cards played.
    state.play_counts.insert("p1".to_string(), 12);
    state.play_counts.insert("p2".to_string(), 2);
    assert_eq!(check_victory(&state, Some(5)).as_deref(), Some("p1"));

    // p2 completes all three trials: the trials win outranks the score.
    {
        let trials = state.trials.get_mut("p2").unwrap();
        trials.sun_complete = true;
        trials.moon_complete = true;
        trials.judgement_complete = true;
    }
    assert_eq!(trials_winner(&state).as_deref(), Some("p2"));
    assert_eq!(check_victory(&state, Some(5)).as_deref(), Some("p2"));
    assert_eq!(check_victory(&state, None).as_deref(), Some("p2"));
}

#[test]
fn score_threshold_requires_reaching_it() {
    let mut state = create_initial_state(&config());
    state.play_counts.insert("p1".to_string(), 5);
    state.play_counts.insert("p2".to_string(), 3);
    assert_eq!(check_victory(&state, Some(4)).as_deref(), Some("p1"));
    assert_eq!(check_victory(&state, Some(6)), None);
    assert_eq!(check_victory(&state, None), None);
}

#[test]
fn trials_winner_ends_the_match_mid_flow() {
    let mut state = create_initial_state(&config());
    {
        let trials = state.trials.get_mut("p2").unwrap();
        trials.sun_complete = true;
        trials.moon_complete = true;
        trials.judgement_complete = true;
    }
    // Any applied intent notices the completed trials and sets the winner.
    let state = apply_intent(
        &state,
        &Intent::Pass {
            player_id: "p1".to_string(),
        },
    );
    assert_eq!(state.winner.as_deref(), Some("p2"));
}
