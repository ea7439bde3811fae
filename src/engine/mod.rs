//! The match engine: a pure state-transition function over `MatchState`.
//!
//! `apply_intent` validates an intent against the current state and priority,
//! dispatches to the round machine / combat resolver / fate actions, then
//! runs trial accounting and the trigger queue. Illegal intents are no-ops:
//! the unchanged state comes back and callers probe legality by comparison.

pub mod combat;
pub mod effects;
pub mod intent;
pub mod keywords;
pub mod rng;
pub mod round;
pub mod state;
pub mod trials;

use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;
use std::collections::{HashMap, VecDeque};

use crate::cards;
use intent::Intent;
use state::{
    MainStep, MatchState, Nexus, Phase, ResourcePool, TrialProgress, BOARD_SLOTS, NEXUS_MAX,
    OPENING_HAND,
};
use trials::ActionDescriptor;

/// Everything needed to start (or replay) a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct MatchConfig {
    pub match_id: String,
    pub seed: String,
    pub players: Vec<String>,
    /// Optional per-player deck lists. Provided decks are used in order;
    /// absent decks fall back to the shuffled default deck.
    pub decks: Option<HashMap<String, Vec<String>>>,
}

/// Pure constructor: never fails for well-formed input.
pub fn create_initial_state(config: &MatchConfig) -> MatchState {
    let players = config.players.clone();
    let mut state = MatchState {
        match_id: config.match_id.clone(),
        seed: config.seed.clone(),
        players: players.clone(),
        turn: 1,
        phase: Phase::Main(MainStep::Idle),
        priority: players.first().cloned().unwrap_or_default(),
        attack_token: players.first().cloned(),
        pass_count: 0,
        ended_this_round: Vec::new(),
        resources: HashMap::new(),
        nexus: HashMap::new(),
        hands: HashMap::new(),
        decks: HashMap::new(),
        discards: HashMap::new(),
        boards: HashMap::new(),
        combat: None,
        spell_stack: Vec::new(),
        trials: HashMap::new(),
        orientations: HashMap::new(),
        reaction_window: None,
        trigger_queue: VecDeque::new(),
        flip_blocks: Vec::new(),
        used_flip_block: HashMap::new(),
        spreads: HashMap::new(),
        play_counts: HashMap::new(),
        next_unit_id: 0,
        next_stack_id: 0,
        rng_cursor: 0,
        winner: None,
    };

    for player in &players {
        state.resources.insert(player.clone(), ResourcePool::starting());
        state.nexus.insert(
            player.clone(),
            Nexus {
                health: NEXUS_MAX,
                max_health: NEXUS_MAX,
            },
        );
        state.trials.insert(player.clone(), TrialProgress::default());
        state.boards.insert(player.clone(), vec![None; BOARD_SLOTS]);
        state.discards.insert(player.clone(), Vec::new());
        state.play_counts.insert(player.clone(), 0);
        state.used_flip_block.insert(player.clone(), false);

        let configured = config
            .decks
            .as_ref()
            .and_then(|d| d.get(player))
            .cloned();
        let deck = match configured {
            // Caller-provided decks keep their order so tests and replays
            // control the draw sequence exactly.
            Some(deck) => deck,
            None => {
                let mut deck = cards::default_deck();
                state.rng_cursor = rng::shuffle(&state.seed, state.rng_cursor, &mut deck);
                deck
            }
        };
        state.decks.insert(player.clone(), deck);
        state.hands.insert(player.clone(), Vec::new());
        for _ in 0..OPENING_HAND {
            state.draw_card(player);
        }
    }
    state
}

/// Drain pending keyword triggers in FIFO order.
fn drain_triggers(state: &mut MatchState) {
    while let Some(trigger) = state.trigger_queue.pop_front() {
        if trigger.timing == keywords::KeywordTiming::OnSummon {
            keywords::apply_on_summon(state, &trigger.unit_id);
        }
    }
}

fn dispatch(
    state: &mut MatchState,
    intent: &Intent,
    out: &mut Vec<ActionDescriptor>,
) -> Result<(), String> {
    match intent {
        Intent::PlayCard {
            player_id,
            card_id,
            lane,
        } => round::handle_play_card(state, player_id, card_id, *lane, out),
        Intent::DeclareAttackers {
            player_id,
            attacker_ids,
        } => combat::declare_attackers(state, player_id, attacker_ids),
        Intent::DeclareBlockers {
            player_id,
            block_assignments,
        } => combat::declare_blockers(state, player_id, block_assignments),
        Intent::Pass { player_id } => round::handle_pass(state, player_id, out),
        Intent::EndTurn { player_id } => round::handle_end_turn(state, player_id, out),
        Intent::FlipOrientation { player_id, card_id } => {
            round::handle_flip(state, player_id, card_id)
        }
        Intent::Peek { player_id } => round::handle_peek(state, player_id),
        Intent::ForceDraw { player_id } => round::handle_force_draw(state, player_id),
        Intent::BlockFlip {
            player_id,
            target_player_id,
            card_id,
        } => round::handle_block_flip(state, player_id, target_player_id, card_id),
        Intent::AssignSpread {
            player_id,
            past_id,
            present_id,
            future_id,
        } => round::handle_assign_spread(
            state,
            player_id,
            past_id.clone(),
            present_id.clone(),
            future_id.clone(),
        ),
    }
}

/// Pure transition. Illegal intents return the state unchanged rather than
/// erroring, so callers can probe legality by before/after comparison.
pub fn apply_intent(state: &MatchState, intent: &Intent) -> MatchState {
    if state.winner.is_some() {
        return state.clone();
    }
    let mut next = state.clone();
    let mut descriptors: Vec<ActionDescriptor> = Vec::new();

    match dispatch(&mut next, intent, &mut descriptors) {
        Ok(()) => {
            drain_triggers(&mut next);
            next.bury_dead();
            for descriptor in &descriptors {
                trials::evaluate(&mut next, descriptor);
            }
            if next.winner.is_none() {
                if let Some(champion) = trials::trials_winner(&next) {
                    next.winner = Some(champion);
                }
            }
            next
        }
        Err(reason) => {
            log::debug!("intent rejected: {reason}");
            state.clone()
        }
    }
}

/// Pure victory query. Three completed trials win outright and are checked
/// before any score-based tiebreak.
pub fn check_victory(state: &MatchState, score_threshold: Option<u32>) -> Option<String> {
    if let Some(champion) = trials::trials_winner(state) {
        return Some(champion);
    }
    if let Some(winner) = &state.winner {
        return Some(winner.clone());
    }
    if let Some(threshold) = score_threshold {
        return state
            .players
            .iter()
            .filter(|p| state.play_counts.get(*p).copied().unwrap_or(0) >= threshold)
            .max_by_key(|p| state.play_counts.get(*p).copied().unwrap_or(0))
            .cloned();
    }
    None
}

/// Replay a match from its configuration and ordered intent list. Two runs
/// of this function produce identical states on any machine.
pub fn replay(config: &MatchConfig, intents: &[Intent]) -> MatchState {
    let mut state = create_initial_state(config);
    for intent in intents {
        state = apply_intent(&state, intent);
    }
    state
}
