//! Heuristic AI controller.
//!
//! Generates the legal candidate moves for a player, scores each by applying
//! it to a copy of the state and evaluating the resulting board with a
//! difficulty-weighted heuristic, then selects with difficulty-tuned
//! randomization. Selection randomness comes from the same deterministic
//! stream as the engine, so AI turns replay exactly.

use std::str::FromStr;

use crate::cards::{card_set, CardKind};
use crate::engine::intent::{BlockAssignment, Intent};
use crate::engine::keywords;
use crate::engine::state::{CombatStep, MainStep, MatchState, Phase, Unit};
use crate::engine::{apply_intent, rng};

/// Score given to candidates whose simulation leaves the state unchanged.
const INVALID_SCORE: f64 = -1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "normal" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("Unknown difficulty {other}")),
        }
    }
}

/// Evaluation weights: board control, card advantage, health differential,
/// unspent-resource penalty, attack-token bonus.
struct Weights {
    board: f64,
    cards: f64,
    health: f64,
    unspent: f64,
    token: f64,
}

fn weights_for(difficulty: Difficulty) -> Weights {
    match difficulty {
        // Easy barely values the board and hoards resources.
        Difficulty::Easy => Weights {
            board: 1.0,
            cards: 0.5,
            health: 1.0,
            unspent: 0.1,
            token: 0.5,
        },
        Difficulty::Medium => Weights {
            board: 2.0,
            cards: 1.0,
            health: 1.5,
            unspent: 0.5,
            token: 1.0,
        },
        Difficulty::Hard => Weights {
            board: 3.0,
            cards: 1.5,
            health: 2.0,
            unspent: 1.0,
            token: 1.5,
        },
    }
}

fn board_value(state: &MatchState, player: &str) -> f64 {
    state
        .boards
        .get(player)
        .map(|board| {
            board
                .iter()
                .flatten()
                .map(|u| (u.attack + u.current_health()) as f64)
                .sum()
        })
        .unwrap_or(0.0)
}

fn evaluate(state: &MatchState, player: &str, weights: &Weights) -> f64 {
    let opponent = state.opponent(player);
    if state.winner.as_deref() == Some(player) {
        return 10_000.0;
    }
    if state.winner.as_deref() == Some(opponent.as_str()) {
        return -10_000.0;
    }
    let board = board_value(state, player) - board_value(state, &opponent);
    let cards = state.hands.get(player).map_or(0, Vec::len) as f64
        - state.hands.get(&opponent).map_or(0, Vec::len) as f64;
    let health = state.nexus.get(player).map_or(0, |n| n.health) as f64
        - state.nexus.get(&opponent).map_or(0, |n| n.health) as f64;
    let unspent = state
        .resources
        .get(player)
        .map_or(0, |p| p.mana + p.spell_mana) as f64;
    let token = if state.attack_token.as_deref() == Some(player) {
        1.0
    } else {
        0.0
    };

    weights.board * board + weights.cards * cards + weights.health * health
        - weights.unspent * unspent
        + weights.token * token
}

/// Ready attackers on a player's board, in slot order.
fn ready_attackers(state: &MatchState, player: &str) -> Vec<String> {
    state
        .boards
        .get(player)
        .map(|board| {
            board
                .iter()
                .flatten()
                .filter(|u| u.can_attack && !u.has_attacked && !u.is_attacking)
                .map(|u| u.id.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Greedy best-trade block assignment: for each attacker, pick the unused
/// legal blocker with the best trade value, if any assignment is worthwhile.
fn greedy_blocks(state: &MatchState, player: &str) -> Option<Vec<BlockAssignment>> {
    let combat = state.combat.as_ref()?;
    if combat.attacking_player == player {
        return None;
    }
    let blockers: Vec<&Unit> = state
        .boards
        .get(player)
        .map(|board| {
            board
                .iter()
                .flatten()
                .filter(|u| !u.is_attacking && !u.is_blocking)
                .collect()
        })
        .unwrap_or_default();

    let mut used: Vec<String> = Vec::new();
    let mut assignments = Vec::new();
    for pair in &combat.pairs {
        let Some(attacker) = state.unit(&pair.attacker_id) else {
            continue;
        };
        let mut best: Option<(f64, &Unit)> = None;
        for blocker in &blockers {
            if used.contains(&blocker.id) || !keywords::can_block(attacker, blocker) {
                continue;
            }
            let kills = blocker.attack >= attacker.current_health();
            let dies = attacker.attack >= blocker.current_health();
            let gained = if kills { attacker.attack + attacker.current_health() } else { 0 };
            let lost = if dies { blocker.attack + blocker.current_health() } else { 0 };
            let trade = gained - lost;
            // Blocking soaks attacker damage off the nexus even on a loss.
            let value = trade as f64 + attacker.attack as f64 * 0.5;
            if best.as_ref().map_or(true, |(b, _)| value > *b) {
                best = Some((value, blocker));
            }
        }
        if let Some((value, blocker)) = best {
            if value > 0.0 {
                used.push(blocker.id.clone());
                assignments.push(BlockAssignment {
                    blocker_id: blocker.id.clone(),
                    attacker_id: pair.attacker_id.clone(),
                });
            }
        }
    }
    if assignments.is_empty() {
        None
    } else {
        Some(assignments)
    }
}

/// All candidate moves for the player in the current state.
fn candidates(state: &MatchState, player: &str) -> Vec<Intent> {
    let mut moves = Vec::new();
    let empty = Vec::new();
    let hand = state.hands.get(player).unwrap_or(&empty);

    let mut seen: Vec<&String> = Vec::new();
    for card_id in hand {
        if seen.contains(&card_id) {
            continue;
        }
        seen.push(card_id);
        let Some(def) = card_set().get(card_id) else {
            continue;
        };
        match &def.kind {
            CardKind::Unit { .. } => moves.push(Intent::PlayCard {
                player_id: player.to_string(),
                card_id: card_id.clone(),
                lane: None,
            }),
            CardKind::Spell { .. } => {
                // Targeted spells get one candidate per occupied lane on the
                // relevant side; the engine rejects lanes that do not apply.
                let own_lanes: Vec<usize> = occupied_lanes(state, player);
                let opp_lanes: Vec<usize> = occupied_lanes(state, &state.opponent(player));
                if own_lanes.is_empty() && opp_lanes.is_empty() {
                    moves.push(Intent::PlayCard {
                        player_id: player.to_string(),
                        card_id: card_id.clone(),
                        lane: None,
                    });
                } else {
                    moves.push(Intent::PlayCard {
                        player_id: player.to_string(),
                        card_id: card_id.clone(),
                        lane: None,
                    });
                    for lane in own_lanes.iter().chain(opp_lanes.iter()) {
                        moves.push(Intent::PlayCard {
                            player_id: player.to_string(),
                            card_id: card_id.clone(),
                            lane: Some(*lane),
                        });
                    }
                }
            }
        }
    }

    if state.attack_token.as_deref() == Some(player)
        && state.phase == Phase::Main(MainStep::Idle)
    {
        let ready = ready_attackers(state, player);
        for id in &ready {
            moves.push(Intent::DeclareAttackers {
                player_id: player.to_string(),
                attacker_ids: vec![id.clone()],
            });
        }
        if ready.len() > 1 {
            moves.push(Intent::DeclareAttackers {
                player_id: player.to_string(),
                attacker_ids: ready.clone(),
            });
        }
        if ready.len() >= 3 {
            for i in 0..ready.len() {
                for j in (i + 1)..ready.len() {
                    moves.push(Intent::DeclareAttackers {
                        player_id: player.to_string(),
                        attacker_ids: vec![ready[i].clone(), ready[j].clone()],
                    });
                }
            }
        }
    }

    if state.phase == Phase::Combat(CombatStep::AttackDeclared) {
        if let Some(assignments) = greedy_blocks(state, player) {
            moves.push(Intent::DeclareBlockers {
                player_id: player.to_string(),
                block_assignments: assignments,
            });
        }
    }

    moves.push(Intent::Pass {
        player_id: player.to_string(),
    });
    moves.push(Intent::EndTurn {
        player_id: player.to_string(),
    });
    moves
}

fn occupied_lanes(state: &MatchState, player: &str) -> Vec<usize> {
    state
        .boards
        .get(player)
        .map(|board| {
            board
                .iter()
                .enumerate()
                .filter(|(_, u)| u.is_some())
                .map(|(i, _)| i)
                .collect()
        })
        .unwrap_or_default()
}

/// Pick the AI's move for this state. Hard always takes the top-scored move;
/// medium takes the top move 70% of the time, otherwise the second-best;
/// easy samples uniformly from the top half of the ranked list.
pub fn take_turn(state: &MatchState, player: &str, difficulty: Difficulty) -> Intent {
    let weights = weights_for(difficulty);
    let mut scored: Vec<(f64, Intent)> = candidates(state, player)
        .into_iter()
        .map(|intent| {
            let simulated = apply_intent(state, &intent);
            let score = if simulated == *state {
                INVALID_SCORE
            } else {
                // Declarations alone never resolve combat; preview the
                // resolution by letting the other side pass.
                let preview = match &intent {
                    Intent::DeclareAttackers { .. } | Intent::DeclareBlockers { .. } => {
                        let responder = simulated.priority.clone();
                        apply_intent(
                            &simulated,
                            &Intent::Pass {
                                player_id: responder,
                            },
                        )
                    }
                    _ => simulated,
                };
                evaluate(&preview, player, &weights)
            };
            (score, intent)
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.retain(|(score, _)| *score > INVALID_SCORE);

    let fallback = Intent::Pass {
        player_id: player.to_string(),
    };
    if scored.is_empty() {
        return fallback;
    }

    let ai_seed = format!("{}#ai", state.seed);
    match difficulty {
        Difficulty::Hard => scored[0].1.clone(),
        Difficulty::Medium => {
            let roll = rng::value(&ai_seed, state.rng_cursor);
            if roll < 0.7 || scored.len() < 2 {
                scored[0].1.clone()
            } else {
                scored[1].1.clone()
            }
        }
        Difficulty::Easy => {
            let half = (scored.len() + 1) / 2;
            let pick = rng::next_int(&ai_seed, state.rng_cursor, half as u64) as usize;
            scored[pick].1.clone()
        }
    }
}
