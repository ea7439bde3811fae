//! Alternate-victory trials: Sun, Moon and Judgement.
//!
//! The evaluator consumes action descriptors emitted by the transition
//! functions. Completing all three trials wins the match outright, checked
//! before any score-based tiebreak.

use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;

use crate::cards::Suit;
use crate::engine::state::{JudgementFlag, MatchState, Orientation};

/// Single authoritative home for every trial threshold.
pub mod thresholds {
    use crate::cards::Suit;

    /// Suit whose damage feeds the Sun trial.
    pub const SUN_SUIT: Suit = Suit::Wands;
    /// Total suit damage required to complete the Sun trial.
    pub const SUN_DAMAGE: i64 = 20;
    /// Minimum fate at end of turn to extend the Moon streak.
    pub const MOON_FATE_MIN: i64 = 3;
    /// Consecutive qualifying turn-ends required for the Moon trial.
    pub const MOON_STREAK: u32 = 2;
    /// Trials required for the alternate victory.
    pub const TRIALS_TO_WIN: u32 = 3;
}

/// What just happened, as far as trial accounting is concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde", tag = "action")]
pub enum ActionDescriptor {
    DamageDealt {
        player: String,
        suit: Suit,
        amount: i64,
    },
    TurnEnded {
        player: String,
        fate: i64,
    },
    CardPlayed {
        player: String,
        card_id: String,
        orientation: Orientation,
    },
}

/// Fold one descriptor into the acting player's trial progress.
/// Completion flags only ever go from false to true.
pub fn evaluate(state: &mut MatchState, descriptor: &ActionDescriptor) {
    match descriptor {
        ActionDescriptor::DamageDealt {
            player,
            suit,
            amount,
        } => {
            if *suit == thresholds::SUN_SUIT && *amount > 0 {
                if let Some(progress) = state.trials.get_mut(player) {
                    progress.sun_damage += amount;
                    if progress.sun_damage >= thresholds::SUN_DAMAGE {
                        progress.sun_complete = true;
                    }
                }
            }
        }
        ActionDescriptor::TurnEnded { player, fate } => {
            if let Some(progress) = state.trials.get_mut(player) {
                if *fate >= thresholds::MOON_FATE_MIN {
                    progress.moon_streak += 1;
                    if progress.moon_streak >= thresholds::MOON_STREAK {
                        progress.moon_complete = true;
                    }
                } else {
                    progress.moon_streak = 0;
                }
            }
        }
        ActionDescriptor::CardPlayed {
            player,
            card_id,
            orientation,
        } => {
            if let Some(progress) = state.trials.get_mut(player) {
                let flag = JudgementFlag {
                    orientation: *orientation,
                    card_id: card_id.clone(),
                };
                if !progress.judgement_seen.contains(&flag) {
                    progress.judgement_seen.push(flag);
                }
                let both_seen = progress.judgement_seen.iter().any(|f| {
                    f.card_id == *card_id && f.orientation == Orientation::Upright
                }) && progress.judgement_seen.iter().any(|f| {
                    f.card_id == *card_id && f.orientation == Orientation::Reversed
                });
                if both_seen {
                    progress.judgement_complete = true;
                }
            }
        }
    }
}

/// The player who has completed all trials, if any.
pub fn trials_winner(state: &MatchState) -> Option<String> {
    state
        .players
        .iter()
        .find(|p| {
            state
                .trials
                .get(*p)
                .is_some_and(|t| t.completed_count() >= thresholds::TRIALS_TO_WIN)
        })
        .cloned()
}
