//! Keyword registry: each unit ability maps to exactly one timing bucket and
//! one application rule. Sweeps walk boards in slot order so every engine
//! run visits keywords in the same sequence.

use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;

use super::state::{MatchState, Unit};

/// Named unit abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub enum Keyword {
    QuickAttack,
    Overwhelm,
    Lifesteal,
    Barrier,
    Tough,
    Fearsome,
    Elusive,
    Regeneration,
    Fury,
    Spellshield,
}

/// When a keyword's rule is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub enum KeywordTiming {
    PreCombat,
    OnStrike,
    OnDamage,
    OnSummon,
    TurnStart,
    TurnEnd,
    PostCombat,
}

impl Keyword {
    pub fn all() -> [Keyword; 10] {
        [
            Keyword::QuickAttack,
            Keyword::Overwhelm,
            Keyword::Lifesteal,
            Keyword::Barrier,
            Keyword::Tough,
            Keyword::Fearsome,
            Keyword::Elusive,
            Keyword::Regeneration,
            Keyword::Fury,
            Keyword::Spellshield,
        ]
    }

    /// Each keyword belongs to exactly one timing bucket.
    pub fn timing(self) -> KeywordTiming {
        match self {
            Keyword::Fearsome | Keyword::Elusive => KeywordTiming::PreCombat,
            Keyword::QuickAttack => KeywordTiming::OnStrike,
            Keyword::Overwhelm | Keyword::Lifesteal | Keyword::Barrier | Keyword::Tough => {
                KeywordTiming::OnDamage
            }
            Keyword::Spellshield => KeywordTiming::OnSummon,
            Keyword::Regeneration => KeywordTiming::TurnEnd,
            Keyword::Fury => KeywordTiming::PostCombat,
        }
    }
}

/// Blocker-declaration predicate. Elusive attackers require an Elusive
/// blocker; Fearsome attackers require a blocker with attack >= 3.
pub fn can_block(attacker: &Unit, blocker: &Unit) -> bool {
    if attacker.has_keyword(Keyword::Elusive) && !blocker.has_keyword(Keyword::Elusive) {
        return false;
    }
    if attacker.has_keyword(Keyword::Fearsome) && blocker.attack < 3 {
        return false;
    }
    true
}

/// Apply Barrier/Tough mitigation to a single incoming damage instance, then
/// decrement the unit's health by whatever remains. Returns the damage that
/// actually reached the unit's health.
pub fn soak_damage(unit: &mut Unit, amount: i64) -> i64 {
    if amount <= 0 {
        return 0;
    }
    if unit.barrier_active {
        // Barrier negates the whole instance, then is spent.
        unit.barrier_active = false;
        return 0;
    }
    let mut remaining = amount;
    if unit.has_keyword(Keyword::Tough) {
        remaining = (remaining - 1).max(0);
    }
    unit.damage += remaining;
    remaining
}

/// Run one unit's on-summon keyword rules.
pub fn apply_on_summon(state: &mut MatchState, unit_id: &str) {
    if let Some(unit) = state.unit_mut(unit_id) {
        if unit.has_keyword(Keyword::Barrier) {
            unit.barrier_active = true;
        }
        if unit.has_keyword(Keyword::Spellshield) {
            unit.spell_shield = true;
        }
    }
}

/// Turn-start sweep over a player's board in slot order.
pub fn turn_start_sweep(state: &mut MatchState, player: &str) {
    if let Some(board) = state.boards.get_mut(player) {
        for unit in board.iter_mut().flatten() {
            unit.can_attack = true;
            unit.has_attacked = false;
        }
    }
}

/// Turn-end sweep over a player's board in slot order: Regeneration heals to
/// full and timed buffs tick down and expire.
pub fn turn_end_sweep(state: &mut MatchState, player: &str) {
    if let Some(board) = state.boards.get_mut(player) {
        for unit in board.iter_mut().flatten() {
            if unit.has_keyword(Keyword::Regeneration) {
                unit.damage = 0;
            }
            let mut expired_attack = 0;
            for buff in &mut unit.buffs {
                buff.rounds_left = buff.rounds_left.saturating_sub(1);
                if buff.rounds_left == 0 {
                    expired_attack += buff.amount;
                }
            }
            unit.buffs.retain(|b| b.rounds_left > 0);
            unit.attack = (unit.attack - expired_attack).max(0);
        }
    }
}

/// Post-combat rule: a unit with Fury that killed another unit grows by +1/+1.
pub fn apply_fury(state: &mut MatchState, unit_id: &str) {
    if let Some(unit) = state.unit_mut(unit_id) {
        if unit.has_keyword(Keyword::Fury) {
            unit.attack += 1;
            unit.max_health += 1;
        }
    }
}
