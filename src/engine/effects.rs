//! Effect DSL: the small `name(arg, arg, ...)` call syntax embedded in card
//! definitions.
//!
//! Calls parse into a structured `EffectCall` and dispatch through a closed
//! `EffectKind` enum. Unknown effect names execute as no-ops by design, so
//! card data may reference effects this engine version does not know yet.

use crate::cards::CardDef;
use crate::engine::keywords;
use crate::engine::state::{MatchState, Orientation, TimedBuff, FATE_CAP, MANA_CAP, SPELL_MANA_CAP};
use crate::engine::trials::ActionDescriptor;

/// A parsed argument: decimal integer or bare string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectArg {
    Num(i64),
    Text(String),
}

impl EffectArg {
    fn as_num(&self) -> Option<i64> {
        match self {
            EffectArg::Num(n) => Some(*n),
            EffectArg::Text(_) => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            EffectArg::Text(s) => Some(s),
            EffectArg::Num(_) => None,
        }
    }
}

/// A parsed `name(args...)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectCall {
    pub name: String,
    pub args: Vec<EffectArg>,
}

/// Parse a call string. `draw(2)`, `branch(card, a, b)` and a bare `name`
/// all parse; anything malformed yields `None` and is treated as unknown.
pub fn parse_call(input: &str) -> Option<EffectCall> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let Some(open) = input.find('(') else {
        // Bare name with no argument list.
        return Some(EffectCall {
            name: input.to_string(),
            args: Vec::new(),
        });
    };
    if !input.ends_with(')') {
        return None;
    }
    let name = input[..open].trim();
    if name.is_empty() {
        return None;
    }
    let inner = &input[open + 1..input.len() - 1];
    let mut args = Vec::new();
    if !inner.trim().is_empty() {
        for raw in inner.split(',') {
            let raw = raw.trim();
            match raw.parse::<i64>() {
                Ok(n) => args.push(EffectArg::Num(n)),
                Err(_) => args.push(EffectArg::Text(raw.to_string())),
            }
        }
    }
    Some(EffectCall {
        name: name.to_string(),
        args,
    })
}

/// Closed set of effect kinds. `Unknown` is the explicit forward-compatible
/// fallback, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectKind {
    GainMana(i64),
    GainSpellMana(i64),
    GainFate(i64),
    DamageNexus(i64),
    HealNexus(i64),
    DamageUnit(i64),
    BuffAttack { amount: i64, rounds: u32 },
    Draw(u32),
    DiscardRandom(u32),
    Branch {
        card_id: String,
        upright: String,
        reversed: String,
    },
    Unknown,
}

impl EffectKind {
    pub fn from_call(call: &EffectCall) -> EffectKind {
        let num = |idx: usize| call.args.get(idx).and_then(EffectArg::as_num);
        match call.name.as_str() {
            "gain_mana" => num(0).map_or(EffectKind::Unknown, EffectKind::GainMana),
            "gain_spell_mana" => num(0).map_or(EffectKind::Unknown, EffectKind::GainSpellMana),
            "gain_fate" => num(0).map_or(EffectKind::Unknown, EffectKind::GainFate),
            "damage_nexus" => num(0).map_or(EffectKind::Unknown, EffectKind::DamageNexus),
            "heal_nexus" => num(0).map_or(EffectKind::Unknown, EffectKind::HealNexus),
            "damage_unit" => num(0).map_or(EffectKind::Unknown, EffectKind::DamageUnit),
            "buff_attack" => match (num(0), num(1)) {
                (Some(amount), Some(rounds)) if rounds > 0 => EffectKind::BuffAttack {
                    amount,
                    rounds: rounds as u32,
                },
                _ => EffectKind::Unknown,
            },
            "draw" => num(0)
                .filter(|n| *n >= 0)
                .map_or(EffectKind::Unknown, |n| EffectKind::Draw(n as u32)),
            "discard_random" => num(0)
                .filter(|n| *n >= 0)
                .map_or(EffectKind::Unknown, |n| EffectKind::DiscardRandom(n as u32)),
            "branch" => {
                let text = |idx: usize| call.args.get(idx).and_then(EffectArg::as_text);
                match (text(0), text(1), text(2)) {
                    (Some(card_id), Some(upright), Some(reversed)) => EffectKind::Branch {
                        card_id: card_id.to_string(),
                        upright: upright.to_string(),
                        reversed: reversed.to_string(),
                    },
                    _ => EffectKind::Unknown,
                }
            }
            _ => EffectKind::Unknown,
        }
    }
}

/// Execute one parsed call against the match state for the acting player.
/// `targets` carries resolved unit ids for unit-targeted effects.
pub fn execute(
    state: &mut MatchState,
    card: &CardDef,
    call: &EffectCall,
    acting: &str,
    targets: &[String],
    out: &mut Vec<ActionDescriptor>,
) {
    execute_at_depth(state, card, call, acting, targets, out, 0);
}

fn execute_at_depth(
    state: &mut MatchState,
    card: &CardDef,
    call: &EffectCall,
    acting: &str,
    targets: &[String],
    out: &mut Vec<ActionDescriptor>,
    depth: u8,
) {
    // Branch targets may not themselves branch.
    if depth > 1 {
        return;
    }
    match EffectKind::from_call(call) {
        EffectKind::GainMana(n) => {
            if let Some(pool) = state.resources.get_mut(acting) {
                pool.mana = (pool.mana + n).clamp(0, MANA_CAP);
            }
        }
        EffectKind::GainSpellMana(n) => {
            if let Some(pool) = state.resources.get_mut(acting) {
                pool.spell_mana = (pool.spell_mana + n).clamp(0, SPELL_MANA_CAP);
            }
        }
        EffectKind::GainFate(n) => {
            if let Some(pool) = state.resources.get_mut(acting) {
                pool.fate = (pool.fate + n).clamp(0, FATE_CAP);
            }
        }
        EffectKind::DamageNexus(n) => {
            let opponent = state.opponent(acting);
            state.damage_nexus(&opponent, n);
            out.push(ActionDescriptor::DamageDealt {
                player: acting.to_string(),
                suit: card.suit,
                amount: n,
            });
        }
        EffectKind::HealNexus(n) => {
            state.heal_nexus(acting, n);
        }
        EffectKind::DamageUnit(n) => {
            if let Some(unit_id) = targets.first() {
                let mut applied = 0;
                if let Some(unit) = state.unit_mut(unit_id) {
                    if unit.spell_shield {
                        // Spellshield negates the spell instance, then is spent.
                        unit.spell_shield = false;
                    } else {
                        applied = keywords::soak_damage(unit, n);
                    }
                }
                if applied > 0 {
                    out.push(ActionDescriptor::DamageDealt {
                        player: acting.to_string(),
                        suit: card.suit,
                        amount: applied,
                    });
                }
            }
        }
        EffectKind::BuffAttack { amount, rounds } => {
            if let Some(unit_id) = targets.first() {
                if let Some(unit) = state.unit_mut(unit_id) {
                    unit.attack = (unit.attack + amount).max(0);
                    unit.buffs.push(TimedBuff {
                        kind: "attack".to_string(),
                        amount,
                        rounds_left: rounds,
                    });
                }
            }
        }
        EffectKind::Draw(n) => {
            for _ in 0..n {
                state.draw_card(acting);
            }
        }
        EffectKind::DiscardRandom(n) => {
            for _ in 0..n {
                let len = state.hands.get(acting).map_or(0, Vec::len);
                if len == 0 {
                    break;
                }
                let idx = state.next_random(len as u64) as usize;
                if let Some(hand) = state.hands.get_mut(acting) {
                    let card_id = hand.remove(idx);
                    state
                        .discards
                        .entry(acting.to_string())
                        .or_default()
                        .push(card_id);
                }
            }
        }
        EffectKind::Branch {
            card_id,
            upright,
            reversed,
        } => {
            let chosen = match state.orientation_of(&card_id) {
                Orientation::Upright => upright,
                Orientation::Reversed => reversed,
            };
            let named = match &card.kind {
                crate::cards::CardKind::Spell { named_calls, .. } => named_calls.get(&chosen),
                crate::cards::CardKind::Unit { .. } => None,
            };
            if let Some(raw) = named {
                if let Some(inner) = parse_call(raw) {
                    execute_at_depth(state, card, &inner, acting, targets, out, depth + 1);
                }
            }
        }
        EffectKind::Unknown => {
            // Deliberate leniency: undefined effects are tolerated.
            log::debug!("ignoring unknown effect call {:?}", call.name);
        }
    }
}
