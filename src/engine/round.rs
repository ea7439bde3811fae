//! Canonical round state machine.
//!
//! One flow owns phases, priority, pass counting, the spell stack and
//! reaction windows: roundStart -> draw -> main -> combat -> roundEnd.
//! Priority alternates on any non-burst action; two consecutive passes with
//! an empty stack end the phase.

use crate::cards::{card_set, CardDef, CardKind, CardSpeed};
use crate::engine::combat;
use crate::engine::effects;
use crate::engine::keywords::{self, KeywordTiming};
use crate::engine::state::{
    CombatStep, FlipBlock, MainStep, MatchState, Phase, ReactionWindow, SpellStackItem, Trigger,
    Unit, FATE_CAP, MANA_CAP, SPELL_MANA_CAP,
};
use crate::engine::trials::ActionDescriptor;

/// Round rollover: bank unspent mana, advance the turn counter, rotate the
/// attack token and set up the next round.
fn end_round(state: &mut MatchState, out: &mut Vec<ActionDescriptor>) {
    let _ = out;
    state.phase = Phase::RoundEnd;
    for player in state.players.clone() {
        if let Some(pool) = state.resources.get_mut(&player) {
            pool.spell_mana = (pool.spell_mana + pool.mana).min(SPELL_MANA_CAP);
        }
    }
    state.turn += 1;
    begin_round(state);
}

/// Set up a new round: token rotation by round parity, mana ramp and refill,
/// fate tick, one draw per player, turn-start keyword sweep.
pub fn begin_round(state: &mut MatchState) {
    state.phase = Phase::RoundStart;
    let holder_idx = (state.turn as usize + 1) % state.players.len().max(1);
    let holder = state.players[holder_idx].clone();
    state.attack_token = Some(holder.clone());

    for player in state.players.clone() {
        if let Some(pool) = state.resources.get_mut(&player) {
            pool.max_mana = (pool.max_mana + 1).min(MANA_CAP);
            pool.mana = pool.max_mana;
            pool.fate = (pool.fate + 1).min(FATE_CAP);
        }
    }

    state.phase = Phase::Draw;
    for player in state.players.clone() {
        state.draw_card(&player);
    }
    for player in state.players.clone() {
        keywords::turn_start_sweep(state, &player);
    }

    state.phase = Phase::Main(MainStep::Idle);
    state.priority = holder;
    state.pass_count = 0;
    state.ended_this_round.clear();
    state.reaction_window = None;
}

/// A board-visible play opens a reaction window; both players may respond
/// with one fate action each.
fn open_reaction_window(state: &mut MatchState) {
    state.reaction_window = Some(ReactionWindow {
        responded: Vec::new(),
    });
}

/// Record a player's (possibly implicit) response to the open window and
/// close it once everyone has responded.
fn note_window_response(state: &mut MatchState, player: &str) {
    let player_count = state.players.len();
    if let Some(window) = state.reaction_window.as_mut() {
        if !window.responded.iter().any(|p| p == player) {
            window.responded.push(player.to_string());
        }
        if window.responded.len() >= player_count {
            state.reaction_window = None;
        }
    }
}

/// Run one player's end of turn: keyword sweep, Moon accounting, and either
/// priority handoff or round rollover.
pub fn handle_end_turn(
    state: &mut MatchState,
    player: &str,
    out: &mut Vec<ActionDescriptor>,
) -> Result<(), String> {
    if !state.is_player(player) {
        return Err(format!("Unknown player {player}"));
    }
    // Ending is a declaration, not an action on the stack: a player who has
    // not ended yet may end even without holding priority, as long as
    // nothing is pending.
    if state.phase != Phase::Main(MainStep::Idle) {
        return Err("Turn can only end from an idle main phase".to_string());
    }
    if !state.spell_stack.is_empty() {
        return Err("Turn cannot end while the stack is live".to_string());
    }
    if state.ended_this_round.iter().any(|p| p == player) {
        return Err(format!("{player} has already ended this round"));
    }

    note_window_response(state, player);
    keywords::turn_end_sweep(state, player);
    let fate = state.resources.get(player).map_or(0, |p| p.fate);
    out.push(ActionDescriptor::TurnEnded {
        player: player.to_string(),
        fate,
    });
    state.ended_this_round.push(player.to_string());
    state.pass_count = 0;

    if state.ended_this_round.len() >= state.players.len() {
        end_round(state, out);
    } else {
        state.priority = state.opponent(player);
    }
    Ok(())
}

/// A pass: responds/declines any open reaction window, advances the pass
/// counter and drives stack resolution or phase end.
pub fn handle_pass(
    state: &mut MatchState,
    player: &str,
    out: &mut Vec<ActionDescriptor>,
) -> Result<(), String> {
    if !state.is_player(player) {
        return Err(format!("Unknown player {player}"));
    }
    if state.priority != player {
        return Err(format!("{player} does not hold priority"));
    }

    note_window_response(state, player);
    state.pass_count += 1;
    state.priority = state.opponent(player);

    if !state.spell_stack.is_empty() {
        if state.pass_count >= 2 {
            resolve_stack(state, out);
            state.pass_count = 0;
            match state.phase {
                Phase::Combat(_) => {
                    // A stack cast before blocks were declared must not skip
                    // the defender's declaration step.
                    let pending_blocks = state
                        .combat
                        .as_ref()
                        .filter(|c| !c.blocks_declared)
                        .map(|c| c.attacking_player.clone());
                    match pending_blocks {
                        Some(attacker) => {
                            state.phase = Phase::Combat(CombatStep::AttackDeclared);
                            state.priority = state.opponent(&attacker);
                        }
                        None => combat::resolve_combat(state, out)?,
                    }
                }
                _ => state.phase = Phase::Main(MainStep::Idle),
            }
        }
        return Ok(());
    }

    match state.phase {
        // Skipping blocks, or declining to answer declared blocks, resolves
        // the combat at once.
        Phase::Combat(CombatStep::AttackDeclared)
        | Phase::Combat(CombatStep::BlocksDeclared)
        | Phase::Combat(CombatStep::CombatStack) => {
            combat::resolve_combat(state, out)?;
        }
        Phase::Main(_) if state.pass_count >= 2 => {
            // Two consecutive passes with an empty stack end the main phase,
            // and with it the round.
            for p in state.players.clone() {
                if !state.ended_this_round.iter().any(|e| *e == p) {
                    keywords::turn_end_sweep(state, &p);
                    let fate = state.resources.get(&p).map_or(0, |r| r.fate);
                    out.push(ActionDescriptor::TurnEnded { player: p, fate });
                }
            }
            end_round(state, out);
        }
        _ => {}
    }
    Ok(())
}

/// Resolve the spell stack strictly LIFO.
pub fn resolve_stack(state: &mut MatchState, out: &mut Vec<ActionDescriptor>) {
    while let Some(item) = state.spell_stack.pop() {
        resolve_spell(state, &item.owner, &item.card_id, &item.targets, out);
    }
}

fn resolve_spell(
    state: &mut MatchState,
    owner: &str,
    card_id: &str,
    targets: &[String],
    out: &mut Vec<ActionDescriptor>,
) {
    let Some(def) = card_set().get(card_id) else {
        return;
    };
    if let CardKind::Spell { effect, .. } = &def.kind {
        if let Some(call) = effects::parse_call(effect) {
            effects::execute(state, def, &call, owner, targets, out);
        }
    }
    state.bury_dead();
}

/// Whether a card of the given speed may be played in the current phase.
fn speed_playable(state: &MatchState, def: &CardDef) -> Result<(), String> {
    let in_combat = matches!(state.phase, Phase::Combat(_)) || state.combat.is_some();
    let stack_live = !state.spell_stack.is_empty();
    match def.speed {
        CardSpeed::Burst | CardSpeed::Fast => match state.phase {
            Phase::Main(_)
            | Phase::Combat(CombatStep::AttackDeclared)
            | Phase::Combat(CombatStep::BlocksDeclared)
            | Phase::Combat(CombatStep::CombatStack) => Ok(()),
            _ => Err("Spell cannot be played in this phase".to_string()),
        },
        CardSpeed::Slow => {
            if in_combat {
                Err("Slow cards cannot be played once combat is declared".to_string())
            } else if stack_live {
                Err("Slow cards cannot be played while the stack is live".to_string())
            } else if state.phase == Phase::Main(MainStep::Idle) {
                Ok(())
            } else {
                Err("Slow cards are main-phase only".to_string())
            }
        }
    }
}

/// Pay a card's cost. Spells spend banked spell mana first.
fn pay_cost(state: &mut MatchState, player: &str, def: &CardDef) -> Result<(), String> {
    let pool = state
        .resources
        .get_mut(player)
        .ok_or_else(|| format!("Unknown player {player}"))?;
    let spendable = if def.is_unit() {
        pool.mana
    } else {
        pool.mana + pool.spell_mana
    };
    if spendable < def.cost {
        return Err(format!("Cannot afford {} (cost {})", def.id, def.cost));
    }
    let mut remaining = def.cost;
    if !def.is_unit() {
        let from_bank = remaining.min(pool.spell_mana);
        pool.spell_mana -= from_bank;
        remaining -= from_bank;
    }
    pool.mana -= remaining;
    Ok(())
}

/// Resolve the unit target of a targeted spell from the `lane` hint:
/// damage spells point at the opponent's slot, buffs at the caster's.
fn resolve_spell_targets(
    state: &MatchState,
    player: &str,
    def: &CardDef,
    lane: Option<usize>,
) -> Result<Vec<String>, String> {
    let CardKind::Spell { effect, .. } = &def.kind else {
        return Ok(Vec::new());
    };
    let Some(call) = effects::parse_call(effect) else {
        return Ok(Vec::new());
    };
    let needs = match effects::EffectKind::from_call(&call) {
        effects::EffectKind::DamageUnit(_) => Some(state.opponent(player)),
        effects::EffectKind::BuffAttack { .. } => Some(player.to_string()),
        _ => None,
    };
    let Some(target_player) = needs else {
        return Ok(Vec::new());
    };
    let slot = lane.ok_or_else(|| format!("{} requires a target lane", def.id))?;
    let unit = state
        .boards
        .get(&target_player)
        .and_then(|board| board.get(slot))
        .and_then(Option::as_ref)
        .ok_or_else(|| format!("No unit in lane {slot}"))?;
    Ok(vec![unit.id.clone()])
}

/// Play a card from hand: place a unit or cast a spell per its speed.
pub fn handle_play_card(
    state: &mut MatchState,
    player: &str,
    card_id: &str,
    lane: Option<usize>,
    out: &mut Vec<ActionDescriptor>,
) -> Result<(), String> {
    if !state.is_player(player) {
        return Err(format!("Unknown player {player}"));
    }
    if state.priority != player {
        return Err(format!("{player} does not hold priority"));
    }
    let def = card_set()
        .get(card_id)
        .ok_or_else(|| format!("Card {card_id} does not exist"))?
        .clone();
    if !state
        .hands
        .get(player)
        .is_some_and(|h| h.iter().any(|c| c == card_id))
    {
        return Err(format!("Card {card_id} is not in hand"));
    }

    match &def.kind {
        CardKind::Unit {
            attack,
            health,
            keywords: unit_keywords,
        } => {
            if state.phase != Phase::Main(MainStep::Idle) {
                return Err("Units are main-phase only".to_string());
            }
            if !state.spell_stack.is_empty() {
                return Err("Units cannot be played while the stack is live".to_string());
            }
            let slot = match lane {
                Some(slot) => {
                    let open = state
                        .boards
                        .get(player)
                        .and_then(|b| b.get(slot))
                        .is_some_and(Option::is_none);
                    if !open {
                        return Err(format!("Lane {slot} is not open"));
                    }
                    slot
                }
                None => state
                    .first_empty_slot(player)
                    .ok_or("Board is full")?,
            };
            pay_cost(state, player, &def)?;
            state.remove_from_hand(player, card_id)?;

            let unit_id = format!("u{}", state.next_unit_id);
            state.next_unit_id += 1;
            let unit = Unit::new(&unit_id, card_id, player, *attack, *health, unit_keywords.clone());
            if let Some(board) = state.boards.get_mut(player) {
                board[slot] = Some(unit);
            }
            state.trigger_queue.push_back(Trigger {
                timing: KeywordTiming::OnSummon,
                unit_id,
            });
            note_window_response(state, player);
            open_reaction_window(state);
            state.priority = state.opponent(player);
        }
        CardKind::Spell { .. } => {
            speed_playable(state, &def)?;
            let targets = resolve_spell_targets(state, player, &def, lane)?;
            pay_cost(state, player, &def)?;
            state.remove_from_hand(player, card_id)?;
            note_window_response(state, player);

            match def.speed {
                CardSpeed::Burst => {
                    // Burst resolves immediately and never yields priority.
                    resolve_spell(state, player, card_id, &targets, out);
                }
                CardSpeed::Fast | CardSpeed::Slow => {
                    let stack_id = format!("s{}", state.next_stack_id);
                    let order = state.next_stack_id;
                    state.next_stack_id += 1;
                    state.spell_stack.push(SpellStackItem {
                        id: stack_id,
                        owner: player.to_string(),
                        card_id: card_id.to_string(),
                        targets,
                        order,
                    });
                    state.phase = match state.phase {
                        Phase::Combat(_) => Phase::Combat(CombatStep::CombatStack),
                        _ => Phase::Main(MainStep::SpellStack),
                    };
                    state.priority = state.opponent(player);
                }
            }
        }
    }

    let orientation = state.orientation_of(card_id);
    out.push(ActionDescriptor::CardPlayed {
        player: player.to_string(),
        card_id: card_id.to_string(),
        orientation,
    });
    *state.play_counts.entry(player.to_string()).or_insert(0) += 1;
    state.pass_count = 0;
    Ok(())
}

/// Validation shared by the four fate actions: an open window the player has
/// not yet used, and enough fate to spend.
fn take_fate_action(state: &mut MatchState, player: &str, cost: i64) -> Result<(), String> {
    if !state.is_player(player) {
        return Err(format!("Unknown player {player}"));
    }
    let window = state
        .reaction_window
        .as_ref()
        .ok_or("No reaction window is open")?;
    if window.responded.iter().any(|p| p == player) {
        return Err(format!("{player} has already responded to this window"));
    }
    let pool = state
        .resources
        .get_mut(player)
        .ok_or_else(|| format!("Unknown player {player}"))?;
    if pool.fate < cost {
        return Err(format!("{player} cannot afford the fate cost {cost}"));
    }
    pool.fate -= cost;
    Ok(())
}

/// Fate action: flip a card's orientation (cost 1). A pending flip-block on
/// the card spends itself to prevent the flip.
pub fn handle_flip(state: &mut MatchState, player: &str, card_id: &str) -> Result<(), String> {
    if !card_set().contains(card_id) {
        return Err(format!("Card {card_id} does not exist"));
    }
    take_fate_action(state, player, 1)?;
    let blocked = state
        .flip_blocks
        .iter()
        .position(|b| b.target_player == player && b.card_id == card_id);
    match blocked {
        Some(idx) => {
            state.flip_blocks.remove(idx);
        }
        None => {
            let flipped = state.orientation_of(card_id).flipped();
            state.orientations.insert(card_id.to_string(), flipped);
        }
    }
    note_window_response(state, player);
    Ok(())
}

/// Fate action: peek at the top two cards of the deck and swap them
/// (cost 1).
pub fn handle_peek(state: &mut MatchState, player: &str) -> Result<(), String> {
    take_fate_action(state, player, 1)?;
    if let Some(deck) = state.decks.get_mut(player) {
        if deck.len() >= 2 {
            deck.swap(0, 1);
        }
    }
    note_window_response(state, player);
    Ok(())
}

/// Fate action: immediately draw a card (cost 2).
pub fn handle_force_draw(state: &mut MatchState, player: &str) -> Result<(), String> {
    take_fate_action(state, player, 2)?;
    state.draw_card(player);
    note_window_response(state, player);
    Ok(())
}

/// Fate action: block the opponent's next flip of a card (cost 2, once per
/// match).
pub fn handle_block_flip(
    state: &mut MatchState,
    player: &str,
    target_player: &str,
    card_id: &str,
) -> Result<(), String> {
    if !state.is_player(target_player) || target_player == player {
        return Err(format!("Invalid flip-block target {target_player}"));
    }
    if state.used_flip_block.get(player).copied().unwrap_or(false) {
        return Err(format!("{player} has already used a flip block this match"));
    }
    if !card_set().contains(card_id) {
        return Err(format!("Card {card_id} does not exist"));
    }
    take_fate_action(state, player, 2)?;
    state.used_flip_block.insert(player.to_string(), true);
    state.flip_blocks.push(FlipBlock {
        target_player: target_player.to_string(),
        card_id: card_id.to_string(),
    });
    note_window_response(state, player);
    Ok(())
}

/// Assign cards to the past/present/future spread positions.
pub fn handle_assign_spread(
    state: &mut MatchState,
    player: &str,
    past: Option<String>,
    present: Option<String>,
    future: Option<String>,
) -> Result<(), String> {
    if !state.is_player(player) {
        return Err(format!("Unknown player {player}"));
    }
    for card_id in [&past, &present, &future].into_iter().flatten() {
        if !card_set().contains(card_id) {
            return Err(format!("Card {card_id} does not exist"));
        }
    }
    let spread = state.spreads.entry(player.to_string()).or_default();
    spread.past = past;
    spread.present = present;
    spread.future = future;
    Ok(())
}
