//! Combat resolver: attacker declaration, blocker declaration and
//! simultaneous strike resolution.
//!
//! The resolver assumes well-formed state (validation happens at intent
//! dispatch); its math only consults units that are present on a board.

use crate::cards::{card_set, Suit};
use crate::engine::keywords::{self, Keyword};
use crate::engine::state::{
    ActiveCombat, CombatPair, CombatStep, MainStep, MatchState, Phase,
};
use crate::engine::trials::ActionDescriptor;
use crate::engine::intent::BlockAssignment;

fn suit_of(card_id: &str) -> Suit {
    card_set().get(card_id).map_or(Suit::Major, |def| def.suit)
}

/// Declare attackers. Requires the declaring player to hold priority and the
/// attack token; declaring consumes the token.
pub fn declare_attackers(
    state: &mut MatchState,
    player: &str,
    attacker_ids: &[String],
) -> Result<(), String> {
    if state.phase != Phase::Main(MainStep::Idle) {
        return Err("Attacks may only be declared from an idle main phase".to_string());
    }
    if state.priority != player {
        return Err(format!("{player} does not hold priority"));
    }
    if state.attack_token.as_deref() != Some(player) {
        return Err(format!("{player} does not hold the attack token"));
    }
    if attacker_ids.is_empty() {
        return Err("At least one attacker is required".to_string());
    }
    let mut seen: Vec<&String> = Vec::new();
    for id in attacker_ids {
        if seen.contains(&id) {
            return Err(format!("Attacker {id} declared twice"));
        }
        seen.push(id);
        let unit = state
            .unit(id)
            .ok_or_else(|| format!("Unit {id} is not on the board"))?;
        if unit.owner != player {
            return Err(format!("Unit {id} is not controlled by {player}"));
        }
        if !unit.can_attack || unit.has_attacked {
            return Err(format!("Unit {id} cannot attack"));
        }
    }

    for id in attacker_ids {
        if let Some(unit) = state.unit_mut(id) {
            unit.is_attacking = true;
        }
    }
    state.combat = Some(ActiveCombat {
        attacking_player: player.to_string(),
        pairs: attacker_ids
            .iter()
            .map(|id| CombatPair {
                attacker_id: id.clone(),
                blocker_id: None,
            })
            .collect(),
        blocks_declared: false,
    });
    state.attack_token = None;
    state.phase = Phase::Combat(CombatStep::AttackDeclared);
    state.priority = state.opponent(player);
    state.pass_count = 0;
    Ok(())
}

/// Declare blockers for the defending player. Assignments are validated with
/// the keyword registry's `can_block` predicate.
pub fn declare_blockers(
    state: &mut MatchState,
    player: &str,
    assignments: &[BlockAssignment],
) -> Result<(), String> {
    if state.phase != Phase::Combat(CombatStep::AttackDeclared) {
        return Err("No attack awaiting blocks".to_string());
    }
    if state.priority != player {
        return Err(format!("{player} does not hold priority"));
    }
    let combat = state
        .combat
        .as_ref()
        .ok_or("No active combat")?
        .clone();
    if combat.attacking_player == player {
        return Err("The attacking player cannot declare blockers".to_string());
    }

    let mut used_blockers: Vec<&String> = Vec::new();
    for assignment in assignments {
        if used_blockers.contains(&&assignment.blocker_id) {
            return Err(format!(
                "Blocker {} assigned to more than one attacker",
                assignment.blocker_id
            ));
        }
        used_blockers.push(&assignment.blocker_id);

        let pair = combat
            .pairs
            .iter()
            .find(|p| p.attacker_id == assignment.attacker_id)
            .ok_or_else(|| format!("{} is not attacking", assignment.attacker_id))?;
        if pair.blocker_id.is_some() {
            return Err(format!("{} is already blocked", assignment.attacker_id));
        }
        let blocker = state
            .unit(&assignment.blocker_id)
            .ok_or_else(|| format!("Unit {} is not on the board", assignment.blocker_id))?;
        if blocker.owner != player {
            return Err(format!(
                "Unit {} is not controlled by {player}",
                assignment.blocker_id
            ));
        }
        if blocker.is_attacking || blocker.is_blocking {
            return Err(format!("Unit {} cannot block", assignment.blocker_id));
        }
        let attacker = state
            .unit(&assignment.attacker_id)
            .ok_or_else(|| format!("Unit {} is not on the board", assignment.attacker_id))?;
        if !keywords::can_block(attacker, blocker) {
            return Err(format!(
                "Unit {} is not a legal blocker for {}",
                assignment.blocker_id, assignment.attacker_id
            ));
        }
    }

    for assignment in assignments {
        if let Some(combat) = state.combat.as_mut() {
            if let Some(pair) = combat
                .pairs
                .iter_mut()
                .find(|p| p.attacker_id == assignment.attacker_id)
            {
                pair.blocker_id = Some(assignment.blocker_id.clone());
            }
        }
        if let Some(blocker) = state.unit_mut(&assignment.blocker_id) {
            blocker.is_blocking = true;
            blocker.blocked_unit_id = Some(assignment.attacker_id.clone());
        }
    }
    if let Some(combat) = state.combat.as_mut() {
        combat.blocks_declared = true;
    }
    state.phase = Phase::Combat(CombatStep::BlocksDeclared);
    state.priority = combat.attacking_player;
    state.pass_count = 0;
    Ok(())
}

/// One unit striking another. Returns the damage that reached the target's
/// health (after Barrier/Tough) so the caller can account for it.
fn unit_strike(
    state: &mut MatchState,
    striker_id: &str,
    target_id: &str,
    out: &mut Vec<ActionDescriptor>,
) -> i64 {
    let Some(striker) = state.unit(striker_id) else {
        return 0;
    };
    let amount = striker.attack;
    let owner = striker.owner.clone();
    let suit = suit_of(&striker.card_id);
    let lifesteal = striker.has_keyword(Keyword::Lifesteal);
    if amount <= 0 {
        return 0;
    }
    let applied = match state.unit_mut(target_id) {
        Some(target) => keywords::soak_damage(target, amount),
        None => 0,
    };
    if applied > 0 {
        if lifesteal {
            state.heal_nexus(&owner, applied);
        }
        out.push(ActionDescriptor::DamageDealt {
            player: owner,
            suit,
            amount: applied,
        });
    }
    applied
}

/// Strike directly at the defending nexus.
fn nexus_strike(
    state: &mut MatchState,
    striker_id: &str,
    defender: &str,
    amount: i64,
    out: &mut Vec<ActionDescriptor>,
) {
    if amount <= 0 {
        return;
    }
    let Some(striker) = state.unit(striker_id) else {
        return;
    };
    let owner = striker.owner.clone();
    let suit = suit_of(&striker.card_id);
    let lifesteal = striker.has_keyword(Keyword::Lifesteal);
    state.damage_nexus(defender, amount);
    if lifesteal {
        state.heal_nexus(&owner, amount);
    }
    out.push(ActionDescriptor::DamageDealt {
        player: owner,
        suit,
        amount,
    });
}

/// Resolve the declared combat: simultaneous strikes per pair, keyword
/// ordering for Quick Attack, Overwhelm spillover, then cleanup.
pub fn resolve_combat(
    state: &mut MatchState,
    out: &mut Vec<ActionDescriptor>,
) -> Result<(), String> {
    let combat = state.combat.as_ref().ok_or("No active combat")?.clone();
    let defender = state.opponent(&combat.attacking_player);
    state.phase = Phase::Combat(CombatStep::Resolving);

    for pair in &combat.pairs {
        let Some(attacker) = state.unit(&pair.attacker_id) else {
            continue;
        };
        let attacker_quick = attacker.has_keyword(Keyword::QuickAttack);
        let attacker_overwhelm = attacker.has_keyword(Keyword::Overwhelm);
        let attack_value = attacker.attack;

        match pair.blocker_id.as_deref() {
            Some(blocker_id) if state.unit(blocker_id).is_some() => {
                let blocker = state.unit(blocker_id).expect("checked above");
                let blocker_quick = blocker.has_keyword(Keyword::QuickAttack);
                let blocker_health_before = blocker.current_health();

                if attacker_quick && !blocker_quick {
                    // Quick Attack strikes first; a dead blocker does not
                    // strike back.
                    unit_strike(state, &pair.attacker_id, blocker_id, out);
                    let blocker_dead = state.unit(blocker_id).is_some_and(|u| u.is_dead());
                    if !blocker_dead {
                        unit_strike(state, blocker_id, &pair.attacker_id, out);
                    }
                } else if blocker_quick && !attacker_quick {
                    unit_strike(state, blocker_id, &pair.attacker_id, out);
                    let attacker_dead =
                        state.unit(&pair.attacker_id).is_some_and(|u| u.is_dead());
                    if !attacker_dead {
                        unit_strike(state, &pair.attacker_id, blocker_id, out);
                    }
                } else {
                    // Simultaneous: both strike regardless of lethality.
                    unit_strike(state, &pair.attacker_id, blocker_id, out);
                    unit_strike(state, blocker_id, &pair.attacker_id, out);
                }

                if attacker_overwhelm && attack_value > blocker_health_before {
                    let excess = attack_value - blocker_health_before;
                    nexus_strike(state, &pair.attacker_id, &defender, excess, out);
                }
            }
            _ => {
                // Unblocked: full attack to the defending nexus.
                nexus_strike(state, &pair.attacker_id, &defender, attack_value, out);
            }
        }
    }

    // Post-combat keyword bucket: Fury credit for units that killed.
    for pair in &combat.pairs {
        if let Some(blocker_id) = &pair.blocker_id {
            let blocker_dead = state.unit(blocker_id).map_or(true, |u| u.is_dead());
            let attacker_dead = state
                .unit(&pair.attacker_id)
                .map_or(true, |u| u.is_dead());
            if blocker_dead && !attacker_dead {
                keywords::apply_fury(state, &pair.attacker_id);
            }
            if attacker_dead && !blocker_dead {
                keywords::apply_fury(state, blocker_id);
            }
        }
    }

    state.bury_dead();

    // Cleanup: clear combat flags, remember who attacked.
    let attacker_ids: Vec<String> = combat.pairs.iter().map(|p| p.attacker_id.clone()).collect();
    for player in state.players.clone() {
        if let Some(board) = state.boards.get_mut(&player) {
            for unit in board.iter_mut().flatten() {
                if attacker_ids.contains(&unit.id) {
                    unit.has_attacked = true;
                }
                unit.is_attacking = false;
                unit.is_blocking = false;
                unit.blocked_unit_id = None;
            }
        }
    }
    state.combat = None;
    state.phase = Phase::Main(MainStep::Idle);
    state.priority = combat.attacking_player;
    state.pass_count = 0;
    Ok(())
}
