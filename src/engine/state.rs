//! Match state data model.
//!
//! `MatchState` is the root document: one per match, produced only by pure
//! transition functions. Every type here serializes canonically so two
//! engines fed the same seed and intent log compare bit-for-bit.

use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;
use std::collections::{HashMap, VecDeque};

use super::keywords::{Keyword, KeywordTiming};
use super::rng;

/// Fixed number of board slots per player.
pub const BOARD_SLOTS: usize = 6;
pub const NEXUS_MAX: i64 = 20;
pub const MANA_CAP: i64 = 10;
pub const SPELL_MANA_CAP: i64 = 3;
pub const FATE_CAP: i64 = 5;
pub const STARTING_FATE: i64 = 2;
pub const OPENING_HAND: usize = 4;

/// Binary per-card state selecting between a card's two effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub enum Orientation {
    Upright,
    Reversed,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Upright => Orientation::Reversed,
            Orientation::Reversed => Orientation::Upright,
        }
    }
}

/// Per-player resource pools: generic mana, spell-banked mana and fate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct ResourcePool {
    pub mana: i64,
    pub max_mana: i64,
    pub spell_mana: i64,
    pub fate: i64,
}

impl ResourcePool {
    pub fn starting() -> Self {
        ResourcePool {
            mana: 1,
            max_mana: 1,
            spell_mana: 0,
            fate: STARTING_FATE,
        }
    }
}

/// A player's health pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct Nexus {
    pub health: i64,
    pub max_health: i64,
}

/// Temporary stat change with a remaining duration in rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct TimedBuff {
    pub kind: String,
    pub amount: i64,
    pub rounds_left: u32,
}

/// A unit on the board. Invariant: `current_health = max_health - damage`;
/// units at or below zero health are buried before state is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct Unit {
    pub id: String,
    pub card_id: String,
    pub owner: String,
    pub base_attack: i64,
    pub base_health: i64,
    pub attack: i64,
    pub max_health: i64,
    pub damage: i64,
    pub keywords: Vec<Keyword>,
    pub buffs: Vec<TimedBuff>,
    pub barrier_active: bool,
    pub spell_shield: bool,
    pub can_attack: bool,
    pub has_attacked: bool,
    pub is_attacking: bool,
    pub is_blocking: bool,
    pub blocked_unit_id: Option<String>,
}

impl Unit {
    pub fn new(
        id: &str,
        card_id: &str,
        owner: &str,
        attack: i64,
        health: i64,
        keywords: Vec<Keyword>,
    ) -> Self {
        Unit {
            id: id.to_string(),
            card_id: card_id.to_string(),
            owner: owner.to_string(),
            base_attack: attack,
            base_health: health,
            attack,
            max_health: health,
            damage: 0,
            keywords,
            buffs: Vec::new(),
            barrier_active: false,
            spell_shield: false,
            can_attack: true,
            has_attacked: false,
            is_attacking: false,
            is_blocking: false,
            blocked_unit_id: None,
        }
    }

    pub fn current_health(&self) -> i64 {
        self.max_health - self.damage
    }

    pub fn is_dead(&self) -> bool {
        self.current_health() <= 0
    }

    pub fn has_keyword(&self, keyword: Keyword) -> bool {
        self.keywords.contains(&keyword)
    }
}

/// One declared attack lane. Each attacker appears at most once per combat;
/// a blocker is assigned to at most one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct CombatPair {
    pub attacker_id: String,
    pub blocker_id: Option<String>,
}

/// Active combat, from attacker declaration to resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct ActiveCombat {
    pub attacking_player: String,
    pub pairs: Vec<CombatPair>,
    /// Whether the defender has taken their blocker-declaration step. A stack
    /// cast before blocks keeps the declaration step pending.
    pub blocks_declared: bool,
}

/// An entry on the spell stack. Resolved strictly LIFO; burst-speed casts
/// never join the stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct SpellStackItem {
    pub id: String,
    pub owner: String,
    pub card_id: String,
    pub targets: Vec<String>,
    pub order: u64,
}

/// An `(orientation, card)` pair observed at play time, for the Judgement
/// trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct JudgementFlag {
    pub orientation: Orientation,
    pub card_id: String,
}

/// Per-player progress toward the three alternate-victory trials.
/// Completion is monotonic: a completed trial never reverts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct TrialProgress {
    pub sun_damage: i64,
    pub sun_complete: bool,
    pub moon_streak: u32,
    pub moon_complete: bool,
    pub judgement_seen: Vec<JudgementFlag>,
    pub judgement_complete: bool,
}

impl TrialProgress {
    pub fn completed_count(&self) -> u32 {
        u32::from(self.sun_complete)
            + u32::from(self.moon_complete)
            + u32::from(self.judgement_complete)
    }
}

/// Transient period after a board-visible play during which each player may
/// take one fate action. A player responds at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct ReactionWindow {
    pub responded: Vec<String>,
}

/// Pending keyword trigger, drained FIFO after each applied intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct Trigger {
    pub timing: KeywordTiming,
    pub unit_id: String,
}

/// A pending block on the opponent's next flip of a specific card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct FlipBlock {
    pub target_player: String,
    pub card_id: String,
}

/// Three-position spread assignment (past / present / future).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct SpreadAssignment {
    pub past: Option<String>,
    pub present: Option<String>,
    pub future: Option<String>,
}

/// Sub-step of the main phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub enum MainStep {
    Idle,
    SpellStack,
}

/// Sub-step of the combat phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub enum CombatStep {
    AttackDeclared,
    BlocksDeclared,
    CombatStack,
    Resolving,
}

/// Canonical round phase. One state machine owns the whole round flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde", tag = "phase", content = "step")]
pub enum Phase {
    RoundStart,
    Draw,
    Main(MainStep),
    Combat(CombatStep),
    RoundEnd,
}

/// Root match document. Immutable per transition: `apply_intent` clones,
/// mutates the clone and returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct MatchState {
    pub match_id: String,
    pub seed: String,
    pub players: Vec<String>,
    pub turn: u32,
    pub phase: Phase,
    pub priority: String,
    pub attack_token: Option<String>,
    pub pass_count: u32,
    pub ended_this_round: Vec<String>,
    pub resources: HashMap<String, ResourcePool>,
    pub nexus: HashMap<String, Nexus>,
    pub hands: HashMap<String, Vec<String>>,
    pub decks: HashMap<String, Vec<String>>,
    pub discards: HashMap<String, Vec<String>>,
    pub boards: HashMap<String, Vec<Option<Unit>>>,
    pub combat: Option<ActiveCombat>,
    pub spell_stack: Vec<SpellStackItem>,
    pub trials: HashMap<String, TrialProgress>,
    pub orientations: HashMap<String, Orientation>,
    pub reaction_window: Option<ReactionWindow>,
    pub trigger_queue: VecDeque<Trigger>,
    pub flip_blocks: Vec<FlipBlock>,
    pub used_flip_block: HashMap<String, bool>,
    pub spreads: HashMap<String, SpreadAssignment>,
    pub play_counts: HashMap<String, u32>,
    pub next_unit_id: u64,
    pub next_stack_id: u64,
    pub rng_cursor: u64,
    pub winner: Option<String>,
}

impl MatchState {
    /// The other player in a two-player match.
    pub fn opponent(&self, player: &str) -> String {
        self.players
            .iter()
            .find(|p| p.as_str() != player)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_player(&self, player: &str) -> bool {
        self.players.iter().any(|p| p == player)
    }

    /// Consume one position of the deterministic random stream.
    pub fn next_random(&mut self, bound: u64) -> u64 {
        let v = rng::next_int(&self.seed, self.rng_cursor, bound);
        self.rng_cursor += 1;
        v
    }

    /// Look up a unit anywhere on either board.
    pub fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.boards
            .values()
            .flat_map(|b| b.iter())
            .flatten()
            .find(|u| u.id == unit_id)
    }

    pub fn unit_mut(&mut self, unit_id: &str) -> Option<&mut Unit> {
        self.boards
            .values_mut()
            .flat_map(|b| b.iter_mut())
            .flatten()
            .find(|u| u.id == unit_id)
    }

    /// Owner and slot index of a unit, if it is on a board.
    pub fn locate_unit(&self, unit_id: &str) -> Option<(String, usize)> {
        for player in &self.players {
            if let Some(board) = self.boards.get(player) {
                for (slot, unit) in board.iter().enumerate() {
                    if unit.as_ref().is_some_and(|u| u.id == unit_id) {
                        return Some((player.clone(), slot));
                    }
                }
            }
        }
        None
    }

    /// Move every unit at or below zero health to its owner's discard.
    /// Runs before any player-visible state is returned.
    pub fn bury_dead(&mut self) {
        let mut dead: Vec<(String, usize)> = Vec::new();
        for player in self.players.clone() {
            if let Some(board) = self.boards.get(&player) {
                for (slot, unit) in board.iter().enumerate() {
                    if unit.as_ref().is_some_and(Unit::is_dead) {
                        dead.push((player.clone(), slot));
                    }
                }
            }
        }
        for (player, slot) in dead {
            if let Some(board) = self.boards.get_mut(&player) {
                if let Some(unit) = board[slot].take() {
                    self.discards
                        .entry(player.clone())
                        .or_default()
                        .push(unit.card_id);
                }
            }
        }
    }

    /// Apply nexus damage. Reaching zero or below ends the match at once.
    pub fn damage_nexus(&mut self, player: &str, amount: i64) {
        if amount <= 0 {
            return;
        }
        if let Some(nexus) = self.nexus.get_mut(player) {
            nexus.health -= amount;
            if nexus.health <= 0 && self.winner.is_none() {
                self.winner = Some(self.opponent(player));
            }
        }
    }

    /// Heal a nexus, capped at its maximum.
    pub fn heal_nexus(&mut self, player: &str, amount: i64) {
        if amount <= 0 {
            return;
        }
        if let Some(nexus) = self.nexus.get_mut(player) {
            nexus.health = (nexus.health + amount).min(nexus.max_health);
        }
    }

    /// Draw one card from the top of a player's deck. Empty deck is a no-op.
    pub fn draw_card(&mut self, player: &str) {
        let drawn = self.decks.get_mut(player).and_then(|deck| {
            if deck.is_empty() {
                None
            } else {
                Some(deck.remove(0))
            }
        });
        if let Some(card_id) = drawn {
            self.hands.entry(player.to_string()).or_default().push(card_id);
        }
    }

    /// Remove exactly one matching instance from a player's hand.
    pub fn remove_from_hand(&mut self, player: &str, card_id: &str) -> Result<(), String> {
        let hand = self
            .hands
            .get_mut(player)
            .ok_or_else(|| format!("Unknown player {player}"))?;
        match hand.iter().position(|c| c == card_id) {
            Some(idx) => {
                hand.remove(idx);
                Ok(())
            }
            None => Err(format!("Card {card_id} is not in hand")),
        }
    }

    /// First empty slot on a player's board.
    pub fn first_empty_slot(&self, player: &str) -> Option<usize> {
        self.boards
            .get(player)
            .and_then(|board| board.iter().position(Option::is_none))
    }

    /// Current orientation for a card id (Upright until flipped).
    pub fn orientation_of(&self, card_id: &str) -> Orientation {
        self.orientations
            .get(card_id)
            .copied()
            .unwrap_or(Orientation::Upright)
    }
}
