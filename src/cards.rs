//! Built-in card definitions.
//!
//! Cards are registered once at startup into an immutable set, the same way
//! the library seeds its canonical collection, and validated so that every
//! `branch(...)` effect resolves to a named call on the same card.

use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::engine::keywords::Keyword;

/// Card suit. Major arcana cards belong to no minor suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub enum Suit {
    Wands,
    Cups,
    Swords,
    Pentacles,
    Major,
}

/// Cast speed. Burst resolves immediately and never yields priority; fast
/// joins the stack; slow is main-phase only with an empty stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub enum CardSpeed {
    Slow,
    Fast,
    Burst,
}

/// Type-specific payload of a card definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde", tag = "card_kind")]
pub enum CardKind {
    Unit {
        attack: i64,
        health: i64,
        keywords: Vec<Keyword>,
    },
    Spell {
        /// Effect DSL call executed on resolution.
        effect: String,
        /// Named calls referenced by `branch(...)` arguments.
        named_calls: HashMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct CardDef {
    pub id: String,
    pub name: String,
    pub suit: Suit,
    pub cost: i64,
    pub speed: CardSpeed,
    pub kind: CardKind,
}

impl CardDef {
    fn unit(id: &str, name: &str, suit: Suit, cost: i64, attack: i64, health: i64, keywords: Vec<Keyword>) -> Self {
        CardDef {
            id: id.to_string(),
            name: name.to_string(),
            suit,
            cost,
            speed: CardSpeed::Slow,
            kind: CardKind::Unit {
                attack,
                health,
                keywords,
            },
        }
    }

    fn spell(id: &str, name: &str, suit: Suit, cost: i64, speed: CardSpeed, effect: &str) -> Self {
        CardDef {
            id: id.to_string(),
            name: name.to_string(),
            suit,
            cost,
            speed,
            kind: CardKind::Spell {
                effect: effect.to_string(),
                named_calls: HashMap::new(),
            },
        }
    }

    fn with_named_call(mut self, name: &str, call: &str) -> Self {
        if let CardKind::Spell { named_calls, .. } = &mut self.kind {
            named_calls.insert(name.to_string(), call.to_string());
        }
        self
    }

    pub fn is_unit(&self) -> bool {
        matches!(self.kind, CardKind::Unit { .. })
    }
}

/// Immutable collection of all card definitions.
#[derive(Debug, Clone)]
pub struct CardSet {
    defs: HashMap<String, CardDef>,
}

impl CardSet {
    pub fn get(&self, card_id: &str) -> Option<&CardDef> {
        self.defs.get(card_id)
    }

    pub fn contains(&self, card_id: &str) -> bool {
        self.defs.contains_key(card_id)
    }

    fn add(&mut self, def: CardDef) {
        self.defs.insert(def.id.clone(), def);
    }

    /// Validate that every `branch(card, up, rev)` references named calls
    /// that exist on the owning card.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        for def in self.defs.values() {
            if let CardKind::Spell {
                effect,
                named_calls,
            } = &def.kind
            {
                if let Some(call) = crate::engine::effects::parse_call(effect) {
                    if call.name == "branch" {
                        for arg in call.args.iter().skip(1) {
                            if let crate::engine::effects::EffectArg::Text(name) = arg {
                                if !named_calls.contains_key(name) {
                                    errors.push(format!(
                                        "Card {} branches to undefined call {name}",
                                        def.id
                                    ));
                                }
                            }
                        }
                    }
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn initialize_card_set() -> CardSet {
    let mut set = CardSet {
        defs: HashMap::new(),
    };

    // ---- Wands: aggression ----
    set.add(CardDef::unit("wands_01", "Page of Wands", Suit::Wands, 1, 2, 1, vec![Keyword::QuickAttack]));
    set.add(CardDef::unit("wands_02", "Knight of Wands", Suit::Wands, 1, 3, 2, vec![Keyword::Overwhelm]));
    set.add(CardDef::unit("wands_03", "King of Wands", Suit::Wands, 5, 5, 4, vec![Keyword::Overwhelm, Keyword::Fury]));
    set.add(CardDef::spell("wands_04", "Burst of Flame", Suit::Wands, 2, CardSpeed::Fast, "damage_unit(2)"));
    set.add(CardDef::spell("wands_05", "Ignite", Suit::Wands, 1, CardSpeed::Burst, "buff_attack(2, 1)"));

    // ---- Cups: sustain ----
    set.add(CardDef::unit("cups_01", "Page of Cups", Suit::Cups, 2, 2, 3, vec![Keyword::Lifesteal]));
    set.add(CardDef::unit("cups_02", "Knight of Cups", Suit::Cups, 2, 1, 4, vec![Keyword::Tough]));
    set.add(CardDef::unit("cups_03", "Queen of Cups", Suit::Cups, 4, 3, 3, vec![Keyword::Regeneration]));
    set.add(CardDef::spell("cups_04", "Renewal", Suit::Cups, 2, CardSpeed::Burst, "heal_nexus(3)"));

    // ---- Swords: evasion ----
    set.add(CardDef::unit("swords_01", "Page of Swords", Suit::Swords, 2, 3, 1, vec![Keyword::Elusive]));
    set.add(CardDef::unit("swords_02", "Knight of Swords", Suit::Swords, 3, 4, 3, vec![Keyword::Fearsome]));
    set.add(CardDef::unit("swords_03", "Queen of Swords", Suit::Swords, 3, 2, 2, vec![Keyword::Barrier]));
    set.add(CardDef::spell("swords_04", "Sudden Gale", Suit::Swords, 3, CardSpeed::Fast, "damage_nexus(2)"));

    // ---- Pentacles: value ----
    set.add(CardDef::unit("pentacles_01", "Page of Pentacles", Suit::Pentacles, 2, 1, 3, vec![Keyword::Spellshield]));
    set.add(CardDef::unit("pentacles_02", "Knight of Pentacles", Suit::Pentacles, 3, 3, 4, vec![]));
    set.add(
        CardDef::spell("pentacles_04", "Turn of Fortune", Suit::Pentacles, 2, CardSpeed::Slow, "branch(pentacles_04, reading_up, reading_rev)")
            .with_named_call("reading_up", "draw(2)")
            .with_named_call("reading_rev", "gain_fate(1)"),
    );

    // Effect name intentionally undefined: exercises the forward-compatible
    // unknown-effect path.
    set.add(CardDef::spell("major_00", "The Fool", Suit::Major, 0, CardSpeed::Slow, "wander(3)"));

    set
}

/// The process-wide immutable card set.
pub fn card_set() -> &'static CardSet {
    static SET: OnceLock<CardSet> = OnceLock::new();
    SET.get_or_init(|| {
        let set = initialize_card_set();
        if let Err(errors) = set.validate() {
            panic!("Card set validation failed: {errors:?}");
        }
        set
    })
}

/// Default 20-card deck used when a match config carries no deck lists.
pub fn default_deck() -> Vec<String> {
    [
        "wands_01", "wands_01", "wands_02", "wands_02", "wands_03",
        "wands_04", "wands_05", "cups_01", "cups_01", "cups_02",
        "cups_03", "cups_04", "swords_01", "swords_02", "swords_03",
        "swords_04", "pentacles_01", "pentacles_02", "pentacles_04", "major_00",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}
