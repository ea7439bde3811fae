//! Player/AI intents: the tagged records accepted by `apply_intent`.

use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;

/// One blocker-to-attacker assignment.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema, Hash)]
#[serde(crate = "rocket::serde")]
pub struct BlockAssignment {
    pub blocker_id: String,
    pub attacker_id: String,
}

/// Everything a player (or the AI) can ask the engine to do.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema, Hash)]
#[serde(crate = "rocket::serde", tag = "intent_type")]
pub enum Intent {
    PlayCard {
        player_id: String,
        card_id: String,
        lane: Option<usize>,
    },
    DeclareAttackers {
        player_id: String,
        attacker_ids: Vec<String>,
    },
    DeclareBlockers {
        player_id: String,
        block_assignments: Vec<BlockAssignment>,
    },
    Pass {
        player_id: String,
    },
    EndTurn {
        player_id: String,
    },
    FlipOrientation {
        player_id: String,
        card_id: String,
    },
    Peek {
        player_id: String,
    },
    ForceDraw {
        player_id: String,
    },
    BlockFlip {
        player_id: String,
        target_player_id: String,
        card_id: String,
    },
    AssignSpread {
        player_id: String,
        past_id: Option<String>,
        present_id: Option<String>,
        future_id: Option<String>,
    },
}

impl Intent {
    /// The player issuing this intent.
    pub fn player_id(&self) -> &str {
        match self {
            Intent::PlayCard { player_id, .. }
            | Intent::DeclareAttackers { player_id, .. }
            | Intent::DeclareBlockers { player_id, .. }
            | Intent::Pass { player_id }
            | Intent::EndTurn { player_id }
            | Intent::FlipOrientation { player_id, .. }
            | Intent::Peek { player_id }
            | Intent::ForceDraw { player_id }
            | Intent::BlockFlip { player_id, .. }
            | Intent::AssignSpread { player_id, .. } => player_id,
        }
    }
}
