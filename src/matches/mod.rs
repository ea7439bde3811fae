//! Match store and HTTP endpoints.
//!
//! Matches live in a shared map behind an async mutex. The endpoints are a
//! thin shell: every rules decision happens in `engine::apply_intent`, and
//! "did anything happen" is answered by comparing the state before and after.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use either::{Either, Left, Right};
use rocket::response::status::{BadRequest, NotFound};
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::State;
use rocket_okapi::{openapi, JsonSchema};

use crate::ai::{self, Difficulty};
use crate::engine::intent::Intent;
use crate::engine::state::MatchState;
use crate::engine::{self, MatchConfig};
use crate::intent_log::persistence::FileWriter;
use crate::intent_log::{IntentEntry, IntentLog};
use crate::status_messages::{new_status, Status};

/// One live match: its config, current state, and applied-intent log.
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub config: MatchConfig,
    pub state: MatchState,
    pub log: IntentLog,
}

/// Shared store of live matches, keyed by match id.
pub type MatchStore = Arc<rocket::futures::lock::Mutex<HashMap<String, MatchRecord>>>;

pub fn new_store() -> MatchStore {
    Arc::new(rocket::futures::lock::Mutex::new(HashMap::new()))
}

/// Outcome of posting an intent: whether the engine accepted it, plus the
/// resulting state either way.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct IntentOutcome {
    pub applied: bool,
    pub state: MatchState,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct VictoryResponse {
    pub winner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct LogResponse {
    pub entries: Vec<IntentEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct AiMoveRequest {
    pub player_id: String,
    pub difficulty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct AiMoveResponse {
    pub intent: Intent,
    pub applied: bool,
    pub state: MatchState,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct ReplayRequest {
    pub config: MatchConfig,
    pub intents: Vec<Intent>,
}

fn validate_config(config: &MatchConfig) -> Result<(), String> {
    if config.match_id.trim().is_empty() {
        return Err("match_id must not be empty".to_string());
    }
    if config.players.len() != 2 {
        return Err("exactly two players required".to_string());
    }
    if config.players[0] == config.players[1] {
        return Err("player ids must be distinct".to_string());
    }
    if let Some(decks) = &config.decks {
        let set = crate::cards::card_set();
        for (player, deck) in decks {
            if !config.players.contains(player) {
                return Err(format!("deck for unknown player {player}"));
            }
            for card_id in deck {
                if !set.contains(card_id) {
                    return Err(format!("unknown card {card_id} in deck of {player}"));
                }
            }
        }
    }
    Ok(())
}

/// Create a match from a config and return its initial state.
#[openapi]
#[post("/match", format = "json", data = "<config>")]
pub async fn create_match(
    store: &State<MatchStore>,
    config: Json<MatchConfig>,
) -> Result<(rocket::http::Status, Json<MatchState>), BadRequest<Json<Status>>> {
    let config = config.0;
    if let Err(e) = validate_config(&config) {
        return Err(BadRequest(new_status(e)));
    }
    let mut matches = store.lock().await;
    if matches.contains_key(&config.match_id) {
        return Err(BadRequest(new_status(format!(
            "Match {} already exists",
            config.match_id
        ))));
    }
    let state = engine::create_initial_state(&config);
    let mut log = IntentLog::new();
    // MATCH_LOG_DIR enables JSONL persistence, one file per match.
    if let Ok(dir) = std::env::var("MATCH_LOG_DIR") {
        let path = std::path::Path::new(&dir).join(format!("{}.jsonl", config.match_id));
        match FileWriter::new(path) {
            Ok(writer) => log.set_writer(Some(writer)),
            Err(e) => log::warn!("match log persistence disabled: {e}"),
        }
    }
    let record = MatchRecord {
        config: config.clone(),
        state: state.clone(),
        log,
    };
    matches.insert(config.match_id.clone(), record);
    Ok((rocket::http::Status::Created, Json(state)))
}

/// Current state of a match.
#[openapi]
#[get("/match/<match_id>")]
pub async fn get_match(
    store: &State<MatchStore>,
    match_id: &str,
) -> Result<Json<MatchState>, NotFound<Json<Status>>> {
    let matches = store.lock().await;
    match matches.get(match_id) {
        Some(record) => Ok(Json(record.state.clone())),
        None => Err(NotFound(new_status(format!("Match {match_id} not found")))),
    }
}

/// Apply one intent. Rejected intents leave the state unchanged and come back
/// with `applied: false` rather than an error status.
#[openapi]
#[post("/match/<match_id>/intent", format = "json", data = "<intent>")]
pub async fn post_intent(
    store: &State<MatchStore>,
    match_id: &str,
    intent: Json<Intent>,
) -> Result<Json<IntentOutcome>, Either<NotFound<Json<Status>>, BadRequest<Json<Status>>>> {
    let intent = intent.0;
    let mut matches = store.lock().await;
    let record = match matches.get_mut(match_id) {
        Some(record) => record,
        None => {
            return Err(Left(NotFound(new_status(format!(
                "Match {match_id} not found"
            )))));
        }
    };
    if !record.state.is_player(intent.player_id()) {
        return Err(Right(BadRequest(new_status(format!(
            "Player {} is not in match {match_id}",
            intent.player_id()
        )))));
    }
    let next = engine::apply_intent(&record.state, &intent);
    let applied = next != record.state;
    if applied {
        record.log.append(intent);
        record.state = next.clone();
    }
    Ok(Json(IntentOutcome {
        applied,
        state: next,
    }))
}

/// Victory check with an optional score threshold tiebreak.
#[openapi]
#[get("/match/<match_id>/victory?<threshold>")]
pub async fn get_victory(
    store: &State<MatchStore>,
    match_id: &str,
    threshold: Option<u32>,
) -> Result<Json<VictoryResponse>, NotFound<Json<Status>>> {
    let matches = store.lock().await;
    match matches.get(match_id) {
        Some(record) => Ok(Json(VictoryResponse {
            winner: engine::check_victory(&record.state, threshold),
        })),
        None => Err(NotFound(new_status(format!("Match {match_id} not found")))),
    }
}

/// All applied intents in order.
#[openapi]
#[get("/match/<match_id>/log")]
pub async fn get_log(
    store: &State<MatchStore>,
    match_id: &str,
) -> Result<Json<LogResponse>, NotFound<Json<Status>>> {
    let matches = store.lock().await;
    match matches.get(match_id) {
        Some(record) => Ok(Json(LogResponse {
            entries: record.log.entries(),
        })),
        None => Err(NotFound(new_status(format!("Match {match_id} not found")))),
    }
}

/// Ask the AI to pick and apply a move for a player.
#[openapi]
#[post("/match/<match_id>/ai_move", format = "json", data = "<request>")]
pub async fn ai_move(
    store: &State<MatchStore>,
    match_id: &str,
    request: Json<AiMoveRequest>,
) -> Result<Json<AiMoveResponse>, Either<NotFound<Json<Status>>, BadRequest<Json<Status>>>> {
    let request = request.0;
    let difficulty = match Difficulty::from_str(&request.difficulty) {
        Ok(d) => d,
        Err(e) => return Err(Right(BadRequest(new_status(e)))),
    };
    let mut matches = store.lock().await;
    let record = match matches.get_mut(match_id) {
        Some(record) => record,
        None => {
            return Err(Left(NotFound(new_status(format!(
                "Match {match_id} not found"
            )))));
        }
    };
    if !record.state.is_player(&request.player_id) {
        return Err(Right(BadRequest(new_status(format!(
            "Player {} is not in match {match_id}",
            request.player_id
        )))));
    }
    let intent = ai::take_turn(&record.state, &request.player_id, difficulty);
    let next = engine::apply_intent(&record.state, &intent);
    let applied = next != record.state;
    if applied {
        record.log.append(intent.clone());
        record.state = next.clone();
    }
    Ok(Json(AiMoveResponse {
        intent,
        applied,
        state: next,
    }))
}

/// Replay a config plus intent list from scratch and return the final state.
/// The store is untouched.
#[openapi]
#[post("/replay", format = "json", data = "<request>")]
pub async fn replay_match(
    request: Json<ReplayRequest>,
) -> Result<Json<MatchState>, BadRequest<Json<Status>>> {
    let request = request.0;
    if let Err(e) = validate_config(&request.config) {
        return Err(BadRequest(new_status(e)));
    }
    Ok(Json(engine::replay(&request.config, &request.intents)))
}
