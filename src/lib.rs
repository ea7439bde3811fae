//! # Arcana Duel
//!
//! A deterministic two-player card duel engine with a REST API.
//!
//! ## Overview
//!
//! Matches are driven entirely by intents: every move a player or the AI
//! makes is a record posted to the engine, which either applies it or leaves
//! the state untouched. All randomness derives from the match seed, so a
//! match replayed from its config and intent log reproduces the same final
//! state on any machine.
//!
//! ## Architecture
//!
//! The API is built using the Rocket web framework with OpenAPI documentation
//! support. The rules engine itself is pure (`engine::apply_intent` maps a
//! state and an intent to a new state); live matches are held in a shared
//! store behind an async mutex so concurrent HTTP requests stay consistent.

// Rocket makes this a bit tricky to support
#![allow(clippy::module_name_repetitions)]
#[macro_use]
extern crate rocket;

use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::{make_swagger_ui, SwaggerUIConfig};

pub mod ai;
pub mod cards;
pub mod engine;
pub mod intent_log;
pub mod matches;
pub mod status_messages;

/// Initializes and configures the Rocket web server with all routes and OpenAPI documentation.
///
/// # Returns
///
/// A configured Rocket instance ready to be launched.
///
/// # Example
///
/// ```no_run
/// use arcana_duel::rocket_initialize;
///
/// #[rocket::main]
/// async fn main() {
///     rocket_initialize().launch().await.expect("Failed to launch rocket");
/// }
/// ```
pub fn rocket_initialize() -> rocket::Rocket<rocket::Build> {
    use crate::matches::okapi_add_operation_for_ai_move_;
    use crate::matches::okapi_add_operation_for_create_match_;
    use crate::matches::okapi_add_operation_for_get_log_;
    use crate::matches::okapi_add_operation_for_get_match_;
    use crate::matches::okapi_add_operation_for_get_victory_;
    use crate::matches::okapi_add_operation_for_post_intent_;
    use crate::matches::okapi_add_operation_for_replay_match_;
    use crate::matches::{
        ai_move, create_match, get_log, get_match, get_victory, post_intent, replay_match,
    };

    #[allow(clippy::no_effect_underscore_binding)]
    let _ = env_logger::try_init();

    use rocket::fairing::AdHoc;

    let store = matches::new_store();

    rocket::build()
        .mount(
            "/",
            openapi_get_routes![
                create_match,
                get_match,
                post_intent,
                get_victory,
                get_log,
                ai_move,
                replay_match
            ],
        )
        .mount("/swagger", make_swagger_ui(&get_docs()))
        .manage(store.clone())
        .attach(AdHoc::on_liftoff("intentlog-shutdown", |rocket| {
            Box::pin(async move {
                // When the process receives SIGINT/SIGTERM (or ctrl-c), flush
                // every match's intent log writer before exit.
                if let Some(store) = rocket.state::<matches::MatchStore>().cloned() {
                    rocket::tokio::spawn(async move {
                        #[cfg(unix)]
                        {
                            use rocket::tokio::signal::unix::{signal, SignalKind};
                            let mut sigterm = signal(SignalKind::terminate())
                                .expect("failed to set SIGTERM handler");
                            let mut sigint = signal(SignalKind::interrupt())
                                .expect("failed to set SIGINT handler");
                            rocket::tokio::select! {
                                _ = sigterm.recv() => {},
                                _ = sigint.recv() => {},
                            }
                        }
                        #[cfg(not(unix))]
                        {
                            let _ = rocket::tokio::signal::ctrl_c().await;
                        }

                        let matches = store.lock().await;
                        for record in matches.values() {
                            record.log.shutdown();
                        }
                    });
                }
            })
        }))
}

fn get_docs() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/openapi.json".to_string(),
        ..Default::default()
    }
}
