pub mod config;
pub mod data;
pub mod error;
pub mod game;
pub mod handlers;
pub mod state;

use axum::{
    http::Method,
    routing::{delete, get},
    Router,
};
use config::Config;
use error::AppError;
use game::{GameManager, LevelRepository, PuzzleGenerator};
use handlers::rest;
use state::{AppState, SharedState};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

/// Loads level data, starts the reaper and builds the router.
pub fn create_app(config: Config) -> Result<Router, AppError> {
    let levels = LevelRepository::from_file(&config.game.levels_path)?;
    Ok(create_app_with_levels(config, levels))
}

pub fn create_app_with_levels(config: Config, levels: LevelRepository) -> Router {
    let generator = PuzzleGenerator::new(levels, config.game.puzzles_per_round);
    let manager = Arc::new(GameManager::new(generator, config.game.settings()));
    GameManager::spawn_reaper(&manager, config.game.reap_interval());

    router(Arc::new(AppState { manager }))
}

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/time", get(rest::time_handler))
        .route("/games", get(rest::list_joinable_games_handler).post(rest::create_game_handler))
        .route("/games/{id}", get(rest::get_game_handler))
        .route("/games/{id}/state", get(rest::get_game_state_handler).post(rest::post_update_handler))
        .route("/games/{id}/round", get(rest::get_current_round_handler))
        .route("/games/{id}/score", get(rest::get_scoreboard_handler))
        .route("/games/{id}/players", get(rest::list_players_handler).post(rest::add_player_handler))
        .route("/games/{id}/players/{player_id}", delete(rest::remove_player_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default().include_headers(true)))
        .layer(cors)
}
