use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::{sync::Arc, time::Duration};
use tracing::instrument;

use crate::{
    data::{AddPlayerRequest, CreateGameRequest, GameSummary, TimeResponse},
    error::AppError,
    game::{state::wall_clock_ms, Game, GameId, GameStatusUpdate, Player, PlayerId},
    state::SharedState,
};

// Polled resources must never be served from a cache.
const NO_CACHE: [(header::HeaderName, &str); 1] = [(header::CACHE_CONTROL, "no-cache")];

fn find_game(state: &SharedState, game_id: GameId) -> Result<Arc<Game>, AppError> {
    state.manager.find_game(game_id).ok_or(AppError::GameNotFound(game_id))
}

// ==============================================================================
// === REST API Handlers
// =============================================================================

pub async fn time_handler() -> Json<TimeResponse> {
    Json(TimeResponse {
        server_time_ms: wall_clock_ms(Duration::ZERO),
    })
}

#[instrument(skip(state))]
pub async fn create_game_handler(
    State(state): State<SharedState>,
    Json(payload): Json<CreateGameRequest>,
) -> (StatusCode, Json<GameSummary>) {
    let owner_id = payload.owner_id.unwrap_or_else(PlayerId::new);
    let owner = Player::new(owner_id, payload.owner_name);

    let game = state.manager.add_game(payload.name, owner);

    tracing::info!(game_id = %game.id(), owner_id = %owner_id, "Game created successfully");
    (StatusCode::CREATED, Json(GameSummary::from(game.as_ref())))
}

#[instrument(skip(state))]
pub async fn list_joinable_games_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let games: Vec<GameSummary> = state
        .manager
        .get_all()
        .iter()
        .filter(|game| game.is_joinable())
        .map(|game| GameSummary::from(game.as_ref()))
        .collect();

    (NO_CACHE, Json(games))
}

#[instrument(skip(state))]
pub async fn get_game_handler(
    State(state): State<SharedState>,
    Path(game_id): Path<GameId>,
) -> Result<Json<GameSummary>, AppError> {
    let game = find_game(&state, game_id)?;
    Ok(Json(GameSummary::from(game.as_ref())))
}

#[instrument(skip(state))]
pub async fn get_game_state_handler(
    State(state): State<SharedState>,
    Path(game_id): Path<GameId>,
) -> Result<impl IntoResponse, AppError> {
    let game = find_game(&state, game_id)?;
    Ok((NO_CACHE, Json(game.state_snapshot())))
}

#[instrument(skip(state))]
pub async fn post_update_handler(
    State(state): State<SharedState>,
    Path(game_id): Path<GameId>,
    Json(update): Json<GameStatusUpdate>,
) -> Result<StatusCode, AppError> {
    let game = find_game(&state, game_id)?;
    game.process_update(&update);
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_current_round_handler(
    State(state): State<SharedState>,
    Path(game_id): Path<GameId>,
) -> Result<impl IntoResponse, AppError> {
    let game = find_game(&state, game_id)?;
    let round = game.current_round().ok_or(AppError::RoundNotStarted(game_id))?;
    Ok((NO_CACHE, Json(round.as_ref().clone())))
}

#[instrument(skip(state))]
pub async fn get_scoreboard_handler(
    State(state): State<SharedState>,
    Path(game_id): Path<GameId>,
) -> Result<impl IntoResponse, AppError> {
    let game = find_game(&state, game_id)?;
    Ok((NO_CACHE, Json(game.score_snapshot())))
}

#[instrument(skip(state))]
pub async fn list_players_handler(
    State(state): State<SharedState>,
    Path(game_id): Path<GameId>,
) -> Result<impl IntoResponse, AppError> {
    let game = find_game(&state, game_id)?;
    Ok((NO_CACHE, Json(game.players())))
}

#[instrument(skip(state))]
pub async fn add_player_handler(
    State(state): State<SharedState>,
    Path(game_id): Path<GameId>,
    Json(payload): Json<AddPlayerRequest>,
) -> Result<StatusCode, AppError> {
    let game = find_game(&state, game_id)?;
    game.add_player(Player::new(payload.player_id, payload.name))?;

    tracing::info!(game_id = %game_id, player_id = %payload.player_id, "Player joined");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn remove_player_handler(
    State(state): State<SharedState>,
    Path((game_id, player_id)): Path<(GameId, PlayerId)>,
) -> Result<StatusCode, AppError> {
    let game = find_game(&state, game_id)?;
    game.remove_player(player_id);

    tracing::info!(game_id = %game_id, player_id = %player_id, "Player left");
    Ok(StatusCode::NO_CONTENT)
}
