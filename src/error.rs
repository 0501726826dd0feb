use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::game::{GameError, GameId, LevelDataError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Game with ID {0} not found")]
    GameNotFound(GameId),

    #[error("Game {0} has not started a round yet")]
    RoundNotStarted(GameId),

    #[error("Game logic violation: {0}")]
    Game(#[from] GameError),

    #[error("Level data error: {0}")]
    LevelData(#[from] LevelDataError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::GameNotFound(id) => (StatusCode::NOT_FOUND, format!("No game exists with id {}", id)),
            AppError::RoundNotStarted(id) => (StatusCode::NOT_FOUND, format!("Game {} has no round yet", id)),
            AppError::Game(e) => {
                tracing::warn!("Game logic violation: {}", e);
                (StatusCode::CONFLICT, format!("Game rule violation: {}", e))
            }
            AppError::LevelData(e) => {
                tracing::error!("Level data error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Level data is unavailable".to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let id = GameId::new();
        assert_eq!(AppError::GameNotFound(id).into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::RoundNotStarted(id).into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(GameError::GameAbandoned).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(LevelDataError::Empty).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
