use serde::{Deserialize, Serialize};

use crate::game::{Game, GameId, PlayerId};

// --- DTOs (Data Transfer Objects) ---
#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    pub name: String,
    pub owner_id: Option<PlayerId>,
    pub owner_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: GameId,
    pub name: String,
    pub owner_name: String,
}

impl From<&Game> for GameSummary {
    fn from(game: &Game) -> Self {
        Self {
            id: game.id(),
            name: game.name().to_string(),
            owner_name: game.owner_name().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddPlayerRequest {
    pub player_id: PlayerId,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimeResponse {
    pub server_time_ms: u64,
}
