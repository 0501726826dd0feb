use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)] // Serialize directly as the inner UUID string
pub struct PlayerId(Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(Uuid);

impl GameId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// Client-submitted update, posted against a game's state resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    try_from = "RawStatusUpdate"
)]
pub enum GameStatusUpdate {
    BeginGame,
    PuzzleCompleted { player_id: PlayerId },
    /// Any update type this server does not know, whatever its payload. Every state ignores it.
    Unrecognized,
}

/// Wire form of an update before its type tag is interpreted.
#[derive(Debug, Deserialize)]
struct RawStatusUpdate {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CompletionPayload {
    player_id: PlayerId,
}

impl TryFrom<RawStatusUpdate> for GameStatusUpdate {
    type Error = serde_json::Error;

    fn try_from(raw: RawStatusUpdate) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            "BEGIN_GAME" => Ok(GameStatusUpdate::BeginGame),
            "PUZZLE_COMPLETED" => {
                let payload: CompletionPayload = serde_json::from_value(raw.payload.unwrap_or(Value::Null))?;
                Ok(GameStatusUpdate::PuzzleCompleted {
                    player_id: payload.player_id,
                })
            }
            _ => Ok(GameStatusUpdate::Unrecognized),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("game has been abandoned")]
    GameAbandoned,
}
