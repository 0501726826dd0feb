pub mod domain;
pub mod manager;
pub mod puzzle;
pub mod scoreboard;
pub mod state;
pub mod types;


pub use domain::{Game, GameSettings};
pub use manager::GameManager;
pub use puzzle::{Deformation, LevelDataError, LevelRepository, LevelTemplate, Puzzle, PuzzleGenerator, Round, ShapeTemplate, ShapeTransformation};
pub use scoreboard::{PlayerScore, ScoreSnapshot, Scoreboard};
pub use state::{StateDetails, StateKind, StateSnapshot};
pub use types::{GameError, GameId, GameStatusUpdate, Player, PlayerId};
