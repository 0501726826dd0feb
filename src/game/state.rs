use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::{runtime::Handle, task::AbortHandle, time::Instant};

use super::domain::{Game, GameSettings};
use super::puzzle::{PuzzleGenerator, Round};
use super::scoreboard::Scoreboard;
use super::types::{GameStatusUpdate, Player, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    WaitingForPlayers,
    BeginningRound,
    BeginningPuzzle,
    SolvingPuzzle,
    RoundEnded,
    Abandoned,
}

/// Immutable projection of a game's current state, as handed to polling clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub ordinal: u64,
    #[serde(flatten)]
    pub details: StateDetails,
}

impl StateSnapshot {
    pub fn kind(&self) -> StateKind {
        match self.details {
            StateDetails::WaitingForPlayers => StateKind::WaitingForPlayers,
            StateDetails::BeginningRound { .. } => StateKind::BeginningRound,
            StateDetails::BeginningPuzzle { .. } => StateKind::BeginningPuzzle,
            StateDetails::SolvingPuzzle { .. } => StateKind::SolvingPuzzle,
            StateDetails::RoundEnded { .. } => StateKind::RoundEnded,
            StateDetails::Abandoned => StateKind::Abandoned,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum StateDetails {
    WaitingForPlayers,
    BeginningRound {
        start_time_ms: u64,
    },
    BeginningPuzzle {
        start_time_ms: u64,
        current_puzzle: usize,
        winner_of_previous_puzzle: Option<PlayerId>,
    },
    SolvingPuzzle {
        current_puzzle: usize,
    },
    RoundEnded {
        rounds_played: u32,
    },
    Abandoned,
}

/// Everything a game owns besides its current state.
#[derive(Debug, Default)]
pub(super) struct SessionData {
    pub players: HashMap<PlayerId, Player>,
    pub scoreboard: Scoreboard,
    pub round: Option<Arc<Round>>,
    pub current_puzzle: Option<usize>,
    pub previous_winner: Option<PlayerId>,
}

/// A delayed auto-transition owned by the state that scheduled it.
#[derive(Debug)]
pub(super) struct PendingTransition {
    handle: AbortHandle,
}

impl PendingTransition {
    fn cancel(&self) {
        self.handle.abort();
    }
}

/// Spawns timers that re-enter the game once their deadline passes. Each timer
/// carries the ordinal of the state that scheduled it so a late firing is a no-op.
pub(super) struct Scheduler<'a> {
    runtime: &'a Handle,
    game: &'a Weak<Game>,
    ordinal: u64,
}

impl<'a> Scheduler<'a> {
    pub fn new(runtime: &'a Handle, game: &'a Weak<Game>, ordinal: u64) -> Self {
        Self { runtime, game, ordinal }
    }

    fn after(&self, delay: Duration, next: StateKind) -> PendingTransition {
        let game = self.game.clone();
        let ordinal = self.ordinal;
        let deadline = Instant::now() + delay;

        let handle = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(game) = game.upgrade() {
                game.fire_scheduled(ordinal, next);
            }
        });

        PendingTransition {
            handle: handle.abort_handle(),
        }
    }
}

pub(super) struct StateEnv<'a> {
    pub generator: &'a PuzzleGenerator,
    pub settings: &'a GameSettings,
    pub scheduler: Scheduler<'a>,
}

#[derive(Debug)]
pub(super) enum GameState {
    WaitingForPlayers {
        begin_requests: u32,
    },
    BeginningRound {
        start_time_ms: u64,
        timer: PendingTransition,
    },
    BeginningPuzzle {
        start_time_ms: u64,
        current_puzzle: usize,
        winner_of_previous_puzzle: Option<PlayerId>,
        timer: PendingTransition,
    },
    SolvingPuzzle {
        current_puzzle: usize,
    },
    RoundEnded {
        rounds_played: u32,
    },
    Abandoned,
}

impl GameState {
    pub fn initial() -> Self {
        GameState::WaitingForPlayers { begin_requests: 0 }
    }

    pub fn kind(&self) -> StateKind {
        match self {
            GameState::WaitingForPlayers { .. } => StateKind::WaitingForPlayers,
            GameState::BeginningRound { .. } => StateKind::BeginningRound,
            GameState::BeginningPuzzle { .. } => StateKind::BeginningPuzzle,
            GameState::SolvingPuzzle { .. } => StateKind::SolvingPuzzle,
            GameState::RoundEnded { .. } => StateKind::RoundEnded,
            GameState::Abandoned => StateKind::Abandoned,
        }
    }

    /// Builds the state for `kind` and runs its entry actions. The second value is
    /// a transition the new state wants to take immediately.
    pub fn enter(kind: StateKind, data: &mut SessionData, env: &StateEnv<'_>) -> (GameState, Option<StateKind>) {
        match kind {
            StateKind::WaitingForPlayers => (GameState::initial(), None),
            StateKind::BeginningRound => {
                let delay = env.settings.round_start_delay;
                let round = env.generator.generate_round(data.scoreboard.rounds_played());
                let empty = round.puzzles.is_empty();

                data.round = Some(Arc::new(round));
                data.current_puzzle = None;
                data.previous_winner = None;

                let state = GameState::BeginningRound {
                    start_time_ms: wall_clock_ms(delay),
                    timer: env.scheduler.after(delay, StateKind::BeginningPuzzle),
                };
                let cascade = empty.then_some(StateKind::RoundEnded);
                (state, cascade)
            }
            StateKind::BeginningPuzzle => {
                let delay = env.settings.puzzle_start_delay;
                let current_puzzle = data.current_puzzle.map_or(0, |index| index + 1);
                data.current_puzzle = Some(current_puzzle);

                let state = GameState::BeginningPuzzle {
                    start_time_ms: wall_clock_ms(delay),
                    current_puzzle,
                    winner_of_previous_puzzle: data.previous_winner.take(),
                    timer: env.scheduler.after(delay, StateKind::SolvingPuzzle),
                };
                (state, None)
            }
            StateKind::SolvingPuzzle => {
                let current_puzzle = data.current_puzzle.unwrap_or(0);
                (GameState::SolvingPuzzle { current_puzzle }, None)
            }
            StateKind::RoundEnded => {
                data.scoreboard.round_completed();
                let rounds_played = data.scoreboard.rounds_played();
                (GameState::RoundEnded { rounds_played }, None)
            }
            StateKind::Abandoned => (GameState::Abandoned, None),
        }
    }

    /// Cancels anything this state scheduled.
    pub fn leave(&mut self) {
        match self {
            GameState::BeginningRound { timer, .. } | GameState::BeginningPuzzle { timer, .. } => timer.cancel(),
            _ => {}
        }
    }

    /// Applies a client update. Updates the state does not expect are ignored.
    pub fn process_update(&mut self, update: &GameStatusUpdate, data: &mut SessionData) -> Option<StateKind> {
        match (self, update) {
            (GameState::WaitingForPlayers { begin_requests }, GameStatusUpdate::BeginGame) => {
                *begin_requests += 1;
                ready_to_begin(*begin_requests, data)
            }
            (GameState::SolvingPuzzle { current_puzzle }, GameStatusUpdate::PuzzleCompleted { player_id }) => {
                if !data.players.contains_key(player_id) {
                    tracing::debug!(player_id = %player_id, "Dropping completion report from unknown player");
                    return None;
                }

                data.scoreboard.puzzle_won(*player_id);
                data.previous_winner = Some(*player_id);

                let puzzle_count = data.round.as_ref().map_or(0, |round| round.puzzles.len());
                if *current_puzzle + 1 < puzzle_count {
                    Some(StateKind::BeginningPuzzle)
                } else {
                    Some(StateKind::RoundEnded)
                }
            }
            (GameState::RoundEnded { .. }, GameStatusUpdate::BeginGame) => Some(StateKind::BeginningRound),
            _ => None,
        }
    }

    /// Lets the lobby start once a player shows up after a begin request.
    pub fn on_player_joined(&self, data: &SessionData) -> Option<StateKind> {
        match self {
            GameState::WaitingForPlayers { begin_requests } => ready_to_begin(*begin_requests, data),
            _ => None,
        }
    }

    pub fn snapshot(&self, ordinal: u64) -> StateSnapshot {
        let details = match self {
            GameState::WaitingForPlayers { .. } => StateDetails::WaitingForPlayers,
            GameState::BeginningRound { start_time_ms, .. } => StateDetails::BeginningRound {
                start_time_ms: *start_time_ms,
            },
            GameState::BeginningPuzzle {
                start_time_ms,
                current_puzzle,
                winner_of_previous_puzzle,
                ..
            } => StateDetails::BeginningPuzzle {
                start_time_ms: *start_time_ms,
                current_puzzle: *current_puzzle,
                winner_of_previous_puzzle: *winner_of_previous_puzzle,
            },
            GameState::SolvingPuzzle { current_puzzle } => StateDetails::SolvingPuzzle {
                current_puzzle: *current_puzzle,
            },
            GameState::RoundEnded { rounds_played } => StateDetails::RoundEnded {
                rounds_played: *rounds_played,
            },
            GameState::Abandoned => StateDetails::Abandoned,
        };

        StateSnapshot { ordinal, details }
    }
}

fn ready_to_begin(begin_requests: u32, data: &SessionData) -> Option<StateKind> {
    (begin_requests >= 1 && !data.players.is_empty()).then_some(StateKind::BeginningRound)
}

/// Wall-clock unix time in milliseconds, `offset` from now.
pub fn wall_clock_ms(offset: Duration) -> u64 {
    let at = SystemTime::now() + offset;
    at.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_kind_tag() {
        let snapshot = StateSnapshot {
            ordinal: 4,
            details: StateDetails::BeginningPuzzle {
                start_time_ms: 1_000,
                current_puzzle: 1,
                winner_of_previous_puzzle: None,
            },
        };

        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["kind"], "BeginningPuzzle");
        assert_eq!(json["ordinal"], 4);
        assert_eq!(json["current_puzzle"], 1);
        assert_eq!(snapshot.kind(), StateKind::BeginningPuzzle);
    }

    #[test]
    fn test_waiting_state_needs_a_player_and_a_begin() {
        let mut state = GameState::initial();
        let mut data = SessionData::default();

        assert_eq!(state.process_update(&GameStatusUpdate::BeginGame, &mut data), None);
        assert_eq!(state.on_player_joined(&data), None);

        let player = Player::new(PlayerId::new(), "Alice");
        data.players.insert(player.id, player);
        assert_eq!(state.on_player_joined(&data), Some(StateKind::BeginningRound));
    }

    #[test]
    fn test_unrecognized_updates_are_ignored_everywhere() {
        let mut data = SessionData::default();
        let mut states = vec![
            GameState::initial(),
            GameState::SolvingPuzzle { current_puzzle: 0 },
            GameState::RoundEnded { rounds_played: 1 },
            GameState::Abandoned,
        ];

        for state in states.iter_mut() {
            assert_eq!(state.process_update(&GameStatusUpdate::Unrecognized, &mut data), None);
        }
    }

    #[test]
    fn test_completion_from_unknown_player_is_dropped() {
        let mut state = GameState::SolvingPuzzle { current_puzzle: 0 };
        let mut data = SessionData::default();

        let update = GameStatusUpdate::PuzzleCompleted { player_id: PlayerId::new() };

        assert_eq!(state.process_update(&update, &mut data), None);
        assert_eq!(data.scoreboard.most_recent_winner(), None);
    }
}
