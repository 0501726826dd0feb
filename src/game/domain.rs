use parking_lot::{Mutex, RwLock};
use std::{
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::{runtime::Handle, time::Instant};

use super::puzzle::{PuzzleGenerator, Round};
use super::scoreboard::ScoreSnapshot;
use super::state::{GameState, Scheduler, SessionData, StateEnv, StateKind, StateSnapshot};
use super::types::{GameError, GameId, GameStatusUpdate, Player, PlayerId};

/// Upper bound on transitions triggered by a single mutation, entry cascades included.
const MAX_CASCADE: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettings {
    pub round_start_delay: Duration,
    pub puzzle_start_delay: Duration,
    pub inactivity_timeout: Duration,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            round_start_delay: Duration::from_secs(4),
            puzzle_start_delay: Duration::from_secs(3),
            inactivity_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct Session {
    state: GameState,
    ordinal: u64,
    data: SessionData,
}

/// A multiplayer session. All state lives behind one reader/writer lock; every
/// mutation, including the transitions it cascades into, runs inside a single
/// write-locked section.
pub struct Game {
    id: GameId,
    name: String,
    owner_name: String,
    settings: GameSettings,
    generator: Arc<PuzzleGenerator>,
    runtime: Handle,
    handle: Weak<Game>,
    last_activity: Mutex<Instant>,
    session: RwLock<Session>,
}

impl Game {
    /// Delayed transitions are spawned on `runtime`, so the game can be driven from
    /// threads outside it.
    pub fn new(
        name: impl Into<String>,
        owner: Player,
        generator: Arc<PuzzleGenerator>,
        settings: GameSettings,
        runtime: Handle,
    ) -> Arc<Self> {
        let mut data = SessionData::default();
        data.scoreboard.add_player(&owner);
        let owner_name = owner.name.clone();
        data.players.insert(owner.id, owner);

        Arc::new_cyclic(|handle| Self {
            id: GameId::new(),
            name: name.into(),
            owner_name,
            settings,
            generator,
            runtime,
            handle: handle.clone(),
            last_activity: Mutex::new(Instant::now()),
            session: RwLock::new(Session {
                state: GameState::initial(),
                ordinal: 0,
                data,
            }),
        })
    }

    // Getters
    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    /// New players are only advertised while the lobby is open.
    pub fn is_joinable(&self) -> bool {
        self.session.read().state.kind() == StateKind::WaitingForPlayers
    }

    pub fn state_snapshot(&self) -> StateSnapshot {
        self.touch();
        let session = self.session.read();
        session.state.snapshot(session.ordinal)
    }

    pub fn score_snapshot(&self) -> ScoreSnapshot {
        self.touch();
        self.session.read().data.scoreboard.snapshot()
    }

    pub fn current_round(&self) -> Option<Arc<Round>> {
        self.touch();
        self.session.read().data.round.clone()
    }

    pub fn players(&self) -> Vec<Player> {
        self.touch();
        self.session.read().data.players.values().cloned().collect()
    }

    pub fn is_inactive(&self) -> bool {
        self.last_activity.lock().elapsed() > self.settings.inactivity_timeout
    }

    //  --- Public mutators ---
    #[tracing::instrument(skip(self), fields(game_id = %self.id))]
    pub fn process_update(&self, update: &GameStatusUpdate) {
        self.touch();
        let mut guard = self.session.write();
        let session = &mut *guard;

        match session.state.process_update(update, &mut session.data) {
            Some(next) => self.transition(session, next),
            None => tracing::debug!(state = ?session.state.kind(), "Update ignored by current state"),
        }
    }

    #[tracing::instrument(skip(self), fields(game_id = %self.id))]
    pub fn add_player(&self, player: Player) -> Result<(), GameError> {
        self.touch();
        let mut guard = self.session.write();
        let session = &mut *guard;

        if session.state.kind() == StateKind::Abandoned {
            tracing::warn!(player_id = %player.id, "Join attempt on abandoned game");
            return Err(GameError::GameAbandoned);
        }
        if session.data.players.contains_key(&player.id) {
            return Ok(());
        }

        session.data.scoreboard.add_player(&player);
        session.data.players.insert(player.id, player);

        if let Some(next) = session.state.on_player_joined(&session.data) {
            self.transition(session, next);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(game_id = %self.id))]
    pub fn remove_player(&self, player_id: PlayerId) {
        self.touch();
        let mut guard = self.session.write();
        let session = &mut *guard;

        if session.data.players.remove(&player_id).is_none() {
            return;
        }
        session.data.scoreboard.remove_player(player_id);

        if session.data.players.is_empty() {
            self.transition(session, StateKind::Abandoned);
        }
    }

    /// Entry point for delayed transitions. Timers from superseded states are ignored.
    pub(super) fn fire_scheduled(&self, ordinal: u64, next: StateKind) {
        let mut session = self.session.write();
        if session.ordinal != ordinal {
            tracing::debug!(game_id = %self.id, ordinal, current = session.ordinal, "Ignoring stale timer");
            return;
        }
        self.transition(&mut *session, next);
    }

    //  --- Private helpers ---
    /// Abandoned games stop counting requests so the reaper can reclaim them.
    fn touch(&self) {
        if self.session.read().state.kind() == StateKind::Abandoned {
            return;
        }
        *self.last_activity.lock() = Instant::now();
    }

    /// Leaves the current state and enters `kind`, following any transitions the
    /// new state requests on entry. Abandoned is terminal.
    fn transition(&self, session: &mut Session, kind: StateKind) {
        let mut next = Some(kind);
        let mut steps = 0;

        while let Some(kind) = next {
            steps += 1;
            assert!(steps <= MAX_CASCADE, "state transitions cascaded more than {MAX_CASCADE} times");

            let from = session.state.kind();
            if from == StateKind::Abandoned {
                tracing::debug!(game_id = %self.id, to = ?kind, "Game abandoned, ignoring transition");
                return;
            }

            session.state.leave();
            session.ordinal += 1;

            let env = StateEnv {
                generator: &self.generator,
                settings: &self.settings,
                scheduler: Scheduler::new(&self.runtime, &self.handle, session.ordinal),
            };
            let (state, cascade) = GameState::enter(kind, &mut session.data, &env);
            session.state = state;

            tracing::info!(game_id = %self.id, ?from, to = ?kind, ordinal = session.ordinal, "State transition");
            next = cascade;
        }
    }
}
