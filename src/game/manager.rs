//! Registry of live games and the reaper that evicts idle ones.

use dashmap::DashMap;
use std::{sync::Arc, time::Duration};
use tokio::{runtime::Handle, task::JoinHandle, time::Instant};

use super::domain::{Game, GameSettings};
use super::puzzle::PuzzleGenerator;
use super::types::{GameId, Player};

pub struct GameManager {
    games: DashMap<GameId, Arc<Game>>,
    generator: Arc<PuzzleGenerator>,
    settings: GameSettings,
    runtime: Handle,
}

impl GameManager {
    /// Binds the manager to the current tokio runtime, which then runs every
    /// game timer and the reaper. Games may be driven from any thread afterwards.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime context.
    pub fn new(generator: PuzzleGenerator, settings: GameSettings) -> Self {
        Self {
            games: DashMap::new(),
            generator: Arc::new(generator),
            settings,
            runtime: Handle::current(),
        }
    }

    #[tracing::instrument(skip(self, name), fields(owner_id = %owner.id))]
    pub fn add_game(&self, name: impl Into<String>, owner: Player) -> Arc<Game> {
        let game = Game::new(
            name,
            owner,
            self.generator.clone(),
            self.settings.clone(),
            self.runtime.clone(),
        );
        self.games.insert(game.id(), game.clone());

        tracing::info!(game_id = %game.id(), name = game.name(), "Game registered");
        game
    }

    pub fn find_game(&self, id: GameId) -> Option<Arc<Game>> {
        self.games.get(&id).map(|entry| entry.value().clone())
    }

    pub fn get_all(&self) -> Vec<Arc<Game>> {
        self.games.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Drops every inactive game from the registry. Callers already holding a
    /// game keep a valid, if orphaned, instance.
    pub fn remove_inactive(&self) -> usize {
        let before = self.games.len();
        self.games.retain(|id, game| {
            let inactive = game.is_inactive();
            if inactive {
                tracing::info!(game_id = %id, "Evicting inactive game");
            }
            !inactive
        });
        before.saturating_sub(self.games.len())
    }

    /// Sweeps the registry every `period` until the manager is dropped.
    pub fn spawn_reaper(manager: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let runtime = manager.runtime.clone();
        let manager = Arc::downgrade(manager);

        runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                let evicted = manager.remove_inactive();
                if evicted > 0 {
                    tracing::info!(evicted, remaining = manager.games.len(), "Reaper sweep complete");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::puzzle::{LevelRepository, LevelTemplate, ShapeTemplate};
    use crate::game::state::StateKind;
    use crate::game::types::{GameStatusUpdate, PlayerId};

    fn setup_manager() -> Arc<GameManager> {
        setup_manager_with(GameSettings::default())
    }

    fn setup_manager_with(settings: GameSettings) -> Arc<GameManager> {
        let level = LevelTemplate {
            shapes: vec![ShapeTemplate {
                tile_positions: vec![vec![1]],
                offset_x: 0,
                offset_y: 0,
            }],
        };
        let generator = PuzzleGenerator::new(LevelRepository::new(vec![level]).unwrap(), 5);
        Arc::new(GameManager::new(generator, settings))
    }

    fn player(name: &str) -> Player {
        Player::new(PlayerId::new(), name)
    }

    #[tokio::test]
    async fn test_add_game_registers_owner() {
        let manager = setup_manager();

        let game = manager.add_game("Friday puzzles", player("Alice"));

        assert_eq!(game.name(), "Friday puzzles");
        assert_eq!(game.owner_name(), "Alice");
        assert_eq!(game.players().len(), 1);
        assert!(game.is_joinable());
        assert!(Arc::ptr_eq(&manager.find_game(game.id()).unwrap(), &game));
    }

    #[tokio::test]
    async fn test_find_unknown_game_returns_none() {
        let manager = setup_manager();
        manager.add_game("one", player("Alice"));

        assert!(manager.find_game(GameId::new()).is_none());
    }

    #[tokio::test]
    async fn test_get_all_lists_every_game() {
        let manager = setup_manager();
        let first = manager.add_game("one", player("Alice"));
        let second = manager.add_game("two", player("Bob"));

        let mut ids: Vec<GameId> = manager.get_all().iter().map(|g| g.id()).collect();
        ids.sort_by_key(|id| id.to_string());
        let mut expected = vec![first.id(), second.id()];
        expected.sort_by_key(|id| id.to_string());

        assert_eq!(ids, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_inactive_keeps_recently_used_games() {
        let manager = setup_manager();
        let idle = manager.add_game("idle", player("Alice"));
        let busy = manager.add_game("busy", player("Bob"));

        tokio::time::advance(Duration::from_secs(45)).await;
        busy.state_snapshot();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(manager.remove_inactive(), 1);
        assert!(manager.find_game(idle.id()).is_none());
        assert!(manager.find_game(busy.id()).is_some());

        // the evicted instance stays usable for whoever still holds it
        assert_eq!(idle.players().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_evicts_on_interval() {
        let manager = setup_manager();
        let game = manager.add_game("idle", player("Alice"));
        let reaper = GameManager::spawn_reaper(&manager, Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(30)).await;
        game.state_snapshot();
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(manager.find_game(game.id()).is_some());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(manager.find_game(game.id()).is_none());

        reaper.abort();
    }

    #[test]
    fn test_games_can_be_driven_from_plain_threads() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let settings = GameSettings {
            round_start_delay: Duration::from_millis(20),
            puzzle_start_delay: Duration::from_secs(30),
            ..GameSettings::default()
        };
        let manager = {
            let _guard = runtime.enter();
            setup_manager_with(settings)
        };
        let game = manager.add_game("threaded", player("Alice"));

        let worker = {
            let game = game.clone();
            std::thread::spawn(move || game.process_update(&GameStatusUpdate::BeginGame))
        };
        worker.join().unwrap();
        assert_eq!(game.state_snapshot().kind(), StateKind::BeginningRound);

        // the round timer runs on the runtime's workers
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while game.state_snapshot().kind() != StateKind::BeginningPuzzle {
            assert!(std::time::Instant::now() < deadline, "round timer never fired");
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}
