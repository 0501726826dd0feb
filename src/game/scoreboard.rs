use serde::Serialize;
use std::collections::HashMap;

use super::types::{Player, PlayerId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerScore {
    pub player_id: PlayerId,
    pub name: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreSnapshot {
    pub scores: Vec<PlayerScore>,
    pub rounds_played: u32,
    pub most_recent_winner: Option<PlayerId>,
}

/// Per-game score table. Entries are kept in lock-step with the game's player registry.
#[derive(Debug, Default)]
pub struct Scoreboard {
    scores: HashMap<PlayerId, PlayerScore>,
    rounds_played: u32,
    most_recent_winner: Option<PlayerId>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_player(&mut self, player: &Player) {
        self.scores.entry(player.id).or_insert_with(|| PlayerScore {
            player_id: player.id,
            name: player.name.clone(),
            score: 0,
        });
    }

    pub fn remove_player(&mut self, player_id: PlayerId) {
        self.scores.remove(&player_id);
    }

    /// Credits a puzzle win. Unknown ids are ignored: a stale or duplicate
    /// client report must not take the session down.
    pub fn puzzle_won(&mut self, player_id: PlayerId) {
        match self.scores.get_mut(&player_id) {
            Some(entry) => {
                entry.score += 1;
                self.most_recent_winner = Some(player_id);
            }
            None => tracing::debug!(player_id = %player_id, "Ignoring puzzle win for unknown player"),
        }
    }

    pub fn round_completed(&mut self) {
        self.rounds_played += 1;
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    pub fn most_recent_winner(&self) -> Option<PlayerId> {
        self.most_recent_winner
    }

    pub fn score_of(&self, player_id: PlayerId) -> Option<u32> {
        self.scores.get(&player_id).map(|entry| entry.score)
    }

    /// Highest score first, ties broken by name.
    pub fn snapshot(&self) -> ScoreSnapshot {
        let mut scores: Vec<PlayerScore> = self.scores.values().cloned().collect();
        scores.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));

        ScoreSnapshot {
            scores,
            rounds_played: self.rounds_played,
            most_recent_winner: self.most_recent_winner,
        }
    }
}
