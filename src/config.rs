use serde::Deserialize;
use std::{env, time::Duration};

use crate::game::GameSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    pub round_start_delay_ms: u64,
    pub puzzle_start_delay_ms: u64,
    pub puzzles_per_round: usize,
    pub inactivity_timeout_secs: u64,
    pub reap_interval_secs: u64,
    pub levels_path: String,
}

impl GameConfig {
    pub fn settings(&self) -> GameSettings {
        GameSettings {
            round_start_delay: Duration::from_millis(self.round_start_delay_ms),
            puzzle_start_delay: Duration::from_millis(self.puzzle_start_delay_ms),
            inactivity_timeout: Duration::from_secs(self.inactivity_timeout_secs),
        }
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_start_delay_ms: 4_000,
            puzzle_start_delay_ms: 3_000,
            puzzles_per_round: 5,
            inactivity_timeout_secs: 60,
            reap_interval_secs: 60,
            levels_path: "config/levels.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub game: GameConfig,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = env::var("RUN_ENV").unwrap_or_else(|_| "local".into());

        let builder = ::config::Config::builder()
            .add_source(config::File::with_name("config/default.toml"))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::File::with_name("config/local.toml").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_config_projects_settings() {
        let game = GameConfig {
            round_start_delay_ms: 1_500,
            puzzle_start_delay_ms: 250,
            inactivity_timeout_secs: 90,
            ..GameConfig::default()
        };

        let settings = game.settings();

        assert_eq!(settings.round_start_delay, Duration::from_millis(1_500));
        assert_eq!(settings.puzzle_start_delay, Duration::from_millis(250));
        assert_eq!(settings.inactivity_timeout, Duration::from_secs(90));
        assert_eq!(game.reap_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_default_game_config_matches_settings_defaults() {
        assert_eq!(GameConfig::default().settings(), GameSettings::default());
    }

    #[test]
    fn test_load_reads_default_file() {
        let config = Config::load().expect("config/default.toml should load");
        assert!(!config.server.addr.is_empty());
        assert_eq!(config.game.puzzles_per_round, 5);
    }
}
