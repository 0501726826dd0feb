pub mod rest;

pub use rest::{
    add_player_handler, create_game_handler, get_current_round_handler, get_game_handler, get_game_state_handler,
    get_scoreboard_handler, list_joinable_games_handler, list_players_handler, post_update_handler,
    remove_player_handler, time_handler,
};
