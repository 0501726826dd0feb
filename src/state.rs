use std::sync::Arc;

use crate::game::GameManager;

pub struct AppState {
    pub manager: Arc<GameManager>,
}

pub type SharedState = Arc<AppState>;
