use std::sync::Arc;

use crate::services::tokens::TokenService;
use shared::UserStore;

/// Application state shared across all handlers
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub tokens: TokenService,
}
