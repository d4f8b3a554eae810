use std::sync::Arc;

use shared::UserStore;

pub struct AppState {
    pub store: Arc<dyn UserStore>,
}
