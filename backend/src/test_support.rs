//! Fixtures shared by the handler and service tests.

use std::sync::{Arc, OnceLock};

use actix_web::web;
use chrono::Utc;

use crate::models::AppState;
use crate::services::tokens::{TokenService, TokenSettings};
use shared::password::hash_password;
use shared::{MemoryUserStore, User};

pub const TEST_SECRET: &str = "asdf123sadafasdf123123sadfasdf12312asdfasdf123123asdfasdf";
pub const TEST_DOMAIN: &str = "example.com";

/// Argon2 is slow in debug builds, so the fixture hash is computed once
fn admin_password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password("secret").unwrap()).clone()
}

/// User 1, `admin@example.com`, password `secret`
pub fn admin_user() -> User {
    let now = Utc::now();
    User {
        id: 1,
        first_name: "Admin".to_string(),
        last_name: "User".to_string(),
        email: "admin@example.com".to_string(),
        password_hash: Some(admin_password_hash()),
        last_login: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn seeded_store() -> MemoryUserStore {
    MemoryUserStore::with_users(vec![admin_user()])
}

pub fn token_service() -> TokenService {
    TokenService::new(TEST_SECRET, TEST_DOMAIN, TokenSettings::default())
}

pub fn app_state() -> web::Data<AppState> {
    web::Data::new(AppState {
        store: Arc::new(seeded_store()),
        tokens: token_service(),
    })
}

/// `Authorization` header value carrying a fresh access token for the admin user
pub fn bearer() -> (&'static str, String) {
    let pair = token_service().generate_token_pair(&admin_user()).unwrap();
    ("Authorization", format!("Bearer {}", pair.access_token))
}
