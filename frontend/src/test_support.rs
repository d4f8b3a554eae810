//! Fixtures shared by the handler tests.

use std::sync::{Arc, OnceLock};

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{body::MessageBody, cookie::Cookie, cookie::Key, dev::ServiceResponse, test, web};
use chrono::Utc;

use crate::models::AppState;
use shared::password::hash_password;
use shared::{MemoryUserStore, User};

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

pub fn app_state() -> web::Data<AppState> {
    web::Data::new(AppState {
        store: Arc::new(MemoryUserStore::with_users(vec![admin_user()])),
    })
}

/// Test requests are plain http, so the cookie must not be marked secure
pub fn session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_secure(false)
        .build()
}

/// Session cookie set by a response, ready to send back
pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Cookie<'static> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == "id")
        .expect("response sets no session cookie")
        .into_owned()
}

pub async fn body_text<B: MessageBody>(resp: ServiceResponse<B>) -> String {
    let body = test::read_body(resp).await;
    String::from_utf8(body.to_vec()).unwrap()
}
