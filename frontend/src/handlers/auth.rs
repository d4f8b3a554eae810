use actix_session::Session;
use actix_web::{web, HttpResponse};
use shared::password::verify_password;
use shared::User;
use validator::Validate;

use super::see_other;
use crate::forms::LoginForm;
use crate::models::AppState;
use crate::session::{self, ERROR_KEY, FLASH_KEY, USER_KEY};

/// Shown for login forms that fail decoding or validation
pub const INVALID_FORM_MESSAGE: &str = "Invalid login credentials";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::post().to(login))
        .route("/user/logout", web::get().to(logout));
}

async fn login(
    state: web::Data<AppState>,
    session: Session,
    form: web::Form<LoginForm>,
) -> HttpResponse {
    let form = form.into_inner();
    if let Err(e) = form.validate() {
        log::warn!("Login form rejected: {}", e);
        session::put(&session, ERROR_KEY, INVALID_FORM_MESSAGE);
        return see_other("/");
    }

    let email = form.email.as_str();
    let user = match state.store.get_user_by_email(email).await {
        Ok(user) => user,
        Err(e) => {
            log::warn!("Login failed for {}: {}", email, e);
            session::put(&session, ERROR_KEY, "Invalid login!");
            return see_other("/");
        }
    };

    if !password_matches(&user, &form.password) {
        log::warn!("Login failed for {}: wrong password", email);
        session::put(&session, ERROR_KEY, "Invalid login!");
        return see_other("/");
    }

    // new session id for the authenticated session
    session.renew();
    if let Err(e) = state.store.record_login(user.id).await {
        log::warn!("Failed to record login for user {}: {}", user.id, e);
    }
    log::info!("User {} logged in", user.id);

    session::put(&session, USER_KEY, &user);
    session::put(&session, FLASH_KEY, "Successfully logged in!");
    see_other("/user/profile")
}

fn password_matches(user: &User, password: &str) -> bool {
    let Some(hash) = user.password_hash.as_deref() else {
        return false;
    };
    verify_password(password, hash).unwrap_or_else(|e| {
        log::error!("Stored hash for user {} is unusable: {}", user.id, e);
        false
    })
}

async fn logout(session: Session) -> HttpResponse {
    session.purge();
    see_other("/")
}
