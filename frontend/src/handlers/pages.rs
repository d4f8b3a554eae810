use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};
use askama::Template;
use chrono::Utc;
use shared::{User, UserImage};

use super::render;
use crate::middleware::{client_ip, SessionUser};
use crate::models::AppState;
use crate::session::{self, ERROR_KEY, FLASH_KEY, VISIT_KEY};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(home))
        .route("/user/profile", web::get().to(profile));
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    ip: String,
    flash: Option<String>,
    error: Option<String>,
    visit: String,
}

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate {
    ip: String,
    flash: Option<String>,
    error: Option<String>,
    user: User,
    image: Option<UserImage>,
}

async fn home(req: HttpRequest, session: Session) -> HttpResponse {
    let visit = match session::get::<String>(&session, VISIT_KEY) {
        Some(note) => note,
        None => {
            session::put(&session, VISIT_KEY, format!("Hit this page at {}", Utc::now()));
            String::new()
        }
    };

    render(&HomeTemplate {
        ip: client_ip(&req),
        flash: session::pop(&session, FLASH_KEY),
        error: session::pop(&session, ERROR_KEY),
        visit,
    })
}

async fn profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    session: Session,
    user: SessionUser,
) -> HttpResponse {
    let user = user.0;
    // a missing picture never blocks the page
    let image = state.store.get_user_image(user.id).await.unwrap_or_else(|e| {
        log::warn!("Failed to load profile picture of user {}: {}", user.id, e);
        None
    });

    render(&ProfileTemplate {
        ip: client_ip(&req),
        flash: session::pop(&session, FLASH_KEY),
        error: session::pop(&session, ERROR_KEY),
        user,
        image,
    })
}
