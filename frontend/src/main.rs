use actix_files::Files;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;

mod config;
mod forms;
mod handlers;
mod middleware;
mod models;
mod session;
#[cfg(test)]
mod test_support;

use config::Config;
use shared::SqliteUserStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    log::info!("Starting web front end at {}:{}", config.host, config.port);
    if !config.cookie_secure {
        log::warn!("Session cookies are sent over plain http");
    }

    // Create database pool
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to create database pool");

    let store = SqliteUserStore::new(pool);

    // Run migrations
    store.migrate().await.expect("Failed to run migrations");

    let app_state = web::Data::new(models::AppState {
        store: Arc::new(store),
    });

    let session_key = config.session_key.clone();
    let cookie_secure = config.cookie_secure;
    let static_dir = config.static_dir.clone();

    // Start HTTP server
    HttpServer::new(move || {
        let sessions = SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
            .cookie_secure(cookie_secure)
            .build();

        App::new()
            .app_data(app_state.clone())
            .wrap(sessions)
            .wrap(Logger::default())
            .service(Files::new("/static", &static_dir))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
