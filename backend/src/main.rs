use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;

mod config;
mod handlers;
mod middleware;
mod models;
mod services;
#[cfg(test)]
mod test_support;

use config::Config;
use services::tokens::TokenService;
use shared::SqliteUserStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    log::info!("Starting API at {}:{}", config.host, config.port);
    log::info!("Issuing tokens for domain {}", config.domain);

    // Create database pool
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to create database pool");

    let store = SqliteUserStore::new(pool);

    // Run migrations
    store.migrate().await.expect("Failed to run migrations");

    log::info!("Database migrations completed");

    let tokens = TokenService::new(&config.jwt_secret, &config.domain, config.token_settings());
    log::info!(
        "Access tokens live {} minutes, refresh tokens {} hours",
        tokens.settings().access_ttl.num_minutes(),
        tokens.settings().refresh_ttl.num_hours()
    );

    let app_state = web::Data::new(models::AppState {
        store: Arc::new(store),
        tokens,
    });

    let allowed_origins = config.cors_origins.clone();

    // Start HTTP server
    HttpServer::new(move || {
        let allowed_origins = allowed_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origin_str = origin.to_str().unwrap_or("");
                allowed_origins.iter().any(|allowed| origin_str == allowed)
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::ACCEPT,
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::HeaderName::from_static("x-csrf-token"),
            ])
            .supports_credentials()
            .max_age(300);

        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
