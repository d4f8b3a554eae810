use actix_web::{error::InternalError, web, HttpResponse};
use shared::ApiError;

pub mod auth;
pub mod users;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(form_config())
        .configure(auth::configure)
        .configure(users::configure);
}

/// Body decoding failures answer with the same `ApiError` shape as every other failure
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        log::warn!("Rejected JSON body: {}", err);
        let response = HttpResponse::BadRequest().json(ApiError::new("invalid_json", err.to_string()));
        InternalError::from_response(err, response).into()
    })
}

fn form_config() -> web::FormConfig {
    web::FormConfig::default().error_handler(|err, _req| {
        log::warn!("Rejected form body: {}", err);
        let response = HttpResponse::BadRequest().json(ApiError::new("invalid_form", err.to_string()));
        InternalError::from_response(err, response).into()
    })
}
