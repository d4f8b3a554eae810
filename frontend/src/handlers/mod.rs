use actix_session::SessionExt;
use actix_web::{error::InternalError, http::header, web, HttpResponse};
use askama::Template;

use crate::session::{self, ERROR_KEY};

pub mod auth;
pub mod pages;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(form_config())
        .configure(pages::configure)
        .configure(auth::configure);
}

/// Undecodable form bodies go back to the home page with a one-shot error
fn form_config() -> web::FormConfig {
    web::FormConfig::default().error_handler(|err, req| {
        log::warn!("Rejected form body: {}", err);
        session::put(&req.get_session(), ERROR_KEY, auth::INVALID_FORM_MESSAGE);
        InternalError::from_response(err, see_other("/")).into()
    })
}

fn render<T: Template>(template: &T) -> HttpResponse {
    match template.render() {
        Ok(body) => HttpResponse::Ok()
            .content_type(header::ContentType::html())
            .body(body),
        Err(e) => {
            log::error!("Failed to render template: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}
