use actix_web::{
    dev::Payload, error::InternalError, http::header, web, FromRequest, HttpRequest, HttpResponse,
};
use futures::future::{ready, Ready};
use shared::ApiError;

use crate::models::AppState;
use crate::services::tokens::{AccessClaims, TokenError, TokenService};

/// Validate the bearer token in the Authorization header
pub fn verify_token(req: &HttpRequest, tokens: &TokenService) -> Result<AccessClaims, TokenError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(TokenError::MalformedHeader)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| TokenError::MalformedHeader)?;

    let parts: Vec<&str> = auth_str.split(' ').collect();
    if parts.len() != 2 || parts[0] != "Bearer" {
        return Err(TokenError::MalformedHeader);
    }

    tokens.verify_access_token(parts[1])
}

/// Extractor for routes that need a valid access token
#[derive(Debug)]
pub struct AuthUser(pub AccessClaims);

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            log::error!("Application state is not registered");
            return ready(Err(actix_web::error::ErrorInternalServerError(
                "application state not configured",
            )));
        };

        let result: Result<Self, Self::Error> = verify_token(req, &state.tokens).map(AuthUser).map_err(|e| {
            let body = match &e {
                TokenError::Expired => {
                    log::info!("Rejected expired access token for {}", req.path());
                    ApiError::new("token_expired", "Access token has expired")
                }
                _ => {
                    log::warn!("Rejected request to {}: {}", req.path(), e);
                    ApiError::new("unauthorized", "Invalid or missing token")
                }
            };
            InternalError::from_response(e, HttpResponse::Unauthorized().json(body)).into()
        });

        ready(result)
    }
}
