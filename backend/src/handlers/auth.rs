use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Result};
use shared::{AccessTokenResponse, ApiError, LoginRequest, RefreshRequest};

use crate::models::AppState;
use crate::services::auth::{self as auth_service, RefreshError, RotationPolicy};
use crate::services::tokens::REFRESH_COOKIE_NAME;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth", web::post().to(authenticate))
        .route("/refresh-token", web::post().to(refresh))
        .route("/refresh-cookie", web::get().to(refresh_using_cookie))
        .route("/logout", web::get().to(delete_refresh_cookie));
}

fn invalid_credentials() -> HttpResponse {
    HttpResponse::Unauthorized().json(ApiError::new(
        "authentication_error",
        "Invalid email or password",
    ))
}

fn refresh_error_response(err: &RefreshError) -> HttpResponse {
    match err {
        RefreshError::TokenExpired => {
            log::info!("Refresh rejected: token expired");
            HttpResponse::BadRequest().json(ApiError::new("token_expired", "Refresh token has expired"))
        }
        RefreshError::TokenInvalid(reason) => {
            log::warn!("Refresh rejected: {}", reason);
            HttpResponse::BadRequest().json(ApiError::new("invalid_token", "Invalid refresh token"))
        }
        RefreshError::UnknownSubject => {
            log::warn!("Refresh rejected: token subject no longer exists");
            HttpResponse::Unauthorized().json(ApiError::new("unauthorized", "Unknown user"))
        }
        RefreshError::Store(e) => {
            log::error!("Refresh rejected, user lookup failed: {}", e);
            HttpResponse::Unauthorized().json(ApiError::new("unauthorized", "Unknown user"))
        }
        RefreshError::TooEarly => {
            log::info!("Refresh rejected: token not yet in its grace window");
            let status = StatusCode::from_u16(425).unwrap_or(StatusCode::BAD_REQUEST);
            HttpResponse::build(status).json(ApiError::new(
                "too_early",
                "Refresh token is not yet eligible for rotation",
            ))
        }
        RefreshError::Signing(e) => {
            log::error!("JWT creation error: {:?}", e);
            HttpResponse::InternalServerError().json(ApiError::new("jwt_error", "Failed to create token"))
        }
    }
}

/// The body is decoded by hand so that malformed JSON is answered like bad credentials
async fn authenticate(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse> {
    let request: LoginRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Login rejected, malformed body: {}", e);
            return Ok(invalid_credentials());
        }
    };

    let user = match auth_service::login_user(state.store.as_ref(), &request).await {
        Ok(user) => user,
        Err(e) => {
            log::warn!("Login failed for {}: {}", request.email, e);
            return Ok(invalid_credentials());
        }
    };

    match state.tokens.generate_token_pair(&user) {
        Ok(pair) => {
            log::info!("User {} logged in", user.id);
            Ok(HttpResponse::Ok()
                .cookie(state.tokens.refresh_cookie(&pair.refresh_token))
                .json(pair))
        }
        Err(e) => {
            log::error!("JWT creation error: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError::new("jwt_error", "Failed to create token")))
        }
    }
}

async fn refresh(
    state: web::Data<AppState>,
    form: web::Form<RefreshRequest>,
) -> Result<HttpResponse> {
    let result = auth_service::rotate_refresh_token(
        state.store.as_ref(),
        &state.tokens,
        &form.refresh_token,
        RotationPolicy::EnforceGrace,
    )
    .await;

    match result {
        Ok(pair) => Ok(HttpResponse::Ok().json(pair)),
        Err(e) => Ok(refresh_error_response(&e)),
    }
}

async fn refresh_using_cookie(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let Some(cookie) = req.cookie(REFRESH_COOKIE_NAME) else {
        return Ok(HttpResponse::Unauthorized().json(ApiError::new(
            "unauthorized",
            "Missing refresh cookie",
        )));
    };

    let result = auth_service::rotate_refresh_token(
        state.store.as_ref(),
        &state.tokens,
        cookie.value(),
        RotationPolicy::Immediate,
    )
    .await;

    match result {
        Ok(pair) => {
            let refresh_cookie = state.tokens.refresh_cookie(&pair.refresh_token);
            Ok(HttpResponse::Ok()
                .cookie(refresh_cookie)
                .json(AccessTokenResponse {
                    access_token: pair.access_token,
                }))
        }
        Err(e) => Ok(refresh_error_response(&e)),
    }
}

/// Client-side logout: tokens stay valid, only the browser cookie is dropped
async fn delete_refresh_cookie(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Accepted()
        .cookie(state.tokens.expired_refresh_cookie())
        .finish())
}
