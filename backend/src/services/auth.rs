use chrono::Utc;
use thiserror::Error;

use crate::services::tokens::{TokenError, TokenService};
use shared::password::verify_password;
use shared::{LoginRequest, StoreError, TokenPair, User, UserStore};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Refresh token has expired")]
    TokenExpired,
    #[error("Invalid refresh token: {0}")]
    TokenInvalid(String),
    #[error("Refresh token subject does not exist")]
    UnknownSubject,
    #[error("Store error: {0}")]
    Store(StoreError),
    #[error("Refresh token is not yet eligible for rotation")]
    TooEarly,
    #[error("Token signing failed: {0}")]
    Signing(#[source] TokenError),
}

impl From<TokenError> for RefreshError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => RefreshError::TokenExpired,
            TokenError::Invalid(reason) => RefreshError::TokenInvalid(reason),
            TokenError::MalformedHeader => RefreshError::TokenInvalid(err.to_string()),
            TokenError::Signing(_) => RefreshError::Signing(err),
        }
    }
}

/// Whether rotation waits for the refresh token to reach its grace window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPolicy {
    EnforceGrace,
    Immediate,
}

/// Check an email/password pair against the store.
///
/// Unknown emails, empty fields and wrong passwords all collapse into
/// `InvalidCredentials` so callers cannot tell them apart.
pub async fn login_user(store: &dyn UserStore, request: &LoginRequest) -> Result<User, LoginError> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(LoginError::InvalidCredentials);
    }

    let user = match store.get_user_by_email(&request.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(LoginError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };

    let password_hash = user
        .password_hash
        .as_deref()
        .ok_or(LoginError::InvalidCredentials)?;

    match verify_password(&request.password, password_hash) {
        Ok(true) => {}
        Ok(false) => return Err(LoginError::InvalidCredentials),
        Err(e) => {
            log::warn!("Stored password hash for user {} is unusable: {}", user.id, e);
            return Err(LoginError::InvalidCredentials);
        }
    }

    if let Err(e) = store.record_login(user.id).await {
        log::warn!("Failed to record login for user {}: {}", user.id, e);
    }

    Ok(user)
}

/// Exchange a refresh token for a new token pair.
///
/// The old token is not revoked; it stays valid until its own expiry.
pub async fn rotate_refresh_token(
    store: &dyn UserStore,
    tokens: &TokenService,
    refresh_token: &str,
    policy: RotationPolicy,
) -> Result<TokenPair, RefreshError> {
    let now = Utc::now();
    let claims = tokens.parse_refresh_token(refresh_token)?;

    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| RefreshError::TokenInvalid("subject is not a user id".to_string()))?;

    let user = store.get_user(user_id).await.map_err(|e| match e {
        StoreError::NotFound => RefreshError::UnknownSubject,
        other => RefreshError::Store(other),
    })?;

    if policy == RotationPolicy::EnforceGrace && !tokens.rotation_allowed(&claims, now) {
        return Err(RefreshError::TooEarly);
    }

    Ok(tokens.generate_token_pair_at(&user, now)?)
}
