//! Access/refresh token issuance and validation.
//!
//! Tokens are HS256 JWTs signed with the server secret. They are stateless:
//! validity depends only on signature, claims and expiry at presentation time.

use actix_web::cookie::{
    time::{Duration as CookieDuration, OffsetDateTime},
    Cookie, SameSite,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared::{TokenPair, User};

/// `__Host-` asks browsers to keep the cookie host-locked and HTTPS-only
pub const REFRESH_COOKIE_NAME: &str = "__Host-refresh_token";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Authorization header is missing or malformed")]
    MalformedHeader,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub name: String,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: TokenType,
}

/// Lifetime policy for issued tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// A refresh token may only be rotated once its remaining lifetime drops to this value.
    pub refresh_grace: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::hours(24),
            refresh_grace: Duration::hours(12),
        }
    }
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    domain: String,
    settings: TokenSettings,
}

impl TokenService {
    pub fn new(secret: &str, domain: &str, settings: TokenSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            domain: domain.to_string(),
            settings,
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    pub fn generate_token_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        self.generate_token_pair_at(user, Utc::now())
    }

    /// Mint a pair as if the clock read `now`
    pub fn generate_token_pair_at(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        let access_claims = AccessClaims {
            sub: user.id.to_string(),
            name: user.full_name(),
            aud: self.domain.clone(),
            iss: self.domain.clone(),
            iat: now.timestamp(),
            exp: (now + self.settings.access_ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: TokenType::Access,
        };

        let refresh_claims = RefreshClaims {
            sub: user.id.to_string(),
            aud: self.domain.clone(),
            iss: self.domain.clone(),
            iat: now.timestamp(),
            exp: (now + self.settings.refresh_ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: TokenType::Refresh,
        };

        Ok(TokenPair {
            access_token: self.sign(&access_claims)?,
            refresh_token: self.sign(&refresh_claims)?,
        })
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.domain.as_str()]);
        validation.set_issuer(&[self.domain.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        validation
    }

    fn decode_claims<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        decode::<T>(token, &self.decoding_key, &self.validation())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.decode_claims(token)?;
        if claims.token_type != TokenType::Access {
            return Err(TokenError::Invalid("not an access token".to_string()));
        }
        Ok(claims)
    }

    pub fn parse_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.decode_claims(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(TokenError::Invalid("not a refresh token".to_string()));
        }
        Ok(claims)
    }

    /// Whether the token has aged into the grace window
    pub fn rotation_allowed(&self, claims: &RefreshClaims, now: DateTime<Utc>) -> bool {
        let remaining = claims.exp - now.timestamp();
        remaining <= self.settings.refresh_grace.num_seconds()
    }

    pub fn refresh_cookie(&self, refresh_token: &str) -> Cookie<'static> {
        let ttl = CookieDuration::seconds(self.settings.refresh_ttl.num_seconds());

        Cookie::build(REFRESH_COOKIE_NAME, refresh_token.to_string())
            .path("/")
            .domain(self.domain.clone())
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Strict)
            .max_age(ttl)
            .expires(OffsetDateTime::now_utc() + ttl)
            .finish()
    }

    /// Cookie that overwrites the refresh cookie and expires it immediately
    pub fn expired_refresh_cookie(&self) -> Cookie<'static> {
        Cookie::build(REFRESH_COOKIE_NAME, "")
            .path("/")
            .domain(self.domain.clone())
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Strict)
            .max_age(CookieDuration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .finish()
    }
}
