use std::env;

use chrono::{Duration, Utc};
use thiserror::Error;

use crate::services::tokens::TokenSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be a number")]
    InvalidNumber(&'static str),
    #[error("{0} must be a positive number of reasonable size")]
    OutOfRange(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub domain: String,
    pub access_token_minutes: i64,
    pub refresh_token_hours: i64,
    pub refresh_grace_hours: i64,
    pub cors_origins: Vec<String>,
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidNumber(name))
}

/// Token lifetimes must be positive and must not overflow when added to the current time
fn parse_lifetime(
    name: &'static str,
    default: &str,
    to_duration: fn(i64) -> Option<Duration>,
) -> Result<i64, ConfigError> {
    let value: i64 = parse_var(name, default)?;
    to_duration(value)
        .filter(|duration| *duration > Duration::zero())
        .filter(|duration| Utc::now().checked_add_signed(*duration).is_some())
        .map(|_| value)
        .ok_or(ConfigError::OutOfRange(name))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", "8090")?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:users.db?mode=rwc".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "development-secret-key-change-in-production".to_string()),
            domain: env::var("DOMAIN").unwrap_or_else(|_| "example.com".to_string()),
            access_token_minutes: parse_lifetime("ACCESS_TOKEN_MINUTES", "15", Duration::try_minutes)?,
            refresh_token_hours: parse_lifetime("REFRESH_TOKEN_HOURS", "24", Duration::try_hours)?,
            refresh_grace_hours: parse_lifetime("REFRESH_GRACE_HOURS", "12", Duration::try_hours)?,
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:8080".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        })
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            access_ttl: Duration::minutes(self.access_token_minutes),
            refresh_ttl: Duration::hours(self.refresh_token_hours),
            refresh_grace: Duration::hours(self.refresh_grace_hours),
        }
    }
}
