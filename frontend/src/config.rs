use std::env;
use std::fmt;

use actix_web::cookie::Key;
use thiserror::Error;

/// Minimum key material accepted by the cookie signing/encryption key
const MIN_SESSION_KEY_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be a number")]
    InvalidNumber(&'static str),
    #[error("{0} must be true or false")]
    InvalidFlag(&'static str),
    #[error("SESSION_KEY must be at least 64 bytes")]
    SessionKeyTooShort,
}

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub session_key: Key,
    pub cookie_secure: bool,
    /// Served under `/static`; profile pictures live in its `img` directory
    pub static_dir: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("session_key", &"<redacted>")
            .field("cookie_secure", &self.cookie_secure)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidNumber("PORT"))?;

        let cookie_secure = match env::var("COOKIE_SECURE") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidFlag("COOKIE_SECURE"))?,
            Err(_) => true,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:users.db?mode=rwc".to_string()),
            session_key: session_key()?,
            cookie_secure,
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "./static".to_string()),
        })
    }
}

/// Sessions die with the process unless a persistent key is configured
fn session_key() -> Result<Key, ConfigError> {
    match env::var("SESSION_KEY") {
        Ok(value) if value.len() < MIN_SESSION_KEY_LEN => Err(ConfigError::SessionKeyTooShort),
        Ok(value) => {
            Key::try_from(value.as_bytes()).map_err(|_| ConfigError::SessionKeyTooShort)
        }
        Err(_) => {
            log::warn!("SESSION_KEY not set, generating a random key");
            Ok(Key::generate())
        }
    }
}
