use actix_session::Session;
use serde::{de::DeserializeOwned, Serialize};

pub const USER_KEY: &str = "user";
pub const FLASH_KEY: &str = "flash";
pub const ERROR_KEY: &str = "error";
pub const VISIT_KEY: &str = "visit";

/// Failing to write the session only loses a message, so it is logged and ignored
pub fn put<T: Serialize>(session: &Session, key: &str, value: T) {
    if let Err(e) = session.insert(key, value) {
        log::warn!("Failed to store '{}' in session: {}", key, e);
    }
}

pub fn get<T: DeserializeOwned>(session: &Session, key: &str) -> Option<T> {
    session.get::<T>(key).unwrap_or_else(|e| {
        log::warn!("Discarding unreadable session value '{}': {}", key, e);
        None
    })
}

/// Reads a one-shot message and removes it from the session
pub fn pop(session: &Session, key: &str) -> Option<String> {
    let value = get::<String>(session, key);
    if value.is_some() {
        session.remove(key);
    }
    value
}
