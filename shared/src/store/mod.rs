//! Persistence for [`User`] records and their profile pictures.
//!
//! Both services talk to users through the [`UserStore`] trait. The SQLite
//! implementation backs the running services; the in-memory one is used by
//! handler tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::{User, UserImage};

mod memory;
mod sqlite;

pub use memory::MemoryUserStore;
pub use sqlite::SqliteUserStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User not found")]
    NotFound,
    #[error("Email already in use")]
    DuplicateEmail,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users ordered by last name, then first name.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn get_user(&self, id: i64) -> Result<User, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Overwrite name and email of an existing user. The password hash is left alone.
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;

    async fn delete_user(&self, id: i64) -> Result<(), StoreError>;

    /// Insert a new user and return the id assigned by the store. `user.id` is ignored.
    async fn insert_user(&self, user: &User) -> Result<i64, StoreError>;

    async fn reset_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError>;

    /// Stamp `last_login` with the current time.
    async fn record_login(&self, id: i64) -> Result<(), StoreError>;

    /// Store `image` as the profile picture of `image.user_id`, replacing any
    /// previous one, and return its new id. `image.id` is ignored.
    async fn insert_user_image(&self, image: &UserImage) -> Result<i64, StoreError>;

    /// Current profile picture of a user, if any.
    async fn get_user_image(&self, user_id: i64) -> Result<Option<UserImage>, StoreError>;
}
