use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{StoreError, UserStore};
use crate::{User, UserImage};

#[derive(Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    next_id: i64,
    // keyed by user id
    images: BTreeMap<i64, UserImage>,
    next_image_id: i64,
}

/// In-process user store with the same semantics as the SQLite store
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

impl MemoryUserStore {
    /// Seed the store with users, keeping their ids
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let users: BTreeMap<i64, User> = users.into_iter().map(|u| (u.id, u)).collect();
        let next_id = users.keys().next_back().copied().unwrap_or(0);

        Self {
            inner: RwLock::new(Inner {
                users,
                next_id,
                ..Inner::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Inner {
    fn email_taken(&self, email: &str, except_id: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except_id)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.read().users.values().cloned().collect();
        users.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(users)
    }

    async fn get_user(&self, id: i64) -> Result<User, StoreError> {
        self.read().users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.write();
        if inner.email_taken(&user.email, Some(user.id)) {
            return Err(StoreError::DuplicateEmail);
        }

        let existing = inner.users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        existing.first_name = user.first_name.clone();
        existing.last_name = user.last_name.clone();
        existing.email = user.email.clone();
        existing.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.write();
        inner.users.remove(&id).ok_or(StoreError::NotFound)?;
        inner.images.remove(&id);
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<i64, StoreError> {
        let mut inner = self.write();
        if inner.email_taken(&user.email, None) {
            return Err(StoreError::DuplicateEmail);
        }

        inner.next_id += 1;
        let id = inner.next_id;
        let now = Utc::now();
        inner.users.insert(
            id,
            User {
                id,
                last_login: None,
                created_at: now,
                updated_at: now,
                ..user.clone()
            },
        );
        Ok(id)
    }

    async fn reset_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        let mut inner = self.write();
        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.password_hash = Some(password_hash.to_string());
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn record_login(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.write();
        let user = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.last_login = Some(Utc::now());
        Ok(())
    }

    async fn insert_user_image(&self, image: &UserImage) -> Result<i64, StoreError> {
        let mut inner = self.write();
        if !inner.users.contains_key(&image.user_id) {
            return Err(StoreError::NotFound);
        }

        inner.next_image_id += 1;
        let id = inner.next_image_id;
        let now = Utc::now();
        inner.images.insert(
            image.user_id,
            UserImage {
                id,
                created_at: now,
                updated_at: now,
                ..image.clone()
            },
        );
        Ok(id)
    }

    async fn get_user_image(&self, user_id: i64) -> Result<Option<UserImage>, StoreError> {
        Ok(self.read().images.get(&user_id).cloned())
    }
}
