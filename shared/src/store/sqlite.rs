use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use super::{StoreError, UserStore};
use crate::{User, UserImage};

/// Database model for users
#[derive(Debug, Clone, FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: Option<String>,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database model for profile pictures
#[derive(Debug, Clone, FromRow)]
struct UserImageRow {
    id: i64,
    user_id: i64,
    file_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserImageRow> for UserImage {
    fn from(row: UserImageRow) -> Self {
        UserImage {
            id: row.id,
            user_id: row.user_id,
            file_name: row.file_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::DuplicateEmail;
        }
    }
    StoreError::DatabaseError(err)
}

#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT * FROM users ORDER BY last_name, first_name"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn get_user(&self, id: i64) -> Result<User, StoreError> {
        let row: UserRow = sqlx::query_as(
            "SELECT * FROM users WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let row: UserRow = sqlx::query_as(
            "SELECT * FROM users WHERE email = ?"
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(row.into())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = ?, last_name = ?, email = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(Utc::now())
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<i64, StoreError> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(result.last_insert_rowid())
    }

    async fn reset_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?"
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn record_login(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn insert_user_image(&self, image: &UserImage) -> Result<i64, StoreError> {
        let now = Utc::now();

        // Replace the previous picture atomically
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
            .bind(image.user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound);
        }

        sqlx::query("DELETE FROM user_images WHERE user_id = ?")
            .bind(image.user_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO user_images (user_id, file_name, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(image.user_id)
        .bind(&image.file_name)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_user_image(&self, user_id: i64) -> Result<Option<UserImage>, StoreError> {
        let row: Option<UserImageRow> = sqlx::query_as(
            "SELECT * FROM user_images WHERE user_id = ? ORDER BY id DESC LIMIT 1"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserImage::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_store() -> SqliteUserStore {
        // A single connection keeps every query on the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let store = SqliteUserStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn new_user(first_name: &str, last_name: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: 0,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            password_hash: Some("hash".to_string()),
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_user() {
        let store = setup_test_store().await;

        let id = store
            .insert_user(&new_user("Admin", "User", "admin@example.com"))
            .await
            .unwrap();

        let user = store.get_user(id).await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "admin@example.com");
        assert_eq!(user.password_hash.as_deref(), Some("hash"));

        let by_email = store.get_user_by_email("admin@example.com").await.unwrap();
        assert_eq!(by_email.id, id);
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let store = setup_test_store().await;

        assert!(matches!(store.get_user(42).await, Err(StoreError::NotFound)));
        assert!(matches!(
            store.get_user_by_email("nobody@example.com").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_insert_duplicate_email() {
        let store = setup_test_store().await;
        store
            .insert_user(&new_user("Admin", "User", "admin@example.com"))
            .await
            .unwrap();

        let result = store
            .insert_user(&new_user("Other", "User", "admin@example.com"))
            .await;
        assert!(matches!(result, Err(StoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_list_users_sorted() {
        let store = setup_test_store().await;
        store.insert_user(&new_user("Zoe", "Zimmer", "z@example.com")).await.unwrap();
        store.insert_user(&new_user("Anna", "Abel", "a@example.com")).await.unwrap();

        let users = store.list_users().await.unwrap();
        let emails: Vec<&str> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["a@example.com", "z@example.com"]);
    }

    #[tokio::test]
    async fn test_update_user_keeps_password() {
        let store = setup_test_store().await;
        let id = store
            .insert_user(&new_user("Admin", "User", "admin@example.com"))
            .await
            .unwrap();

        let mut user = store.get_user(id).await.unwrap();
        user.first_name = "Administrator".to_string();
        user.password_hash = None;
        store.update_user(&user).await.unwrap();

        let updated = store.get_user(id).await.unwrap();
        assert_eq!(updated.first_name, "Administrator");
        assert_eq!(updated.password_hash.as_deref(), Some("hash"));
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let store = setup_test_store().await;
        let mut user = new_user("Ghost", "User", "ghost@example.com");
        user.id = 99;

        assert!(matches!(store.update_user(&user).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_to_taken_email() {
        let store = setup_test_store().await;
        store.insert_user(&new_user("Admin", "User", "admin@example.com")).await.unwrap();
        let id = store.insert_user(&new_user("Jack", "User", "jack@example.com")).await.unwrap();

        let mut user = store.get_user(id).await.unwrap();
        user.email = "admin@example.com".to_string();
        assert!(matches!(store.update_user(&user).await, Err(StoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let store = setup_test_store().await;
        let id = store
            .insert_user(&new_user("Admin", "User", "admin@example.com"))
            .await
            .unwrap();

        store.delete_user(id).await.unwrap();
        assert!(matches!(store.get_user(id).await, Err(StoreError::NotFound)));
        assert!(matches!(store.delete_user(id).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_reset_password_and_record_login() {
        let store = setup_test_store().await;
        let id = store
            .insert_user(&new_user("Admin", "User", "admin@example.com"))
            .await
            .unwrap();

        store.reset_password(id, "new-hash").await.unwrap();
        store.record_login(id).await.unwrap();

        let user = store.get_user(id).await.unwrap();
        assert_eq!(user.password_hash.as_deref(), Some("new-hash"));
        assert!(user.last_login.is_some());
    }

    fn new_image(user_id: i64, file_name: &str) -> UserImage {
        let now = Utc::now();
        UserImage {
            id: 0,
            user_id,
            file_name: file_name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_user_image_replaces_previous() {
        let store = setup_test_store().await;
        let id = store
            .insert_user(&new_user("Admin", "User", "admin@example.com"))
            .await
            .unwrap();

        assert!(store.get_user_image(id).await.unwrap().is_none());

        let first = store.insert_user_image(&new_image(id, "first.png")).await.unwrap();
        let second = store.insert_user_image(&new_image(id, "second.png")).await.unwrap();
        assert_ne!(first, second);

        let image = store.get_user_image(id).await.unwrap().unwrap();
        assert_eq!(image.id, second);
        assert_eq!(image.user_id, id);
        assert_eq!(image.file_name, "second.png");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_images WHERE user_id = ?")
            .bind(id)
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_insert_user_image_for_missing_user() {
        let store = setup_test_store().await;

        let result = store.insert_user_image(&new_image(42, "ghost.png")).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_user_removes_image() {
        let store = setup_test_store().await;
        let id = store
            .insert_user(&new_user("Admin", "User", "admin@example.com"))
            .await
            .unwrap();
        store.insert_user_image(&new_image(id, "admin.png")).await.unwrap();

        store.delete_user(id).await.unwrap();
        assert!(store.get_user_image(id).await.unwrap().is_none());
    }
}
