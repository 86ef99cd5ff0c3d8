use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{NewUser, ProfilePatch, User};
use crate::error::AppError;

const COLUMNS: &str = "id, username, email, password_hash, created_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    /// True when another account (not `except_id`) already uses the username or email.
    async fn is_taken(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        except_id: Option<&str>,
    ) -> Result<bool, AppError>;
    async fn create(&self, new: NewUser) -> Result<User, AppError>;
    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<(), AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

fn not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

#[derive(Clone)]
pub struct SqliteUsers {
    pool: SqlitePool,
}

impl SqliteUsers {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUsers {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    #[instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    #[instrument(skip(self, email))]
    async fn is_taken(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        except_id: Option<&str>,
    ) -> Result<bool, AppError> {
        if username.is_none() && email.is_none() {
            return Ok(false);
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users WHERE id <> ");
        qb.push_bind(except_id.unwrap_or_default().to_string());
        qb.push(" AND (");
        {
            let mut any = qb.separated(" OR ");
            if let Some(username) = username {
                any.push("username = ").push_bind_unseparated(username.to_string());
            }
            if let Some(email) = email {
                any.push("email = ").push_bind_unseparated(email.to_string());
            }
        }
        qb.push(")");

        let (count,): (i64,) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(count > 0)
    }

    #[instrument(skip(self, new), fields(username = %new.username))]
    async fn create(&self, new: NewUser) -> Result<User, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(%id, "Created user");
        Ok(User {
            id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            created_at: now,
        })
    }

    #[instrument(skip(self, patch))]
    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<(), AppError> {
        if patch.is_empty() {
            return Err(AppError::Validation("No fields to update".to_string()));
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE users SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(username) = &patch.username {
                set.push("username = ").push_bind_unseparated(username.clone());
            }
            if let Some(email) = &patch.email {
                set.push("email = ").push_bind_unseparated(email.clone());
            }
            set.push("updated_at = ").push_bind_unseparated(Utc::now());
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        info!("Updated profile");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        info!("Deleted user");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_pool;

    fn alice() -> NewUser {
        NewUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$2b$04$not-a-real-hash".into(),
        }
    }

    #[tokio::test]
    async fn create_and_find() {
        let repo = SqliteUsers::new(memory_pool().await);
        let created = repo.create(alice()).await.unwrap();

        let by_id = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        let by_email = repo.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        assert!(repo.find_by_email("bob@example.com").await.unwrap().is_none());
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let repo = SqliteUsers::new(memory_pool().await);
        repo.create(alice()).await.unwrap();

        let err = repo
            .create(NewUser { username: "alice2".into(), ..alice() })
            .await
            .unwrap_err();
        match err {
            AppError::Conflict(msg) => assert_eq!(msg, "User already exists"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn is_taken_ignores_the_caller() {
        let repo = SqliteUsers::new(memory_pool().await);
        let a = repo.create(alice()).await.unwrap();

        assert!(repo.is_taken(Some("alice"), None, None).await.unwrap());
        assert!(repo.is_taken(None, Some("alice@example.com"), None).await.unwrap());
        assert!(repo.is_taken(Some("nobody"), Some("alice@example.com"), None).await.unwrap());
        assert!(!repo.is_taken(Some("alice"), Some("alice@example.com"), Some(&a.id)).await.unwrap());
        assert!(!repo.is_taken(Some("bob"), Some("bob@example.com"), None).await.unwrap());
        assert!(!repo.is_taken(None, None, None).await.unwrap());
    }

    #[tokio::test]
    async fn update_profile_changes_only_given_fields() {
        let repo = SqliteUsers::new(memory_pool().await);
        let a = repo.create(alice()).await.unwrap();

        repo.update_profile(&a.id, &ProfilePatch { username: Some("alicia".into()), email: None })
            .await
            .unwrap();

        let updated = repo.find_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(updated.username, "alicia");
        assert_eq!(updated.email, "alice@example.com");
        assert_eq!(updated.created_at, a.created_at);
    }

    #[tokio::test]
    async fn empty_profile_patch_is_rejected() {
        let repo = SqliteUsers::new(memory_pool().await);
        let a = repo.create(alice()).await.unwrap();
        let err = repo.update_profile(&a.id, &ProfilePatch::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_then_missing() {
        let repo = SqliteUsers::new(memory_pool().await);
        let a = repo.create(alice()).await.unwrap();

        repo.delete(&a.id).await.unwrap();
        assert!(repo.find_by_id(&a.id).await.unwrap().is_none());
        assert!(matches!(repo.delete(&a.id).await, Err(AppError::NotFound(_))));
    }
}
