use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::auth::errors::StoreError;
use crate::auth::repo_types::{NewUser, Role, User, UserRow};

/// Persistence port for user records. Every call commits atomically.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Exact match on the (already normalized) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// User whose reset token equals `token` and whose expiry is after `now`.
    async fn find_by_reset_token_if_unexpired(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError>;

    /// Fails with `StoreError::Duplicate` when the email is taken.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Replaces the hash and drops any pending reset in the same write.
    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<(), StoreError>;

    async fn set_reset_token(
        &self,
        id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError>;

    /// Clears the pending reset only while it still holds `token`.
    async fn clear_reset_token(&self, id: i64, token: &str) -> Result<(), StoreError>;

    /// Compare-and-clear: replaces the hash and clears both reset fields only if
    /// the user still holds `token` unexpired at `now`. Returns whether it applied.
    async fn consume_reset_token(
        &self,
        id: i64,
        token: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<bool, StoreError>;

    async fn set_role(&self, id: i64, role: Role) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str =
    "id, email, full_name, password_hash, role, created_at, reset_token, reset_token_expiry";

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_reset_token_if_unexpired(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE reset_token = $1 AND reset_token_expiry > $2"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.db)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (email, full_name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&new_user.email)
            .bind(&new_user.full_name)
            .bind(&new_user.password_hash)
            .bind(new_user.role.as_str())
            .fetch_one(&self.db)
            .await
            .map_err(map_insert_error)?;
        User::try_from(row)
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2,
                   reset_token = NULL,
                   reset_token_expiry = NULL
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET reset_token = $2, reset_token_expiry = $3 WHERE id = $1")
            .bind(id)
            .bind(token)
            .bind(expires_at)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn clear_reset_token(&self, id: i64, token: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
               SET reset_token = NULL,
                   reset_token_expiry = NULL
             WHERE id = $1
               AND reset_token = $2
            "#,
        )
        .bind(id)
        .bind(token)
        .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        id: i64,
        token: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $3,
                   reset_token = NULL,
                   reset_token_expiry = NULL
             WHERE id = $1
               AND reset_token = $2
               AND reset_token_expiry > $4
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(password_hash)
        .bind(now)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_role(&self, id: i64, role: Role) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
