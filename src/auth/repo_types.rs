use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::auth::errors::StoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(StoreError::Corrupt(format!("unknown role {other:?}"))),
        }
    }
}

/// Row shape of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: OffsetDateTime,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<OffsetDateTime>,
}

/// Pending password reset; token and expiry only exist together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReset {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl PendingReset {
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

/// User record in the identity store.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(skip_serializing)]
    pub pending_reset: Option<PendingReset>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this user created the resource owned by `creator_id`.
    pub fn owns(&self, creator_id: i64) -> bool {
        self.id == creator_id
    }
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let pending_reset = match (r.reset_token, r.reset_token_expiry) {
            (Some(token), Some(expires_at)) => Some(PendingReset { token, expires_at }),
            (None, None) => None,
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "user {} has a partial reset token",
                    r.id
                )))
            }
        };
        if r.password_hash.is_empty() {
            return Err(StoreError::Corrupt(format!("user {} has no password hash", r.id)));
        }
        Ok(Self {
            id: r.id,
            email: r.email,
            full_name: r.full_name,
            password_hash: r.password_hash,
            role: r.role.parse()?,
            created_at: r.created_at,
            pending_reset,
        })
    }
}

/// Input for `UserRepository::create`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
}
