use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::auth::errors::StoreError;
use crate::auth::repo::UserRepository;
use crate::auth::repo_types::{NewUser, PendingReset, Role, User};

/// Process-local identity store. Each operation holds the lock for its whole
/// read-modify-write, so every call is atomic.
#[derive(Default)]
pub struct InMemoryUserRepository {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_user<T>(&self, id: i64, f: impl FnOnce(&mut User) -> T) -> Option<T> {
        self.lock().users.get_mut(&id).map(f)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_reset_token_if_unexpired(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| {
                u.pending_reset
                    .as_ref()
                    .is_some_and(|r| r.token == token && r.is_valid_at(now))
            })
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.lock();
        if inner.users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::Duplicate);
        }
        inner.next_id += 1;
        let user = User {
            id: inner.next_id,
            email: new_user.email,
            full_name: new_user.full_name,
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: OffsetDateTime::now_utc(),
            pending_reset: None,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        self.with_user(id, |u| {
            u.password_hash = password_hash.to_string();
            u.pending_reset = None;
        });
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.with_user(id, |u| {
            u.pending_reset = Some(PendingReset {
                token: token.to_string(),
                expires_at,
            })
        });
        Ok(())
    }

    async fn clear_reset_token(&self, id: i64, token: &str) -> Result<(), StoreError> {
        self.with_user(id, |u| {
            if u.pending_reset.as_ref().is_some_and(|r| r.token == token) {
                u.pending_reset = None;
            }
        });
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        id: i64,
        token: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let applied = self.with_user(id, |u| {
            let matches = u
                .pending_reset
                .as_ref()
                .is_some_and(|r| r.token == token && r.is_valid_at(now));
            if matches {
                u.password_hash = password_hash.to_string();
                u.pending_reset = None;
            }
            matches
        });
        Ok(applied.unwrap_or(false))
    }

    async fn set_role(&self, id: i64, role: Role) -> Result<(), StoreError> {
        self.with_user(id, |u| u.role = role);
        Ok(())
    }
}
