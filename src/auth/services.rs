use std::sync::Arc;

use lazy_static::lazy_static;
use time::{Duration, OffsetDateTime};
use tracing::{debug, error, info, instrument, warn};

use crate::auth::{
    dto::{
        MessageResponse, PublicUser, TokenResponse, CHANGE_PASSWORD_ACK, FORGOT_PASSWORD_ACK,
        RESET_PASSWORD_ACK,
    },
    errors::AuthError,
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    policy::{check_password_strength, is_valid_email, is_valid_full_name, normalize_email},
    repo::UserRepository,
    repo_types::{NewUser, Role, User},
    reset_token::generate_reset_token,
};
use crate::config::AdminConfig;
use crate::notify::ResetNotifier;

lazy_static! {
    // Stand-in hash verified when the login email is unknown.
    static ref DUMMY_HASH: String = hash_password("Dummy-Passw0rd!").unwrap_or_default();
}

/// Registration, login and password recovery over a `UserRepository`.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    notifier: Arc<dyn ResetNotifier>,
    keys: JwtKeys,
    reset_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        notifier: Arc<dyn ResetNotifier>,
        keys: JwtKeys,
        reset_ttl: Duration,
    ) -> Self {
        Self {
            users,
            notifier,
            keys,
            reset_ttl,
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    #[instrument(skip(self, full_name, password))]
    pub async fn register(
        &self,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> Result<PublicUser, AuthError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AuthError::InvalidEmail);
        }
        if !is_valid_full_name(full_name) {
            return Err(AuthError::InvalidFullName);
        }
        check_password_strength(password).map_err(AuthError::WeakPassword)?;

        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AuthError::DuplicateIdentity);
        }

        let password_hash = hash(password)?;
        // The store's unique constraint decides races between concurrent registrations.
        let user = self
            .users
            .create(NewUser {
                email,
                full_name: full_name.trim().to_string(),
                password_hash,
                role: Role::User,
            })
            .await?;

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(PublicUser::from(&user))
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, AuthError> {
        let email = normalize_email(email);
        let user = match self.users.find_by_email(&email).await? {
            Some(u) => u,
            None => {
                verify_password(password, &DUMMY_HASH);
                warn!(email = %email, "login unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash) {
            warn!(email = %email, user_id = user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.keys.issue(&user.email).map_err(internal)?;
        info!(user_id = user.id, email = %user.email, "user logged in");
        Ok(TokenResponse::bearer(token))
    }

    /// Resolves a bearer token to the user it was issued for.
    #[instrument(skip_all)]
    pub async fn resolve_current_user(&self, token: &str) -> Result<User, AuthError> {
        let subject = self.keys.decode(token).map_err(|e| {
            debug!(error = %e, "bearer token rejected");
            AuthError::InvalidCredentials
        })?;
        match self.users.find_by_email(&subject).await? {
            Some(user) => Ok(user),
            None => {
                warn!(email = %subject, "token subject no longer exists");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Authenticates a raw `Authorization` header value.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<User, AuthError> {
        let header = authorization
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        let token = match header.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
            _ => {
                warn!("invalid auth scheme");
                return Err(AuthError::InvalidCredential);
            }
        };
        if token.is_empty() {
            return Err(AuthError::InvalidCredential);
        }

        self.resolve_current_user(token).await.map_err(|e| match e {
            AuthError::InvalidCredentials => AuthError::InvalidCredential,
            other => other,
        })
    }

    /// Always returns the same acknowledgement, whether or not the email is registered.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> MessageResponse {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return FORGOT_PASSWORD_ACK;
        }

        let user = match self.users.find_by_email(&email).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                debug!(email = %email, "reset requested for unknown email");
                return FORGOT_PASSWORD_ACK;
            }
            Err(e) => {
                error!(error = %e, "find_by_email failed");
                return FORGOT_PASSWORD_ACK;
            }
        };

        let token = generate_reset_token();
        let Some(expires_at) = OffsetDateTime::now_utc().checked_add(self.reset_ttl) else {
            error!(user_id = user.id, "reset expiry out of range");
            return FORGOT_PASSWORD_ACK;
        };
        if let Err(e) = self.users.set_reset_token(user.id, &token, expires_at).await {
            error!(error = %e, user_id = user.id, "set_reset_token failed");
            return FORGOT_PASSWORD_ACK;
        }
        info!(user_id = user.id, "password reset requested");

        let notifier = Arc::clone(&self.notifier);
        let users = Arc::clone(&self.users);
        tokio::spawn(async move {
            if let Err(e) = notifier.send_reset_notification(&user.email, &token).await {
                warn!(error = %e, user_id = user.id, "reset notification failed");
                // An undelivered token is withdrawn unless a newer request replaced it.
                if let Err(e) = users.clear_reset_token(user.id, &token).await {
                    error!(error = %e, user_id = user.id, "clear_reset_token failed");
                }
            }
        });

        FORGOT_PASSWORD_ACK
    }

    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<MessageResponse, AuthError> {
        let now = OffsetDateTime::now_utc();
        let user = self
            .users
            .find_by_reset_token_if_unexpired(token, now)
            .await?
            .ok_or_else(|| {
                warn!("invalid or expired reset token");
                AuthError::InvalidOrExpiredToken
            })?;

        check_password_strength(new_password).map_err(AuthError::WeakPassword)?;
        let password_hash = hash(new_password)?;

        if !self
            .users
            .consume_reset_token(user.id, token, &password_hash, now)
            .await?
        {
            warn!(user_id = user.id, "reset token consumed concurrently");
            return Err(AuthError::InvalidOrExpiredToken);
        }

        info!(user_id = user.id, "password reset");
        Ok(RESET_PASSWORD_ACK)
    }

    #[instrument(skip_all, fields(user_id = user.id))]
    pub async fn change_password(
        &self,
        user: &User,
        old_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, AuthError> {
        if !verify_password(old_password, &user.password_hash) {
            warn!("change_password with wrong current password");
            return Err(AuthError::InvalidCredentials);
        }
        check_password_strength(new_password).map_err(AuthError::WeakPassword)?;
        let password_hash = hash(new_password)?;

        self.users
            .update_password_hash(user.id, &password_hash)
            .await?;

        info!("password changed");
        Ok(CHANGE_PASSWORD_ACK)
    }

    /// Makes sure the configured admin exists with the `admin` role.
    #[instrument(skip_all, fields(email = %admin.email))]
    pub async fn ensure_admin(&self, admin: &AdminConfig) -> Result<User, AuthError> {
        let email = normalize_email(&admin.email);
        if let Some(mut user) = self.users.find_by_email(&email).await? {
            if !user.is_admin() {
                self.users.set_role(user.id, Role::Admin).await?;
                user.role = Role::Admin;
                info!(user_id = user.id, "existing user promoted to admin");
            }
            return Ok(user);
        }

        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        check_password_strength(&admin.password).map_err(AuthError::WeakPassword)?;
        let user = self
            .users
            .create(NewUser {
                email,
                full_name: admin.full_name.trim().to_string(),
                password_hash: hash(&admin.password)?,
                role: Role::Admin,
            })
            .await?;
        info!(user_id = user.id, "admin user created");
        Ok(user)
    }
}

fn hash(password: &str) -> Result<String, AuthError> {
    hash_password(password).map_err(|e| AuthError::Internal(e.to_string()))
}

fn internal(e: impl std::fmt::Display) -> AuthError {
    AuthError::Internal(e.to_string())
}
