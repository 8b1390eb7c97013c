use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::errors::AuthError;
use super::repo_types::User;
use crate::state::AppState;

/// Authenticated caller, resolved from the `Authorization: Bearer` header on
/// every request. Protected handlers (including the catalog layer) take this
/// as an argument.
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Only the creator of a resource may modify it.
    pub fn ensure_owns(&self, creator_id: i64) -> Result<(), AuthError> {
        if self.0.owns(creator_id) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // A header that is not valid visible ASCII is present but unusable.
        let header = match parts.headers.get(axum::http::header::AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| AuthError::InvalidCredential)?),
            None => None,
        };
        let user = state.auth.authenticate(header).await?;
        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(state: &AppState, header: Option<&str>) -> Result<CurrentUser, AuthError> {
        let mut builder = Request::builder().uri("/auth/me");
        if let Some(h) = header {
            builder = builder.header(axum::http::header::AUTHORIZATION, h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CurrentUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn extracts_user_from_bearer_header() {
        let state = AppState::fake();
        state
            .auth
            .register("a@x.com", "A", "Abcdefg1!")
            .await
            .unwrap();
        let token = state
            .auth
            .login("a@x.com", "Abcdefg1!")
            .await
            .unwrap()
            .access_token;

        let current = extract(&state, Some(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert_eq!(current.0.email, "a@x.com");
        assert!(current.ensure_owns(current.0.id).is_ok());
        assert!(matches!(
            current.ensure_owns(current.0.id + 1),
            Err(AuthError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn rejects_missing_and_invalid_headers() {
        let state = AppState::fake();
        assert!(matches!(
            extract(&state, None).await,
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            extract(&state, Some("Bearer nope")).await,
            Err(AuthError::InvalidCredential)
        ));
        assert!(matches!(
            extract(&state, Some("Token abc")).await,
            Err(AuthError::InvalidCredential)
        ));
    }
}
