use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            ChangePasswordRequest, ForgotPasswordRequest, LoginForm, LoginRequest,
            MessageResponse, PublicUser, RegisterRequest, ResetPasswordRequest, TokenResponse,
        },
        errors::AuthError,
        extractors::CurrentUser,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login_form))
        .route("/auth/login/json", post(login_json))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/change-password", post(change_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    let user = state
        .auth
        .register(&payload.email, &payload.full_name, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, form))]
pub async fn login_form(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AuthError> {
    let token = state.auth.login(&form.username, &form.password).await?;
    Ok(Json(token))
}

#[instrument(skip(state, payload))]
pub async fn login_json(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let token = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(token))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Json<MessageResponse> {
    Json(state.auth.forgot_password(&payload.email).await)
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    let ack = state
        .auth
        .reset_password(&payload.token, &payload.new_password)
        .await?;
    Ok(Json(ack))
}

#[instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    // Wrong old password from an authenticated caller: 400, no challenge.
    let ack = state
        .auth
        .change_password(&user, &payload.old_password, &payload.new_password)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials => AuthError::IncorrectCurrentPassword,
            other => other,
        })?;
    Ok(Json(ack))
}
