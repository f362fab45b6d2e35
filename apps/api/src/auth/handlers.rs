//! Axum route handlers for registration, login and account management.

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_cookies::{Cookie, Cookies};
use tracing::info;

use crate::auth::password::{
    hash_password, validate_new_password, validate_username, verify_password,
};
use crate::auth::session::SESSION_COOKIE;
use crate::auth::{AuthError, AuthUser};
use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub password_changed_at: Option<DateTime<Utc>>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            created_at: user.created_at,
            password_changed_at: user.password_changed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub username: String,
    pub token: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ProfileResponse>), AppError> {
    let username = req.username.trim().to_string();
    if username.is_empty() || req.password.is_empty() {
        return Err(AuthError::MissingCredentials.into());
    }
    validate_username(&username)?;
    validate_new_password(&req.password, &req.confirm_password)?;

    let hash = hash_blocking(req.password, state.config.bcrypt_cost).await?;
    let user = state.users.create_user(&username, &hash).await?;

    info!(user = %user.username, "Registered user");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /auth/login
///
/// Sets the session cookie and also returns the token for bearer-auth clients.
pub async fn handle_login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AuthError::MissingCredentials.into());
    }

    let user = state
        .users
        .find_user(username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_blocking(req.password, user.password_hash.clone()).await? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state.sessions.issue(&user)?;
    cookies.add(session_cookie(token.clone()));

    info!(user = %user.username, "User logged in");
    Ok(Json(SessionResponse {
        username: user.username,
        token,
    }))
}

/// POST /auth/logout
pub async fn handle_logout(cookies: Cookies) -> Json<Value> {
    cookies.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    Json(json!({ "message": "Logged out" }))
}

/// GET /api/v1/me
pub async fn handle_me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = state
        .users
        .find_user(&user.username)
        .await?
        .ok_or(AuthError::InvalidSession)?;
    Ok(Json(user.into()))
}

/// PUT /api/v1/me/password
///
/// Older sessions stop working; the caller receives a fresh one.
pub async fn handle_change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    cookies: Cookies,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = state
        .users
        .find_user(&auth.username)
        .await?
        .ok_or(AuthError::InvalidSession)?;

    if !verify_blocking(req.current_password, user.password_hash).await? {
        return Err(AuthError::InvalidCredentials.into());
    }
    validate_new_password(&req.new_password, &req.confirm_password)?;

    let hash = hash_blocking(req.new_password, state.config.bcrypt_cost).await?;
    let user = state.users.update_password(&auth.username, &hash).await?;

    let token = state.sessions.issue(&user)?;
    cookies.add(session_cookie(token.clone()));

    info!(user = %auth.username, "Password changed");
    Ok(Json(SessionResponse {
        username: auth.username,
        token,
    }))
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .path("/")
        .build()
}

// bcrypt is deliberately slow; keep it off the async workers.
async fn hash_blocking(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(AppError::from)
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))
}
