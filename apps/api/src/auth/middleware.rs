use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;
use tracing::debug;

use crate::auth::session::{password_stamp, SESSION_COOKIE};
use crate::auth::AuthError;
use crate::errors::AppError;
use crate::state::AppState;

/// Identity resolved from the session, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

/// Rejects requests without a valid session. Accepts the session cookie or a
/// bearer token. Tokens issued before the user's last password change are void.
pub async fn require_user(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .or_else(|| cookies.get(SESSION_COOKIE).map(|c| c.value().to_string()))
        .ok_or(AuthError::InvalidSession)?;

    let claims = state.sessions.verify(&token)?;

    let user = state
        .users
        .find_user(&claims.sub)
        .await?
        .ok_or(AuthError::InvalidSession)?;

    if password_stamp(&user) != claims.pwd {
        debug!(user = %user.username, "Rejected session issued before password change");
        return Err(AuthError::InvalidSession.into());
    }

    req.extensions_mut().insert(AuthUser {
        username: user.username,
    });

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
