//! Registration, login and session resolution.
//!
//! The analysis core only ever sees a resolved [`middleware::AuthUser`].

use thiserror::Error;

pub mod handlers;
pub mod middleware;
pub mod password;
pub mod session;

pub use middleware::AuthUser;
pub use session::SessionKeys;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,

    #[error("usernames are 3-64 characters of letters, digits, '.', '_', '-' or '@'")]
    InvalidUsername,

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("authentication required")]
    InvalidSession,

    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}
