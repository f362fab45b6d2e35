use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::error::AnalysisError;
use crate::analysis::parser::ParseError;
use crate::auth::AuthError;
use crate::storage::StorageError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every failure ends up here; none of them take the process down.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Analysis(err) => analysis_parts(err),
            AppError::Auth(err) => auth_parts(err),
            AppError::Storage(StorageError::DuplicateUser(_)) => (
                StatusCode::CONFLICT,
                "USERNAME_TAKEN",
                "Username already exists".to_string(),
            ),
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

fn analysis_parts(err: &AnalysisError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        AnalysisError::EmptyInput { .. } => (StatusCode::BAD_REQUEST, "EMPTY_INPUT", message),
        AnalysisError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "INVALID_URL", message),
        AnalysisError::ArticleTooLong { .. } => {
            (StatusCode::PAYLOAD_TOO_LARGE, "ARTICLE_TOO_LONG", message)
        }
        AnalysisError::Fetch(_) => (StatusCode::BAD_GATEWAY, "FETCH_FAILED", message),
        AnalysisError::Extraction => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "EXTRACTION_FAILED",
            format!("{message}. The site might rely on JavaScript or block scraping; try pasting the text instead."),
        ),
        AnalysisError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", message),
        AnalysisError::ModelCall(detail) => {
            tracing::error!("Model call failed: {detail}");
            (
                StatusCode::BAD_GATEWAY,
                "MODEL_ERROR",
                "The analysis model could not be reached. Please try again later.".to_string(),
            )
        }
        AnalysisError::Parse(parse) => {
            let code = match parse {
                ParseError::ScoreNotFound => "SCORE_NOT_FOUND",
                ParseError::ScoreOutOfRange { .. } => "SCORE_OUT_OF_RANGE",
                ParseError::SummaryNotFound => "SUMMARY_NOT_FOUND",
            };
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                code,
                format!("The analysis could not be completed: {parse}"),
            )
        }
        AnalysisError::Persistence(e) => {
            tracing::error!("Persistence error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_ERROR",
                "Analysis history is unavailable right now".to_string(),
            )
        }
    }
}

fn auth_parts(err: &AuthError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        AuthError::MissingCredentials
        | AuthError::PasswordMismatch
        | AuthError::InvalidUsername
        | AuthError::WeakPassword(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message),
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", message),
        AuthError::InvalidSession => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message),
        AuthError::Hashing(_) | AuthError::Token(_) => {
            tracing::error!("Auth internals failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
