use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::error::AnalysisError;
use crate::analysis::models::{
    AnalysisResult, ArticleInput, HistoryEntry, ScoreBand, VerdictClass,
};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: Option<String>,
    pub url: Option<String>,
}

impl AnalyzeRequest {
    /// Exactly one of `text` or `url` must be supplied.
    fn into_input(self) -> Result<ArticleInput, AppError> {
        match (self.text, self.url) {
            (Some(text), None) => Ok(ArticleInput::Text(text)),
            (None, Some(url)) => Ok(ArticleInput::Url(url)),
            (Some(_), Some(_)) => Err(AppError::Validation(
                "Provide either 'text' or 'url', not both".to_string(),
            )),
            (None, None) => Err(AppError::Validation(
                "Provide the article as 'text' or as a 'url'".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub result: AnalysisResult,
    pub score_band: ScoreBand,
    pub verdict_class: Option<VerdictClass>,
    pub complete: bool,
    pub history_saved: bool,
    pub history_entry_id: Option<Uuid>,
    /// Set when the analysis succeeded but could not be saved.
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryItem {
    #[serde(flatten)]
    pub entry: HistoryEntry,
    pub source_preview: String,
    pub score_band: ScoreBand,
}

impl From<HistoryEntry> for HistoryItem {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            source_preview: entry.source_preview(),
            score_band: entry.result.score_band(),
            entry,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub items: Vec<HistoryItem>,
}

/// POST /api/v1/analyses
pub async fn handle_analyze(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let input = req.into_input()?;
    let submission = state.analyzer.submit(&user.username, &input).await?;

    let result = submission.result;
    let (history_entry_id, warning) = match submission.recorded {
        Ok(entry) => (Some(entry.id), None),
        Err(_) => (
            None,
            Some("Analysis completed but was not saved to history".to_string()),
        ),
    };

    Ok(Json(AnalyzeResponse {
        score_band: result.score_band(),
        verdict_class: result.verdict_class(),
        complete: result.is_complete(),
        history_saved: history_entry_id.is_some(),
        history_entry_id,
        warning,
        result,
    }))
}

/// GET /api/v1/history
pub async fn handle_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<HistoryResponse>, AppError> {
    let entries = state
        .history
        .list(&user.username)
        .await
        .map_err(AnalysisError::from)?;
    Ok(Json(HistoryResponse {
        items: entries.into_iter().map(HistoryItem::from).collect(),
    }))
}

/// DELETE /api/v1/history/:id
pub async fn handle_delete_history_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state
        .history
        .delete(&user.username, id)
        .await
        .map_err(AnalysisError::from)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("History entry {id} not found")))
    }
}
