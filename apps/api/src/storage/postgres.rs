use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::analysis::models::{AnalysisResult, HistoryEntry};
use crate::models::user::User;
use crate::storage::{HistoryStore, StorageError, UserStore};

/// PostgreSQL-backed store. Each history entry is one row carrying the full
/// analysis as a JSONB document.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: Uuid,
    user_id: String,
    recorded_at: DateTime<Utc>,
    result: Json<AnalysisResult>,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        HistoryEntry {
            id: row.id,
            user_id: row.user_id,
            recorded_at: row.recorded_at,
            result: row.result.0,
        }
    }
}

#[async_trait]
impl HistoryStore for PgStore {
    async fn append(
        &self,
        user_id: &str,
        result: &AnalysisResult,
    ) -> Result<HistoryEntry, StorageError> {
        // Append-only: entries are never updated in place
        let row = sqlx::query_as::<_, HistoryRow>(
            r#"
            INSERT INTO analysis_history (id, user_id, recorded_at, result)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, recorded_at, result
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(Utc::now())
        .bind(Json(result))
        .fetch_one(&self.pool)
        .await?;

        info!("Recorded history entry {} for user {}", row.id, user_id);
        Ok(row.into())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<HistoryEntry>, StorageError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, user_id, recorded_at, result
            FROM analysis_history
            WHERE user_id = $1
            ORDER BY recorded_at DESC, seq DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }

    async fn delete(&self, user_id: &str, entry_id: Uuid) -> Result<bool, StorageError> {
        let deleted = sqlx::query("DELETE FROM analysis_history WHERE id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, StorageError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (username) DO NOTHING
            RETURNING username, password_hash, created_at, password_changed_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or_else(|| StorageError::DuplicateUser(username.to_string()))
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, StorageError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT username, password_hash, created_at, password_changed_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, StorageError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET password_hash = $2, password_changed_at = now()
            WHERE username = $1
            RETURNING username, password_hash, created_at, password_changed_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or_else(|| StorageError::UnknownUser(username.to_string()))
    }
}
