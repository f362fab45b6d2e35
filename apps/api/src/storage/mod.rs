//! Persistence for users and analysis history.
//!
//! Two interchangeable backends: PostgreSQL (one JSONB document per history
//! entry) and an in-process store. `AppState` holds both traits as
//! `Arc<dyn ...>`, chosen at startup from `STORAGE_BACKEND`.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::analysis::models::{AnalysisResult, HistoryEntry};
use crate::models::user::User;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("user '{0}' already exists")]
    DuplicateUser(String),

    #[error("user '{0}' not found")]
    UnknownUser(String),
}

/// Append-only, per-user analysis history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Records a result. Identical results appended twice produce two entries.
    async fn append(
        &self,
        user_id: &str,
        result: &AnalysisResult,
    ) -> Result<HistoryEntry, StorageError>;

    /// All entries for a user, newest first. Unknown users get an empty list.
    async fn list(&self, user_id: &str) -> Result<Vec<HistoryEntry>, StorageError>;

    /// Removes one of the user's entries. Returns false if it did not exist.
    async fn delete(&self, user_id: &str, entry_id: Uuid) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, username: &str, password_hash: &str)
        -> Result<User, StorageError>;

    async fn find_user(&self, username: &str) -> Result<Option<User>, StorageError>;

    /// Replaces the hash and stamps the change time. Returns the updated user.
    async fn update_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, StorageError>;
}
