use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::analysis::models::{AnalysisResult, HistoryEntry};
use crate::models::user::User;
use crate::storage::{HistoryStore, StorageError, UserStore};

/// In-process store. Data lives as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    /// Per-user entries in insertion order.
    history: RwLock<HashMap<String, Vec<HistoryEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn append(
        &self,
        user_id: &str,
        result: &AnalysisResult,
    ) -> Result<HistoryEntry, StorageError> {
        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            recorded_at: Utc::now(),
            result: result.clone(),
        };
        self.history
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<HistoryEntry>, StorageError> {
        let history = self.history.read().await;
        Ok(history
            .get(user_id)
            .map(|entries| entries.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, user_id: &str, entry_id: Uuid) -> Result<bool, StorageError> {
        let mut history = self.history.write().await;
        let Some(entries) = history.get_mut(user_id) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|e| e.id != entry_id);
        Ok(entries.len() != before)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, StorageError> {
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(StorageError::DuplicateUser(username.to_string()));
        }
        let user = User {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
            password_changed_at: None,
        };
        users.insert(username.to_string(), user.clone());
        Ok(user)
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, StorageError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn update_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, StorageError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(username)
            .ok_or_else(|| StorageError::UnknownUser(username.to_string()))?;
        user.password_hash = password_hash.to_string();
        user.password_changed_at = Some(Utc::now());
        Ok(user.clone())
    }
}
