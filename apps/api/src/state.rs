use std::sync::Arc;

use crate::analysis::pipeline::Analyzer;
use crate::auth::SessionKeys;
use crate::config::Config;
use crate::storage::{HistoryStore, UserStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    /// Same backend the analyzer records into.
    pub history: Arc<dyn HistoryStore>,
    pub users: Arc<dyn UserStore>,
    pub sessions: SessionKeys,
    pub config: Config,
}
