use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::analysis::prompt_builder::DEFAULT_MAX_ARTICLE_CHARS;
use crate::llm_client::{DEFAULT_ENDPOINT, DEFAULT_MODEL};

/// Where users and analysis history are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local; everything is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => bail!("STORAGE_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub hf_token: String,
    pub jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub model_id: String,
    pub model_endpoint: String,
    pub model_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub max_article_chars: usize,
    pub session_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env(&lookup);

        let storage_backend: StorageBackend = env.parsed_or("STORAGE_BACKEND", StorageBackend::Postgres)?;
        let database_url = env.optional("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL is required when STORAGE_BACKEND is 'postgres'");
        }

        Ok(Config {
            hf_token: env.require("HF_TOKEN")?,
            jwt_secret: env.require("JWT_SECRET")?,
            storage_backend,
            database_url,
            model_id: env.optional("MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            model_endpoint: env
                .optional("MODEL_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model_timeout_secs: env.parsed_or("MODEL_TIMEOUT_SECS", 120)?,
            fetch_timeout_secs: env.parsed_or("FETCH_TIMEOUT_SECS", 10)?,
            max_article_chars: env.parsed_or("MAX_ARTICLE_CHARS", DEFAULT_MAX_ARTICLE_CHARS)?,
            session_ttl_hours: env.parsed_or("SESSION_TTL_HOURS", 24)?,
            bcrypt_cost: env.parsed_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            port: env.parsed_or("PORT", 8080)?,
            rust_log: env.optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.optional(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("HF_TOKEN", "hf_x"),
            ("JWT_SECRET", "s"),
            ("DATABASE_URL", "postgres://localhost/news"),
        ])
        .unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.model_id, DEFAULT_MODEL);
        assert_eq!(config.model_endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.model_timeout_secs, 120);
        assert_eq!(config.fetch_timeout_secs, 10);
        assert_eq!(config.max_article_chars, 24_000);
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let err = load(&[("JWT_SECRET", "s"), ("STORAGE_BACKEND", "memory")]).unwrap_err();
        assert!(err.to_string().contains("HF_TOKEN"));
    }

    #[test]
    fn test_postgres_needs_database_url() {
        let err = load(&[("HF_TOKEN", "hf_x"), ("JWT_SECRET", "s")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_memory_backend_without_database() {
        let config = load(&[
            ("HF_TOKEN", "hf_x"),
            ("JWT_SECRET", "s"),
            ("STORAGE_BACKEND", "Memory"),
            ("PORT", "3000"),
        ])
        .unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert!(config.database_url.is_none());
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = load(&[
            ("HF_TOKEN", "hf_x"),
            ("JWT_SECRET", "s"),
            ("STORAGE_BACKEND", "memory"),
            ("MODEL_TIMEOUT_SECS", "soon"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("MODEL_TIMEOUT_SECS"));
    }

    #[test]
    fn test_unknown_backend() {
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }
}
