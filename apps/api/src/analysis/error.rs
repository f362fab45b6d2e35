use thiserror::Error;

use crate::analysis::parser::ParseError;
use crate::llm_client::LlmError;
use crate::storage::StorageError;

/// Everything that can stop an article submission.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("article text is empty or shorter than {min_chars} characters")]
    EmptyInput { min_chars: usize },

    #[error("not a valid http(s) URL: {0}")]
    InvalidUrl(String),

    #[error("article is {chars} characters long, the model accepts at most {limit}")]
    ArticleTooLong { chars: usize, limit: usize },

    #[error("failed to fetch article: {0}")]
    Fetch(String),

    #[error("could not extract enough article text from the page")]
    Extraction,

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("model call failed: {0}")]
    ModelCall(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("could not save analysis: {0}")]
    Persistence(#[from] StorageError),
}

impl From<LlmError> for AnalysisError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout { seconds } => AnalysisError::Timeout {
                operation: "model call",
                seconds,
            },
            other => AnalysisError::ModelCall(other.to_string()),
        }
    }
}
