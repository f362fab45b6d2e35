use crate::analysis::error::AnalysisError;
use crate::analysis::models::Article;
use crate::analysis::prompts::{NEWS_ANALYSIS_PREAMBLE, NEWS_ANALYSIS_SYSTEM};

/// Default article budget in characters, sized to fit an 8k-token context
/// alongside the system prompt and a 2k-token reply.
pub const DEFAULT_MAX_ARTICLE_CHARS: usize = 24_000;

/// The two messages sent to the model for one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPrompt {
    pub system: String,
    pub user: String,
}

/// Builds the analysis prompt. Articles over `max_article_chars` are rejected, never truncated.
pub fn build_prompt(
    article: &Article,
    max_article_chars: usize,
) -> Result<AnalysisPrompt, AnalysisError> {
    let chars = article.body.chars().count();
    if chars > max_article_chars {
        return Err(AnalysisError::ArticleTooLong {
            chars,
            limit: max_article_chars,
        });
    }

    let mut user = String::with_capacity(NEWS_ANALYSIS_PREAMBLE.len() + article.body.len() + 64);
    user.push_str(NEWS_ANALYSIS_PREAMBLE);
    if let Some(title) = article.title.as_deref().filter(|t| !t.trim().is_empty()) {
        user.push_str("Title: ");
        user.push_str(title.trim());
        user.push_str("\n\n");
    }
    user.push_str(&article.body);

    Ok(AnalysisPrompt {
        system: NEWS_ANALYSIS_SYSTEM.to_string(),
        user,
    })
}
