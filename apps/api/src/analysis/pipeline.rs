//! Article analysis: runs one submission end to end.
//!
//! Flow: normalize input → build prompt → model call → parse reply →
//!       assemble result → record in history.
//!
//! A failed history write does not fail the submission: the caller still gets
//! the analysis, with the storage failure reported alongside it.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::analysis::error::AnalysisError;
use crate::analysis::models::{
    AnalysisResult, Article, ArticleInput, BreakdownField, HistoryEntry,
};
use crate::analysis::normalizer::{normalize, PageFetcher};
use crate::analysis::parser::{parse_reply, ParseOutcome, ParsedReply};
use crate::analysis::prompt_builder::build_prompt;
use crate::llm_client::CompletionModel;
use crate::storage::HistoryStore;

/// Outcome of a submission that produced an analysis.
#[derive(Debug)]
pub struct Submission {
    pub result: AnalysisResult,
    /// The saved history entry, or why saving failed.
    pub recorded: Result<HistoryEntry, AnalysisError>,
}

/// Everything one submission needs, wired at startup.
pub struct Analyzer {
    llm: Arc<dyn CompletionModel>,
    fetcher: Arc<dyn PageFetcher>,
    history: Arc<dyn HistoryStore>,
    max_article_chars: usize,
}

impl Analyzer {
    pub fn new(
        llm: Arc<dyn CompletionModel>,
        fetcher: Arc<dyn PageFetcher>,
        history: Arc<dyn HistoryStore>,
        max_article_chars: usize,
    ) -> Self {
        Self {
            llm,
            fetcher,
            history,
            max_article_chars,
        }
    }

    /// Analyzes an article and records it in the user's history.
    #[instrument(level = "info", skip_all, fields(user = %user_id))]
    pub async fn submit(
        &self,
        user_id: &str,
        input: &ArticleInput,
    ) -> Result<Submission, AnalysisError> {
        let result = self.analyze(user_id, input).await?;

        let recorded = self
            .history
            .append(user_id, &result)
            .await
            .map_err(AnalysisError::from);

        if let Err(e) = &recorded {
            warn!(error = %e, "Analysis succeeded but could not be saved");
        }

        Ok(Submission { result, recorded })
    }

    /// Runs normalization, prompting, the model call and parsing. Does not persist.
    pub async fn analyze(
        &self,
        user_id: &str,
        input: &ArticleInput,
    ) -> Result<AnalysisResult, AnalysisError> {
        let article = normalize(input, self.fetcher.as_ref()).await?;
        let prompt = build_prompt(&article, self.max_article_chars)?;

        info!(
            source = %article.source,
            chars = article.body.chars().count(),
            "Requesting credibility analysis"
        );
        let reply = self.llm.complete(&prompt.user, &prompt.system).await?;

        let outcome = parse_reply(&reply);
        if let ParseOutcome::PartiallyValid { missing, .. } = &outcome {
            warn!(?missing, "Model reply is missing breakdown sections");
        }
        let (parsed, missing_fields) = outcome.into_result().map_err(|e| {
            warn!(error = %e, "Model reply could not be parsed");
            AnalysisError::Parse(e)
        })?;

        info!(score = parsed.score, "Analysis complete");

        Ok(assemble(user_id, article, parsed, missing_fields, reply))
    }
}

fn assemble(
    user_id: &str,
    article: Article,
    parsed: ParsedReply,
    missing_fields: Vec<BreakdownField>,
    raw_reply: String,
) -> AnalysisResult {
    AnalysisResult {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        source: article.source,
        title: article.title,
        score: parsed.score,
        verdict: parsed.verdict,
        tone: parsed.tone,
        bias: parsed.bias,
        sources: parsed.sources,
        fact_check: parsed.fact_check,
        red_flags: parsed.red_flags,
        summary: parsed.summary,
        missing_fields,
        raw_reply,
        analyzed_at: Utc::now(),
    }
}
