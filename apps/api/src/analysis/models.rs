use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Source label stored for pasted articles.
pub const PASTED_TEXT_SOURCE: &str = "Pasted Text";

/// What the user submitted, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleInput {
    Text(String),
    Url(String),
}

/// A normalized article ready for prompting. Never persisted on its own.
#[derive(Debug, Clone)]
pub struct Article {
    pub source: String,
    pub title: Option<String>,
    pub body: String,
}

/// Breakdown fields the model may omit without invalidating the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownField {
    Verdict,
    Tone,
    Bias,
    Sources,
    FactCheck,
    RedFlags,
}

/// Display band for a credibility score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Reliable,
    Questionable,
    Unreliable,
}

impl ScoreBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            7..=u8::MAX => ScoreBand::Reliable,
            4..=6 => ScoreBand::Questionable,
            _ => ScoreBand::Unreliable,
        }
    }
}

/// Coarse classification of the model's one-line verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictClass {
    Reliable,
    Misleading,
    False,
    Opinion,
}

impl VerdictClass {
    pub fn classify(verdict: &str) -> Self {
        let lower = verdict.to_lowercase();
        if lower.contains("misleading") {
            VerdictClass::Misleading
        } else if lower.contains("false") {
            VerdictClass::False
        } else if lower.contains("opinion") || lower.contains("satire") {
            VerdictClass::Opinion
        } else {
            VerdictClass::Reliable
        }
    }
}

/// A validated credibility analysis. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub user_id: String,
    pub source: String,
    pub title: Option<String>,
    /// Always within 1..=10.
    pub score: u8,
    pub verdict: Option<String>,
    pub tone: String,
    pub bias: String,
    pub sources: String,
    pub fact_check: String,
    pub red_flags: Vec<String>,
    pub summary: String,
    /// Breakdown sections absent from the model reply.
    pub missing_fields: Vec<BreakdownField>,
    pub raw_reply: String,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn score_band(&self) -> ScoreBand {
        ScoreBand::from_score(self.score)
    }

    pub fn verdict_class(&self) -> Option<VerdictClass> {
        self.verdict.as_deref().map(VerdictClass::classify)
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields.is_empty()
    }
}

/// One persisted analysis in a user's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub user_id: String,
    pub recorded_at: DateTime<Utc>,
    pub result: AnalysisResult,
}

impl HistoryEntry {
    /// Shortened source label for list views.
    pub fn source_preview(&self) -> String {
        preview(&self.result.source, 100)
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_band_boundaries() {
        assert_eq!(ScoreBand::from_score(10), ScoreBand::Reliable);
        assert_eq!(ScoreBand::from_score(7), ScoreBand::Reliable);
        assert_eq!(ScoreBand::from_score(6), ScoreBand::Questionable);
        assert_eq!(ScoreBand::from_score(4), ScoreBand::Questionable);
        assert_eq!(ScoreBand::from_score(3), ScoreBand::Unreliable);
        assert_eq!(ScoreBand::from_score(1), ScoreBand::Unreliable);
    }

    #[test]
    fn test_verdict_class() {
        assert_eq!(
            VerdictClass::classify("Potentially Misleading"),
            VerdictClass::Misleading
        );
        assert_eq!(VerdictClass::classify("Likely False"), VerdictClass::False);
        assert_eq!(
            VerdictClass::classify("Opinion/Satire"),
            VerdictClass::Opinion
        );
        assert_eq!(
            VerdictClass::classify("Likely Reliable"),
            VerdictClass::Reliable
        );
    }

    #[test]
    fn test_preview_truncates_long_sources() {
        let long = "x".repeat(150);
        let short = preview(&long, 100);
        assert_eq!(short.chars().count(), 103);
        assert!(short.ends_with("..."));
        assert_eq!(preview("short", 100), "short");
    }
}
