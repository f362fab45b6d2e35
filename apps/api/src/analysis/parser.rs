//! Response parser: turns a free-form model reply into a fixed-shape record.
//!
//! The model is asked for a fixed set of headers but nothing enforces that, so
//! parsing is tolerant: header matching is case-insensitive, Markdown emphasis,
//! bullets and heading marks are ignored, and a handful of aliases are accepted
//! for each section. Only the score and the summary are mandatory; every other
//! section may be absent and is reported back as missing.
//!
//! The parser is a pure function and never panics, whatever the input.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::analysis::models::BreakdownField;

/// `Score: 7`, `Credibility Score (1-10): **7**`, `score - 7`
static LABELED_SCORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bscore\b\s*(?:\([^)\n]*\))?[\s*_:=\-]*?(-?[0-9]+)").expect("static regex")
});

/// `7/10`, `7 / 10`, `7 out of 10`. Rejects dates such as `2024/10/05`.
static OUT_OF_TEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^0-9/.])(-?[0-9]+)\s*(?:/|out\s+of)\s*10(?:[^/0-9]|$)").expect("static regex")
});

static PARENTHESIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("the model reply did not include a credibility score")]
    ScoreNotFound,

    #[error("the model reply gave a credibility score of {raw}, outside 1-10")]
    ScoreOutOfRange { raw: String },

    #[error("the model reply did not include a summary")]
    SummaryNotFound,
}

/// Fields extracted from a model reply. Breakdown fields are empty when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub score: u8,
    pub verdict: Option<String>,
    pub tone: String,
    pub bias: String,
    pub sources: String,
    pub fact_check: String,
    pub red_flags: Vec<String>,
    pub summary: String,
}

/// Result of parsing one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Score, summary and every breakdown section were found.
    Valid(ParsedReply),
    /// Score and summary were found; some breakdown sections were not.
    PartiallyValid {
        reply: ParsedReply,
        missing: Vec<BreakdownField>,
    },
    /// The score or the summary could not be extracted.
    Invalid(ParseError),
}

impl ParseOutcome {
    /// Collapses the outcome into the reply plus its missing fields.
    pub fn into_result(self) -> Result<(ParsedReply, Vec<BreakdownField>), ParseError> {
        match self {
            ParseOutcome::Valid(reply) => Ok((reply, Vec::new())),
            ParseOutcome::PartiallyValid { reply, missing } => Ok((reply, missing)),
            ParseOutcome::Invalid(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Header {
    Score,
    Verdict,
    Tone,
    Bias,
    ToneAndBias,
    Sources,
    FactCheck,
    RedFlags,
    Summary,
    /// Recognized only so it ends the previous section.
    Analysis,
}

impl Header {
    fn lookup(label: &str) -> Option<Header> {
        let header = match label {
            "score" | "credibility score" | "credibility" | "credibility rating"
            | "rating" | "overall score" => Header::Score,
            "verdict" | "overall verdict" | "final verdict" => Header::Verdict,
            "tone" | "language" | "tone of language" | "emotional tone" | "language & tone" => {
                Header::Tone
            }
            "bias" | "political bias" | "bias assessment" | "perspective" | "slant" => {
                Header::Bias
            }
            "tone & bias" | "bias & tone" | "tone / bias" | "tone/bias" => Header::ToneAndBias,
            "sources" | "source" | "sources & evidence" | "evidence & sources" | "evidence"
            | "source usage" | "sourcing" | "source quality" | "use of sources" => Header::Sources,
            "fact-checking" | "fact checking" | "fact-check" | "fact check" | "factual accuracy"
            | "accuracy" => Header::FactCheck,
            "red flags" | "red flag" | "warning signs" | "misinformation tactics" => {
                Header::RedFlags
            }
            "summary" | "neutral summary" | "unbiased summary" | "article summary" => {
                Header::Summary
            }
            "analysis" | "detailed analysis" | "breakdown" => Header::Analysis,
            _ => return None,
        };
        Some(header)
    }

    fn targets(self, field: Target) -> bool {
        matches!(
            (self, field),
            (Header::Verdict, Target::Verdict)
                | (Header::Tone, Target::Tone)
                | (Header::Bias, Target::Bias)
                | (Header::ToneAndBias, Target::Tone)
                | (Header::ToneAndBias, Target::Bias)
                | (Header::Sources, Target::Sources)
                | (Header::FactCheck, Target::FactCheck)
                | (Header::RedFlags, Target::RedFlags)
                | (Header::Summary, Target::Summary)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Verdict,
    Tone,
    Bias,
    Sources,
    FactCheck,
    RedFlags,
    Summary,
}

struct Section {
    header: Header,
    body: String,
}

/// Parses a raw model reply. Score errors take precedence over a missing summary.
pub fn parse_reply(raw: &str) -> ParseOutcome {
    let score = match extract_score(raw) {
        Ok(score) => score,
        Err(err) => return ParseOutcome::Invalid(err),
    };

    let sections = split_sections(raw);
    let field = |target: Target| -> Option<String> {
        sections
            .iter()
            .find(|s| s.header.targets(target))
            .map(|s| s.body.clone())
            .filter(|body| !body.is_empty())
    };

    let Some(summary) = field(Target::Summary) else {
        return ParseOutcome::Invalid(ParseError::SummaryNotFound);
    };

    let mut missing = Vec::new();
    let mut take = |target: Target, marker: BreakdownField| -> Option<String> {
        let value = field(target);
        if value.is_none() {
            missing.push(marker);
        }
        value
    };

    let verdict = take(Target::Verdict, BreakdownField::Verdict).map(|v| clean_inline(&v));
    let tone = take(Target::Tone, BreakdownField::Tone).unwrap_or_default();
    let bias = take(Target::Bias, BreakdownField::Bias).unwrap_or_default();
    let sources = take(Target::Sources, BreakdownField::Sources).unwrap_or_default();
    let fact_check = take(Target::FactCheck, BreakdownField::FactCheck).unwrap_or_default();
    let red_flags = take(Target::RedFlags, BreakdownField::RedFlags)
        .map(|body| split_red_flags(&body))
        .unwrap_or_default();

    let reply = ParsedReply {
        score,
        verdict,
        tone,
        bias,
        sources,
        fact_check,
        red_flags,
        summary,
    };

    if missing.is_empty() {
        ParseOutcome::Valid(reply)
    } else {
        ParseOutcome::PartiallyValid { reply, missing }
    }
}

/// Finds the earliest recognized score pattern and range-checks it.
pub fn extract_score(raw: &str) -> Result<u8, ParseError> {
    let labeled = LABELED_SCORE.captures(raw).and_then(|c| c.get(1));
    let out_of = OUT_OF_TEN.captures(raw).and_then(|c| c.get(1));

    let found = match (labeled, out_of) {
        (Some(a), Some(b)) => {
            if a.start() <= b.start() {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return Err(ParseError::ScoreNotFound),
    };

    let digits = found.as_str();
    match digits.parse::<i64>() {
        Ok(value @ 1..=10) => Ok(value as u8),
        _ => Err(ParseError::ScoreOutOfRange {
            raw: digits.to_string(),
        }),
    }
}

fn split_sections(raw: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<(Header, Vec<&str>)> = None;

    for line in raw.lines() {
        let open = current.as_ref().map(|(h, _)| *h);
        if let Some(found) = classify_header(line).filter(|l| l.starts_section(open)) {
            let HeaderLine { header, rest, .. } = found;
            if let Some((h, lines)) = current.take() {
                sections.push(finish_section(h, &lines));
            }
            let mut lines = Vec::new();
            if !rest.is_empty() {
                lines.push(rest);
            }
            current = Some((header, lines));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }
    if let Some((h, lines)) = current {
        sections.push(finish_section(h, &lines));
    }
    sections
}

fn finish_section(header: Header, lines: &[&str]) -> Section {
    Section {
        header,
        body: lines.join("\n").trim().to_string(),
    }
}

/// A line recognized as a section header.
struct HeaderLine<'a> {
    header: Header,
    /// Text after the colon, if any.
    rest: &'a str,
    /// Bold label or `#` heading.
    emphasized: bool,
    /// Starts with `-`, `*`, `+` or a bullet glyph.
    bulleted: bool,
    /// One of the labels the system prompt asks for, not a loose alias.
    canonical: bool,
}

impl HeaderLine<'_> {
    /// Red-flag and summary bodies routinely contain `Evidence:` or
    /// `Source:` lines, so inside them only emphasized headers or unbulleted
    /// canonical labels open a new section.
    fn starts_section(&self, open: Option<Header>) -> bool {
        match open {
            Some(Header::RedFlags | Header::Summary) => {
                self.emphasized || (self.canonical && !self.bulleted)
            }
            _ => true,
        }
    }
}

/// Recognizes a header line, returning its kind and any text after the colon.
fn classify_header(line: &str) -> Option<HeaderLine<'_>> {
    let trimmed = line.trim();
    let is_heading = trimmed.starts_with('#');
    let bulleted = trimmed.starts_with(['-', '+', '•', '·'])
        || trimmed
            .strip_prefix('*')
            .is_some_and(|rest| rest.starts_with(char::is_whitespace));
    let content = strip_list_marker(trimmed);

    if let Some((label, rest)) = content.split_once(':') {
        if let Some((header, canonical)) = lookup_label(label) {
            let rest = rest.trim_start_matches(|c: char| c == '*' || c == '_' || c.is_whitespace());
            return Some(HeaderLine {
                header,
                rest: rest.trim_end(),
                emphasized: is_heading || label.contains("**") || label.contains("__"),
                bulleted,
                canonical,
            });
        }
    }

    let bold_line = content.starts_with("**") && content.ends_with("**");
    if is_heading || bold_line {
        if let Some((header, canonical)) = lookup_label(content) {
            return Some(HeaderLine {
                header,
                rest: "",
                emphasized: true,
                bulleted,
                canonical,
            });
        }
    }
    None
}

/// Labels the system prompt itself uses, in normalized form.
const CANONICAL_LABELS: &[&str] = &[
    "score",
    "credibility score",
    "verdict",
    "tone",
    "bias",
    "tone & bias",
    "sources",
    "sources & evidence",
    "fact-checking",
    "fact checking",
    "red flags",
    "summary",
    "neutral summary",
    "analysis",
];

/// Resolves a label to its header and whether it is a canonical label.
fn lookup_label(label: &str) -> Option<(Header, bool)> {
    if label.len() > 48 {
        return None;
    }
    let without_parens = PARENTHESIZED.replace_all(label, " ");
    let normalized = without_parens
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '#' | '`' | ':'))
        .collect::<String>()
        .to_lowercase();
    let normalized = normalized
        .split_whitespace()
        .map(|w| if w == "and" { "&" } else { w })
        .collect::<Vec<_>>()
        .join(" ");
    Header::lookup(&normalized).map(|h| (h, CANONICAL_LABELS.contains(&normalized.as_str())))
}

/// Drops leading bullet, quote, heading and numbering marks.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start_matches(|c: char| {
        c.is_whitespace() || matches!(c, '#' | '-' | '+' | '•' | '>' | '·')
    });
    // "* item" is a bullet, "**Bold**" is emphasis and is kept
    let line = match line.strip_prefix('*') {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => line,
    };

    let digits_end = line
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    if digits_end > 0 {
        let after = &line[digits_end..];
        if let Some(rest) = after.strip_prefix('.').or_else(|| after.strip_prefix(')')) {
            if rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    }
    line
}

fn clean_inline(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| matches!(c, '*' | '_' | '"' | '\'' | '[' | ']'))
        .trim()
        .to_string()
}

/// "None", "N/A", "None identified", "No red flags were identified", "There are no significant red flags".
static NO_FLAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(?:none|nothing|n/?a)(?:\s+(?:identified|found|detected|noted|observed|apparent))?|(?:there\s+(?:are|were|is|was)\s+)?no\s+(?:[a-z]+\s+){0,2}red\s+flags?\b.*)$",
    )
    .expect("static regex")
});

/// Splits a red-flag section into individual items.
fn split_red_flags(body: &str) -> Vec<String> {
    let lines: Vec<&str> = body
        .lines()
        .map(strip_list_marker)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let items: Vec<String> = match lines.as_slice() {
        [single] if single.contains(';') => single.split(';').map(String::from).collect(),
        [single] if is_short_comma_list(single) => single.split(',').map(String::from).collect(),
        _ => lines.iter().map(|l| l.to_string()).collect(),
    };

    items
        .iter()
        .map(|item| clean_inline(item).trim_end_matches('.').trim().to_string())
        .filter(|item| !item.is_empty())
        .filter(|item| !NO_FLAGS.is_match(item))
        .collect()
}

fn is_short_comma_list(line: &str) -> bool {
    line.contains(',') && line.split(',').all(|part| part.split_whitespace().count() <= 6)
}
