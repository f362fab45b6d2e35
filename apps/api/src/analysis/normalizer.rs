//! Input normalization: pasted text is validated, URLs are fetched and reduced
//! to the readable article text.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::analysis::error::AnalysisError;
use crate::analysis::models::{Article, ArticleInput, PASTED_TEXT_SOURCE};

/// Pasted text shorter than this is treated as empty.
pub const MIN_TEXT_CHARS: usize = 20;
/// Pages yielding less text than this are assumed to be JS shells or bot walls.
pub const MIN_EXTRACTED_CHARS: usize = 200;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36";

/// Elements whose text is never article content.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "form", "iframe", "svg",
    "template", "button", "head",
];

const BLOCK_ELEMENTS: &[&str] = &[
    "p",
    "div",
    "br",
    "li",
    "ul",
    "ol",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "section",
    "article",
    "main",
    "blockquote",
    "pre",
    "tr",
    "figcaption",
];

static ARTICLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article").expect("static selector"));
static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("static selector"));
static OG_TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property='og:title']").expect("static selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("static selector"));
static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("static selector"));

/// Retrieves raw HTML for a URL. Split out so the pipeline can run without a network.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, AnalysisError>;
}

/// `reqwest`-backed fetcher with a hard request timeout.
pub struct HttpPageFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url) -> Result<String, AnalysisError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Article fetch returned non-success status");
            return Err(AnalysisError::Fetch(format!("server responded with {status}")));
        }

        let body = response.text().await.map_err(|e| self.map_error(e))?;
        debug!(bytes = body.len(), "Fetched article page");
        Ok(body)
    }
}

impl HttpPageFetcher {
    fn map_error(&self, err: reqwest::Error) -> AnalysisError {
        if err.is_timeout() {
            AnalysisError::Timeout {
                operation: "article fetch",
                seconds: self.timeout.as_secs(),
            }
        } else {
            AnalysisError::Fetch(err.to_string())
        }
    }
}

/// Turns raw user input into an [`Article`], fetching and extracting URLs.
pub async fn normalize(
    input: &ArticleInput,
    fetcher: &dyn PageFetcher,
) -> Result<Article, AnalysisError> {
    match input {
        ArticleInput::Text(text) => normalize_text(text),
        ArticleInput::Url(raw) => {
            let url = parse_article_url(raw)?;
            let html = fetcher.fetch(&url).await?;
            let article = extract_article(url.as_str(), &html)?;
            info!(
                url = %url,
                chars = article.body.chars().count(),
                "Extracted article text"
            );
            Ok(article)
        }
    }
}

/// Validates pasted text. Whitespace-only or very short input is rejected.
pub fn normalize_text(text: &str) -> Result<Article, AnalysisError> {
    let body = text.trim();
    if body.chars().count() < MIN_TEXT_CHARS {
        return Err(AnalysisError::EmptyInput {
            min_chars: MIN_TEXT_CHARS,
        });
    }
    Ok(Article {
        source: PASTED_TEXT_SOURCE.to_string(),
        title: None,
        body: body.to_string(),
    })
}

pub fn parse_article_url(raw: &str) -> Result<Url, AnalysisError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|_| AnalysisError::InvalidUrl(trimmed.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(url),
        _ => Err(AnalysisError::InvalidUrl(trimmed.to_string())),
    }
}

/// Extracts title and readable body text from an HTML document.
pub fn extract_article(source: &str, html: &str) -> Result<Article, AnalysisError> {
    let document = Html::parse_document(html);

    let root = document
        .select(&ARTICLE_SELECTOR)
        .next()
        .or_else(|| document.select(&BODY_SELECTOR).next())
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    collect_text(root, &mut raw);
    let body = clean_whitespace(&raw);

    if body.chars().count() < MIN_EXTRACTED_CHARS {
        return Err(AnalysisError::Extraction);
    }

    Ok(Article {
        source: source.to_string(),
        title: extract_title(&document),
        body,
    })
}

fn extract_title(document: &Html) -> Option<String> {
    let og = document
        .select(&OG_TITLE_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string);

    og.or_else(|| {
        document
            .select(&TITLE_SELECTOR)
            .chain(document.select(&H1_SELECTOR))
            .map(|el| el.text().collect::<String>())
            .find(|t| !t.trim().is_empty())
    })
    .map(|t| clean_whitespace(&t).replace('\n', " "))
    .filter(|t| !t.is_empty())
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if SKIPPED_ELEMENTS.contains(&name) {
                continue;
            }
            let block = BLOCK_ELEMENTS.contains(&name);
            if block {
                out.push('\n');
            }
            collect_text(child_el, out);
            if block {
                out.push('\n');
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

/// Strips every line, breaks on double spaces, and drops empty fragments.
pub fn clean_whitespace(text: &str) -> String {
    text.lines()
        .flat_map(|line| line.trim().split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
