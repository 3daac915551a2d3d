//! Page fetching and readable-text extraction.
//!
//! Fetching is the third remote operation of the pipeline (after
//! `generate` and `search`) and the only one issued per-URL. Each fetch is
//! bounded by its own timeout; failures are the caller's to absorb.

use crate::types::RemoteCallError;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

static CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, h1, h2, h3, li").expect("valid selector literal"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector literal"));

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Readable content pulled from one page.
#[derive(Debug, Clone)]
pub struct PageExtract {
    /// Final URL after redirects.
    pub url: String,
    /// `<title>` text, when present and non-empty.
    pub title: Option<String>,
    /// Paragraph/heading text, whitespace-collapsed and truncated.
    pub text: String,
    pub latency: Duration,
}

/// Page-fetching seam, mockable in tests.
#[async_trait]
pub trait FetchClient: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<PageExtract, RemoteCallError>;
}

/// [`FetchClient`] over a shared `reqwest` client with a browser-like
/// user agent and a hard per-request timeout.
pub struct HttpFetcher {
    http: reqwest::Client,
    char_limit: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, char_limit: usize) -> std::result::Result<Self, RemoteCallError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteCallError::Unavailable(format!("http client: {e}")))?;

        Ok(Self { http, char_limit })
    }
}

#[async_trait]
impl FetchClient for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<PageExtract, RemoteCallError> {
        let started = Instant::now();

        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                RemoteCallError::Timeout(started.elapsed())
            } else {
                RemoteCallError::Unavailable(format!("fetch {url}: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(RemoteCallError::Unavailable(format!(
                "fetch {url}: status {}",
                response.status()
            )));
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| {
            RemoteCallError::InvalidResponse(format!("fetch {url}: body: {e}"))
        })?;

        let (title, text) = extract_readable(&body, self.char_limit);

        Ok(PageExtract {
            url: final_url,
            title,
            text,
            latency: started.elapsed(),
        })
    }
}

/// Pull readable text out of an HTML document.
///
/// Kept synchronous on purpose: `Html` is not `Send`, so it must never
/// live across an await point.
fn extract_readable(body: &str, char_limit: usize) -> (Option<String>, String) {
    let document = Html::parse_document(body);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let mut parts: Vec<String> = Vec::new();
    let mut total = 0usize;
    for element in document.select(&CONTENT) {
        let text = collapse_whitespace(&element.text().collect::<String>());
        if text.is_empty() {
            continue;
        }
        total += text.len() + 1;
        parts.push(text);
        if total > char_limit * 2 {
            break;
        }
    }

    (title, truncate_chars(&parts.join(" "), char_limit))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate on a char boundary, never mid-codepoint.
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        text.chars().take(limit).collect()
    }
}
