//! Core types shared across the research pipeline.
//!
//! Every entity here is owned exclusively by the run that created it; the
//! only artifact that crosses the crate boundary is [`ResearchResult`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

// ============= Pipeline Entities =============

/// The immutable user query that starts a research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// Correlation id assigned at request entry.
    pub id: Uuid,
    /// The raw query text, referenced read-only for the rest of the run.
    pub text: String,
}

impl Query {
    /// Create a query with a fresh correlation id.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
        }
    }
}

/// One decomposed facet of the original query, researched independently.
///
/// Sub-questions are ordered; position in the planner's output vector is
/// execution priority and drives section order in the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuestion {
    pub id: Uuid,
    pub text: String,
    /// Correlation id of the parent [`Query`].
    pub query_id: Uuid,
}

impl SubQuestion {
    pub fn new(text: impl Into<String>, query_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            query_id,
        }
    }
}

/// A fetched web page considered as potential evidence.
///
/// At most one candidate exists per normalized URL per run; the
/// coordinator's fan-in enforces this with [`normalize_url`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCandidate {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    /// Host of the URL, `www.` stripped.
    pub domain: String,
    /// Readable text extracted from the page, whitespace-collapsed and
    /// truncated to the configured char limit.
    pub raw_extract: String,
    pub sub_question_id: Uuid,
    pub fetch_latency: Duration,
}

impl SourceCandidate {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        raw_extract: impl Into<String>,
        sub_question_id: Uuid,
        fetch_latency: Duration,
    ) -> Self {
        let url = url.into();
        let domain = domain_of(&url);
        Self {
            id: Uuid::new_v4(),
            url,
            title: title.into(),
            domain,
            raw_extract: raw_extract.into(),
            sub_question_id,
            fetch_latency,
        }
    }
}

/// A claim corroborated by one or more source candidates.
///
/// Invariant: `supporting_source_ids` is never empty; a finding without
/// support cannot exist. Confidence is monotonically non-decreasing with
/// corroborating-source count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedFinding {
    pub claim_text: String,
    pub supporting_source_ids: BTreeSet<Uuid>,
    /// In `[0, 1]`, driven primarily by distinct supporting domains.
    pub confidence: f64,
    pub sub_question_id: Uuid,
}

/// One entry in the final report's reference list.
///
/// Indices are 1-based, assigned in first-reference order, and never
/// reassigned to a different URL within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationEntry {
    pub index: usize,
    pub url: String,
    pub title: String,
    pub domain: String,
}

// ============= Run Output =============

/// Counters and timings for a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Deduplicated source candidates gathered across all sub-questions.
    pub source_count: usize,
    pub sub_question_count: usize,
    /// True when the run completed under reduced budget or after a
    /// recoverable failure (fallback synthesis, early cutoff).
    pub degraded: bool,
}

/// The sole artifact crossing the core's output boundary.
///
/// Immutable once produced. Renderers must present `citations` in the
/// given index order and must not invent entries absent from the list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    /// Markdown report body with inline `[n]` citation markers.
    pub body_text: String,
    /// Ordered, de-duplicated reference list.
    pub citations: Vec<CitationEntry>,
    pub metrics: RunMetrics,
}

// ============= URL Handling =============

/// Normalize a URL for run-level deduplication: scheme + lowercased host +
/// path, query string and fragment stripped, trailing slash trimmed.
///
/// Returns `None` for unparseable or non-http(s) URLs.
pub fn normalize_url(raw: &str) -> Option<String> {
    let url = reqwest::Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    let path = url.path().trim_end_matches('/');
    Some(format!("{}://{}{}", url.scheme(), host, path))
}

/// Host of a URL with any leading `www.` stripped, lowercased.
///
/// Falls back to the raw string when the URL does not parse, so candidates
/// built from malformed search hits still group deterministically.
pub fn domain_of(raw: &str) -> String {
    match reqwest::Url::parse(raw) {
        Ok(url) => url
            .host_str()
            .map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
            .unwrap_or_else(|| raw.to_string()),
        Err(_) => raw.trim().to_ascii_lowercase(),
    }
}

// ============= Error Types =============

/// Failure of one of the two remote capabilities (`generate`, `search`) or
/// a page fetch. Transient kinds are retried once at the gateway; the rest
/// surface immediately.
#[derive(Debug, thiserror::Error)]
pub enum RemoteCallError {
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl RemoteCallError {
    /// Whether the gateway may retry this failure (once, with backoff).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::RateLimited(_))
    }
}

/// Terminal errors of a research run.
///
/// Component-local failures are absorbed into degraded-but-complete
/// results; a caller only ever sees `NoFindings` (every sub-question
/// yielded zero usable sources) or `Configuration` (at startup).
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("no findings could be gathered for query: {0}")]
    NoFindings(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, ResearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_query_and_fragment() {
        let n = normalize_url("https://Example.com/a/b?utm=x#frag").unwrap();
        assert_eq!(n, "https://example.com/a/b");
    }

    #[test]
    fn normalize_trims_trailing_slash() {
        assert_eq!(
            normalize_url("http://site.org/path/").unwrap(),
            "http://site.org/path"
        );
        // Root path collapses to the bare authority.
        assert_eq!(normalize_url("http://site.org/").unwrap(), "http://site.org");
    }

    #[test]
    fn normalize_rejects_non_http() {
        assert!(normalize_url("ftp://example.com/file").is_none());
        assert!(normalize_url("not a url").is_none());
    }

    #[test]
    fn normalize_equates_case_and_query_variants() {
        assert_eq!(
            normalize_url("https://EXAMPLE.com/Path?q=1"),
            normalize_url("https://example.com/Path"),
        );
    }

    #[test]
    fn domain_strips_www() {
        assert_eq!(domain_of("https://www.example.com/page"), "example.com");
        assert_eq!(domain_of("https://sub.example.org"), "sub.example.org");
    }

    #[test]
    fn retryable_kinds() {
        assert!(RemoteCallError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(RemoteCallError::RateLimited("429".into()).is_retryable());
        assert!(!RemoteCallError::InvalidResponse("bad json".into()).is_retryable());
        assert!(!RemoteCallError::Unavailable("503".into()).is_retryable());
    }

    #[test]
    fn source_candidate_derives_domain() {
        let c = SourceCandidate::new(
            "https://www.research.edu/papers/1",
            "Paper",
            "text",
            Uuid::new_v4(),
            Duration::from_millis(120),
        );
        assert_eq!(c.domain, "research.edu");
    }
}
