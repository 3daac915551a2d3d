//! Per-sub-question source gathering.
//!
//! One bounded search per sub-question, then concurrent page fetches for
//! the top-ranked URLs under the run's global fetch semaphore. Per-URL
//! failures are logged and skipped; a sub-question that yields nothing
//! simply contributes no candidates.

use crate::gateway::{Gateway, SearchHit};
use crate::research::fetch::FetchClient;
use crate::types::{domain_of, SourceCandidate, SubQuestion};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Tunables for one gathering pass.
#[derive(Debug, Clone)]
pub struct GatherLimits {
    /// Results requested from the search engine.
    pub max_search_results: usize,
    /// Pages actually fetched per sub-question.
    pub max_sources_per_query: usize,
    /// Shortest extract accepted before falling back to the search snippet.
    pub min_extract_chars: usize,
}

impl Default for GatherLimits {
    fn default() -> Self {
        Self {
            max_search_results: 6,
            max_sources_per_query: 3,
            min_extract_chars: 80,
        }
    }
}

/// Gathers source candidates for one sub-question at a time.
pub struct SourceGatherer {
    gateway: Arc<Gateway>,
    fetcher: Arc<dyn FetchClient>,
    limits: GatherLimits,
    /// Global cap on concurrent outbound fetches, shared across all
    /// sub-question workers.
    fetch_permits: Arc<Semaphore>,
}

impl SourceGatherer {
    pub fn new(
        gateway: Arc<Gateway>,
        fetcher: Arc<dyn FetchClient>,
        limits: GatherLimits,
        fetch_permits: Arc<Semaphore>,
    ) -> Self {
        Self {
            gateway,
            fetcher,
            limits,
            fetch_permits,
        }
    }

    /// Search, rank, and fetch sources for `sub_question`.
    ///
    /// Never fails: search errors and per-URL extraction failures degrade
    /// to an empty or smaller candidate set.
    pub async fn gather(&self, sub_question: &SubQuestion) -> Vec<SourceCandidate> {
        let query = clean_search_query(&sub_question.text);

        let hits = match self
            .gateway
            .search(&query, self.limits.max_search_results)
            .await
        {
            Ok(hits) => hits,
            Err(err) => {
                tracing::warn!(
                    sub_question = %sub_question.text,
                    error = %err,
                    "search failed, sub-question yields no candidates"
                );
                return Vec::new();
            }
        };

        let targets: Vec<SearchHit> = rank_hits(hits)
            .into_iter()
            .take(self.limits.max_sources_per_query)
            .collect();

        tracing::debug!(
            sub_question = %sub_question.text,
            targets = targets.len(),
            "fetching top-ranked sources"
        );

        let fetches = targets.into_iter().map(|hit| self.fetch_candidate(hit, sub_question.id));
        let results = futures::future::join_all(fetches).await;

        results.into_iter().flatten().collect()
    }

    async fn fetch_candidate(
        &self,
        hit: SearchHit,
        sub_question_id: uuid::Uuid,
    ) -> Option<SourceCandidate> {
        // Closed semaphores cannot occur here; the permit just bounds
        // global fetch concurrency.
        let _permit = self.fetch_permits.acquire().await.ok()?;

        match self.fetcher.fetch(&hit.url).await {
            Ok(extract) => {
                // Thin pages fall back to the search snippet, which is
                // still attributable evidence.
                let text = if extract.text.len() >= self.limits.min_extract_chars {
                    extract.text
                } else if !hit.snippet.is_empty() {
                    hit.snippet.clone()
                } else {
                    tracing::warn!(url = %hit.url, "extract too thin and no snippet, skipping");
                    return None;
                };

                let title = extract
                    .title
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| hit.title.clone());

                Some(SourceCandidate::new(
                    hit.url,
                    title,
                    text,
                    sub_question_id,
                    extract.latency,
                ))
            }
            Err(err) => {
                tracing::warn!(url = %hit.url, error = %err, "fetch failed, skipping candidate");
                None
            }
        }
    }
}

/// Clean a sub-question into a search query: cap the word count and strip
/// quoting/grouping characters that confuse search operators.
pub(crate) fn clean_search_query(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '"' | '(' | ')'))
        .collect();

    cleaned
        .split_whitespace()
        .take(12)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Re-rank search hits: engine order is the primary signal; distinct
/// domains are preferred over repeats, and among repeats quality domains
/// (edu/org/gov) go first.
pub(crate) fn rank_hits(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut seen_domains: HashSet<String> = HashSet::new();
    let mut primary: Vec<SearchHit> = Vec::new();
    let mut repeats: Vec<SearchHit> = Vec::new();

    for hit in hits {
        let domain = domain_of(&hit.url);
        if seen_domains.insert(domain) {
            primary.push(hit);
        } else {
            repeats.push(hit);
        }
    }

    // Stable: equal keys keep engine order.
    repeats.sort_by_key(|hit| !is_quality_domain(&domain_of(&hit.url)));

    primary.extend(repeats);
    primary
}

fn is_quality_domain(domain: &str) -> bool {
    domain.ends_with(".edu") || domain.ends_with(".org") || domain.ends_with(".gov")
}
