//! Mock gateway backends and fetchers for testing.
//!
//! These mocks let pipeline tests run without any network dependency.
//! `MockGenerate` is scripted: each call pops the next outcome, so tests
//! can make the planner succeed while synthesis times out, exercise the
//! retry budget, and so on.

use async_trait::async_trait;
use sift::research::fetch::{FetchClient, PageExtract};
use sift::{
    GenerateClient, Gateway, RemoteCallError, ResearchConfig, ResearchCoordinator, RetryPolicy,
    SearchClient, SearchHit,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type GenerateOutcome = Result<String, RemoteCallError>;

/// Scripted generation backend: pops one outcome per call.
pub struct MockGenerate {
    script: Mutex<VecDeque<GenerateOutcome>>,
    calls: Arc<AtomicUsize>,
}

impl MockGenerate {
    pub fn scripted(outcomes: Vec<GenerateOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle to the call counter, usable after the mock is boxed.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl GenerateClient for MockGenerate {
    async fn generate(
        &self,
        _prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, RemoteCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(RemoteCallError::Unavailable("script exhausted".into())))
    }
}

/// Search backend returning a fixed hit list (or always failing).
pub struct MockSearch {
    hits: Vec<SearchHit>,
    fail: bool,
}

impl MockSearch {
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self { hits, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            hits: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl SearchClient for MockSearch {
    async fn search(
        &self,
        _query_text: &str,
        result_count: usize,
    ) -> Result<Vec<SearchHit>, RemoteCallError> {
        if self.fail {
            return Err(RemoteCallError::Unavailable("search down".into()));
        }
        Ok(self.hits.iter().take(result_count).cloned().collect())
    }
}

/// Fetcher serving pages from an in-memory map.
pub struct MockFetch {
    pages: HashMap<String, String>,
    fail_all: bool,
}

impl MockFetch {
    pub fn with_pages(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, text)| (url.to_string(), text.to_string()))
                .collect(),
            fail_all: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            pages: HashMap::new(),
            fail_all: true,
        }
    }
}

#[async_trait]
impl FetchClient for MockFetch {
    async fn fetch(&self, url: &str) -> Result<PageExtract, RemoteCallError> {
        if self.fail_all {
            return Err(RemoteCallError::Unavailable("fetch down".into()));
        }
        match self.pages.get(url) {
            Some(text) => Ok(PageExtract {
                url: url.to_string(),
                title: Some(format!("Page at {url}")),
                text: text.clone(),
                latency: Duration::from_millis(5),
            }),
            None => Err(RemoteCallError::Unavailable(format!("no page for {url}"))),
        }
    }
}

pub fn hit(url: &str, title: &str) -> SearchHit {
    SearchHit {
        url: url.to_string(),
        title: title.to_string(),
        snippet: String::new(),
    }
}

/// Pipeline config tuned for fast tests.
pub fn test_config() -> ResearchConfig {
    ResearchConfig {
        global_time_budget: Duration::from_secs(60),
        synthesis_reserve: Duration::from_millis(10),
        ..ResearchConfig::default()
    }
}

/// Wire a coordinator around mock backends with a fast retry policy.
pub fn coordinator(
    generate: MockGenerate,
    search: MockSearch,
    fetch: MockFetch,
    config: ResearchConfig,
) -> ResearchCoordinator {
    let policy = RetryPolicy {
        call_timeout: Duration::from_millis(500),
        backoff: Duration::from_millis(1),
    };
    let gateway = Arc::new(Gateway::new(Box::new(generate), Box::new(search), policy));
    ResearchCoordinator::new(gateway, Arc::new(fetch), config)
}
