//! Gateway core: backend traits, retry policy, and the timeout wrapper.

use crate::types::RemoteCallError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// One result row returned by the search capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// Text-generation backend.
#[async_trait]
pub trait GenerateClient: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> std::result::Result<String, RemoteCallError>;
}

/// Web-search backend.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Return up to `result_count` hits for `query_text`, engine-ordered.
    async fn search(
        &self,
        query_text: &str,
        result_count: usize,
    ) -> std::result::Result<Vec<SearchHit>, RemoteCallError>;
}

/// Per-call timeout and single-retry backoff applied to every remote call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Upper bound on a single backend call.
    pub call_timeout: Duration,
    /// Sleep between the first failure and the one retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            backoff: Duration::from_millis(500),
        }
    }
}

/// Uniform entry point for the two remote capabilities.
///
/// Owns the backends and applies the timeout/retry policy uniformly. No
/// caller-visible side effects besides the network call itself.
pub struct Gateway {
    generate: Box<dyn GenerateClient>,
    search: Box<dyn SearchClient>,
    policy: RetryPolicy,
}

impl Gateway {
    pub fn new(
        generate: Box<dyn GenerateClient>,
        search: Box<dyn SearchClient>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            generate,
            search,
            policy,
        }
    }

    /// Generate text, with per-call timeout and at most one retry.
    pub async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> std::result::Result<String, RemoteCallError> {
        self.call("generate", || {
            self.generate.generate(prompt, max_tokens, temperature)
        })
        .await
    }

    /// Search the web, with per-call timeout and at most one retry.
    pub async fn search(
        &self,
        query_text: &str,
        result_count: usize,
    ) -> std::result::Result<Vec<SearchHit>, RemoteCallError> {
        self.call("search", || self.search.search(query_text, result_count))
            .await
    }

    async fn call<T, F, Fut>(
        &self,
        label: &str,
        mut op: F,
    ) -> std::result::Result<T, RemoteCallError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RemoteCallError>>,
    {
        let mut attempt = 0u8;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.policy.call_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(RemoteCallError::Timeout(self.policy.call_timeout)),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if attempt == 1 && err.is_retryable() => {
                    tracing::warn!(call = label, error = %err, "remote call failed, retrying once");
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(err) => {
                    tracing::warn!(call = label, error = %err, attempt, "remote call failed");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FlakySearch {
        calls: Arc<AtomicUsize>,
        failures_before_success: usize,
        error_kind: fn() -> RemoteCallError,
    }

    #[async_trait]
    impl SearchClient for FlakySearch {
        async fn search(
            &self,
            _query_text: &str,
            _result_count: usize,
        ) -> std::result::Result<Vec<SearchHit>, RemoteCallError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_success {
                Err((self.error_kind)())
            } else {
                Ok(vec![SearchHit {
                    url: "https://example.com/a".into(),
                    title: "A".into(),
                    snippet: "snippet".into(),
                }])
            }
        }
    }

    struct NoopGenerate;

    #[async_trait]
    impl GenerateClient for NoopGenerate {
        async fn generate(
            &self,
            _prompt: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> std::result::Result<String, RemoteCallError> {
            Ok(String::new())
        }
    }

    struct SlowGenerate;

    #[async_trait]
    impl GenerateClient for SlowGenerate {
        async fn generate(
            &self,
            _prompt: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> std::result::Result<String, RemoteCallError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            call_timeout: Duration::from_millis(50),
            backoff: Duration::from_millis(1),
        }
    }

    fn gateway_with_search(search: FlakySearch) -> Gateway {
        Gateway::new(Box::new(NoopGenerate), Box::new(search), fast_policy())
    }

    #[tokio::test]
    async fn rate_limited_is_retried_once_then_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gateway = gateway_with_search(FlakySearch {
            calls: Arc::clone(&calls),
            failures_before_success: 1,
            error_kind: || RemoteCallError::RateLimited("429".into()),
        });

        let hits = gateway.search("q", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_failure_surfaces_without_further_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gateway = gateway_with_search(FlakySearch {
            calls: Arc::clone(&calls),
            failures_before_success: 5,
            error_kind: || RemoteCallError::RateLimited("429".into()),
        });

        let err = gateway.search("q", 5).await.unwrap_err();
        assert!(matches!(err, RemoteCallError::RateLimited(_)));
        // One initial call plus exactly one retry, never more.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_errors_surface_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gateway = gateway_with_search(FlakySearch {
            calls: Arc::clone(&calls),
            failures_before_success: 5,
            error_kind: || RemoteCallError::InvalidResponse("bad json".into()),
        });

        let err = gateway.search("q", 5).await.unwrap_err();
        assert!(matches!(err, RemoteCallError::InvalidResponse(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_backend_times_out_on_both_attempts() {
        let gateway = Gateway::new(
            Box::new(SlowGenerate),
            Box::new(FlakySearch {
                calls: Arc::new(AtomicUsize::new(0)),
                failures_before_success: 0,
                error_kind: || RemoteCallError::Unavailable("unused".into()),
            }),
            fast_policy(),
        );

        let err = gateway.generate("p", 100, 0.3).await.unwrap_err();
        assert!(matches!(err, RemoteCallError::Timeout(_)));
    }
}
