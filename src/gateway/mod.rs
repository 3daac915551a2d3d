//! Remote call gateway.
//!
//! Uniform interface to the two external capabilities the pipeline depends
//! on: text generation and web search. Both are invoked under an explicit
//! per-call timeout; on `Timeout` or `RateLimited` the gateway performs at
//! most one retry with backoff before surfacing the error upward. Retries
//! are never silent beyond that bound.
//!
//! Backends live behind [`client::GenerateClient`] and
//! [`client::SearchClient`] so tests can substitute mocks without touching
//! the network.

/// Gateway core: traits, retry policy, timeout wrapper.
pub mod client;
/// Text generation backed by an OpenAI-compatible chat completions API.
pub mod openai;
/// Web search backed by the Serper API.
pub mod serper;

pub use client::{Gateway, GenerateClient, RetryPolicy, SearchClient, SearchHit};
pub use openai::OpenAiGenerate;
pub use serper::SerperSearch;

use crate::utils::config::GatewayConfig;

/// Build the production gateway (OpenAI generation + Serper search) from
/// configuration. Fails when either API key is missing.
pub fn build_gateway(config: &GatewayConfig) -> crate::types::Result<Gateway> {
    let openai_key = config.require_openai_key()?.to_string();
    let serper_key = config.require_serper_key()?.to_string();

    let generate = OpenAiGenerate::new(
        openai_key,
        config.openai_api_base.clone(),
        config.model.clone(),
    );
    let search = SerperSearch::new(serper_key, config.serper_url.clone());
    let policy = RetryPolicy {
        call_timeout: config.call_timeout,
        backoff: config.retry_backoff,
    };

    Ok(Gateway::new(Box::new(generate), Box::new(search), policy))
}
