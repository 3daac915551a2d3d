//! # SIFT - Cited Research Pipeline
//!
//! Given a natural-language query, SIFT decomposes it into focused
//! sub-questions, gathers and validates web evidence concurrently, and
//! synthesizes an evidence-backed markdown report with a stable,
//! first-referenced-first citation list, all under a strict global time
//! budget.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sift::{build_gateway, Config, HttpFetcher, ResearchCoordinator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let gateway = Arc::new(build_gateway(&config.gateway)?);
//!     let fetcher = Arc::new(HttpFetcher::new(
//!         config.research.fetch_timeout,
//!         config.research.extract_char_limit,
//!     )?);
//!
//!     let coordinator = ResearchCoordinator::new(gateway, fetcher, config.research);
//!     let result = coordinator
//!         .research("What is artificial intelligence?", None)
//!         .await?;
//!
//!     println!("{}", result.body_text);
//!     for citation in &result.citations {
//!         println!("[{}] {}", citation.index, citation.url);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! A fixed sequence of stateless stages composed by the coordinator's
//! state machine, with no dynamic dispatch between stages:
//!
//! 1. **Planner** - one `generate` call decomposes the query (2-N
//!    sub-questions, never fails the run)
//! 2. **Gatherer** - bounded concurrent search + fetch per sub-question
//! 3. **Validator** - local cross-source claim grouping and scoring
//! 4. **Synthesizer** - at most one `generate` call, citation-tracked,
//!    with a templated fallback
//!
//! Every remote call runs under a per-call timeout with at most one retry;
//! a global wall-clock budget degrades the run instead of failing it.
//!
//! ## Modules
//!
//! - [`gateway`] - remote call gateway (generate, search)
//! - [`research`] - the pipeline stages and coordinator
//! - [`types`] - data model and error taxonomy
//! - [`utils`] - environment-driven configuration

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line interface for the `sift` binary.
pub mod cli;
/// Remote call gateway (generate, search) with timeout and retry policy.
pub mod gateway;
/// Pipeline stages and run orchestration.
pub mod research;
/// Core types (entities, results, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use gateway::{
    build_gateway, Gateway, GenerateClient, RetryPolicy, SearchClient, SearchHit, SerperSearch,
};
pub use research::{
    FetchClient, HttpFetcher, PageExtract, QueryPlanner, ReportSynthesizer, ResearchCoordinator,
    SourceGatherer, SourceValidator,
};
pub use types::{
    CitationEntry, Query, RemoteCallError, ResearchError, ResearchResult, Result, RunMetrics,
    SourceCandidate, SubQuestion, ValidatedFinding,
};
pub use utils::config::{Config, GatewayConfig, ResearchConfig};
