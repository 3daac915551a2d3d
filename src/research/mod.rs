//! The research pipeline.
//!
//! A fixed sequence of stateless transform stages composed by the
//! coordinator's state machine:
//!
//! ```text
//! Query -> [SubQuestion] -> [SourceCandidate] -> [ValidatedFinding] -> ResearchResult
//! ```
//!
//! Stage order never changes and no stage is revisited. Each stage owns
//! its working data exclusively; the only state shared across workers is
//! the global fetch-concurrency semaphore and the run's budget clock.

/// Run orchestration state machine.
pub mod coordinator;
/// Page fetching and readable-text extraction.
pub mod fetch;
/// Per-sub-question source gathering.
pub mod gather;
/// Query decomposition.
pub mod planner;
/// Report synthesis and citation assignment.
pub mod synthesize;
/// Cross-source validation.
pub mod validate;

pub use coordinator::ResearchCoordinator;
pub use fetch::{FetchClient, HttpFetcher, PageExtract};
pub use gather::SourceGatherer;
pub use planner::QueryPlanner;
pub use synthesize::ReportSynthesizer;
pub use validate::SourceValidator;
