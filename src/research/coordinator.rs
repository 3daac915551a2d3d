//! Run orchestration.
//!
//! Drives the fixed stage sequence
//! `Planning -> Gathering -> Validating -> Synthesizing -> Complete`,
//! with `Aborting` reachable from any non-terminal state. Transitions are
//! one-directional; no stage is revisited.
//!
//! A global wall-clock budget is checked before `Validating` and
//! `Synthesizing`. When the remaining budget cannot cover synthesis, the
//! run skips the generation call and completes degraded from the findings
//! gathered so far; partial results are always preferred to no results.
//! The only terminal error is reaching `Aborting` with nothing gathered
//! at all.

use crate::gateway::Gateway;
use crate::research::fetch::FetchClient;
use crate::research::gather::{GatherLimits, SourceGatherer};
use crate::research::planner::{PlannerBounds, QueryPlanner};
use crate::research::synthesize::ReportSynthesizer;
use crate::research::validate::SourceValidator;
use crate::types::{
    normalize_url, Query, ResearchError, ResearchResult, Result, RunMetrics, SourceCandidate,
    SubQuestion,
};
use crate::utils::config::ResearchConfig;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Token budget for the decomposition call; sub-question lists are short.
const PLANNER_MAX_TOKENS: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Planning,
    Gathering,
    Validating,
    Synthesizing,
    Aborting,
    Complete,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Planning => "planning",
            Phase::Gathering => "gathering",
            Phase::Validating => "validating",
            Phase::Synthesizing => "synthesizing",
            Phase::Aborting => "aborting",
            Phase::Complete => "complete",
        }
    }
}

/// Wall-clock budget for one run.
///
/// Shared only through `&self`; the clock and the fetch semaphore are the
/// only state visible across workers.
struct BudgetClock {
    started: Instant,
    budget: Duration,
    synthesis_reserve: Duration,
}

impl BudgetClock {
    fn start(budget: Duration, synthesis_reserve: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
            synthesis_reserve,
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.elapsed())
    }

    /// True when the remaining budget cannot cover a synthesis call.
    fn cannot_afford_synthesis(&self) -> bool {
        self.remaining() < self.synthesis_reserve
    }
}

/// Top-level entry point of the pipeline.
pub struct ResearchCoordinator {
    planner: QueryPlanner,
    gatherer: Arc<SourceGatherer>,
    validator: SourceValidator,
    synthesizer: ReportSynthesizer,
    config: ResearchConfig,
}

impl ResearchCoordinator {
    /// Wire the pipeline stages around a gateway and a page fetcher.
    pub fn new(
        gateway: Arc<Gateway>,
        fetcher: Arc<dyn FetchClient>,
        config: ResearchConfig,
    ) -> Self {
        let bounds = PlannerBounds {
            min: config.min_sub_questions,
            max: config.max_sub_questions,
        };
        let limits = GatherLimits {
            max_search_results: config.max_search_results,
            max_sources_per_query: config.max_sources_per_query,
            ..GatherLimits::default()
        };
        let fetch_permits = Arc::new(Semaphore::new(config.max_concurrent_fetches));

        Self {
            planner: QueryPlanner::new(Arc::clone(&gateway), bounds, PLANNER_MAX_TOKENS),
            gatherer: Arc::new(SourceGatherer::new(
                Arc::clone(&gateway),
                fetcher,
                limits,
                fetch_permits,
            )),
            validator: SourceValidator::default(),
            synthesizer: ReportSynthesizer::new(
                Arc::clone(&gateway),
                config.max_output_tokens,
                config.temperature,
            ),
            config,
        }
    }

    /// Run one research pass.
    ///
    /// Always returns a [`ResearchResult`] (possibly degraded) unless not
    /// a single usable source could be gathered, in which case the run
    /// aborts with [`ResearchError::NoFindings`].
    pub async fn research(
        &self,
        query_text: &str,
        num_sub_questions: Option<usize>,
    ) -> Result<ResearchResult> {
        let query = Query::new(query_text);
        let started_at = chrono::Utc::now();
        let clock = BudgetClock::start(
            self.config.global_time_budget,
            self.config.synthesis_reserve,
        );
        let mut phase = Phase::Planning;
        tracing::info!(query_id = %query.id, query = query_text, "research run started");

        let sub_questions = self.planner.plan(&query, num_sub_questions).await;
        tracing::info!(
            query_id = %query.id,
            count = sub_questions.len(),
            "decomposed into sub-questions"
        );

        transition(&mut phase, Phase::Gathering, &query);
        let candidates = self.gather_all(&sub_questions).await;
        if candidates.is_empty() {
            transition(&mut phase, Phase::Aborting, &query);
            return Err(ResearchError::NoFindings(query.text));
        }

        // Budget check before validation. Validation itself is local CPU
        // work, so it always runs; a blown budget only commits the run to
        // the degraded synthesis path.
        let mut degraded = clock.cannot_afford_synthesis();
        if degraded {
            tracing::warn!(
                query_id = %query.id,
                remaining = ?clock.remaining(),
                "budget low after gathering, synthesis will be degraded"
            );
        }

        transition(&mut phase, Phase::Validating, &query);
        let mut findings = Vec::new();
        for sub_question in &sub_questions {
            let topic_candidates: Vec<SourceCandidate> = candidates
                .iter()
                .filter(|c| c.sub_question_id == sub_question.id)
                .cloned()
                .collect();
            findings.extend(self.validator.validate(sub_question, &topic_candidates));
        }

        if findings.is_empty() {
            transition(&mut phase, Phase::Aborting, &query);
            return Err(ResearchError::NoFindings(query.text));
        }

        if !degraded && clock.cannot_afford_synthesis() {
            tracing::warn!(
                query_id = %query.id,
                remaining = ?clock.remaining(),
                "budget exhausted before synthesis, using fallback"
            );
            degraded = true;
        }

        transition(&mut phase, Phase::Synthesizing, &query);
        let outcome = if degraded {
            self.synthesizer
                .fallback(&query, &sub_questions, &findings, &candidates)
        } else {
            self.synthesizer
                .synthesize(&query, &sub_questions, &findings, &candidates)
                .await
        };

        transition(&mut phase, Phase::Complete, &query);
        let metrics = RunMetrics {
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
            source_count: candidates.len(),
            sub_question_count: sub_questions.len(),
            degraded: degraded || outcome.degraded,
        };
        tracing::info!(
            query_id = %query.id,
            elapsed_ms = metrics.elapsed_ms,
            sources = metrics.source_count,
            citations = outcome.citations.len(),
            degraded = metrics.degraded,
            "research run complete"
        );

        Ok(ResearchResult {
            body_text: outcome.body_text,
            citations: outcome.citations,
            metrics,
        })
    }

    /// Fan out gathering across sub-questions, fan in re-sorted by
    /// creation order, and deduplicate by normalized URL (first
    /// sub-question wins).
    async fn gather_all(&self, sub_questions: &[SubQuestion]) -> Vec<SourceCandidate> {
        let mut workers = JoinSet::new();
        for (index, sub_question) in sub_questions.iter().cloned().enumerate() {
            let gatherer = Arc::clone(&self.gatherer);
            workers.spawn(async move { (index, gatherer.gather(&sub_question).await) });
        }

        let mut batches: Vec<(usize, Vec<SourceCandidate>)> = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(batch) => batches.push(batch),
                Err(err) => tracing::warn!(error = %err, "gather worker failed"),
            }
        }
        batches.sort_by_key(|(index, _)| *index);

        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates = Vec::new();
        for (_, batch) in batches {
            for candidate in batch {
                let key =
                    normalize_url(&candidate.url).unwrap_or_else(|| candidate.url.clone());
                if seen.insert(key) {
                    candidates.push(candidate);
                } else {
                    tracing::debug!(url = %candidate.url, "dropping duplicate candidate");
                }
            }
        }
        candidates
    }
}

fn transition(phase: &mut Phase, next: Phase, query: &Query) {
    tracing::info!(
        query_id = %query.id,
        from = phase.as_str(),
        to = next.as_str(),
        "phase transition"
    );
    *phase = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_clock_counts_down() {
        let clock = BudgetClock::start(Duration::from_secs(120), Duration::from_secs(20));
        assert!(clock.remaining() <= Duration::from_secs(120));
        assert!(!clock.cannot_afford_synthesis());
    }

    #[test]
    fn exhausted_clock_cannot_afford_synthesis() {
        let clock = BudgetClock::start(Duration::ZERO, Duration::from_secs(20));
        assert_eq!(clock.remaining(), Duration::ZERO);
        assert!(clock.cannot_afford_synthesis());
    }

    #[test]
    fn phase_names() {
        assert_eq!(Phase::Planning.as_str(), "planning");
        assert_eq!(Phase::Complete.as_str(), "complete");
    }
}
