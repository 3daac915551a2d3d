//! Query decomposition.
//!
//! One `generate` call turns the user query into a bounded, ordered set of
//! focused sub-questions. Decomposition must never fail the run: when the
//! model's output does not parse down to the minimum count, the planner
//! falls back to a single synthetic sub-question equal to the original
//! query.

use crate::gateway::Gateway;
use crate::types::{Query, SubQuestion};
use regex::Regex;
use std::sync::{Arc, LazyLock};

static JSON_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[\s\S]*?\]").expect("valid regex literal"));

/// Inclusive bounds on the sub-question count for a run.
#[derive(Debug, Clone, Copy)]
pub struct PlannerBounds {
    pub min: usize,
    pub max: usize,
}

/// Decomposes one query into 2..=N sub-questions.
pub struct QueryPlanner {
    gateway: Arc<Gateway>,
    bounds: PlannerBounds,
    max_tokens: u32,
}

impl QueryPlanner {
    pub fn new(gateway: Arc<Gateway>, bounds: PlannerBounds, max_tokens: u32) -> Self {
        Self {
            gateway,
            bounds,
            max_tokens,
        }
    }

    /// Decompose `query`, honoring an optional caller-requested count
    /// (clamped into the configured bounds). Always returns at least one
    /// sub-question.
    pub async fn plan(&self, query: &Query, requested: Option<usize>) -> Vec<SubQuestion> {
        let target = requested
            .unwrap_or(self.bounds.max)
            .clamp(self.bounds.min, self.bounds.max);

        let prompt = decomposition_prompt(&query.text, target);

        // Low temperature keeps the decomposition close to the query.
        let texts = match self.gateway.generate(&prompt, self.max_tokens, 0.2).await {
            Ok(response) => {
                let parsed = parse_sub_questions(&response);
                if parsed.len() >= self.bounds.min {
                    parsed.into_iter().take(target).collect()
                } else {
                    tracing::warn!(
                        parsed = parsed.len(),
                        min = self.bounds.min,
                        "decomposition below minimum, using the query verbatim"
                    );
                    vec![query.text.clone()]
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "decomposition call failed, using the query verbatim");
                vec![query.text.clone()]
            }
        };

        texts
            .into_iter()
            .map(|text| SubQuestion::new(text, query.id))
            .collect()
    }
}

fn decomposition_prompt(query: &str, count: usize) -> String {
    format!(
        r#"Break down this research query into {count} focused, web-searchable sub-questions.

QUERY: "{query}"

Each sub-question must be specific, factual, and answerable from web sources.
Together they should cover the full scope of the query without overlap.

Return ONLY a JSON array of strings:
["sub-question 1", "sub-question 2"]"#
    )
}

/// Parse the model's decomposition output.
///
/// Primary path: first JSON array in the response. Fallback: quoted or
/// bulleted/numbered lines. Blank and trivially short entries are dropped.
fn parse_sub_questions(response: &str) -> Vec<String> {
    if let Some(questions) = parse_json_array(response) {
        return questions;
    }

    response
        .lines()
        .filter_map(parse_list_line)
        .filter(|line| line.len() > 8)
        .collect()
}

fn parse_json_array(response: &str) -> Option<Vec<String>> {
    // The array may be wrapped in prose or a code fence.
    let array = JSON_ARRAY.find(response)?.as_str();

    let parsed: Vec<String> = serde_json::from_str(array).ok()?;
    let cleaned: Vec<String> = parsed
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| q.len() > 8)
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn parse_list_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(rest) = trimmed.strip_prefix("- ") {
        return Some(rest.trim_matches('"').to_string());
    }

    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() > 2 {
        return Some(trimmed[1..trimmed.len() - 1].to_string());
    }

    // Numbered list: "1. question" / "2) question"
    let stripped = trimmed
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches(['.', ')'])
        .trim();
    if stripped.len() < trimmed.len() && !stripped.is_empty() {
        return Some(stripped.trim_matches('"').to_string());
    }

    None
}
