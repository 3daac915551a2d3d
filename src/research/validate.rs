//! Cross-source validation.
//!
//! Pure CPU stage: no remote calls. Candidate extracts are split into
//! claim sentences, claims are grouped across sources by token overlap,
//! and each group becomes one [`ValidatedFinding`]. Confidence rises with
//! the number of distinct corroborating domains first and total
//! supporting pages second, so a claim backed by three domains always
//! outranks one backed by three pages of the same domain.
//!
//! The exact scoring formula is a tunable policy, not a contract; the
//! invariants that hold regardless are: every finding has at least one
//! supporting source, and adding a corroborating source never lowers
//! confidence.

use crate::types::{SourceCandidate, SubQuestion, ValidatedFinding};
use std::collections::{BTreeSet, HashSet};

/// Groups overlapping claims and scores their corroboration.
pub struct SourceValidator {
    /// Jaccard threshold above which two claims merge into one group.
    min_similarity: f64,
    /// Claims considered per candidate; extracts are ranked by position.
    max_claims_per_source: usize,
}

impl Default for SourceValidator {
    fn default() -> Self {
        Self {
            min_similarity: 0.35,
            max_claims_per_source: 5,
        }
    }
}

struct ClaimGroup {
    representative: String,
    tokens: HashSet<String>,
    supporting: BTreeSet<uuid::Uuid>,
    domains: HashSet<String>,
}

impl SourceValidator {
    pub fn new(min_similarity: f64, max_claims_per_source: usize) -> Self {
        Self {
            min_similarity,
            max_claims_per_source,
        }
    }

    /// Validate all candidates gathered for one sub-question.
    ///
    /// Candidates contributing no extractable claim are dropped silently
    /// and can never be cited. Output is sorted by confidence, highest
    /// first.
    pub fn validate(
        &self,
        sub_question: &SubQuestion,
        candidates: &[SourceCandidate],
    ) -> Vec<ValidatedFinding> {
        let keywords = significant_terms(&sub_question.text);
        let mut groups: Vec<ClaimGroup> = Vec::new();

        for candidate in candidates {
            let claims = claim_sentences(&candidate.raw_extract, &keywords, self.max_claims_per_source);
            if claims.is_empty() {
                tracing::debug!(url = %candidate.url, "candidate contributed no claims");
                continue;
            }

            for claim in claims {
                let tokens = token_set(&claim);
                match groups
                    .iter_mut()
                    .find(|g| jaccard(&g.tokens, &tokens) >= self.min_similarity)
                {
                    Some(group) => {
                        group.supporting.insert(candidate.id);
                        group.domains.insert(candidate.domain.clone());
                        // Keep the most informative phrasing as the face
                        // of the group.
                        if claim.len() > group.representative.len() {
                            group.representative = claim;
                        }
                    }
                    None => groups.push(ClaimGroup {
                        representative: claim,
                        tokens,
                        supporting: BTreeSet::from([candidate.id]),
                        domains: HashSet::from([candidate.domain.clone()]),
                    }),
                }
            }
        }

        let mut findings: Vec<ValidatedFinding> = groups
            .into_iter()
            .map(|group| ValidatedFinding {
                claim_text: group.representative,
                confidence: confidence(group.domains.len(), group.supporting.len()),
                supporting_source_ids: group.supporting,
                sub_question_id: sub_question.id,
            })
            .collect();

        findings.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        findings
    }
}

/// Corroboration score in `[0, 1]`.
///
/// Distinct domains dominate; extra pages from already-seen domains add a
/// small secondary bump. Both terms saturate, keeping the score bounded
/// and monotone in either direction of growth.
fn confidence(distinct_domains: usize, supporting_sources: usize) -> f64 {
    debug_assert!(distinct_domains >= 1 && supporting_sources >= distinct_domains);
    let domain_term = 0.17 * (distinct_domains.min(4).saturating_sub(1)) as f64;
    let page_term = 0.04 * (supporting_sources - distinct_domains).min(3) as f64;
    (0.45 + domain_term + page_term).min(0.95)
}

/// Sentences of `extract` that look like standalone, on-topic claims.
fn claim_sentences(extract: &str, keywords: &HashSet<String>, cap: usize) -> Vec<String> {
    split_sentences(extract)
        .into_iter()
        .filter(|s| (40..=300).contains(&s.len()))
        .filter(|s| {
            if keywords.is_empty() {
                return true;
            }
            let lowered = s.to_lowercase();
            keywords.iter().any(|k| lowered.contains(k))
        })
        .take(cap)
        .collect()
}

fn split_sentences(text: &str) -> Vec<String> {
    text.split_inclusive(['.', '?', '!'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Lowercased terms of four or more letters; short function words carry
/// no grouping signal.
fn significant_terms(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.len() >= 4)
        .collect()
}

fn token_set(text: &str) -> HashSet<String> {
    significant_terms(text)
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}
