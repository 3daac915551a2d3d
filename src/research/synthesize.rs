//! Report synthesis and citation assignment.
//!
//! Findings are serialized into a grounding context with stable source
//! tags (`[S1]`, `[S2]`, ...), one `generate` call produces the prose
//! body, and the tags referenced in the returned text are rewritten into
//! 1-based citation indices in first-reference order. The citation list
//! is built strictly from sources the body actually references, so unused
//! candidates can never be cited.
//!
//! When generation fails after the gateway's retry (or the run budget
//! forces it), synthesis degrades to a templated concatenation of the
//! highest-confidence findings per sub-question, which flows through the
//! same citation path.

use crate::gateway::Gateway;
use crate::types::{CitationEntry, Query, SourceCandidate, SubQuestion, ValidatedFinding};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

static SOURCE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[S(\d+)\]").expect("valid regex literal"));

/// Findings shown per sub-question in the degraded template.
const FALLBACK_FINDINGS_PER_TOPIC: usize = 3;

/// Body text plus the citation list derived from it.
#[derive(Debug)]
pub struct SynthesisOutcome {
    pub body_text: String,
    pub citations: Vec<CitationEntry>,
    /// True when the templated fallback produced the body.
    pub degraded: bool,
}

/// Merges validated findings into a cited markdown report.
pub struct ReportSynthesizer {
    gateway: Arc<Gateway>,
    max_tokens: u32,
    temperature: f32,
}

impl ReportSynthesizer {
    pub fn new(gateway: Arc<Gateway>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            gateway,
            max_tokens,
            temperature,
        }
    }

    /// Synthesize the report, degrading to the template on failure.
    ///
    /// At most one `generate` call is made.
    pub async fn synthesize(
        &self,
        query: &Query,
        sub_questions: &[SubQuestion],
        findings: &[ValidatedFinding],
        candidates: &[SourceCandidate],
    ) -> SynthesisOutcome {
        let tags = SourceTags::build(sub_questions, findings);
        let by_id = index_candidates(candidates);
        let prompt = synthesis_prompt(query, sub_questions, findings, &tags, &by_id);

        match self
            .gateway
            .generate(&prompt, self.max_tokens, self.temperature)
            .await
        {
            Ok(body) => {
                let (body_text, citations) = finalize_report(&body, &tags, &by_id);
                SynthesisOutcome {
                    body_text,
                    citations,
                    degraded: false,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "synthesis call failed, using templated fallback");
                self.fallback(query, sub_questions, findings, candidates)
            }
        }
    }

    /// Templated report from the highest-confidence findings, no remote
    /// calls. Used on generation failure and on budget exhaustion.
    pub fn fallback(
        &self,
        query: &Query,
        sub_questions: &[SubQuestion],
        findings: &[ValidatedFinding],
        candidates: &[SourceCandidate],
    ) -> SynthesisOutcome {
        let tags = SourceTags::build(sub_questions, findings);
        let by_id = index_candidates(candidates);

        let mut body = format!("# {}\n\n", query.text);
        body.push_str(
            "_Compiled directly from validated findings; narrative synthesis was unavailable._\n",
        );

        for sub_question in sub_questions {
            let topic_findings: Vec<&ValidatedFinding> = findings
                .iter()
                .filter(|f| f.sub_question_id == sub_question.id)
                .take(FALLBACK_FINDINGS_PER_TOPIC)
                .collect();

            if topic_findings.is_empty() {
                continue;
            }

            body.push_str(&format!("\n## {}\n\n", sub_question.text));
            for finding in topic_findings {
                let markers: String = finding
                    .supporting_source_ids
                    .iter()
                    .filter_map(|id| tags.tag_for(id))
                    .map(|n| format!("[S{n}]"))
                    .collect();
                body.push_str(&format!("- {} {}\n", finding.claim_text.trim(), markers));
            }
        }

        let (body_text, citations) = finalize_report(&body, &tags, &by_id);
        SynthesisOutcome {
            body_text,
            citations,
            degraded: true,
        }
    }
}

/// Stable source tags assigned to every candidate supporting at least one
/// finding, in first-use order (sub-question order, then confidence order
/// within each sub-question).
struct SourceTags {
    ordered: Vec<Uuid>,
    numbers: HashMap<Uuid, usize>,
}

impl SourceTags {
    fn build(sub_questions: &[SubQuestion], findings: &[ValidatedFinding]) -> Self {
        let mut ordered = Vec::new();
        let mut numbers = HashMap::new();

        for sub_question in sub_questions {
            for finding in findings.iter().filter(|f| f.sub_question_id == sub_question.id) {
                for id in &finding.supporting_source_ids {
                    numbers.entry(*id).or_insert_with(|| {
                        ordered.push(*id);
                        ordered.len()
                    });
                }
            }
        }

        Self { ordered, numbers }
    }

    fn tag_for(&self, id: &Uuid) -> Option<usize> {
        self.numbers.get(id).copied()
    }

    fn candidate_for_tag(&self, tag: usize) -> Option<Uuid> {
        tag.checked_sub(1).and_then(|i| self.ordered.get(i)).copied()
    }
}

fn index_candidates(candidates: &[SourceCandidate]) -> HashMap<Uuid, &SourceCandidate> {
    candidates.iter().map(|c| (c.id, c)).collect()
}

fn synthesis_prompt(
    query: &Query,
    sub_questions: &[SubQuestion],
    findings: &[ValidatedFinding],
    tags: &SourceTags,
    by_id: &HashMap<Uuid, &SourceCandidate>,
) -> String {
    let mut grounding = String::new();
    for sub_question in sub_questions {
        let topic_findings: Vec<&ValidatedFinding> = findings
            .iter()
            .filter(|f| f.sub_question_id == sub_question.id)
            .collect();
        if topic_findings.is_empty() {
            continue;
        }

        grounding.push_str(&format!("### {}\n", sub_question.text));
        for finding in topic_findings {
            let markers: String = finding
                .supporting_source_ids
                .iter()
                .filter_map(|id| tags.tag_for(id))
                .map(|n| format!("[S{n}]"))
                .collect();
            grounding.push_str(&format!(
                "- ({:.2}) {} {}\n",
                finding.confidence,
                finding.claim_text.trim(),
                markers
            ));
        }
        grounding.push('\n');
    }

    let mut sources = String::new();
    for (i, id) in tags.ordered.iter().enumerate() {
        if let Some(candidate) = by_id.get(id) {
            sources.push_str(&format!(
                "[S{}] {} — {}\n",
                i + 1,
                candidate.title,
                candidate.url
            ));
        }
    }

    format!(
        r###"Write an evidence-backed research report in Markdown answering: "{query}"

VALIDATED FINDINGS (grouped by topic, confidence in parentheses):

{grounding}SOURCES:

{sources}
REQUIREMENTS:
1. Structure: a title, an "## Executive Summary", one section per topic in the order given, and a short "## Conclusion".
2. Cite every factual statement with the bracketed source tags exactly as given, e.g. [S2]. A statement may carry several tags.
3. Use only the findings and sources above. Do not invent sources or tags.
4. Do not add a source list; the reference list is generated separately."###,
        query = query.text,
    )
}

/// Rewrite source tags into 1-based citation indices assigned in
/// first-reference order, and build the matching citation list.
///
/// Tags that do not resolve to a tagged source are stripped, which
/// enforces "no phantom citations".
fn finalize_report(
    body: &str,
    tags: &SourceTags,
    by_id: &HashMap<Uuid, &SourceCandidate>,
) -> (String, Vec<CitationEntry>) {
    let mut first_referenced: Vec<Uuid> = Vec::new();
    let mut assigned: HashMap<Uuid, usize> = HashMap::new();

    let rewritten = SOURCE_TAG.replace_all(body, |caps: &Captures| {
        let resolved = caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|tag| tags.candidate_for_tag(tag))
            .filter(|id| by_id.contains_key(id));

        match resolved {
            Some(id) => {
                let index = *assigned.entry(id).or_insert_with(|| {
                    first_referenced.push(id);
                    first_referenced.len()
                });
                format!("[{index}]")
            }
            None => String::new(),
        }
    });

    let citations = first_referenced
        .iter()
        .enumerate()
        .filter_map(|(i, id)| {
            by_id.get(id).map(|candidate| CitationEntry {
                index: i + 1,
                url: candidate.url.clone(),
                title: candidate.title.clone(),
                domain: candidate.domain.clone(),
            })
        })
        .collect();

    (rewritten.into_owned(), citations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn candidate(url: &str) -> SourceCandidate {
        SourceCandidate::new(url, "Title", "extract", Uuid::new_v4(), Duration::ZERO)
    }

    fn finding(sq: Uuid, sources: &[Uuid], confidence: f64) -> ValidatedFinding {
        ValidatedFinding {
            claim_text: "A well supported claim about the topic at hand.".into(),
            supporting_source_ids: BTreeSet::from_iter(sources.iter().copied()),
            confidence,
            sub_question_id: sq,
        }
    }

    fn fixture() -> (Vec<SubQuestion>, Vec<ValidatedFinding>, Vec<SourceCandidate>) {
        let query_id = Uuid::new_v4();
        let sq = SubQuestion::new("topic one", query_id);
        let a = candidate("https://a.com/1");
        let b = candidate("https://b.org/2");
        // The first finding pins tag S1 to `a`; the second then assigns
        // S2 to `b`, keeping tag order deterministic for the assertions.
        let findings = vec![
            finding(sq.id, &[a.id], 0.8),
            finding(sq.id, &[a.id, b.id], 0.5),
        ];
        (vec![sq], findings, vec![a, b])
    }

    #[test]
    fn citations_assigned_in_first_reference_order() {
        let (sqs, findings, candidates) = fixture();
        let tags = SourceTags::build(&sqs, &findings);
        let by_id = index_candidates(&candidates);

        // Body references S2 before S1; indices follow reference order,
        // not tag order.
        let body = "Claim one [S2]. Claim two [S1]. Claim one again [S2].";
        let (rewritten, citations) = finalize_report(body, &tags, &by_id);

        assert_eq!(rewritten, "Claim one [1]. Claim two [2]. Claim one again [1].");
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].index, 1);
        assert_eq!(citations[0].domain, "b.org");
        assert_eq!(citations[1].index, 2);
        assert_eq!(citations[1].domain, "a.com");
    }

    #[test]
    fn phantom_tags_are_stripped() {
        let (sqs, findings, candidates) = fixture();
        let tags = SourceTags::build(&sqs, &findings);
        let by_id = index_candidates(&candidates);

        let body = "Real [S1]. Phantom [S9]. Unparsable [S99999999999999999999].";
        let (rewritten, citations) = finalize_report(body, &tags, &by_id);

        assert_eq!(rewritten, "Real [1]. Phantom . Unparsable .");
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].url, "https://a.com/1");
    }

    #[test]
    fn unreferenced_sources_get_no_citation() {
        let (sqs, findings, candidates) = fixture();
        let tags = SourceTags::build(&sqs, &findings);
        let by_id = index_candidates(&candidates);

        let (_, citations) = finalize_report("Only one reference [S1].", &tags, &by_id);
        assert_eq!(citations.len(), 1);
    }

    #[test]
    fn tags_are_stable_across_findings() {
        let (sqs, findings, _) = fixture();
        let tags = SourceTags::build(&sqs, &findings);

        // Both findings share source `a`; it keeps a single tag.
        assert_eq!(tags.ordered.len(), 2);
        let first = tags.ordered[0];
        assert_eq!(tags.tag_for(&first), Some(1));
        assert_eq!(tags.candidate_for_tag(1), Some(first));
        assert_eq!(tags.candidate_for_tag(3), None);
        assert_eq!(tags.candidate_for_tag(0), None);
    }

    #[test]
    fn prompt_lists_each_tagged_source_once() {
        let (sqs, findings, candidates) = fixture();
        let tags = SourceTags::build(&sqs, &findings);
        let by_id = index_candidates(&candidates);
        let query = Query::new("what is the topic");

        let prompt = synthesis_prompt(&query, &sqs, &findings, &tags, &by_id);
        assert_eq!(prompt.matches("https://a.com/1").count(), 1);
        assert_eq!(prompt.matches("https://b.org/2").count(), 1);
        assert!(prompt.contains("## Executive Summary"));
    }
}
