use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::config::RankingConfig;
use super::similarity::cosine_score;
use super::types::{MatchSource, RankedResult};
use crate::constants::validate_embedding_dim;
use crate::corpus::ExemplarDocument;

/// Keyword scores are placed at most this fraction of the lowest embedding score.
const KEYWORD_HEADROOM: f32 = 0.99;

/// A document and its cached embedding.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub document: &'a Arc<ExemplarDocument>,
    pub vector: &'a [f32],
}

impl<'a> Candidate<'a> {
    pub fn new(document: &'a Arc<ExemplarDocument>, vector: &'a [f32]) -> Self {
        Self { document, vector }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimilarityRanker {
    config: RankingConfig,
}

impl SimilarityRanker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Appends the configured topic phrases triggered by `text`.
    pub fn expand_query(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let extras: Vec<&str> = self
            .config
            .query_expansions
            .iter()
            .filter(|expansion| {
                expansion
                    .triggers
                    .iter()
                    .any(|trigger| lowered.contains(trigger.to_lowercase().as_str()))
            })
            .map(|expansion| expansion.append.as_str())
            .collect();

        if extras.is_empty() {
            text.to_string()
        } else {
            format!("{text} {}", extras.join(" "))
        }
    }

    /// Ranks `candidates` against `query_vector`, returning at most `k` results
    /// ordered by score descending, then id ascending.
    ///
    /// `query_text` is the raw query; boosts and keyword matching read it,
    /// never the expanded text.
    pub fn rank(
        &self,
        query_vector: &[f32],
        query_text: &str,
        candidates: &[Candidate<'_>],
        category_hint: Option<&str>,
        k: usize,
    ) -> Vec<RankedResult> {
        if k == 0 || candidates.is_empty() {
            return Vec::new();
        }

        let query_lower = query_text.to_lowercase();
        let hint = category_hint
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty());

        let mut results = Vec::new();
        for candidate in candidates {
            let document = candidate.document;
            if let Err(err) = validate_embedding_dim(candidate.vector.len(), query_vector.len()) {
                debug!(
                    document_id = document.id(),
                    error = %err,
                    "Skipping candidate for the embedding pass"
                );
                continue;
            }

            let base = cosine_score(query_vector, candidate.vector);
            let boost = self.boost(&query_lower, document, hint.as_deref());
            let score = (base + boost).clamp(0.0, 1.0);

            if score < self.config.threshold {
                continue;
            }
            results.push(RankedResult::new(
                Arc::clone(document),
                score,
                MatchSource::Embedding,
            ));
        }

        sort_results(&mut results);
        results.truncate(k);

        if results.len() < k {
            let lowest = results.last().map(|r| r.score);
            let included: HashSet<&str> =
                results.iter().map(|r| r.document_id.as_str()).collect();
            let needed = k - results.len();
            let extra = self.keyword_pass(&query_lower, candidates, &included, lowest, needed);
            debug!(
                embedding_matches = results.len(),
                keyword_matches = extra.len(),
                "Keyword pass filled remaining slots"
            );
            results.extend(extra);
            sort_results(&mut results);
        }

        results
    }

    /// Keyword-only ranking, for callers that have no query vector at all.
    pub fn rank_by_keywords(
        &self,
        query_text: &str,
        candidates: &[Candidate<'_>],
        k: usize,
    ) -> Vec<RankedResult> {
        if k == 0 {
            return Vec::new();
        }
        let mut results =
            self.keyword_pass(&query_text.to_lowercase(), candidates, &HashSet::new(), None, k);
        sort_results(&mut results);
        results
    }

    fn boost(&self, query_lower: &str, document: &ExemplarDocument, hint: Option<&str>) -> f32 {
        let text = document.search_text();
        let mut total: f32 = self
            .config
            .boost_terms
            .iter()
            .filter(|(term, _)| {
                let term = term.to_lowercase();
                !term.is_empty() && query_lower.contains(&term) && text.contains(&term)
            })
            .map(|(_, bonus)| *bonus)
            .sum();

        if let (Some(hint), Some(category)) = (hint, document.category())
            && category.trim().to_lowercase() == hint
        {
            total += self.config.category_bonus;
        }

        total.min(self.config.boost_ceiling)
    }

    fn keyword_score(&self, query_lower: &str, text: &str) -> f32 {
        let mut score = 0.0;
        for (group, terms) in &self.config.keyword_groups {
            for term in terms {
                let term = term.to_lowercase();
                if term.is_empty() || !query_lower.contains(&term) || !text.contains(&term) {
                    continue;
                }
                score += if term == group.to_lowercase() {
                    self.config.keyword_primary_score
                } else {
                    self.config.keyword_secondary_score
                };
            }
        }
        score
    }

    fn keyword_pass(
        &self,
        query_lower: &str,
        candidates: &[Candidate<'_>],
        included: &HashSet<&str>,
        lowest_admitted: Option<f32>,
        needed: usize,
    ) -> Vec<RankedResult> {
        let cap = lowest_admitted
            .map(|lowest| lowest * KEYWORD_HEADROOM)
            .unwrap_or(self.config.keyword_max_score)
            .min(self.config.keyword_max_score);
        if cap <= 0.0 || needed == 0 {
            return Vec::new();
        }

        let remaining: Vec<(&Arc<ExemplarDocument>, f32)> = candidates
            .iter()
            .map(|c| c.document)
            .filter(|doc| !included.contains(doc.id()))
            .map(|doc| (doc, self.keyword_score(query_lower, doc.search_text())))
            .collect();

        let max_raw = remaining.iter().map(|(_, raw)| *raw).fold(0.0f32, f32::max);

        let mut matched: Vec<RankedResult> = Vec::new();
        if max_raw > 0.0 {
            matched = remaining
                .iter()
                .filter(|(_, raw)| *raw > 0.0)
                .map(|(doc, raw)| {
                    RankedResult::new(Arc::clone(doc), cap * raw / max_raw, MatchSource::Keyword)
                })
                .collect();
            sort_results(&mut matched);
            matched.truncate(needed);
        }

        if self.config.keyword_fill_unmatched && matched.len() < needed {
            let mut unmatched: Vec<&Arc<ExemplarDocument>> = remaining
                .iter()
                .filter(|(_, raw)| *raw <= 0.0)
                .map(|(doc, _)| *doc)
                .collect();
            unmatched.sort_by(|a, b| a.id().cmp(b.id()));
            let fill = needed - matched.len();
            matched.extend(
                unmatched
                    .into_iter()
                    .take(fill)
                    .map(|doc| RankedResult::new(Arc::clone(doc), 0.0, MatchSource::Keyword)),
            );
        }

        matched
    }
}

/// Score descending, then document id ascending.
fn sort_results(results: &mut [RankedResult]) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });
}
