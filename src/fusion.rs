//! Hybrid fusion: merge dense and sparse candidates, filter, rerank.
//!
//! The pipeline for one query:
//!
//! 1. Compute the adaptive result budget `k` from the context budget.
//! 2. Fan out to both index adapters with the configured `top_k`.
//! 3. Merge candidates by id (falling back to text), taking the per-axis
//!    maximum of the cosine and BM25 scores for duplicate keys.
//! 4. Compute the weighted hybrid score.
//! 5. Drop candidates at or below the adaptive threshold `mean + gamma *
//!    stddev`, falling back to the top `top_k` when nothing survives.
//! 6. Rerank the survivors; candidates the reranker does not return keep
//!    their hybrid score.
//! 7. Sort by final score and truncate to `k`.
//!
//! Candidates and results are per-call values; the engine holds no state,
//! performs no retries, and propagates any backend failure immediately.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    config::RetrievalConfig,
    error::{Error, Result},
    index::{IndexedHit, RetrievalIndex},
    reranker::Reranker,
};

/// A deduplicated hit assembled during fusion.
#[derive(Debug, Clone)]
pub struct RetrievalCandidate {
    pub text: String,
    pub source_id: String,
    pub parent_id: Option<String>,
    pub score_cosine: f32,
    pub score_bm25: f32,
    pub score_hybrid: f32,
    pub metadata: HashMap<String, String>,
}

/// The externally visible answer for one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub text: String,
    pub source_id: String,
    pub parent_id: Option<String>,
    /// Final score: the rerank score when the reranker returned this text,
    /// otherwise the hybrid score.
    pub score: f32,
    pub metadata: HashMap<String, String>,
    /// Debug payload carrying the pre-rerank hybrid score.
    pub raw: serde_json::Value,
}

/// Execute the full hybrid retrieval pipeline for one query.
///
/// Fails with a precondition error for an empty query; backend failures
/// from either adapter or the reranker abort the whole query. An empty
/// candidate pool is not an error and yields an empty result list.
pub fn hybrid_search(
    query: &str,
    cfg: &RetrievalConfig,
    dense: &dyn RetrievalIndex,
    sparse: &dyn RetrievalIndex,
    reranker: &dyn Reranker,
) -> Result<Vec<RetrievalResult>> {
    if query.trim().is_empty() {
        return Err(Error::Precondition(
            "query must not be empty".to_string(),
        ));
    }

    let k = cfg.adaptive_k();

    let dense_hits = dense.search(query, cfg.top_k)?;
    let sparse_hits = sparse.search(query, cfg.top_k)?;
    tracing::debug!(
        dense = dense_hits.len(),
        sparse = sparse_hits.len(),
        "collected candidates"
    );

    let mut candidates = merge_candidates(&dense_hits, &sparse_hits);
    for candidate in &mut candidates {
        candidate.score_hybrid = cfg.lambda_hybrid * candidate.score_cosine
            + (1.0 - cfg.lambda_hybrid) * candidate.score_bm25;
    }

    let filtered = adaptive_filter(candidates, cfg);
    if filtered.is_empty() {
        return Ok(Vec::new());
    }

    let documents: Vec<String> =
        filtered.iter().map(|c| c.text.clone()).collect();
    let top_n = documents.len().min(k);
    let ranked = reranker.rerank(query, &documents, top_n)?;
    let rerank_scores: HashMap<String, f32> =
        ranked.into_iter().map(|r| (r.text, r.score)).collect();

    let mut results: Vec<RetrievalResult> = filtered
        .into_iter()
        .map(|candidate| {
            let score = rerank_scores
                .get(&candidate.text)
                .copied()
                .unwrap_or(candidate.score_hybrid);
            let raw = serde_json::json!({ "hybrid": candidate.score_hybrid });
            RetrievalResult {
                text: candidate.text,
                source_id: candidate.source_id,
                parent_id: candidate.parent_id,
                score,
                metadata: candidate.metadata,
                raw,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(k);
    Ok(results)
}

/// Merge hits from both adapters in discovery order.
///
/// Candidates are keyed by `source_id` when non-empty, else by text. A key
/// seen again takes the maximum of each score axis separately, so a key
/// first discovered via one source can later acquire the other source's
/// score; the max is associative and commutative, making the merge
/// insensitive to discovery order.
fn merge_candidates(
    dense: &[IndexedHit],
    sparse: &[IndexedHit],
) -> Vec<RetrievalCandidate> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, RetrievalCandidate> = HashMap::new();

    let mut absorb = |hit: &IndexedHit, cosine: f32, bm25: f32| {
        let key = if hit.source_id.is_empty() {
            hit.text.clone()
        } else {
            hit.source_id.clone()
        };
        match merged.get_mut(&key) {
            Some(existing) => {
                existing.score_cosine = existing.score_cosine.max(cosine);
                existing.score_bm25 = existing.score_bm25.max(bm25);
            }
            None => {
                order.push(key.clone());
                merged.insert(
                    key,
                    RetrievalCandidate {
                        text: hit.text.clone(),
                        source_id: hit.source_id.clone(),
                        parent_id: hit.metadata.get("parent_id").cloned(),
                        score_cosine: cosine,
                        score_bm25: bm25,
                        score_hybrid: 0.0,
                        metadata: hit.metadata.clone(),
                    },
                );
            }
        }
    };

    for hit in dense {
        absorb(hit, hit.score, 0.0);
    }
    for hit in sparse {
        absorb(hit, 0.0, hit.score);
    }

    order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect()
}

/// Keep candidates strictly above `mean + gamma * stddev` (population
/// stddev, zero for fewer than two candidates). When the threshold would
/// eliminate everything, fall back to the top `top_k` by hybrid score; a
/// non-empty candidate set never filters down to nothing.
fn adaptive_filter(
    candidates: Vec<RetrievalCandidate>,
    cfg: &RetrievalConfig,
) -> Vec<RetrievalCandidate> {
    if candidates.is_empty() {
        return candidates;
    }

    let scores: Vec<f32> =
        candidates.iter().map(|c| c.score_hybrid).collect();
    let (mean, stddev) = mean_and_population_stddev(&scores);
    let tau = mean + cfg.gamma_filter * stddev;

    let survivors =
        candidates.iter().filter(|c| c.score_hybrid > tau).count();
    if survivors > 0 {
        return candidates
            .into_iter()
            .filter(|c| c.score_hybrid > tau)
            .collect();
    }

    let mut fallback = candidates;
    fallback.sort_by(|a, b| {
        b.score_hybrid
            .partial_cmp(&a.score_hybrid)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    fallback.truncate(cfg.top_k);
    fallback
}

fn mean_and_population_stddev(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance = values
        .iter()
        .map(|v| (v - mean) * (v - mean))
        .sum::<f32>()
        / values.len() as f32;
    (mean, variance.sqrt())
}

/// Format results for human-readable terminal output.
pub fn format_human(results: &[RetrievalResult]) {
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    for (i, r) in results.iter().enumerate() {
        println!("{:>3}. [{:.3}] {}", i + 1, r.score, r.source_id);
        println!("     {}", preview(&r.text, 120));
    }
    println!("\n{} result(s)", results.len());
}

/// Format results as a JSON document.
pub fn format_json(
    query: &str,
    results: &[RetrievalResult],
) -> Result<String> {
    let value = serde_json::json!({
        "query": query,
        "result_count": results.len(),
        "results": results,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Single-line preview of a chunk text, truncated to `max_chars`.
fn preview(text: &str, max_chars: usize) -> String {
    let one_line: String = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if one_line.chars().count() <= max_chars {
        return one_line;
    }
    let truncated: String = one_line.chars().take(max_chars).collect();
    format!("{truncated}...")
}
