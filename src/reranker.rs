//! The reranking capability applied to the filtered candidate shortlist.
//!
//! Rerankers only reorder and annotate: a candidate the reranker does not
//! return keeps its hybrid score in the final result set.

use crate::error::Result;

/// A reranked document with its relevance score.
#[derive(Debug, Clone)]
pub struct RankedDocument {
    /// Position of the document in the input slice.
    pub index: usize,
    /// Relevance score assigned by the reranker.
    pub score: f32,
    /// The document text, echoed back for lookup.
    pub text: String,
}

/// Scores a shortlist of documents against a query.
///
/// Contract: at most `top_n` entries, relevance-ordered; may return fewer.
/// An unavailable backend fails the call with a typed error; the engine
/// never retries.
pub trait Reranker: Send + Sync {
    fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RankedDocument>>;
}

/// Reranker that returns no judgments.
///
/// Every candidate then keeps its hybrid score, so hybrid ordering passes
/// through unchanged. Used when no reranking service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReranker;

impl Reranker for NoopReranker {
    fn rerank(
        &self,
        _query: &str,
        _documents: &[String],
        _top_n: usize,
    ) -> Result<Vec<RankedDocument>> {
        Ok(Vec::new())
    }
}
