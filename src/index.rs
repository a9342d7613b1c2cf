//! The narrow contract both index adapters satisfy.
//!
//! The fusion engine and the feedback indexer only ever see this trait, so
//! the dense and sparse backends stay swappable at runtime.

use std::collections::HashMap;

use crate::error::Result;

/// A scored entry returned by an index adapter.
#[derive(Debug, Clone)]
pub struct IndexedHit {
    /// Chunk id the entry was stored under.
    pub source_id: String,
    /// Stored chunk text.
    pub text: String,
    /// Relevance score, higher is better. Dense adapters report
    /// `1 - distance`; sparse adapters report BM25 scores.
    pub score: f32,
    /// Opaque tags carried through from `add` (`parent_id`, `qa_id`,
    /// `level`, backend-specific fields).
    pub metadata: HashMap<String, String>,
}

/// Append/search contract shared by the dense and sparse adapters.
pub trait RetrievalIndex {
    /// Append entries. `texts`, `ids` and `metadata` must have equal
    /// lengths; re-adding an id replaces the previous entry.
    fn add(
        &self,
        texts: &[String],
        ids: &[String],
        metadata: &[HashMap<String, String>],
    ) -> Result<()>;

    /// Return at most `k` entries, descending by relevance.
    fn search(&self, query: &str, k: usize) -> Result<Vec<IndexedHit>>;
}
