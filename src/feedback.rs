//! Feedback-driven incremental indexing.
//!
//! An accepted question/answer exchange is folded back into both indices so
//! later queries can retrieve it. This is the sole incremental-write path;
//! there is no deletion or correction path for previously indexed feedback.

use std::collections::HashMap;

use crate::{
    chunking::{ChunkLevel, hierarchical_chunks},
    config::RetrievalConfig,
    error::Result,
    index::RetrievalIndex,
};

/// Index an accepted question/answer exchange into both indices.
///
/// The exchange is rendered as `"Q: {question}\nA: {answer}"`, segmented
/// hierarchically, and its child chunks are appended to the dense and
/// sparse indices tagged with `parent_id`, `qa_id` and `level`.
pub fn append_exchange(
    exchange_id: &str,
    question: &str,
    answer: &str,
    cfg: &RetrievalConfig,
    dense: &dyn RetrievalIndex,
    sparse: &dyn RetrievalIndex,
) -> Result<()> {
    let text = format!("Q: {question}\nA: {answer}");
    let chunks = hierarchical_chunks(exchange_id, &text, cfg);

    let mut texts = Vec::new();
    let mut ids = Vec::new();
    let mut metadata = Vec::new();
    for chunk in chunks {
        if chunk.level != ChunkLevel::Child {
            continue;
        }
        let mut tags = HashMap::new();
        tags.insert("parent_id".to_string(), chunk.parent_id);
        tags.insert("qa_id".to_string(), exchange_id.to_string());
        tags.insert("level".to_string(), chunk.level.as_str().to_string());
        texts.push(chunk.text);
        ids.push(chunk.chunk_id);
        metadata.push(tags);
    }

    dense.add(&texts, &ids, &metadata)?;
    sparse.add(&texts, &ids, &metadata)?;

    tracing::info!(
        exchange_id,
        chunks = texts.len(),
        "indexed feedback exchange"
    );
    Ok(())
}
