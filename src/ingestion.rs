//! Bootstrap indexing of document files.
//!
//! Discovered files are read in parallel, segmented hierarchically, and
//! their child chunks appended to both indices with `parent_id`, `doc_id`
//! and `level` tags, matching the shape the feedback path writes.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::{
    chunking::{ChunkLevel, hierarchical_chunks},
    config::RetrievalConfig,
    error::Result,
    index::RetrievalIndex,
    walker::DiscoveredFile,
};

/// Index a single document's text. Returns the number of child chunks
/// appended.
pub fn ingest_document(
    document_id: &str,
    text: &str,
    cfg: &RetrievalConfig,
    dense: &dyn RetrievalIndex,
    sparse: &dyn RetrievalIndex,
) -> Result<usize> {
    let chunks = hierarchical_chunks(document_id, text, cfg);

    let mut texts = Vec::new();
    let mut ids = Vec::new();
    let mut metadata = Vec::new();
    for chunk in chunks {
        if chunk.level != ChunkLevel::Child {
            continue;
        }
        let mut tags = HashMap::new();
        tags.insert("parent_id".to_string(), chunk.parent_id);
        tags.insert("doc_id".to_string(), document_id.to_string());
        tags.insert("level".to_string(), chunk.level.as_str().to_string());
        texts.push(chunk.text);
        ids.push(chunk.chunk_id);
        metadata.push(tags);
    }

    dense.add(&texts, &ids, &metadata)?;
    sparse.add(&texts, &ids, &metadata)?;
    Ok(texts.len())
}

/// Ingest a batch of discovered files into both indices.
///
/// Files are read in parallel; unreadable files are skipped. Returns the
/// total number of child chunks appended.
pub fn ingest_files(
    files: &[DiscoveredFile],
    cfg: &RetrievalConfig,
    dense: &dyn RetrievalIndex,
    sparse: &dyn RetrievalIndex,
) -> Result<usize> {
    let loaded: Vec<(String, String)> = files
        .par_iter()
        .filter_map(|file| {
            let content =
                std::fs::read_to_string(&file.absolute_path).ok()?;
            let document_id =
                file.relative_path.to_string_lossy().to_string();
            Some((document_id, content))
        })
        .collect();

    let mut total = 0;
    for (document_id, content) in &loaded {
        let count =
            ingest_document(document_id, content, cfg, dense, sparse)?;
        tracing::info!(document_id, chunks = count, "indexed document");
        total += count;
    }

    Ok(total)
}
