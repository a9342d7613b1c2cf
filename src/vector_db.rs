//! Dense index adapter: a redb-backed vector store.
//!
//! `add` embeds texts through the injected [`Embedder`] and persists
//! `(vector, text, metadata)` keyed by chunk id. `search` embeds the query
//! and scores every stored entry by cosine distance, converting distance to
//! a score with `score = 1 - distance`, a placeholder linear mapping that
//! is precise only for ranking, not for absolute comparability across
//! distance metrics.
//!
//! Binary format per entry:
//! - 4 bytes: vector dimension D (u32 LE)
//! - D * 4 bytes: f32 LE vector values
//! - 4 bytes: text length in bytes (u32 LE)
//! - text bytes (UTF-8)
//! - remaining bytes: metadata as JSON

use std::{collections::HashMap, path::Path};

use rayon::prelude::*;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::{
    embedder::Embedder,
    error::{Error, Result},
    index::{IndexedHit, RetrievalIndex},
};

const VECTORS: TableDefinition<&str, &[u8]> = TableDefinition::new("vectors");

pub struct VectorDb {
    db: Database,
    embedder: Box<dyn Embedder>,
}

impl VectorDb {
    /// Open or create a vector store at the given path.
    ///
    /// The embedding capability is injected here and used by both `add`
    /// and `search`.
    pub fn open(path: &Path, embedder: Box<dyn Embedder>) -> Result<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(VECTORS)?;
        txn.commit()?;

        Ok(Self { db, embedder })
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<usize> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(VECTORS)?;
        let mut count = 0;
        for entry in table.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl RetrievalIndex for VectorDb {
    fn add(
        &self,
        texts: &[String],
        ids: &[String],
        metadata: &[HashMap<String, String>],
    ) -> Result<()> {
        if texts.len() != ids.len() || texts.len() != metadata.len() {
            return Err(Error::Precondition(format!(
                "add requires equal lengths, got {} texts, {} ids, {} metadata",
                texts.len(),
                ids.len(),
                metadata.len()
            )));
        }
        if texts.is_empty() {
            return Ok(());
        }

        let vectors = self.embedder.embed(texts)?;
        if vectors.len() != texts.len() {
            return Err(Error::Backend {
                kind: "embedding",
                message: format!(
                    "expected {} vectors, got {}",
                    texts.len(),
                    vectors.len()
                ),
            });
        }

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(VECTORS)?;
            for ((id, text), (vector, meta)) in ids
                .iter()
                .zip(texts)
                .zip(vectors.iter().zip(metadata))
            {
                let encoded = encode_entry(vector, text, meta)?;
                table.insert(id.as_str(), encoded.as_slice())?;
            }
        }
        txn.commit()?;

        tracing::debug!(count = texts.len(), "appended dense entries");
        Ok(())
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<IndexedHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or(Error::Backend {
                kind: "embedding",
                message: "no vector returned for query".to_string(),
            })?;

        let txn = self.db.begin_read()?;
        let table = txn.open_table(VECTORS)?;

        let mut entries = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            if let Some(decoded) = decode_entry(value.value()) {
                entries.push((key.value().to_string(), decoded));
            }
        }

        let mut hits: Vec<IndexedHit> = entries
            .into_par_iter()
            .map(|(source_id, (vector, text, metadata))| {
                let distance = cosine_distance(&query_vector, &vector);
                IndexedHit {
                    source_id,
                    text,
                    score: score_from_distance(distance),
                    metadata,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }
}

impl std::fmt::Debug for VectorDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorDb").finish_non_exhaustive()
    }
}

fn encode_entry(
    vector: &[f32],
    text: &str,
    metadata: &HashMap<String, String>,
) -> Result<Vec<u8>> {
    let meta_bytes = serde_json::to_vec(metadata)?;
    let mut buf = Vec::with_capacity(
        8 + vector.len() * 4 + text.len() + meta_bytes.len(),
    );
    buf.extend_from_slice(&(vector.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytemuck::cast_slice(vector));
    buf.extend_from_slice(&(text.len() as u32).to_le_bytes());
    buf.extend_from_slice(text.as_bytes());
    buf.extend_from_slice(&meta_bytes);
    Ok(buf)
}

type DecodedEntry = (Vec<f32>, String, HashMap<String, String>);

/// Decode a stored entry. Malformed records yield `None` and are skipped
/// rather than failing the whole search.
fn decode_entry(bytes: &[u8]) -> Option<DecodedEntry> {
    if bytes.len() < 4 {
        return None;
    }
    let dim = u32::from_le_bytes(bytes[0..4].try_into().ok()?) as usize;
    let vec_end = 4 + dim * 4;
    if bytes.len() < vec_end + 4 {
        return None;
    }
    let vector: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes[4..vec_end]);

    let text_len =
        u32::from_le_bytes(bytes[vec_end..vec_end + 4].try_into().ok()?)
            as usize;
    let text_end = vec_end + 4 + text_len;
    if bytes.len() < text_end {
        return None;
    }
    let text =
        std::str::from_utf8(&bytes[vec_end + 4..text_end]).ok()?.to_string();

    let metadata: HashMap<String, String> =
        serde_json::from_slice(&bytes[text_end..]).ok()?;

    Some((vector, text, metadata))
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (mag_a * mag_b)
}

fn score_from_distance(distance: f32) -> f32 {
    1.0 - distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashEmbedder;

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(Error::Backend {
                kind: "embedding",
                message: "service offline".to_string(),
            })
        }

        fn dimension(&self) -> usize {
            0
        }
    }

    fn meta(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn test_db() -> (tempfile::TempDir, VectorDb) {
        let tmp = tempfile::tempdir().unwrap();
        let db = VectorDb::open(
            &tmp.path().join("vectors.redb"),
            Box::new(HashEmbedder::default()),
        )
        .unwrap();
        (tmp, db)
    }

    fn add_sample_docs(db: &VectorDb) {
        db.add(
            &[
                "the steel ladle must preheat before casting".to_string(),
                "water the garden plants every morning".to_string(),
                "preheat time depends on ambient temperature".to_string(),
            ],
            &["c0".to_string(), "c1".to_string(), "c2".to_string()],
            &[
                meta(&[("parent_id", "doc_p0")]),
                meta(&[("parent_id", "doc_p0")]),
                meta(&[("parent_id", "doc_p1")]),
            ],
        )
        .unwrap();
    }

    #[test]
    fn add_and_search_ranks_relevant_first() {
        let (_tmp, db) = test_db();
        add_sample_docs(&db);

        let hits = db.search("ladle preheat", 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].source_id, "c0");
        for window in hits.windows(2) {
            assert!(window[0].score >= window[1].score);
        }
    }

    #[test]
    fn search_respects_k() {
        let (_tmp, db) = test_db();
        add_sample_docs(&db);

        let hits = db.search("preheat", 1).unwrap();
        assert_eq!(hits.len(), 1);

        let hits = db.search("preheat", 0).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn identical_text_scores_near_one() {
        let (_tmp, db) = test_db();
        add_sample_docs(&db);

        let hits = db
            .search("the steel ladle must preheat before casting", 1)
            .unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn metadata_survives_the_roundtrip() {
        let (_tmp, db) = test_db();
        add_sample_docs(&db);

        let hits = db.search("ambient temperature", 3).unwrap();
        let hit = hits.iter().find(|h| h.source_id == "c2").unwrap();
        assert_eq!(
            hit.metadata.get("parent_id").map(String::as_str),
            Some("doc_p1")
        );
    }

    #[test]
    fn re_adding_an_id_replaces_the_entry() {
        let (_tmp, db) = test_db();
        db.add(
            &["old text".to_string()],
            &["c0".to_string()],
            &[HashMap::new()],
        )
        .unwrap();
        db.add(
            &["brand new text".to_string()],
            &["c0".to_string()],
            &[HashMap::new()],
        )
        .unwrap();

        assert_eq!(db.len().unwrap(), 1);
        let hits = db.search("brand new text", 1).unwrap();
        assert_eq!(hits[0].text, "brand new text");
    }

    #[test]
    fn mismatched_lengths_is_a_precondition_failure() {
        let (_tmp, db) = test_db();
        let result = db.add(
            &["one".to_string(), "two".to_string()],
            &["c0".to_string()],
            &[HashMap::new()],
        );
        assert!(matches!(result, Err(Error::Precondition(_))));
    }

    #[test]
    fn failing_embedder_propagates_on_add_and_search() {
        let tmp = tempfile::tempdir().unwrap();
        let db = VectorDb::open(
            &tmp.path().join("vectors.redb"),
            Box::new(FailingEmbedder),
        )
        .unwrap();

        let add_err = db.add(
            &["text".to_string()],
            &["c0".to_string()],
            &[HashMap::new()],
        );
        assert!(matches!(add_err, Err(Error::Backend { .. })));

        let search_err = db.search("query", 3);
        assert!(matches!(search_err, Err(Error::Backend { .. })));
    }

    #[test]
    fn empty_store_returns_no_hits() {
        let (_tmp, db) = test_db();
        assert!(db.search("anything", 5).unwrap().is_empty());
        assert!(db.is_empty().unwrap());
    }

    #[test]
    fn empty_add_is_a_no_op() {
        let (_tmp, db) = test_db();
        db.add(&[], &[], &[]).unwrap();
        assert_eq!(db.len().unwrap(), 0);
    }

    #[test]
    fn reopen_preserves_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("vectors.redb");

        {
            let db = VectorDb::open(&path, Box::new(HashEmbedder::default()))
                .unwrap();
            db.add(
                &["persistent entry".to_string()],
                &["c0".to_string()],
                &[meta(&[("level", "child")])],
            )
            .unwrap();
        }

        {
            let db = VectorDb::open(&path, Box::new(HashEmbedder::default()))
                .unwrap();
            let hits = db.search("persistent entry", 1).unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].source_id, "c0");
        }
    }

    #[test]
    fn entry_encoding_roundtrips() {
        let metadata = meta(&[("parent_id", "p0"), ("level", "child")]);
        let vector = vec![0.25f32, -1.5, 3.0];
        let encoded = encode_entry(&vector, "chunk text", &metadata).unwrap();
        let (v, t, m) = decode_entry(&encoded).unwrap();

        assert_eq!(v, vector);
        assert_eq!(t, "chunk text");
        assert_eq!(m, metadata);
    }

    #[test]
    fn truncated_entry_decodes_to_none() {
        let encoded =
            encode_entry(&[1.0, 2.0], "text", &HashMap::new()).unwrap();
        assert!(decode_entry(&encoded[..5]).is_none());
        assert!(decode_entry(&[]).is_none());
    }

    #[test]
    fn cosine_distance_basics() {
        assert!((cosine_distance(&[1.0, 0.0], &[1.0, 0.0])).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }
}
