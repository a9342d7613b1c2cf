//! End-to-end pipeline test: bootstrap indexing, feedback appends, and
//! hybrid queries against on-disk stores.

use braid::{
    RankedDocument,
    Reranker,
    RetrievalConfig,
    embedder::HashEmbedder,
    error::Result,
    feedback,
    fusion,
    ingestion,
    reranker::NoopReranker,
    tantivy_index::LexicalIndex,
    vector_db::VectorDb,
    walker,
};

/// Reranker that pins one known text to the top.
struct PinningReranker {
    pinned: String,
}

impl Reranker for PinningReranker {
    fn rerank(
        &self,
        _query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RankedDocument>> {
        Ok(documents
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == self.pinned)
            .map(|(index, text)| RankedDocument {
                index,
                score: 100.0,
                text: text.clone(),
            })
            .take(top_n)
            .collect())
    }
}

fn write_corpus(dir: &std::path::Path) {
    std::fs::write(
        dir.join("ladle.md"),
        "The steel ladle must preheat before casting. \
         Preheat time depends on ambient temperature. \
         A cold ladle chills the melt and causes defects.",
    )
    .unwrap();
    std::fs::write(
        dir.join("garden.txt"),
        "Water the garden plants every morning. \
         Tomatoes need full sun and regular feeding.",
    )
    .unwrap();
}

fn open_stores(root: &std::path::Path) -> (VectorDb, LexicalIndex) {
    let dense = VectorDb::open(
        &root.join("vectors.redb"),
        Box::new(HashEmbedder::default()),
    )
    .unwrap();
    let sparse = LexicalIndex::open(&root.join("tantivy")).unwrap();
    (dense, sparse)
}

#[test]
fn index_then_search_returns_relevant_chunks() {
    let data = tempfile::tempdir().unwrap();
    let docs = tempfile::tempdir().unwrap();
    write_corpus(docs.path());

    let cfg = RetrievalConfig::default();
    let (dense, sparse) = open_stores(data.path());

    let files = walker::discover_files(docs.path()).unwrap();
    let total = ingestion::ingest_files(&files, &cfg, &dense, &sparse).unwrap();
    assert!(total >= 2);

    let results = fusion::hybrid_search(
        "ladle preheat temperature",
        &cfg,
        &dense,
        &sparse,
        &NoopReranker,
    )
    .unwrap();

    assert!(!results.is_empty());
    assert!(results.len() <= cfg.adaptive_k());
    assert!(results[0].text.contains("ladle") || results[0].text.contains("Preheat"));
    for window in results.windows(2) {
        assert!(window[0].score >= window[1].score);
    }
    for result in &results {
        assert!(result.parent_id.is_some());
        assert!(result.raw.get("hybrid").is_some());
    }
}

#[test]
fn feedback_exchange_becomes_retrievable() {
    let data = tempfile::tempdir().unwrap();
    let docs = tempfile::tempdir().unwrap();
    write_corpus(docs.path());

    let cfg = RetrievalConfig::default();
    let (dense, sparse) = open_stores(data.path());

    let files = walker::discover_files(docs.path()).unwrap();
    ingestion::ingest_files(&files, &cfg, &dense, &sparse).unwrap();

    feedback::append_exchange(
        "qa7",
        "What is the tundish nozzle bore diameter?",
        "The standard tundish nozzle bore is forty millimetres.",
        &cfg,
        &dense,
        &sparse,
    )
    .unwrap();

    let results = fusion::hybrid_search(
        "tundish nozzle bore",
        &cfg,
        &dense,
        &sparse,
        &NoopReranker,
    )
    .unwrap();

    assert!(!results.is_empty());
    let top = &results[0];
    assert!(top.text.contains("tundish") || top.text.contains("nozzle"));
    assert_eq!(
        top.metadata.get("qa_id").map(String::as_str),
        Some("qa7")
    );
    assert_eq!(
        top.metadata.get("level").map(String::as_str),
        Some("child")
    );
}

#[test]
fn reranker_reorders_the_shortlist() {
    let data = tempfile::tempdir().unwrap();
    // Small child chunks make each line its own candidate; the large gamma
    // sends everything through the fallback path, so the reranker decides
    // the final order.
    let cfg = RetrievalConfig {
        child_max_size: 30,
        overlap: 0,
        gamma_filter: 5.0,
        top_k: 10,
        ..Default::default()
    };
    let (dense, sparse) = open_stores(data.path());

    ingestion::ingest_document(
        "notes.md",
        "slag forms on the melt surface\n\
         slag is skimmed before pouring\n\
         slag composition indicates temperature",
        &cfg,
        &dense,
        &sparse,
    )
    .unwrap();

    let pinned = "slag composition indicates temperature".to_string();
    let results = fusion::hybrid_search(
        "slag",
        &cfg,
        &dense,
        &sparse,
        &PinningReranker {
            pinned: pinned.clone(),
        },
    )
    .unwrap();

    assert!(results.len() >= 2);
    assert_eq!(results[0].text, pinned);
    assert!((results[0].score - 100.0).abs() < 1e-6);
    // Candidates the reranker skipped keep their hybrid scores.
    for other in &results[1..] {
        let hybrid = other.raw["hybrid"].as_f64().unwrap();
        assert!((other.score as f64 - hybrid).abs() < 1e-6);
    }
}

#[test]
fn stores_survive_a_restart() {
    let data = tempfile::tempdir().unwrap();
    let cfg = RetrievalConfig::default();

    {
        let (dense, sparse) = open_stores(data.path());
        ingestion::ingest_document(
            "manual.md",
            "The steel ladle must preheat before casting.",
            &cfg,
            &dense,
            &sparse,
        )
        .unwrap();
    }

    {
        let (dense, sparse) = open_stores(data.path());
        let results = fusion::hybrid_search(
            "ladle preheat",
            &cfg,
            &dense,
            &sparse,
            &NoopReranker,
        )
        .unwrap();
        assert!(!results.is_empty());
    }
}

#[test]
fn empty_stores_give_empty_results() {
    let data = tempfile::tempdir().unwrap();
    let cfg = RetrievalConfig::default();
    let (dense, sparse) = open_stores(data.path());

    let results = fusion::hybrid_search(
        "anything at all",
        &cfg,
        &dense,
        &sparse,
        &NoopReranker,
    )
    .unwrap();
    assert!(results.is_empty());
}
