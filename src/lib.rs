//! braid - hybrid document retrieval combining dense and sparse search.
//!
//! braid splits documents into parent/child chunks, indexes the children in
//! a [redb](https://github.com/cberner/redb)-backed vector store and a
//! [Tantivy](https://github.com/quickwit-oss/tantivy) BM25 index, and
//! answers queries by fusing both candidate sets, filtering them with an
//! adaptive statistical threshold, and handing the surviving shortlist to a
//! reranker. Accepted question/answer exchanges can be folded back into
//! both indices to close the incremental-learning loop.
//!
//! # Quick start
//!
//! ```
//! use braid::config::RetrievalConfig;
//! use braid::embedder::HashEmbedder;
//! use braid::fusion::hybrid_search;
//! use braid::ingestion;
//! use braid::reranker::NoopReranker;
//! use braid::tantivy_index::LexicalIndex;
//! use braid::vector_db::VectorDb;
//!
//! let tmp = tempfile::tempdir().unwrap();
//! let cfg = RetrievalConfig::default();
//! let dense = VectorDb::open(
//!     &tmp.path().join("vectors.redb"),
//!     Box::new(HashEmbedder::default()),
//! )
//! .unwrap();
//! let sparse = LexicalIndex::open_in_ram().unwrap();
//!
//! ingestion::ingest_document(
//!     "manual.md",
//!     "The steel ladle must preheat. Preheat time depends on ambient temperature.",
//!     &cfg,
//!     &dense,
//!     &sparse,
//! )
//! .unwrap();
//!
//! let results =
//!     hybrid_search("ladle preheat", &cfg, &dense, &sparse, &NoopReranker)
//!         .unwrap();
//! assert!(!results.is_empty());
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod data_dir;
pub mod embedder;
pub mod error;
pub mod feedback;
pub mod fusion;
pub mod index;
pub mod ingestion;
pub mod reranker;
pub mod tantivy_index;
pub mod vector_db;
pub mod walker;

pub use config::RetrievalConfig;
pub use data_dir::DataDir;
pub use embedder::{Embedder, HashEmbedder};
pub use error::{Error, Result};
pub use fusion::{RetrievalCandidate, RetrievalResult};
pub use index::{IndexedHit, RetrievalIndex};
pub use reranker::{NoopReranker, RankedDocument, Reranker};
pub use tantivy_index::LexicalIndex;
pub use vector_db::VectorDb;
