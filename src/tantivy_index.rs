//! Sparse index adapter: BM25 lexical retrieval over chunk texts.
//!
//! The reference design rebuilds an in-memory ranking model over the whole
//! corpus on every insert; here the ranking structure is a Tantivy index,
//! whose atomic commit plus reader reload gives every search a fully
//! consistent pre- or post-add view of the corpus. Text is analyzed with a
//! whitespace tokenizer and lowercasing.

use std::{collections::HashMap, path::Path, sync::Mutex};

use tantivy::{
    Index,
    IndexReader,
    IndexWriter,
    TantivyDocument,
    collector::TopDocs,
    doc,
    query::QueryParser,
    schema::*,
    tokenizer::{
        LowerCaser,
        RemoveLongFilter,
        TextAnalyzer,
        WhitespaceTokenizer,
    },
};

use crate::{
    error::{Error, Result},
    index::{IndexedHit, RetrievalIndex},
};

/// Field names used in the schema.
pub mod fields {
    pub const CHUNK_ID: &str = "chunk_id";
    pub const PARENT_ID: &str = "parent_id";
    pub const TEXT: &str = "text";
    pub const METADATA: &str = "metadata";
}

const WRITER_MEMORY_BUDGET: usize = 15_000_000;

/// Manages the Tantivy index holding chunk texts and their tags.
pub struct LexicalIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    schema: Schema,
}

/// Resolved field handles for the schema.
#[derive(Clone, Copy)]
struct SchemaFields {
    chunk_id: Field,
    parent_id: Field,
    text: Field,
    metadata: Field,
}

fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    builder.add_text_field(fields::CHUNK_ID, STRING | STORED);
    builder.add_text_field(fields::PARENT_ID, STRING | STORED);

    let text_opts = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("ws_lower")
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();
    builder.add_text_field(fields::TEXT, text_opts);

    builder.add_text_field(fields::METADATA, STORED);

    builder.build()
}

fn register_tokenizers(index: &Index) {
    let ws_lower = TextAnalyzer::builder(WhitespaceTokenizer::default())
        .filter(RemoveLongFilter::limit(64))
        .filter(LowerCaser)
        .build();
    index.tokenizers().register("ws_lower", ws_lower);
}

impl LexicalIndex {
    /// Open or create an index at the given directory.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let schema = build_schema();

        let mmap_dir = tantivy::directory::MmapDirectory::open(dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?;
        let index = if Index::exists(&mmap_dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?
        {
            Index::open(mmap_dir)?
        } else {
            Index::create(
                mmap_dir,
                schema.clone(),
                tantivy::IndexSettings::default(),
            )?
        };

        Self::finish_open(index, schema)
    }

    /// Create an in-memory index (for testing).
    pub fn open_in_ram() -> Result<Self> {
        let schema = build_schema();
        let index = Index::create_in_ram(schema.clone());
        Self::finish_open(index, schema)
    }

    fn finish_open(index: Index, schema: Schema) -> Result<Self> {
        register_tokenizers(&index);
        let reader = index.reader()?;
        let writer = Mutex::new(index.writer(WRITER_MEMORY_BUDGET)?);

        Ok(Self {
            index,
            reader,
            writer,
            schema,
        })
    }

    fn fields(&self) -> Result<SchemaFields> {
        let field = |name: &str| {
            self.schema.get_field(name).map_err(|e| {
                Error::Config(format!("missing schema field {name}: {e}"))
            })
        };
        Ok(SchemaFields {
            chunk_id: field(fields::CHUNK_ID)?,
            parent_id: field(fields::PARENT_ID)?,
            text: field(fields::TEXT)?,
            metadata: field(fields::METADATA)?,
        })
    }

    /// Number of indexed documents.
    pub fn len(&self) -> Result<usize> {
        self.reader.reload()?;
        Ok(self.reader.searcher().num_docs() as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl RetrievalIndex for LexicalIndex {
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

        let f = self.fields()?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::Config("index writer poisoned".into()))?;

        for ((text, id), meta) in texts.iter().zip(ids).zip(metadata) {
            // Delete any existing document with this id first.
            let term = tantivy::Term::from_field_text(f.chunk_id, id);
            writer.delete_term(term);

            let parent_id =
                meta.get("parent_id").map(String::as_str).unwrap_or("");
            let meta_json = serde_json::to_string(meta)?;
            writer.add_document(doc!(
                f.chunk_id => id.as_str(),
                f.parent_id => parent_id,
                f.text => text.as_str(),
                f.metadata => meta_json,
            ))?;
        }

        writer.commit()?;
        self.reader.reload()?;

        tracing::debug!(count = texts.len(), "appended lexical entries");
        Ok(())
    }

    fn search(&self, query_str: &str, k: usize) -> Result<Vec<IndexedHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let f = self.fields()?;
        self.reader.reload()?;
        let searcher = self.reader.searcher();

        let parser = QueryParser::for_index(&self.index, vec![f.text]);
        let (query, _errors) = parser.parse_query_lenient(query_str);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(k))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            let metadata = doc
                .get_first(f.metadata)
                .and_then(|v| v.as_str())
                .and_then(|json| serde_json::from_str(json).ok())
                .unwrap_or_default();
            results.push(IndexedHit {
                source_id: extract_text(&doc, f.chunk_id),
                text: extract_text(&doc, f.text),
                score,
                metadata,
            });
        }

        Ok(results)
    }
}

impl std::fmt::Debug for LexicalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexicalIndex").finish_non_exhaustive()
    }
}

fn extract_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}
