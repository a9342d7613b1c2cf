//! Hierarchical chunking: splitting documents into parent and child segments.
//!
//! Child chunks are built by splitting on the configured delimiters and
//! greedily packing the fragments up to `child_max_size` characters, with an
//! optional character overlap carried from one chunk into the next. Parent
//! chunks group consecutive children up to `parent_max_size` characters and
//! give retrieval results wider context through their `parent_id`.
//!
//! All sizes are measured in Unicode scalar values, so multi-byte text never
//! lands on an invalid boundary.

use crate::config::RetrievalConfig;

/// Granularity of a [`Chunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLevel {
    Parent,
    Child,
}

impl ChunkLevel {
    /// Tag value stored in index metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkLevel::Parent => "parent",
            ChunkLevel::Child => "child",
        }
    }
}

/// A segment of a source document.
///
/// Parent chunks reference their own id in `parent_id`; child chunks
/// reference the parent whose buffer they were appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub chunk_id: String,
    pub parent_id: String,
    pub level: ChunkLevel,
}

/// Split `text` successively by each delimiter, dropping fragments that are
/// empty after trimming. Order of the surviving fragments follows the
/// original text. Empty delimiter strings are skipped.
fn split_by_delimiters(text: &str, delimiters: &[String]) -> Vec<String> {
    let mut parts: Vec<String> = vec![text.to_string()];
    for delimiter in delimiters {
        if delimiter.is_empty() {
            continue;
        }
        let mut next = Vec::with_capacity(parts.len());
        for part in &parts {
            for piece in part.split(delimiter.as_str()) {
                next.push(piece.to_string());
            }
        }
        parts = next;
    }

    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// The trailing `n` characters of `s` (all of `s` when it is shorter).
fn char_tail(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let start = s
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    &s[start..]
}

/// Split `text` into child chunk texts.
///
/// Fragments are accumulated greedily: a chunk closes when appending the
/// next fragment would push it past `child_max_size` characters. The bound
/// is advisory: a single fragment longer than the bound is still kept
/// whole. With `overlap > 0`, the trailing overlap characters of a closed
/// chunk seed the next buffer and count toward its length.
///
/// # Examples
///
/// ```
/// use braid::chunking::split_children;
/// use braid::config::RetrievalConfig;
///
/// let cfg = RetrievalConfig {
///     child_delimiters: vec![". ".to_string()],
///     child_max_size: 40,
///     overlap: 0,
///     ..Default::default()
/// };
/// let children = split_children("First sentence. Second sentence here.", &cfg);
/// assert_eq!(children, vec!["First sentence Second sentence here."]);
/// ```
pub fn split_children(text: &str, cfg: &RetrievalConfig) -> Vec<String> {
    let fragments = split_by_delimiters(text, &cfg.child_delimiters);

    let mut chunks: Vec<String> = Vec::new();
    let mut buffer: Vec<String> = Vec::new();
    let mut buffer_len = 0usize;

    for fragment in fragments {
        let fragment_len = fragment.chars().count();
        if !buffer.is_empty() && buffer_len + fragment_len > cfg.child_max_size
        {
            let closed = buffer.join(" ").trim().to_string();
            if cfg.overlap > 0 && !closed.is_empty() {
                let tail = char_tail(&closed, cfg.overlap).to_string();
                buffer_len = tail.chars().count();
                buffer = vec![tail];
            } else {
                buffer = Vec::new();
                buffer_len = 0;
            }
            chunks.push(closed);
        }
        buffer_len += fragment_len;
        buffer.push(fragment);
    }

    if !buffer.is_empty() {
        chunks.push(buffer.join(" ").trim().to_string());
    }

    chunks
}

/// Segment `text` into an ordered parent/child hierarchy.
///
/// Children are emitted in order as they are produced; a parent is emitted
/// as soon as its buffer closes, and the final parent is flushed at the end.
/// A child whose size triggers a parent rollover belongs to the newly
/// started parent, not the one just closed. Ids are
/// `{document_id}_p{i}` and `{document_id}_c{j}` with independent counters.
///
/// Empty input yields an empty sequence.
pub fn hierarchical_chunks(
    document_id: &str,
    text: &str,
    cfg: &RetrievalConfig,
) -> Vec<Chunk> {
    let children = split_children(text, cfg);

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut parent_buffer: Vec<String> = Vec::new();
    let mut parent_len = 0usize;
    let mut parent_idx = 0usize;

    for (child_idx, child) in children.into_iter().enumerate() {
        let child_len = child.chars().count();
        if !parent_buffer.is_empty()
            && parent_len + child_len > cfg.parent_max_size
        {
            let parent_id = format!("{document_id}_p{parent_idx}");
            chunks.push(Chunk {
                text: parent_buffer.join(" ").trim().to_string(),
                chunk_id: parent_id.clone(),
                parent_id,
                level: ChunkLevel::Parent,
            });
            parent_idx += 1;
            parent_buffer.clear();
            parent_len = 0;
        }

        parent_len += child_len;
        let parent_id = format!("{document_id}_p{parent_idx}");
        chunks.push(Chunk {
            text: child.clone(),
            chunk_id: format!("{document_id}_c{child_idx}"),
            parent_id,
            level: ChunkLevel::Child,
        });
        parent_buffer.push(child);
    }

    if !parent_buffer.is_empty() {
        let parent_id = format!("{document_id}_p{parent_idx}");
        chunks.push(Chunk {
            text: parent_buffer.join(" ").trim().to_string(),
            chunk_id: parent_id.clone(),
            parent_id,
            level: ChunkLevel::Parent,
        });
    }

    chunks
}
