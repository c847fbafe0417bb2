//! In-memory keyword index over document chunks

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::error::IndexError;
use crate::ingestion::{TextChunk, TextChunker};
use crate::providers::{BuiltIndex, Indexer, Passage, PassageIndex};

const STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "could", "did", "do",
    "does", "for", "from", "had", "has", "have", "how", "i", "in", "is", "it", "its", "me",
    "my", "of", "on", "or", "our", "should", "so", "that", "the", "their", "them", "there",
    "these", "this", "those", "to", "was", "we", "were", "what", "when", "where", "which",
    "who", "whom", "why", "will", "with", "would", "you", "your",
];

/// Lowercased content words of `text`, stop words removed, light plural stemming,
/// deduplicated in first-seen order
pub fn query_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Lowercased content words of `text` with repeats kept
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .map(stem)
}

fn stem(word: String) -> String {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word
    }
}

struct IndexedChunk {
    chunk: TextChunk,
    term_counts: HashMap<String, usize>,
    length: usize,
}

/// Term-frequency index with inverse-document-frequency weighting
pub struct KeywordIndex {
    chunks: Vec<IndexedChunk>,
    /// Number of chunks each term occurs in
    doc_freq: HashMap<String, usize>,
}

impl KeywordIndex {
    /// Index the given chunks
    pub fn new(chunks: Vec<TextChunk>) -> Self {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        let chunks: Vec<IndexedChunk> = chunks
            .into_iter()
            .map(|chunk| {
                let mut term_counts: HashMap<String, usize> = HashMap::new();
                let mut length = 0;
                for term in tokenize(&chunk.text) {
                    *term_counts.entry(term).or_default() += 1;
                    length += 1;
                }
                for term in term_counts.keys() {
                    *doc_freq.entry(term.clone()).or_default() += 1;
                }
                IndexedChunk {
                    chunk,
                    term_counts,
                    length,
                }
            })
            .collect();

        Self { chunks, doc_freq }
    }

    fn score(&self, chunk: &IndexedChunk, terms: &[String]) -> f32 {
        let n = self.chunks.len() as f32;
        let norm = (chunk.length.max(1) as f32).sqrt();

        terms
            .iter()
            .filter_map(|term| {
                let tf = *chunk.term_counts.get(term)? as f32;
                let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
                let idf = ((n + 1.0) / (df + 0.5)).ln().max(0.01);
                Some((1.0 + tf.ln()) * idf)
            })
            .sum::<f32>()
            / norm
    }
}

impl PassageIndex for KeywordIndex {
    fn retrieve(&self, query: &str, k: usize) -> Vec<Passage> {
        let terms = query_terms(query);
        if terms.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut passages: Vec<Passage> = self
            .chunks
            .iter()
            .map(|c| (c, self.score(c, &terms)))
            .filter(|(_, score)| *score > 0.0)
            .map(|(c, score)| Passage {
                chunk_index: c.chunk.index,
                text: c.chunk.text.clone(),
                score,
            })
            .collect();

        passages.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        passages.truncate(k);
        passages
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }
}

/// Indexer that chunks text and builds a [`KeywordIndex`]
pub struct ChunkIndexer {
    chunker: TextChunker,
}

impl ChunkIndexer {
    pub fn new(chunk_size: usize, chunk_overlap: usize, min_chunk_size: usize) -> Self {
        Self {
            chunker: TextChunker::new(chunk_size, chunk_overlap, min_chunk_size),
        }
    }
}

#[async_trait]
impl Indexer for ChunkIndexer {
    async fn build(&self, text: &str) -> Result<BuiltIndex, IndexError> {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Err(IndexError::new("No text to index"));
        }

        let chunk_count = chunks.len();
        tracing::debug!("Indexing {} chunks", chunk_count);

        Ok(BuiltIndex {
            index: Box::new(KeywordIndex::new(chunks)),
            chunk_count,
        })
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
