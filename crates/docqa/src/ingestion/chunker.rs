//! Sentence-aligned chunking with overlap

use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;

/// A slice of document text ready for indexing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position of the chunk within the document
    pub index: usize,
    /// Trimmed chunk text
    pub text: String,
    /// Byte range in the source text
    pub span: Range<usize>,
}

/// Packs whole sentences into chunks of roughly `chunk_size` bytes.
///
/// Consecutive chunks share trailing sentences up to `overlap` bytes, so a
/// fact that straddles a boundary is still retrievable from one chunk.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
    min_size: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize, min_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size / 2),
            min_size: min_size.max(1),
        }
    }

    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        // Sentences of the chunk being built, as byte ranges
        let mut window: Vec<Range<usize>> = Vec::new();

        for (start, sentence) in text.split_sentence_bound_indices() {
            let sentence = start..start + sentence.len();

            if !window.is_empty() && span_len(&window) + sentence.len() > self.chunk_size {
                self.emit(text, &window, &mut chunks);
                let keep = self.carried(&window, sentence.len());
                window.drain(..window.len() - keep);
            }

            window.push(sentence);
        }

        self.emit(text, &window, &mut chunks);
        chunks
    }

    /// How many trailing sentences of `window` open the next chunk
    fn carried(&self, window: &[Range<usize>], incoming: usize) -> usize {
        let mut keep = 0;
        let mut carried = 0;

        // Never carry the whole window, or the next chunk repeats it
        for sentence in window.iter().rev().take(window.len().saturating_sub(1)) {
            let next = carried + sentence.len();
            if next > self.overlap || next + incoming > self.chunk_size {
                break;
            }
            carried = next;
            keep += 1;
        }
        keep
    }

    fn emit(&self, text: &str, window: &[Range<usize>], chunks: &mut Vec<TextChunk>) {
        let (Some(first), Some(last)) = (window.first(), window.last()) else {
            return;
        };
        let span = first.start..last.end;
        let content = text[span.clone()].trim();
        if content.len() < self.min_size {
            return;
        }

        chunks.push(TextChunk {
            index: chunks.len(),
            text: content.to_string(),
            span,
        });
    }
}

fn span_len(window: &[Range<usize>]) -> usize {
    match (window.first(), window.last()) {
        (Some(first), Some(last)) => last.end - first.start,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOUR: &str =
        "First sentence here. Second sentence here. Third sentence here. Fourth sentence here.";

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = TextChunker::new(200, 20, 5);
        let chunks = chunker.chunk("A single short sentence.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "A single short sentence.");
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].span, 0..24);
    }

    #[test]
    fn test_overlap_carries_whole_sentences() {
        let chunker = TextChunker::new(60, 30, 5);
        let chunks = chunker.chunk(FOUR);

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "First sentence here. Second sentence here.",
                "Second sentence here. Third sentence here.",
                "Third sentence here. Fourth sentence here.",
            ]
        );
        assert!(chunks.windows(2).all(|w| w[0].span.start < w[1].span.start));
    }

    #[test]
    fn test_zero_overlap_partitions_text() {
        let chunker = TextChunker::new(45, 0, 5);
        let chunks = chunker.chunk(FOUR);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].span.end, chunks[1].span.start);
        assert!(chunks[1].text.starts_with("Third"));
    }

    #[test]
    fn test_oversized_sentence_stands_alone() {
        let chunker = TextChunker::new(10, 5, 1);
        let chunks = chunker.chunk("This sentence is far longer than ten bytes. Tiny.");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, "Tiny.");
    }

    #[test]
    fn test_whitespace_only_text_yields_nothing() {
        let chunker = TextChunker::new(100, 10, 1);
        assert!(chunker.chunk("   \n\n  ").is_empty());
    }

    #[test]
    fn test_multibyte_text_slices_cleanly() {
        let text = "Ünïcödé wörds ärë hérë. Mörë ünïcödé fõllõws nöw. Ånd ëvën mörë tëxt.";
        let chunker = TextChunker::new(30, 12, 1);
        let chunks = chunker.chunk(text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert_eq!(text[chunk.span.clone()].trim(), chunk.text);
        }
    }
}
