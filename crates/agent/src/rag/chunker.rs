//! Word-window chunker.
//!
//! Text is split on whitespace and cut into windows of `chunk_size` words,
//! each window starting `overlap` words before the previous one ended.
//! Parameters are validated at construction, so `chunk` always advances.

use parley_core::document::Chunk;
use parley_core::error::ChunkingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Requires `0 <= overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered, overlapping chunks.
    ///
    /// Text of at most `chunk_size` words comes back as a single chunk holding
    /// the original text unchanged. Empty text yields one empty chunk.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let total = words.len();

        if total <= self.chunk_size {
            return vec![Chunk {
                chunk_id: chunk_id(0),
                text: text.to_string(),
                start_word: 0,
                end_word: total,
                word_count: total,
            }];
        }

        let mut chunks = Vec::with_capacity(total / (self.chunk_size - self.overlap) + 1);
        let mut start = 0;
        while start < total {
            let end = (start + self.chunk_size).min(total);
            chunks.push(Chunk {
                chunk_id: chunk_id(chunks.len()),
                text: words[start..end].join(" "),
                start_word: start,
                end_word: end,
                word_count: end - start,
            });
            start = if end < total { end - self.overlap } else { end };
        }
        chunks
    }
}

fn chunk_id(index: usize) -> String {
    format!("chunk_{index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert_eq!(
            Chunker::new(100, 100).unwrap_err(),
            ChunkingError::OverlapTooLarge {
                chunk_size: 100,
                overlap: 100
            }
        );
        assert!(Chunker::new(100, 150).is_err());
        assert_eq!(Chunker::new(0, 0).unwrap_err(), ChunkingError::ZeroChunkSize);
    }

    #[test]
    fn short_text_is_one_chunk_verbatim() {
        let text = "  Refunds are\n accepted within 30 days.  ";
        let chunks = Chunker::new(600, 100).unwrap().chunk(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].chunk_id, "chunk_0");
        assert_eq!((chunks[0].start_word, chunks[0].end_word), (0, 6));
        assert_eq!(chunks[0].word_count, 6);
    }

    #[test]
    fn text_of_exactly_chunk_size_is_one_chunk() {
        let chunks = Chunker::new(10, 3).unwrap().chunk(&words(10));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].word_count, 10);
    }

    #[test]
    fn empty_text_yields_one_empty_chunk() {
        let chunks = Chunker::new(600, 100).unwrap().chunk("");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].word_count, 0);
        assert_eq!(chunks[0].end_word, 0);
    }

    #[test]
    fn fifteen_hundred_words() {
        let chunks = Chunker::new(600, 100).unwrap().chunk(&words(1500));
        let starts: Vec<usize> = chunks.iter().map(|c| c.start_word).collect();
        assert_eq!(starts, vec![0, 500, 1000]);
        assert_eq!(chunks[2].end_word, 1500);
        assert_eq!(chunks[2].word_count, 500);
        let ids: Vec<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["chunk_0", "chunk_1", "chunk_2"]);
    }

    #[test]
    fn consecutive_chunks_overlap_and_cover_everything() {
        let total = 257;
        let chunker = Chunker::new(40, 7).unwrap();
        let chunks = chunker.chunk(&words(total));

        assert_eq!(chunks[0].start_word, 0);
        assert_eq!(chunks.last().unwrap().end_word, total);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end_word - pair[1].start_word, 7);
            assert!(pair[1].start_word > pair[0].start_word);
        }
        for c in &chunks {
            assert_eq!(c.end_word - c.start_word, c.word_count);
            assert_eq!(c.text.split_whitespace().count(), c.word_count);
        }
    }

    #[test]
    fn zero_overlap_tiles_the_text() {
        let chunks = Chunker::new(4, 0).unwrap().chunk(&words(10));
        let ranges: Vec<(usize, usize)> = chunks.iter().map(|c| (c.start_word, c.end_word)).collect();
        assert_eq!(ranges, vec![(0, 4), (4, 8), (8, 10)]);
        assert_eq!(chunks[1].text, "w4 w5 w6 w7");
    }
}
