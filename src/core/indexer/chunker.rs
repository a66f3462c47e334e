//! Line-based text chunking.
//!
//! Splits file content into overlapping chunks that always start
//! and end on line boundaries, so every chunk can be addressed by a
//! 1-based inclusive line range. Sizes are measured in
//! **characters** (Unicode scalar values), never bytes, so
//! multi-byte content cannot skew chunk boundaries or panic a
//! slice.
//!
//! # Example
//!
//! ```
//! use codeindex::core::indexer::Chunker;
//!
//! let chunker = Chunker::new(16, 4);
//! let chunks = chunker.chunk_text("fn a() {}\nfn b() {}\nfn c() {}\n");
//!
//! assert_eq!(chunks[0].start_line, 1);
//! assert_eq!(chunks.last().unwrap().end_line, 3);
//! ```

use crate::core::types::Chunk;

/// Line-based text chunker.
///
/// Lines accumulate into a buffer until the next line would push
/// it past `chunk_size`. The following chunk is then seeded with
/// enough trailing lines of the closed one to cover roughly
/// `overlap` characters.
#[derive(Debug, Clone)]
pub struct Chunker {
    /// Target number of characters per chunk
    chunk_size: usize,

    /// Approximate number of characters carried into the next chunk
    overlap: usize,
}

impl Chunker {
    /// Create a new chunker with the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is 0 or if `overlap >= chunk_size`.
    /// Options are validated before a build, so this only fires on
    /// programmer error.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be > 0");
        assert!(overlap < chunk_size, "overlap must be < chunk_size");

        Self {
            chunk_size,
            overlap,
        }
    }

    /// Get the chunk size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Get the overlap size in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk text into overlapping, line-bounded segments.
    ///
    /// Each line costs its character count plus one for the line
    /// break. A line longer than `chunk_size` still becomes a chunk
    /// of its own; lines are never split. The last buffer is
    /// always emitted, even when it is short.
    ///
    /// Deterministic: the same text and options always yield the
    /// same chunks.
    pub fn chunk_text(&self, text: &str) -> Vec<Chunk> {
        let lines: Vec<&str> = text.lines().collect();

        if lines.is_empty() {
            return Vec::new();
        }

        let costs: Vec<usize> = lines.iter().map(|l| l.chars().count() + 1).collect();

        let mut chunks = Vec::new();
        // Buffer holds lines[start..i]
        let mut start = 0;
        let mut buffer_len = 0;

        for (i, cost) in costs.iter().enumerate() {
            if buffer_len + cost > self.chunk_size && i > start {
                chunks.push(Self::make_chunk(&lines, start, i, chunks.len()));

                let carried = self.overlap_lines(buffer_len, i - start);
                start = i - carried;
                buffer_len = costs[start..i].iter().sum();
            }
            buffer_len += cost;
        }

        chunks.push(Self::make_chunk(&lines, start, lines.len(), chunks.len()));

        chunks
    }

    /// Number of trailing lines to carry from a closed chunk.
    ///
    /// Derived from the closed chunk's average line length, so the
    /// carried text tracks content density. Capped one line short
    /// of the whole chunk so the next start always advances.
    fn overlap_lines(&self, chunk_len: usize, line_count: usize) -> usize {
        if self.overlap == 0 || line_count <= 1 {
            return 0;
        }

        let avg_line_len = (chunk_len / line_count).max(1);
        self.overlap
            .div_ceil(avg_line_len)
            .min(line_count - 1)
    }

    fn make_chunk(lines: &[&str], start: usize, end: usize, chunk_index: usize) -> Chunk {
        Chunk {
            content: lines[start..end].join("\n"),
            start_line: start + 1,
            end_line: end,
            chunk_index,
        }
    }
}
