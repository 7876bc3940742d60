//! Greedy page chunking.
//!
//! The simplest chunking strategy: walk pages in order and close a chunk as
//! soon as its running token total reaches the target.
//!
//! ## How It Works
//!
//! ```text
//! target = 10
//!
//! Page tokens:  [4, 4, 4, 4, 4]
//! Running:       4  8 12 | 4  8
//!                     ^      ^
//!                 >= 10,     end of document:
//!                 close      final chunk keeps the remainder
//!
//! Chunk 1: pages 1-3 (12)
//! Chunk 2: pages 4-5 (8)
//! ```
//!
//! ## Trade-offs
//!
//! | Property | Greedy |
//! |----------|--------|
//! | Pages split | Never |
//! | Overshoot per chunk | < one page |
//! | Last chunk | Anywhere from 1 token to a full chunk |
//!
//! The final chunk is never dropped or merged backward, so a document whose
//! total is just over a multiple of the target ends with a small straggler.
//! [`EvenChunker`](crate::EvenChunker) spreads the slack to avoid that.

use crate::bounds::ChunkBounds;
use crate::target::ChunkTarget;
use crate::Chunker;

/// Greedy chunker: close each chunk once it reaches the target.
///
/// ## Example
///
/// ```rust
/// use folios::{ChunkTarget, Chunker, GreedyChunker};
///
/// let chunker = GreedyChunker::new(ChunkTarget::new(10).unwrap());
/// let pages = [(1, 4), (2, 4), (3, 4), (4, 4), (5, 4)];
/// let chunks = chunker.partition(&pages);
///
/// assert_eq!(chunks.len(), 2);
/// assert_eq!((chunks[0].first_page, chunks[0].last_page), (1, 3));
/// assert_eq!((chunks[1].first_page, chunks[1].last_page), (4, 5));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyChunker {
    target: ChunkTarget,
}

impl GreedyChunker {
    /// Create a greedy chunker.
    #[must_use]
    pub const fn new(target: ChunkTarget) -> Self {
        Self { target }
    }

    /// The target weight per chunk.
    #[must_use]
    pub const fn target(&self) -> ChunkTarget {
        self.target
    }
}

/// Walk `pages` (page number, tokens) in order, closing chunks at `target`.
pub(crate) fn walk(pages: &[(u32, u64)], target: ChunkTarget) -> Vec<ChunkBounds> {
    let mut chunks = Vec::new();
    let mut open: Option<ChunkBounds> = None;

    for &(page, tokens) in pages {
        let chunk = open.get_or_insert_with(|| {
            ChunkBounds::new(chunks.len() as u32 + 1, page, page, 0)
        });
        chunk.last_page = page;
        chunk.tokens += tokens;

        if target.is_reached(chunk.tokens) {
            chunks.extend(open.take());
        }
    }

    // Whatever is left becomes the final chunk, however small.
    chunks.extend(open);
    chunks
}

impl Chunker for GreedyChunker {
    fn partition(&self, pages: &[(u32, u64)]) -> Vec<ChunkBounds> {
        walk(pages, self.target)
    }

    fn estimate_chunks(&self, total_tokens: u64) -> usize {
        if total_tokens == 0 {
            return 0;
        }
        total_tokens.div_ceil(self.target.tokens()) as usize
    }
}
