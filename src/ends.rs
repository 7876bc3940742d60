//! Ends page chunking.
//!
//! A variant of even chunking that lets the first and last chunk take the
//! document's slack, so the chunks in between sit close to the target:
//!
//! ```text
//! pages = 1_030 x 1 token, target = 100
//!
//! Even: [103] [103] [103] ... [103] [103]
//! Ends: [115] [100] [100] ... [100] [115]
//! ```
//!
//! The first round closes the outer chunks at `target + overflow / 2`
//! without dividing the overflow; later rounds spread whatever the outer
//! chunks missed the same way [`EvenChunker`](crate::EvenChunker) does.
//! Useful when the outer pages carry front and back matter that should not
//! distort the chunks of running text.

use crate::balance::{two_sided, Spread};
use crate::bounds::ChunkBounds;
use crate::even::rounded_chunks;
use crate::target::ChunkTarget;
use crate::Chunker;

/// Chunker that puts the overflow into the first and last chunk.
///
/// ## Example
///
/// ```rust
/// use folios::{ChunkTarget, Chunker, EndsChunker};
///
/// let chunker = EndsChunker::new(ChunkTarget::new(100).unwrap());
/// let pages: Vec<(u32, u64)> = (1..=1_030).map(|p| (p, 1)).collect();
/// let sizes: Vec<u64> = chunker.partition(&pages).iter().map(|c| c.tokens).collect();
///
/// assert_eq!(sizes.len(), 10);
/// assert_eq!((sizes[0], sizes[9]), (115, 115));
/// assert!(sizes[1..9].iter().all(|&t| t == 100));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EndsChunker {
    target: ChunkTarget,
}

impl EndsChunker {
    /// Create an ends chunker.
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

impl Chunker for EndsChunker {
    fn partition(&self, pages: &[(u32, u64)]) -> Vec<ChunkBounds> {
        two_sided(pages, self.target, Spread::AfterFirst)
    }

    fn estimate_chunks(&self, total_tokens: u64) -> usize {
        rounded_chunks(total_tokens, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EvenChunker;

    fn chunker(target: u64) -> EndsChunker {
        EndsChunker::new(ChunkTarget::new(target).unwrap())
    }

    fn pages(tokens: &[u64]) -> Vec<(u32, u64)> {
        tokens
            .iter()
            .enumerate()
            .map(|(i, &t)| (i as u32 + 1, t))
            .collect()
    }

    fn sizes(chunks: &[ChunkBounds]) -> Vec<u64> {
        chunks.iter().map(|c| c.tokens).collect()
    }

    #[test]
    fn test_outer_chunks_take_slack() {
        let chunks = chunker(100).partition(&pages(&[1; 1030]));
        let sizes = sizes(&chunks);
        assert_eq!(sizes.len(), 10);
        assert_eq!(sizes.first(), Some(&115));
        assert_eq!(sizes.last(), Some(&115));
        assert!(sizes[1..9].iter().all(|&t| t == 100));
    }

    #[test]
    fn test_outer_chunks_can_close_short() {
        // 455 is nearer 500 than 400, so the ends aim under the target
        let mut weights = vec![50; 9];
        weights.push(5);
        let chunks = chunker(100).partition(&pages(&weights));
        assert_eq!(sizes(&chunks), vec![100, 100, 100, 100, 55]);
        assert_eq!(chunks[4], ChunkBounds::new(5, 9, 10, 55));
    }

    #[test]
    fn test_differs_from_even_only_in_first_round() {
        let target = ChunkTarget::new(100).unwrap();
        let exact = pages(&[1; 1000]);
        assert_eq!(
            EndsChunker::new(target).partition(&exact),
            EvenChunker::new(target).partition(&exact)
        );
    }

    #[test]
    fn test_midpoint_split() {
        let chunks = chunker(100).partition(&pages(&[20; 12]));
        assert_eq!(sizes(&chunks), vec![120, 120]);
    }

    #[test]
    fn test_small_and_empty_documents() {
        assert!(chunker(100).partition(&[]).is_empty());
        assert_eq!(
            chunker(100).partition(&pages(&[30, 40])),
            vec![ChunkBounds::new(1, 1, 2, 70)]
        );
    }

    #[test]
    fn test_estimate() {
        assert_eq!(chunker(100).estimate_chunks(0), 0);
        assert_eq!(chunker(100).estimate_chunks(1030), 10);
    }
}
