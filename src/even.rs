//! Even page chunking.
//!
//! Greedy chunking keeps every chunk but the last at (or just over) the
//! target, so the last one absorbs all the slack:
//!
//! ```text
//! pages = 1_030 x 1 token, target = 100
//!
//! Greedy: [100] [100] ... [100] [30]      <- straggler
//! Even:   [103] [103] ... [103] [103]     <- slack spread over all ten
//! ```
//!
//! ## Spreading the Overflow
//!
//! The even strategy breaks from both ends of the document toward the
//! middle. Each round it works out how far the remaining tokens overshoot a
//! whole number of targets, divides that overflow over the
//! `round(remaining / target)` chunks still to place, and closes the front
//! and back chunks at the page boundary nearest the adjusted target:
//!
//! ```text
//! remaining = 1_030, target = 100
//! overflow  = 30, spread over round(10.3) = 10 chunks
//! local     = 100 + (30 * 2 / 10) / 2 = 103
//! ```
//!
//! Breaks land on the *nearest* boundary, so a chunk may close under the
//! target when that is closer than overshooting it. The middle of the
//! document takes what the rounding leaves over.
//!
//! ## Trade-offs
//!
//! | Strategy | Within-document spread | Across documents |
//! |----------|------------------------|------------------|
//! | Greedy | Straggler at the end | Close to target |
//! | Even | Near-uniform | Drifts from target |
//! | Ends | Slack in the outer chunks | Middle chunks at target |

use crate::balance::{two_sided, Spread};
use crate::bounds::ChunkBounds;
use crate::target::ChunkTarget;
use crate::Chunker;

/// Chunker that spreads the overflow so chunks come out near-equal.
///
/// ## Example
///
/// ```rust
/// use folios::{ChunkTarget, Chunker, EvenChunker};
///
/// let chunker = EvenChunker::new(ChunkTarget::new(100).unwrap());
/// let pages: Vec<(u32, u64)> = (1..=23).map(|p| (p, 10)).collect();
/// let chunks = chunker.partition(&pages);
///
/// // 230 tokens, under 2.5 targets: split at the nearest midpoint
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[0].tokens, 110);
/// assert_eq!(chunks[1].tokens, 120);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EvenChunker {
    target: ChunkTarget,
}

impl EvenChunker {
    /// Create an even chunker.
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

/// `round(total / target)`, half away from zero.
pub(crate) fn rounded_chunks(total_tokens: u64, target: ChunkTarget) -> usize {
    let target = target.tokens();
    (total_tokens.saturating_add(target / 2) / target) as usize
}

impl Chunker for EvenChunker {
    fn partition(&self, pages: &[(u32, u64)]) -> Vec<ChunkBounds> {
        two_sided(pages, self.target, Spread::Every)
    }

    fn estimate_chunks(&self, total_tokens: u64) -> usize {
        rounded_chunks(total_tokens, self.target)
    }
}
