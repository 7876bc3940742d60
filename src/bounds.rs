//! The ChunkBounds type: a run of whole pages with its token weight.

/// A chunk: a contiguous, inclusive run of pages.
///
/// Chunks never split a page, so a chunk is fully described by its first
/// and last page:
///
/// ```rust
/// use folios::ChunkBounds;
///
/// let bounds = ChunkBounds::new(2, 4, 6, 1_250);
/// assert!(bounds.contains(5));
/// assert!(!bounds.contains(7));
/// assert_eq!(bounds.pages().collect::<Vec<_>>(), vec![4, 5, 6]);
/// ```
///
/// ## Page Numbers vs Positions
///
/// `first_page` and `last_page` are page *numbers*, which need not be
/// contiguous integers when a document skipped or rejected pages. A chunk
/// covers every page of the document whose number falls in that range:
///
/// ```text
/// Pages:    1   2   3   5   6   9
///           |-------|   |---|   |
/// Chunks:   chunk 1     chunk 2  chunk 3
///           [1..=3]     [5..=6]  [9..=9]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkBounds {
    /// 1-based chunk number.
    pub chunk: u32,
    /// First page number in the chunk.
    pub first_page: u32,
    /// Last page number in the chunk (inclusive).
    pub last_page: u32,
    /// Sum of the chunk's per-page token weights.
    pub tokens: u64,
}

impl ChunkBounds {
    /// Create new chunk bounds.
    #[must_use]
    pub const fn new(chunk: u32, first_page: u32, last_page: u32, tokens: u64) -> Self {
        Self {
            chunk,
            first_page,
            last_page,
            tokens,
        }
    }

    /// Whether page number `page` falls in this chunk.
    #[must_use]
    pub const fn contains(&self, page: u32) -> bool {
        self.first_page <= page && page <= self.last_page
    }

    /// The page-number range of this chunk.
    #[must_use]
    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        self.first_page..=self.last_page
    }
}

impl std::fmt::Display for ChunkBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunk {{ number: {}, pages: {}..={}, tokens: {} }}",
            self.chunk, self.first_page, self.last_page, self.tokens
        )
    }
}
